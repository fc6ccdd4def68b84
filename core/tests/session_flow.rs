use piecework_core::{
    GridSpec, ImageRef, InteractionEvent, LeaderboardStore, ManualClock, MemoryStore, PieceStatus,
    PlayRules, Point, PuzzleError, PuzzleRecord, PuzzleSession, SeededRandom, StoredImage,
    SubmitOutcome, TimerState, Visibility,
};

fn session(piece_count: u32, clock: &ManualClock) -> PuzzleSession {
    let image = ImageRef::new("fixture", 1200, 800).unwrap();
    PuzzleSession::new(
        image,
        piece_count,
        PlayRules::default(),
        Box::new(SeededRandom::new(0xC0FFEE)),
        Box::new(clock.clone()),
    )
    .unwrap()
}

fn drop_on_target(session: &mut PuzzleSession, index: usize) -> Vec<InteractionEvent> {
    let piece = session.pieces()[index].clone();
    let mut events = session.begin_drag(index, piece.current_pos);
    session.update_drag(index, piece.target_pos.offset(1.0, 1.0));
    events.extend(session.end_drag(index, piece.target_pos.offset(1.0, 1.0)));
    events
}

#[test]
fn session_uses_planned_grid() {
    let clock = ManualClock::new(0);
    let session = session(48, &clock);
    assert_eq!(session.grid(), GridSpec { cols: 8, rows: 6 });
    assert_eq!(session.total(), 48);
    assert_eq!(session.timer_state(), TimerState::Armed);
    for (index, piece) in session.pieces().iter().enumerate() {
        assert_eq!(piece.index, index);
        assert!(!piece.bounds().intersects(&session.layout().board));
        assert_eq!(session.piece_status(index), Some(PieceStatus::Tray));
    }
}

#[test]
fn rejects_counts_outside_the_allow_list() {
    let clock = ManualClock::new(0);
    let image = ImageRef::new("fixture", 100, 100).unwrap();
    let result = PuzzleSession::new(
        image,
        49,
        PlayRules::default(),
        Box::new(SeededRandom::new(1)),
        Box::new(clock),
    );
    assert!(matches!(result, Err(PuzzleError::InvalidPieceCount(49))));
}

#[test]
fn timer_runs_from_first_pickup_to_solve() {
    let clock = ManualClock::new(10_000);
    let mut session = session(10, &clock);
    clock.advance(5_000);
    assert_eq!(session.tick(), 0);

    let mut solved_events = 0;
    let mut last_placed = 0;
    for index in 0..session.total() {
        let events = drop_on_target(&mut session, index);
        if index == 0 {
            assert_eq!(events[0], InteractionEvent::FirstInteraction);
            assert!(matches!(session.timer_state(), TimerState::Running { .. }));
        }
        solved_events += events
            .iter()
            .filter(|event| **event == InteractionEvent::Solved)
            .count();
        assert!(session.placed_count() >= last_placed);
        last_placed = session.placed_count();
        clock.advance(1_000);
        session.tick();
    }
    assert_eq!(solved_events, 1);
    assert!(session.is_solved());
    assert_eq!(session.timer_state(), TimerState::Stopped);
    let outcome = session.outcome().unwrap();
    assert_eq!(outcome.elapsed_ms, 9_000);
    assert_eq!(outcome.leaderboard_time(), Some(9_000));

    clock.advance(60_000);
    assert_eq!(session.tick(), 9_000);
    assert!(drop_on_target(&mut session, 0).is_empty());
}

#[test]
fn shuffle_keeps_locked_pieces_and_rearms_timer() {
    let clock = ManualClock::new(0);
    let mut session = session(20, &clock);
    drop_on_target(&mut session, 3);
    drop_on_target(&mut session, 7);
    let piece = session.pieces()[5].clone();
    session.begin_drag(5, piece.current_pos);
    session.end_drag(5, Point::new(300.0, 300.0));
    clock.advance(2_000);
    session.tick();

    let locked_before: Vec<_> = session
        .pieces()
        .iter()
        .filter(|piece| piece.locked)
        .map(|piece| (piece.index, piece.current_pos))
        .collect();
    session.shuffle();
    let locked_after: Vec<_> = session
        .pieces()
        .iter()
        .filter(|piece| piece.locked)
        .map(|piece| (piece.index, piece.current_pos))
        .collect();
    assert_eq!(locked_before, locked_after);
    assert_eq!(session.placed_count(), 2);
    assert_eq!(session.timer_state(), TimerState::Armed);
    assert_eq!(session.tick(), 0);
    assert_eq!(session.piece_status(5), Some(PieceStatus::Tray));

    let events = drop_on_target(&mut session, 0);
    assert_eq!(events[0], InteractionEvent::FirstInteraction);
}

#[test]
fn reassemble_never_reaches_the_leaderboard() {
    let clock = ManualClock::new(0);
    let mut session = session(32, &clock);
    drop_on_target(&mut session, 0);
    clock.advance(700);
    let events = session.reassemble();
    assert_eq!(events.last(), Some(&InteractionEvent::Solved));
    let outcome = session.outcome().unwrap();
    assert!(outcome.assisted);
    assert_eq!(outcome.leaderboard_time(), None);
    assert!(session.pieces().iter().all(|piece| piece.current_pos == piece.target_pos));
}

#[test]
fn full_reset_starts_a_new_attempt() {
    let clock = ManualClock::new(0);
    let mut session = session(10, &clock);
    for index in 0..session.total() {
        drop_on_target(&mut session, index);
    }
    assert!(session.outcome().is_some());
    session.full_reset();
    assert_eq!(session.placed_count(), 0);
    assert!(session.outcome().is_none());
    assert_eq!(session.timer_state(), TimerState::Armed);
    assert!(session.pieces().iter().all(|piece| !piece.locked));
}

#[test]
fn closed_session_ignores_input() {
    let clock = ManualClock::new(0);
    let mut session = session(10, &clock);
    drop_on_target(&mut session, 0);
    clock.advance(400);
    session.close();
    assert!(session.is_closed());
    clock.advance(4_000);
    assert_eq!(session.tick(), 400);
    assert!(drop_on_target(&mut session, 1).is_empty());
    assert!(session.shuffle().is_empty());
}

#[test]
fn cancelled_drag_is_not_stranded() {
    let clock = ManualClock::new(0);
    let mut session = session(10, &clock);
    let piece = session.pieces()[2].clone();
    session.begin_drag(2, piece.current_pos);
    session.update_drag(2, Point::new(5.0, 5.0));
    session.cancel_drag();
    assert_eq!(session.dragging(), None);
    assert_ne!(session.piece_status(2), Some(PieceStatus::Dragging));
}

#[test]
fn solved_time_flows_into_leaderboard() {
    let clock = ManualClock::new(1_000);
    let mut session = session(10, &clock);
    for index in 0..session.total() {
        drop_on_target(&mut session, index);
        clock.advance(500);
    }
    let time = session.outcome().and_then(|outcome| outcome.leaderboard_time()).unwrap();
    let mut store = MemoryStore::new();
    let mut board = LeaderboardStore::new(&mut store, &clock);
    assert_eq!(board.submit("puzzle", "Ann", time).unwrap(), SubmitOutcome::Inserted);
    assert_eq!(board.list("puzzle").unwrap()[0].best_time_ms, 4_500);
}

#[test]
fn shuffle_that_releases_the_last_piece_keeps_the_result() {
    let clock = ManualClock::new(0);
    let mut session = session(10, &clock);
    for index in 0..9 {
        drop_on_target(&mut session, index);
    }
    let last = session.pieces()[9].clone();
    session.begin_drag(9, last.current_pos);
    session.update_drag(9, last.target_pos);
    clock.advance(3_000);

    let events = session.shuffle();
    assert_eq!(events.last(), Some(&InteractionEvent::Solved));
    assert_eq!(session.timer_state(), TimerState::Stopped);
    assert_eq!(session.outcome().map(|outcome| outcome.elapsed_ms), Some(3_000));

    clock.advance(1_000);
    assert!(session.shuffle().is_empty());
    assert_eq!(session.timer_state(), TimerState::Stopped);
    assert_eq!(session.tick(), 3_000);
}

#[test]
fn shuffle_releases_a_live_miss_into_the_tray() {
    let clock = ManualClock::new(0);
    let mut session = session(10, &clock);
    let piece = session.pieces()[4].clone();
    session.begin_drag(4, piece.current_pos);
    session.update_drag(4, Point::new(300.0, 300.0));
    let events = session.shuffle();
    assert!(matches!(
        events.as_slice(),
        [InteractionEvent::PieceDropped { index: 4, .. }]
    ));
    assert_eq!(session.dragging(), None);
    assert_eq!(session.piece_status(4), Some(PieceStatus::Tray));
    assert_eq!(session.timer_state(), TimerState::Armed);
    assert!(session.outcome().is_none());
}

fn record_with_grid(grid: GridSpec) -> PuzzleRecord {
    let image = ImageRef::new("fixture", 800, 800).unwrap();
    PuzzleRecord {
        id: "stored".to_string(),
        name: "stored".to_string(),
        visibility: Visibility::Public,
        token: None,
        piece_count: 64,
        grid,
        image: StoredImage::from_bytes(image, "image/png", &[0]),
        created_at: 0,
    }
}

#[test]
fn stored_grid_is_checked_against_piece_count() {
    let clock = ManualClock::new(0);
    let open = |grid| {
        PuzzleSession::from_record(
            &record_with_grid(grid),
            PlayRules::default(),
            Box::new(SeededRandom::new(1)),
            Box::new(clock.clone()),
        )
    };
    assert_eq!(open(GridSpec { cols: 8, rows: 8 }).unwrap().total(), 64);
    assert!(matches!(
        open(GridSpec { cols: 3, rows: 3 }),
        Err(PuzzleError::GridMismatch { .. })
    ));
    assert!(matches!(
        open(GridSpec { cols: 70_000, rows: 70_000 }),
        Err(PuzzleError::GridMismatch { .. })
    ));
}
