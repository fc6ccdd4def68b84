use tracing::info;

use crate::clock::Clock;
use crate::error::PuzzleResult;
use crate::grid::{grid_for_image, validate_grid, validate_piece_count, GridSpec};
use crate::image::{validate_image_ref, ImageRef};
use crate::interaction::{InteractionController, InteractionEvent, PieceStatus};
use crate::layout::{BoardLayout, Point};
use crate::pieces::{build_pieces, Piece};
use crate::record::PuzzleRecord;
use crate::rng::RandomSource;
use crate::rules::PlayRules;
use crate::timer::{Timer, TimerState};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SessionOutcome {
    pub elapsed_ms: u64,
    /// Finished with [`PuzzleSession::reassemble`]; not a real solve.
    pub assisted: bool,
}

impl SessionOutcome {
    pub fn leaderboard_time(&self) -> Option<u64> {
        if self.assisted {
            None
        } else {
            Some(self.elapsed_ms)
        }
    }
}

/// One play-through of one puzzle. Owns the pieces, the interaction state
/// and the timer; dropped when the player leaves or restarts.
pub struct PuzzleSession {
    image: ImageRef,
    grid: GridSpec,
    layout: BoardLayout,
    rules: PlayRules,
    controller: InteractionController,
    timer: Timer,
    clock: Box<dyn Clock>,
    rng: Box<dyn RandomSource>,
    outcome: Option<SessionOutcome>,
    closed: bool,
}

impl PuzzleSession {
    pub fn new(
        image: ImageRef,
        piece_count: u32,
        rules: PlayRules,
        rng: Box<dyn RandomSource>,
        clock: Box<dyn Clock>,
    ) -> PuzzleResult<Self> {
        validate_image_ref(&image)?;
        let grid = grid_for_image(piece_count, image.width, image.height)?;
        Ok(Self::with_grid(image, grid, rules, rng, clock))
    }

    pub fn from_record(
        record: &PuzzleRecord,
        rules: PlayRules,
        rng: Box<dyn RandomSource>,
        clock: Box<dyn Clock>,
    ) -> PuzzleResult<Self> {
        validate_piece_count(record.piece_count)?;
        let grid = validate_grid(record.grid, record.piece_count)?;
        let image = record.image.image_ref.clone();
        validate_image_ref(&image)?;
        Ok(Self::with_grid(image, grid, rules, rng, clock))
    }

    fn with_grid(
        image: ImageRef,
        grid: GridSpec,
        rules: PlayRules,
        mut rng: Box<dyn RandomSource>,
        clock: Box<dyn Clock>,
    ) -> Self {
        let rules = rules.sanitized();
        let layout = BoardLayout::for_workspace(
            rules.workspace_width,
            rules.workspace_height,
            rules.tray_width_ratio,
        );
        let pieces = build_pieces(&image, grid, &layout, rng.as_mut());
        let controller = InteractionController::new(pieces, &layout, rules.snap_distance_ratio);
        let mut timer = Timer::new();
        timer.reset();
        info!(
            handle = %image.handle,
            cols = grid.cols,
            rows = grid.rows,
            "session started"
        );
        Self {
            image,
            grid,
            layout,
            rules,
            controller,
            timer,
            clock,
            rng,
            outcome: None,
            closed: false,
        }
    }

    pub fn image(&self) -> &ImageRef {
        &self.image
    }

    pub fn grid(&self) -> GridSpec {
        self.grid
    }

    pub fn layout(&self) -> &BoardLayout {
        &self.layout
    }

    pub fn rules(&self) -> &PlayRules {
        &self.rules
    }

    pub fn pieces(&self) -> &[Piece] {
        self.controller.pieces()
    }

    pub fn piece_status(&self, index: usize) -> Option<PieceStatus> {
        self.controller.status(index)
    }

    pub fn placed_count(&self) -> usize {
        self.controller.placed_count()
    }

    pub fn total(&self) -> usize {
        self.controller.total()
    }

    pub fn is_solved(&self) -> bool {
        self.controller.is_solved()
    }

    pub fn dragging(&self) -> Option<usize> {
        self.controller.dragging()
    }

    pub fn timer_state(&self) -> TimerState {
        self.timer.state()
    }

    pub fn outcome(&self) -> Option<SessionOutcome> {
        self.outcome
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn begin_drag(&mut self, index: usize, pointer: Point) -> Vec<InteractionEvent> {
        if self.closed {
            return Vec::new();
        }
        let events = self.controller.begin_drag(index, pointer);
        self.apply_events(&events, false);
        events
    }

    pub fn update_drag(&mut self, index: usize, pointer: Point) -> bool {
        if self.closed {
            return false;
        }
        self.controller.update_drag(index, pointer)
    }

    pub fn end_drag(&mut self, index: usize, pointer: Point) -> Vec<InteractionEvent> {
        if self.closed {
            return Vec::new();
        }
        let events = self.controller.end_drag(index, pointer);
        self.apply_events(&events, false);
        events
    }

    pub fn cancel_drag(&mut self) -> Vec<InteractionEvent> {
        if self.closed {
            return Vec::new();
        }
        let events = self.controller.cancel_drag();
        self.apply_events(&events, false);
        events
    }

    /// Host poll for the display; returns the current elapsed time.
    pub fn tick(&mut self) -> u64 {
        if self.closed {
            return self.timer.elapsed();
        }
        let now = self.clock.now_ms();
        self.timer.tick(now)
    }

    pub fn elapsed(&self) -> u64 {
        self.timer.current_elapsed(self.clock.now_ms())
    }

    /// Scatters the loose pieces again and restarts the clock, which arms on
    /// the next pickup. Locked pieces stay put. A finished attempt keeps its
    /// result, even when releasing a live drag is what finished it.
    pub fn shuffle(&mut self) -> Vec<InteractionEvent> {
        if self.closed {
            return Vec::new();
        }
        let events = self.controller.shuffle(self.rng.as_mut());
        self.apply_events(&events, false);
        if self.controller.is_solved() {
            return events;
        }
        self.controller.rearm_first_interaction();
        self.timer.reset();
        events
    }

    /// "Play again": unlocks everything and starts a fresh attempt.
    pub fn full_reset(&mut self) {
        if self.closed {
            return;
        }
        self.controller.full_reset(self.rng.as_mut());
        self.timer.reset();
        self.outcome = None;
    }

    /// Puts every piece in place. The result never counts for the leaderboard.
    pub fn reassemble(&mut self) -> Vec<InteractionEvent> {
        if self.closed {
            return Vec::new();
        }
        let events = self.controller.lock_all();
        self.apply_events(&events, true);
        events
    }

    /// Stops the timer for good. Later input and ticks are ignored.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        let now = self.clock.now_ms();
        self.timer.stop(now);
        self.closed = true;
    }

    fn apply_events(&mut self, events: &[InteractionEvent], assisted: bool) {
        for event in events {
            match event {
                InteractionEvent::FirstInteraction => {
                    let now = self.clock.now_ms();
                    self.timer.start(now);
                }
                InteractionEvent::Solved => {
                    let now = self.clock.now_ms();
                    let elapsed = self.timer.stop(now).unwrap_or_else(|| self.timer.elapsed());
                    info!(elapsed_ms = elapsed, assisted, "attempt finished");
                    self.outcome = Some(SessionOutcome {
                        elapsed_ms: elapsed,
                        assisted,
                    });
                }
                _ => {}
            }
        }
    }
}

impl Drop for PuzzleSession {
    fn drop(&mut self) {
        self.close();
    }
}
