//! Drag, drop and snap handling for one attempt.
//!
//! Each piece moves through `Tray -> Dragging -> Locked | Loose`, and a loose
//! piece may be picked up again. Locked pieces are final. Results come back
//! as [`InteractionEvent`]s for the host to render; nothing here touches a
//! presentation API.

use tracing::{debug, info};

use crate::layout::{BoardLayout, Point, Rect};
use crate::pieces::{scatter_unlocked, Piece};
use crate::rng::RandomSource;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PieceStatus {
    Tray,
    Dragging,
    Loose { on_board: bool },
    Locked,
}

#[derive(Clone, Debug, PartialEq)]
pub enum InteractionEvent {
    FirstInteraction,
    DragStarted { index: usize },
    PieceLocked { index: usize, placed: usize },
    PieceDropped { index: usize, pos: Point, on_board: bool },
    Solved,
}

#[derive(Clone, Copy, Debug)]
struct DragState {
    index: usize,
    grab_offset: Point,
    origin: Point,
    last_pointer: Point,
}

#[derive(Clone, Debug)]
pub struct InteractionController {
    pieces: Vec<Piece>,
    status: Vec<PieceStatus>,
    board: Rect,
    tray: Rect,
    snap_distance_ratio: f32,
    placed_count: usize,
    drag: Option<DragState>,
    first_interaction_sent: bool,
    solved_sent: bool,
}

impl InteractionController {
    pub fn new(pieces: Vec<Piece>, layout: &BoardLayout, snap_distance_ratio: f32) -> Self {
        let status = pieces
            .iter()
            .map(|piece| {
                if piece.locked {
                    PieceStatus::Locked
                } else {
                    PieceStatus::Tray
                }
            })
            .collect();
        let placed_count = pieces.iter().filter(|piece| piece.locked).count();
        Self {
            pieces,
            status,
            board: layout.board,
            tray: layout.tray,
            snap_distance_ratio,
            placed_count,
            drag: None,
            first_interaction_sent: false,
            solved_sent: false,
        }
    }

    pub fn pieces(&self) -> &[Piece] {
        &self.pieces
    }

    pub fn piece(&self, index: usize) -> Option<&Piece> {
        self.pieces.get(index)
    }

    pub fn status(&self, index: usize) -> Option<PieceStatus> {
        self.status.get(index).copied()
    }

    pub fn total(&self) -> usize {
        self.pieces.len()
    }

    pub fn placed_count(&self) -> usize {
        self.placed_count
    }

    pub fn is_solved(&self) -> bool {
        !self.pieces.is_empty() && self.placed_count == self.pieces.len()
    }

    pub fn dragging(&self) -> Option<usize> {
        self.drag.map(|drag| drag.index)
    }

    /// Position the drag started from, while a drag is live.
    pub fn drag_origin(&self) -> Option<Point> {
        self.drag.map(|drag| drag.origin)
    }

    pub fn snap_threshold(&self, piece: &Piece) -> f32 {
        piece.width.min(piece.height) * self.snap_distance_ratio
    }

    /// Picks up a piece. Locked or unknown pieces, and any pickup while
    /// another drag is live, are ignored and yield no events.
    pub fn begin_drag(&mut self, index: usize, pointer: Point) -> Vec<InteractionEvent> {
        let mut events = Vec::new();
        if self.drag.is_some() {
            return events;
        }
        let Some(piece) = self.pieces.get(index) else {
            return events;
        };
        if piece.locked {
            return events;
        }
        let origin = piece.current_pos;
        self.drag = Some(DragState {
            index,
            grab_offset: pointer.minus(origin),
            origin,
            last_pointer: pointer,
        });
        self.status[index] = PieceStatus::Dragging;
        debug!(index, x = origin.x, y = origin.y, "drag started");
        if !self.first_interaction_sent {
            self.first_interaction_sent = true;
            events.push(InteractionEvent::FirstInteraction);
        }
        events.push(InteractionEvent::DragStarted { index });
        events
    }

    /// Tracks the pointer. No snapping happens mid-drag.
    pub fn update_drag(&mut self, index: usize, pointer: Point) -> bool {
        let Some(drag) = self.drag.as_mut() else {
            return false;
        };
        if drag.index != index {
            return false;
        }
        drag.last_pointer = pointer;
        let pos = pointer.minus(drag.grab_offset);
        self.pieces[index].current_pos = pos;
        true
    }

    pub fn end_drag(&mut self, index: usize, pointer: Point) -> Vec<InteractionEvent> {
        match self.drag {
            Some(drag) if drag.index == index => {
                self.drag = None;
                let drop = pointer.minus(drag.grab_offset);
                self.resolve_drop(index, drop)
            }
            _ => Vec::new(),
        }
    }

    /// Host-side cancellation; released exactly like a drop at the last
    /// known pointer position.
    pub fn cancel_drag(&mut self) -> Vec<InteractionEvent> {
        match self.drag {
            Some(drag) => self.end_drag(drag.index, drag.last_pointer),
            None => Vec::new(),
        }
    }

    fn resolve_drop(&mut self, index: usize, drop: Point) -> Vec<InteractionEvent> {
        let mut events = Vec::new();
        let piece = &self.pieces[index];
        let threshold = self.snap_threshold(piece);
        let distance = drop.chebyshev(piece.target_pos);
        let on_board = self.board.contains(piece.center_at(drop));
        if on_board && distance <= threshold {
            let piece = &mut self.pieces[index];
            piece.current_pos = piece.target_pos;
            piece.locked = true;
            self.status[index] = PieceStatus::Locked;
            self.placed_count += 1;
            info!(index, placed = self.placed_count, total = self.pieces.len(), "piece locked");
            events.push(InteractionEvent::PieceLocked {
                index,
                placed: self.placed_count,
            });
            if self.is_solved() && !self.solved_sent {
                self.solved_sent = true;
                info!(total = self.pieces.len(), "puzzle solved");
                events.push(InteractionEvent::Solved);
            }
        } else {
            self.pieces[index].current_pos = drop;
            self.status[index] = PieceStatus::Loose { on_board };
            debug!(index, distance, threshold, on_board, "piece dropped loose");
            events.push(InteractionEvent::PieceDropped {
                index,
                pos: drop,
                on_board,
            });
        }
        debug_assert_eq!(
            self.placed_count,
            self.pieces.iter().filter(|piece| piece.locked).count()
        );
        events
    }

    /// Re-scatters every unlocked piece into the tray. Locked pieces and the
    /// placed count are untouched; a live drag is released first.
    pub fn shuffle(&mut self, rng: &mut dyn RandomSource) -> Vec<InteractionEvent> {
        let events = self.cancel_drag();
        let moved = scatter_unlocked(&mut self.pieces, &self.tray, rng);
        for (status, piece) in self.status.iter_mut().zip(&self.pieces) {
            if !piece.locked {
                *status = PieceStatus::Tray;
            }
        }
        debug!(moved, placed = self.placed_count, "shuffled loose pieces");
        events
    }

    /// Makes the next pickup report [`InteractionEvent::FirstInteraction`] again.
    pub fn rearm_first_interaction(&mut self) {
        self.first_interaction_sent = false;
    }

    /// Starts the attempt over: clears every lock, scatters all pieces and
    /// re-arms the first-interaction and solved signals.
    pub fn full_reset(&mut self, rng: &mut dyn RandomSource) {
        self.drag = None;
        for piece in &mut self.pieces {
            piece.locked = false;
        }
        scatter_unlocked(&mut self.pieces, &self.tray, rng);
        self.status.iter_mut().for_each(|status| *status = PieceStatus::Tray);
        self.placed_count = 0;
        self.first_interaction_sent = false;
        self.solved_sent = false;
        debug!(total = self.pieces.len(), "full reset");
    }

    /// Locks every remaining piece onto its target.
    pub fn lock_all(&mut self) -> Vec<InteractionEvent> {
        self.drag = None;
        let mut events = Vec::new();
        for index in 0..self.pieces.len() {
            let piece = &mut self.pieces[index];
            if piece.locked {
                continue;
            }
            piece.current_pos = piece.target_pos;
            piece.locked = true;
            self.status[index] = PieceStatus::Locked;
            self.placed_count += 1;
            events.push(InteractionEvent::PieceLocked {
                index,
                placed: self.placed_count,
            });
        }
        if self.is_solved() && !self.solved_sent {
            self.solved_sent = true;
            events.push(InteractionEvent::Solved);
        }
        events
    }
}
