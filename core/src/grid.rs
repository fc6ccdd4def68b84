use serde::{Deserialize, Serialize};

use crate::error::{PuzzleError, PuzzleResult};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridSpec {
    pub cols: u32,
    pub rows: u32,
}

impl GridSpec {
    pub fn piece_count(&self) -> u64 {
        u64::from(self.cols) * u64::from(self.rows)
    }

    pub fn label(&self) -> String {
        format!("{} pieces ({}x{})", self.piece_count(), self.cols, self.rows)
    }
}

pub const ALLOWED_PIECE_COUNTS: [u32; 13] = [
    10, 20, 32, 48, 64, 72, 90, 100, 120, 140, 164, 180, 200,
];
pub const DEFAULT_PIECE_COUNT: u32 = 64;

const SCORE_EPSILON: f64 = 1e-9;

pub fn validate_piece_count(count: u32) -> PuzzleResult<u32> {
    if count == 0 || !ALLOWED_PIECE_COUNTS.contains(&count) {
        return Err(PuzzleError::InvalidPieceCount(count));
    }
    Ok(count)
}

/// Picks the `cols x rows` factorisation of `piece_count` whose proportions
/// sit closest to `aspect` (width / height).
///
/// Candidates are scored by `|ln((cols / rows) / aspect)|`, so a grid twice
/// too wide scores the same as one twice too tall. Ties go to the squarer
/// grid, then to the smaller column count. `piece_count` must be at least 1;
/// a non-positive or non-finite aspect is treated as square.
pub fn choose_grid(piece_count: u32, aspect: f64) -> GridSpec {
    let count = piece_count.max(1);
    let target = if aspect.is_finite() && aspect > 0.0 {
        aspect
    } else {
        1.0
    };
    let mut best: Option<(GridSpec, f64)> = None;
    for cols in 1..=count {
        if count % cols != 0 {
            continue;
        }
        let rows = count / cols;
        let ratio = cols as f64 / rows as f64;
        let score = (ratio / target).ln().abs();
        let candidate = GridSpec { cols, rows };
        match &best {
            Some((current, best_score)) if !beats(candidate, score, *current, *best_score) => {}
            _ => best = Some((candidate, score)),
        }
    }
    best.map(|(grid, _)| grid).unwrap_or(GridSpec {
        cols: 1,
        rows: count,
    })
}

fn beats(candidate: GridSpec, score: f64, current: GridSpec, current_score: f64) -> bool {
    if score < current_score - SCORE_EPSILON {
        return true;
    }
    if score > current_score + SCORE_EPSILON {
        return false;
    }
    let squareness = candidate.cols.abs_diff(candidate.rows);
    let current_squareness = current.cols.abs_diff(current.rows);
    if squareness != current_squareness {
        return squareness < current_squareness;
    }
    candidate.cols < current.cols
}

/// Checks a grid read back from storage against the piece count it was
/// planned for.
pub fn validate_grid(grid: GridSpec, piece_count: u32) -> PuzzleResult<GridSpec> {
    if grid.cols == 0 || grid.rows == 0 || grid.piece_count() != u64::from(piece_count) {
        return Err(PuzzleError::GridMismatch {
            cols: grid.cols,
            rows: grid.rows,
            piece_count,
        });
    }
    Ok(grid)
}

pub fn grid_for_image(piece_count: u32, width: u32, height: u32) -> PuzzleResult<GridSpec> {
    let count = validate_piece_count(piece_count)?;
    let aspect = if height == 0 {
        1.0
    } else {
        width as f64 / height as f64
    };
    Ok(choose_grid(count, aspect))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn square_image_gets_square_grid() {
        assert_eq!(choose_grid(64, 1.0), GridSpec { cols: 8, rows: 8 });
    }

    #[test]
    fn equal_scores_pick_fewer_columns() {
        assert_eq!(choose_grid(48, 1.0), GridSpec { cols: 6, rows: 8 });
    }

    #[test]
    fn wide_image_gets_wide_grid() {
        assert_eq!(choose_grid(10, 2.0), GridSpec { cols: 5, rows: 2 });
        assert_eq!(choose_grid(10, 0.5), GridSpec { cols: 2, rows: 5 });
    }

    #[test]
    fn degenerate_aspect_is_square() {
        assert_eq!(choose_grid(64, 0.0), choose_grid(64, 1.0));
        assert_eq!(choose_grid(64, -3.0), choose_grid(64, 1.0));
        assert_eq!(choose_grid(64, f64::NAN), choose_grid(64, 1.0));
    }

    #[test]
    fn every_offered_count_factorises_exactly() {
        for count in ALLOWED_PIECE_COUNTS {
            for aspect in [0.2, 0.5, 0.75, 1.0, 4.0 / 3.0, 16.0 / 9.0, 3.0] {
                let grid = choose_grid(count, aspect);
                assert!(grid.cols >= 1 && grid.rows >= 1);
                assert_eq!(grid.piece_count(), u64::from(count));
                assert_eq!(grid, choose_grid(count, aspect));
            }
        }
    }

    #[test]
    fn few_divisors_still_split() {
        let grid = choose_grid(20, 4.0 / 3.0);
        assert_eq!(grid, GridSpec { cols: 5, rows: 4 });
    }

    #[test]
    fn piece_count_outside_allow_list_is_rejected() {
        assert!(matches!(
            validate_piece_count(0),
            Err(PuzzleError::InvalidPieceCount(0))
        ));
        assert!(matches!(
            validate_piece_count(65),
            Err(PuzzleError::InvalidPieceCount(65))
        ));
        assert_eq!(validate_piece_count(64).ok(), Some(64));
    }

    #[test]
    fn grid_for_image_uses_pixel_aspect() {
        let grid = grid_for_image(100, 1600, 900).ok();
        assert_eq!(grid, Some(GridSpec { cols: 10, rows: 10 }));
        let grid = grid_for_image(32, 1600, 800).ok();
        assert_eq!(grid, Some(GridSpec { cols: 8, rows: 4 }));
    }

    #[test]
    fn stored_grid_must_match_its_count() {
        assert!(validate_grid(GridSpec { cols: 8, rows: 8 }, 64).is_ok());
        assert!(matches!(
            validate_grid(GridSpec { cols: 3, rows: 3 }, 64),
            Err(PuzzleError::GridMismatch { cols: 3, rows: 3, piece_count: 64 })
        ));
        assert!(validate_grid(GridSpec { cols: 0, rows: 64 }, 64).is_err());
        let huge = GridSpec { cols: 70_000, rows: 70_000 };
        assert_eq!(huge.piece_count(), 4_900_000_000);
        assert!(validate_grid(huge, 64).is_err());
    }

    #[test]
    fn label_shows_dimensions() {
        assert_eq!(GridSpec { cols: 8, rows: 8 }.label(), "64 pieces (8x8)");
    }
}
