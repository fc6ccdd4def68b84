use serde::{Deserialize, Serialize};

use crate::grid::GridSpec;
use crate::image::ImageRef;
use crate::layout::{fit_image, BoardLayout, PixelRect, Point, Rect};
use crate::rng::RandomSource;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Piece {
    pub index: usize,
    pub source_rect: PixelRect,
    pub target_pos: Point,
    /// Size of the piece on the board.
    pub width: f32,
    pub height: f32,
    pub current_pos: Point,
    pub locked: bool,
}

impl Piece {
    pub fn bounds(&self) -> Rect {
        Rect::new(self.current_pos.x, self.current_pos.y, self.width, self.height)
    }

    pub fn target_bounds(&self) -> Rect {
        Rect::new(self.target_pos.x, self.target_pos.y, self.width, self.height)
    }

    pub fn center_at(&self, pos: Point) -> Point {
        pos.offset(self.width * 0.5, self.height * 0.5)
    }

    pub fn col(&self, grid: GridSpec) -> u32 {
        self.index as u32 % grid.cols.max(1)
    }

    pub fn row(&self, grid: GridSpec) -> u32 {
        self.index as u32 / grid.cols.max(1)
    }
}

/// Source tile `(col, row)` of an image cut into `cols x rows`. Tiles are
/// `floor(size / count)` wide; the last column and row absorb the remainder.
pub fn source_tile(image_width: u32, image_height: u32, grid: GridSpec, col: u32, row: u32) -> PixelRect {
    let cols = grid.cols.max(1);
    let rows = grid.rows.max(1);
    let base_w = image_width / cols;
    let base_h = image_height / rows;
    let x = col * base_w;
    let y = row * base_h;
    let w = if col + 1 == cols {
        image_width.saturating_sub(x)
    } else {
        base_w
    };
    let h = if row + 1 == rows {
        image_height.saturating_sub(y)
    } else {
        base_h
    };
    PixelRect { x, y, w, h }
}

/// Cuts `image` into `grid` pieces, derives each piece's board target from the
/// letterboxed image fit, and scatters every piece into the tray.
pub fn build_pieces(
    image: &ImageRef,
    grid: GridSpec,
    layout: &BoardLayout,
    rng: &mut dyn RandomSource,
) -> Vec<Piece> {
    let total = grid.piece_count() as usize;
    let fit = fit_image(image.width, image.height, &layout.board);
    let cols = grid.cols.max(1) as usize;
    let mut pieces = Vec::with_capacity(total);
    for index in 0..total {
        let col = (index % cols) as u32;
        let row = (index / cols) as u32;
        let source_rect = source_tile(image.width, image.height, grid, col, row);
        let target_pos = Point::new(
            fit.origin.x + source_rect.x as f32 * fit.scale,
            fit.origin.y + source_rect.y as f32 * fit.scale,
        );
        let width = source_rect.w as f32 * fit.scale;
        let height = source_rect.h as f32 * fit.scale;
        let current_pos = tray_position(&layout.tray, width, height, rng);
        pieces.push(Piece {
            index,
            source_rect,
            target_pos,
            width,
            height,
            current_pos,
            locked: false,
        });
    }
    pieces
}

/// Random top-left inside `tray` keeping the piece within it where it fits.
pub fn tray_position(tray: &Rect, width: f32, height: f32, rng: &mut dyn RandomSource) -> Point {
    let max_x = (tray.right() - width).max(tray.x);
    let max_y = (tray.bottom() - height).max(tray.y);
    let x = rng.next_range(tray.x, max_x).clamp(tray.x, max_x);
    let y = rng.next_range(tray.y, max_y).clamp(tray.y, max_y);
    Point::new(x, y)
}

/// Moves every unlocked piece to a fresh tray position. Locked pieces are
/// left exactly where they are. Returns how many pieces moved.
pub fn scatter_unlocked(pieces: &mut [Piece], tray: &Rect, rng: &mut dyn RandomSource) -> usize {
    let mut moved = 0;
    for piece in pieces.iter_mut().filter(|piece| !piece.locked) {
        piece.current_pos = tray_position(tray, piece.width, piece.height, rng);
        moved += 1;
    }
    moved
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::SeededRandom;

    fn image(width: u32, height: u32) -> ImageRef {
        ImageRef {
            handle: "test".to_string(),
            width,
            height,
        }
    }

    #[test]
    fn tiles_cover_image_with_remainder_on_last() {
        let grid = GridSpec { cols: 3, rows: 2 };
        assert_eq!(source_tile(100, 51, grid, 0, 0), PixelRect { x: 0, y: 0, w: 33, h: 25 });
        assert_eq!(source_tile(100, 51, grid, 2, 1), PixelRect { x: 66, y: 25, w: 34, h: 26 });
    }

    #[test]
    fn pieces_are_row_major_with_targets_on_board() {
        let layout = BoardLayout::for_workspace(1200.0, 700.0, 0.32);
        let grid = GridSpec { cols: 4, rows: 3 };
        let mut rng = SeededRandom::new(9);
        let pieces = build_pieces(&image(800, 600), grid, &layout, &mut rng);
        assert_eq!(pieces.len(), 12);
        for (idx, piece) in pieces.iter().enumerate() {
            assert_eq!(piece.index, idx);
            assert!(!piece.locked);
            let target = piece.target_bounds();
            assert!(target.x >= layout.board.x - 1e-3);
            assert!(target.y >= layout.board.y - 1e-3);
            assert!(target.right() <= layout.board.right() + 1e-3);
            assert!(target.bottom() <= layout.board.bottom() + 1e-3);
        }
        assert_eq!(pieces[5].col(grid), 1);
        assert_eq!(pieces[5].row(grid), 1);
        assert!(pieces[1].target_pos.x > pieces[0].target_pos.x);
        assert!(pieces[4].target_pos.y > pieces[0].target_pos.y);
    }

    #[test]
    fn scattered_pieces_never_touch_the_board() {
        let layout = BoardLayout::for_workspace(1000.0, 800.0, 0.3);
        let grid = GridSpec { cols: 10, rows: 10 };
        let mut rng = SeededRandom::new(3);
        let pieces = build_pieces(&image(1920, 1080), grid, &layout, &mut rng);
        for piece in &pieces {
            assert!(!piece.bounds().intersects(&layout.board));
            assert!(layout.tray.contains(piece.current_pos));
        }
    }

    #[test]
    fn scatter_skips_locked_pieces() {
        let layout = BoardLayout::for_workspace(1000.0, 800.0, 0.3);
        let grid = GridSpec { cols: 2, rows: 2 };
        let mut rng = SeededRandom::new(5);
        let mut pieces = build_pieces(&image(400, 400), grid, &layout, &mut rng);
        pieces[2].locked = true;
        pieces[2].current_pos = pieces[2].target_pos;
        let moved = scatter_unlocked(&mut pieces, &layout.tray, &mut rng);
        assert_eq!(moved, 3);
        assert_eq!(pieces[2].current_pos, pieces[2].target_pos);
    }

    #[test]
    fn same_seed_same_layout() {
        let layout = BoardLayout::for_workspace(1000.0, 800.0, 0.3);
        let grid = GridSpec { cols: 5, rows: 4 };
        let a = build_pieces(&image(500, 400), grid, &layout, &mut SeededRandom::new(77));
        let b = build_pieces(&image(500, 400), grid, &layout, &mut SeededRandom::new(77));
        assert_eq!(a, b);
    }
}
