use serde::{Deserialize, Serialize};

pub const WORKSPACE_MARGIN_FRAC: f32 = 0.03;
pub const WORKSPACE_MARGIN_MIN: f32 = 6.0;

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn offset(self, dx: f32, dy: f32) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }

    pub fn minus(self, other: Point) -> Self {
        Self::new(self.x - other.x, self.y - other.y)
    }

    /// Chebyshev distance, the largest per-axis gap.
    pub fn chebyshev(self, other: Point) -> f32 {
        (self.x - other.x).abs().max((self.y - other.y).abs())
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl Rect {
    pub const fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self { x, y, w, h }
    }

    pub fn right(&self) -> f32 {
        self.x + self.w
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.h
    }

    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.x && point.x <= self.right() && point.y >= self.y && point.y <= self.bottom()
    }

    /// Open-interval overlap; rectangles that only share an edge do not intersect.
    pub fn intersects(&self, other: &Rect) -> bool {
        self.x < other.right()
            && other.x < self.right()
            && self.y < other.bottom()
            && other.y < self.bottom()
    }
}

/// Integer rectangle in source image pixels.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PixelRect {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

/// Play surface split into the board (where the picture is assembled) and the
/// tray strip on the right that holds loose pieces.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoardLayout {
    pub workspace: Rect,
    pub board: Rect,
    pub tray: Rect,
}

impl BoardLayout {
    pub fn for_workspace(width: f32, height: f32, tray_ratio: f32) -> Self {
        let width = width.max(1.0);
        let height = height.max(1.0);
        let margin = (width.min(height) * WORKSPACE_MARGIN_FRAC).max(WORKSPACE_MARGIN_MIN);
        let tray_width = (width * tray_ratio.clamp(0.05, 0.9)).max(margin * 2.0 + 1.0);
        let board_width = (width - tray_width - margin * 2.0).max(1.0);
        let inner_height = (height - margin * 2.0).max(1.0);
        let board = Rect::new(margin, margin, board_width, inner_height);
        let tray_x = board.right() + margin;
        let tray = Rect::new(
            tray_x,
            margin,
            (width - tray_x - margin).max(1.0),
            inner_height,
        );
        Self {
            workspace: Rect::new(0.0, 0.0, width.max(tray.right() + margin), height),
            board,
            tray,
        }
    }
}

/// Largest uniform scale that fits `image` inside `board`, centered.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ImageFit {
    pub origin: Point,
    pub scale: f32,
}

pub fn fit_image(image_width: u32, image_height: u32, board: &Rect) -> ImageFit {
    let safe_width = image_width.max(1) as f32;
    let safe_height = image_height.max(1) as f32;
    let scale = (board.w / safe_width).min(board.h / safe_height);
    let scaled_width = safe_width * scale;
    let scaled_height = safe_height * scale;
    ImageFit {
        origin: Point::new(
            board.x + (board.w - scaled_width) * 0.5,
            board.y + (board.h - scaled_height) * 0.5,
        ),
        scale,
    }
}
