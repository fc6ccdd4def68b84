pub mod clock;
pub mod error;
pub mod grid;
pub mod image;
pub mod interaction;
pub mod layout;
pub mod leaderboard;
pub mod pieces;
pub mod record;
pub mod rng;
pub mod rules;
pub mod session;
pub mod store;
pub mod timer;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{PuzzleError, PuzzleResult};
pub use grid::{
    choose_grid, grid_for_image, validate_grid, validate_piece_count, GridSpec, ALLOWED_PIECE_COUNTS,
    DEFAULT_PIECE_COUNT,
};
pub use image::ImageRef;
pub use interaction::{InteractionController, InteractionEvent, PieceStatus};
pub use layout::{BoardLayout, PixelRect, Point, Rect};
pub use leaderboard::{LeaderboardEntry, LeaderboardStore, SubmitOutcome};
pub use pieces::{build_pieces, Piece};
pub use record::{
    parse_play_link, share_link, NewPuzzle, PlayLink, PuzzleLibrary, PuzzleRecord, StoredImage,
    Visibility,
};
pub use rng::{RandomSource, RngSource, SeededRandom};
pub use rules::PlayRules;
pub use session::{PuzzleSession, SessionOutcome};
pub use store::{JsonFileStore, KeyValueStore, MemoryStore};
pub use timer::{format_elapsed, Timer, TimerState};
