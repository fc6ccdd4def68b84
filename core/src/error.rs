#[derive(Debug, thiserror::Error)]
pub enum PuzzleError {
    #[error("piece count {0} is not one of the offered sizes")]
    InvalidPieceCount(u32),
    #[error("stored grid {cols}x{rows} does not cut {piece_count} pieces")]
    GridMismatch { cols: u32, rows: u32, piece_count: u32 },
    #[error("image unavailable: {0}")]
    ImageUnavailable(String),
    #[error("puzzle {0} was not found locally")]
    MissingPuzzleRecord(String),
    #[error("puzzle {0} requires a valid share token")]
    UnauthorizedLinkAccess(String),
    #[error("storage error: {0}")]
    Storage(String),
}

impl From<serde_json::Error> for PuzzleError {
    fn from(err: serde_json::Error) -> Self {
        PuzzleError::Storage(err.to_string())
    }
}

impl From<std::io::Error> for PuzzleError {
    fn from(err: std::io::Error) -> Self {
        PuzzleError::Storage(err.to_string())
    }
}

pub type PuzzleResult<T> = Result<T, PuzzleError>;
