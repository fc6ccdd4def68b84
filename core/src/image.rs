use serde::{Deserialize, Serialize};

use crate::error::{PuzzleError, PuzzleResult};

/// Loaded image: an opaque handle plus its natural pixel size.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImageRef {
    pub handle: String,
    pub width: u32,
    pub height: u32,
}

impl ImageRef {
    pub fn new(handle: impl Into<String>, width: u32, height: u32) -> PuzzleResult<Self> {
        let image = Self {
            handle: handle.into(),
            width,
            height,
        };
        validate_image_ref(&image)?;
        Ok(image)
    }

    pub fn aspect_ratio(&self) -> f64 {
        if self.height == 0 {
            return 1.0;
        }
        self.width as f64 / self.height as f64
    }
}

pub fn validate_image_ref(image: &ImageRef) -> PuzzleResult<()> {
    if image.handle.trim().is_empty() {
        return Err(PuzzleError::ImageUnavailable("missing image handle".to_string()));
    }
    if image.width == 0 || image.height == 0 {
        return Err(PuzzleError::ImageUnavailable(format!(
            "invalid image dimensions {}x{}",
            image.width, image.height
        )));
    }
    Ok(())
}
