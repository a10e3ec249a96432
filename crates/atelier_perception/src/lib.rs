//! Image perception for the color and wardrobe personas.
//!
//! Photos arrive as raw bytes or base64 (optionally a `data:` URL), are decoded
//! and downsampled to a fixed grid, and reduced to a few aggregate statistics.
//! Nothing here is persisted; every result is computed per request.

mod analysis;
mod payload;

pub use analysis::{
    analyze_skin_tone, analyze_wardrobe, Brightness, ColorVariety, PixelGrid, Rgb,
    SkinToneAnalysis, Undertone, WardrobeAnalysis, GRID_SIZE,
};
pub use payload::ImagePayload;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ImageError {
    #[error("no image data supplied")]
    Empty,

    #[error("image data is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("could not decode image: {0}")]
    Decode(#[from] image::ImageError),
}
