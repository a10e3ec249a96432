use crate::analysis::PixelGrid;
use crate::ImageError;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use std::borrow::Cow;

/// An uploaded photo, either as received bytes or as base64 text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImagePayload {
    Bytes(Vec<u8>),
    Base64(String),
}

impl ImagePayload {
    pub fn from_base64(data: impl Into<String>) -> Self {
        Self::Base64(data.into())
    }

    /// Raw encoded image bytes.
    ///
    /// Base64 text may carry a `data:image/...;base64,` prefix and line breaks.
    pub fn bytes(&self) -> Result<Cow<'_, [u8]>, ImageError> {
        match self {
            Self::Bytes(bytes) if bytes.is_empty() => Err(ImageError::Empty),
            Self::Bytes(bytes) => Ok(Cow::Borrowed(bytes)),
            Self::Base64(text) => {
                let body = strip_data_url(text.trim());
                let compact: String = body.chars().filter(|c| !c.is_whitespace()).collect();
                if compact.is_empty() {
                    return Err(ImageError::Empty);
                }
                Ok(Cow::Owned(BASE64.decode(compact)?))
            }
        }
    }

    /// Decode and downsample to the analysis grid.
    pub fn decode_grid(&self) -> Result<PixelGrid, ImageError> {
        let bytes = self.bytes()?;
        let image = image::load_from_memory(&bytes)?;
        tracing::debug!(
            width = image.width(),
            height = image.height(),
            "Decoded image payload"
        );
        Ok(PixelGrid::from_image(&image))
    }
}

fn strip_data_url(text: &str) -> &str {
    if text.starts_with("data:") {
        if let Some(idx) = text.find(',') {
            return &text[idx + 1..];
        }
    }
    text
}
