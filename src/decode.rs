use image::DynamicImage;

use crate::error::DecodeError;

/// Turns an encoded frame (JPEG, PNG, ...) into pixels
pub trait FrameDecoder: Send + Sync {
    fn decode(&self, bytes: &[u8]) -> Result<DynamicImage, DecodeError>;
}

/// Decoder for every format the `image` crate understands; output is RGB8
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageFrameDecoder;

impl FrameDecoder for ImageFrameDecoder {
    fn decode(&self, bytes: &[u8]) -> Result<DynamicImage, DecodeError> {
        if bytes.is_empty() {
            return Err(DecodeError::Empty);
        }
        let img = image::load_from_memory(bytes)?;
        if img.width() == 0 || img.height() == 0 {
            return Err(DecodeError::Empty);
        }
        Ok(DynamicImage::ImageRgb8(img.to_rgb8()))
    }
}
