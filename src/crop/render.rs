//! Decoding the source picture and producing the cropped output.

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::DynamicImage;

use super::{CropError, SourceRect};

/// Final cropped picture, ready to upload.
#[derive(Debug, Clone)]
pub struct CroppedImage {
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub mime_type: &'static str,
}

pub(super) fn decode(bytes: &[u8]) -> Result<DynamicImage, CropError> {
    image::load_from_memory(bytes).map_err(|e| CropError::Unreadable(e.to_string()))
}

/// Cut `source` out of `image`, resample it to `size`x`size` and encode as JPEG.
pub(super) fn render(
    image: &DynamicImage,
    source: SourceRect,
    size: u32,
    quality: u8,
) -> Result<CroppedImage, CropError> {
    let region = image.crop_imm(source.x, source.y, source.width, source.height);
    let resampled = region.resize_exact(size, size, FilterType::Lanczos3).to_rgb8();

    let mut bytes = Vec::new();
    JpegEncoder::new_with_quality(&mut bytes, quality)
        .encode_image(&resampled)
        .map_err(|e| CropError::Encode(e.to_string()))?;

    tracing::debug!(
        source_x = source.x,
        source_y = source.y,
        source_width = source.width,
        source_height = source.height,
        encoded_bytes = bytes.len(),
        "Rendered cropped image"
    );

    Ok(CroppedImage {
        bytes,
        width: size,
        height: size,
        mime_type: "image/jpeg",
    })
}
