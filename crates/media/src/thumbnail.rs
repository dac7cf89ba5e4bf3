use std::io::Cursor;

use {
    anyhow::{Context, Result},
    image::{GenericImageView, ImageReader, codecs::jpeg::JpegEncoder},
};

/// Maximum thumbnail edge in pixels (Telegram caps attached thumbnails at 320).
pub const THUMBNAIL_MAX_DIMENSION: u32 = 320;

/// JPEG quality for rendered thumbnails (0-100).
pub const JPEG_QUALITY: u8 = 85;

/// Decode a preview image, downscale it to fit [`THUMBNAIL_MAX_DIMENSION`]
/// preserving aspect ratio, and re-encode as JPEG.
///
/// Images already within bounds are still re-encoded so the output format is
/// uniform regardless of what the transport handed us.
pub fn render_thumbnail(data: &[u8]) -> Result<Vec<u8>> {
    let img = ImageReader::new(Cursor::new(data))
        .with_guessed_format()
        .context("failed to guess preview format")?
        .decode()
        .context("failed to decode preview image")?;

    let (width, height) = img.dimensions();
    let img = if width > THUMBNAIL_MAX_DIMENSION || height > THUMBNAIL_MAX_DIMENSION {
        img.thumbnail(THUMBNAIL_MAX_DIMENSION, THUMBNAIL_MAX_DIMENSION)
    } else {
        img
    };

    let mut out = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut out, JPEG_QUALITY);
    img.write_with_encoder(encoder)
        .context("failed to encode thumbnail jpeg")?;
    Ok(out)
}
