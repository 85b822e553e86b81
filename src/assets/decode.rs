use std::sync::Arc;

use crate::foundation::error::{ReelError, ReelResult};
use crate::foundation::math::premultiply_rgba8_in_place;

/// Prepared raster image in premultiplied RGBA8 form.
#[derive(Clone, Debug)]
pub struct PreparedImage {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Pixel bytes in row-major premultiplied RGBA8.
    pub rgba8_premul: Arc<Vec<u8>>,
}

/// Decode encoded image bytes.
///
/// A recognized `mime_type` selects the decoder; when it is unknown or the bytes turn out to be a
/// different format, the format is sniffed from the bytes instead. Images whose longer side
/// exceeds `max_side` are downscaled (aspect preserved) before premultiplication.
pub fn decode_image(bytes: &[u8], mime_type: &str, max_side: u32) -> ReelResult<PreparedImage> {
    if bytes.is_empty() {
        return Err(ReelError::decode("image payload is empty"));
    }

    let declared = image::ImageFormat::from_mime_type(mime_type);
    let dyn_img = match declared {
        Some(fmt) => image::load_from_memory_with_format(bytes, fmt)
            .or_else(|_| image::load_from_memory(bytes)),
        None => image::load_from_memory(bytes),
    }
    .map_err(|e| ReelError::decode(format!("decode image ({mime_type}): {e}")))?;

    let max_side = max_side.clamp(1, u32::from(u16::MAX));
    let dyn_img = if dyn_img.width() > max_side || dyn_img.height() > max_side {
        dyn_img.resize(max_side, max_side, image::imageops::FilterType::Triangle)
    } else {
        dyn_img
    };

    let rgba = dyn_img.to_rgba8();
    let (width, height) = rgba.dimensions();
    if width == 0 || height == 0 {
        return Err(ReelError::decode("decoded image has zero size"));
    }

    let mut rgba8_premul = rgba.into_raw();
    premultiply_rgba8_in_place(&mut rgba8_premul);

    Ok(PreparedImage {
        width,
        height,
        rgba8_premul: Arc::new(rgba8_premul),
    })
}

#[cfg(test)]
#[path = "../../tests/unit/assets/decode.rs"]
mod tests;
