//! Pixel sampling: decode encoded bytes into an RGBA raster, optionally
//! downscaled, plus the encode step used when a processed logo is stored.

use crate::error::DecodeError;
use base64::{Engine as _, engine::general_purpose};
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, ImageOutputFormat};
use rgb::RGBA8;
use std::io::Cursor;

/// Longest side used for the analysis raster.
pub const DEFAULT_MAX_SIDE: u32 = 500;

const PNG_DATA_URL_PREFIX: &str = "data:image/png;base64,";

/// Decoded RGBA raster, row-major.
#[derive(Debug, Clone)]
pub struct RasterImage {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<RGBA8>,
}

impl RasterImage {
    pub fn pixel(&self, x: u32, y: u32) -> RGBA8 {
        self.pixels[(y * self.width + x) as usize]
    }

    pub fn pixel_count(&self) -> usize {
        self.pixels.len()
    }

    fn from_dynamic(img: &DynamicImage) -> Self {
        let rgba = img.to_rgba8();
        let pixels: Vec<RGBA8> = rgba
            .pixels()
            .map(|p| RGBA8::new(p[0], p[1], p[2], p[3]))
            .collect();

        RasterImage {
            width: rgba.width(),
            height: rgba.height(),
            pixels,
        }
    }
}

/// Decode `bytes` into a raster. When `max_side` is set, the image is
/// shrunk (never enlarged) so its longer side fits, keeping aspect ratio.
pub fn load_image(bytes: &[u8], max_side: Option<u32>) -> Result<RasterImage, DecodeError> {
    let decoded = image::load_from_memory(bytes)?;
    let (width, height) = decoded.dimensions();
    if width == 0 || height == 0 {
        return Err(DecodeError::Empty { width, height });
    }

    let sampled = match max_side {
        Some(max) if max > 0 && width.max(height) > max => {
            decoded.resize(max, max, FilterType::Triangle)
        }
        _ => decoded,
    };

    let raster = RasterImage::from_dynamic(&sampled);
    log::debug!(
        "decoded {}x{} image into {}x{} raster",
        width,
        height,
        raster.width,
        raster.height
    );
    Ok(raster)
}

/// Read width and height from the image header without a full decode.
pub fn probe_dimensions(bytes: &[u8]) -> Result<(u32, u32), DecodeError> {
    let reader = image::io::Reader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| DecodeError::UnknownFormat(e.to_string()))?;
    Ok(reader.into_dimensions()?)
}

/// Re-encode an image as a PNG `data:` URL whose longer side is at most
/// `max_side`. Transparency is preserved.
pub fn encode_png_data_url(bytes: &[u8], max_side: u32) -> Result<String, DecodeError> {
    let decoded = image::load_from_memory(bytes)?;
    let (width, height) = decoded.dimensions();
    let resized = if width.max(height) > max_side {
        decoded.resize(max_side, max_side, FilterType::Triangle)
    } else {
        decoded
    };

    let mut buffer = Cursor::new(Vec::new());
    resized.write_to(&mut buffer, ImageOutputFormat::Png)?;
    Ok(format!(
        "{}{}",
        PNG_DATA_URL_PREFIX,
        general_purpose::STANDARD.encode(buffer.into_inner())
    ))
}

/// Wrap bytes that could not be re-encoded as a data URL tagged with
/// whatever format they sniff as.
pub fn raw_data_url(bytes: &[u8]) -> String {
    let mime = match image::guess_format(bytes) {
        Ok(image::ImageFormat::Jpeg) => "image/jpeg",
        Ok(image::ImageFormat::Png) => "image/png",
        _ => "application/octet-stream",
    };
    format!(
        "data:{};base64,{}",
        mime,
        general_purpose::STANDARD.encode(bytes)
    )
}

/// Extract the payload of a base64 `data:` URL.
pub fn decode_data_url(url: &str) -> Option<Vec<u8>> {
    let rest = url.strip_prefix("data:")?;
    let (meta, payload) = rest.split_once(',')?;
    if !meta.ends_with(";base64") {
        return None;
    }
    general_purpose::STANDARD.decode(payload).ok()
}

#[cfg(test)]
mod tests {
    include!("image_processor_tests.rs");
}
