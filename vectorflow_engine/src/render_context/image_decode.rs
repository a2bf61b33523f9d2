//! Encoded image routing and decoding
//!
//! Encoded bytes are routed by their leading signature: PNG and JPEG go
//! through the generic decoder (BGRA output), WEBP through the WEBP decoder
//! (first frame, RGBA output). Anything else is rejected before a decoder
//! runs.

use image::ImageFormat;
use crate::graphics_device::TextureFormat;

const PNG_SIGNATURE: [u8; 4] = [0x89, 0x50, 0x4E, 0x47];
const JPEG_SIGNATURE: [u8; 3] = [0xFF, 0xD8, 0xFF];
const WEBP_SIGNATURE: [u8; 3] = [0x52, 0x49, 0x46];

/// Container format recognized from the leading bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodedImageFormat {
    Png,
    Jpeg,
    Webp,
}

/// Identify an encoded image by signature
///
/// Returns `None` for unknown or truncated headers.
pub fn sniff_image_format(bytes: &[u8]) -> Option<EncodedImageFormat> {
    if bytes.starts_with(&PNG_SIGNATURE) {
        Some(EncodedImageFormat::Png)
    } else if bytes.starts_with(&JPEG_SIGNATURE) {
        Some(EncodedImageFormat::Jpeg)
    } else if bytes.starts_with(&WEBP_SIGNATURE) {
        Some(EncodedImageFormat::Webp)
    } else {
        None
    }
}

/// Decoded 8-bit pixels, tightly packed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedImage {
    pub width: u32,
    pub height: u32,
    /// `B8G8R8A8_UNORM` or `R8G8B8A8_UNORM`
    pub format: TextureFormat,
    pub pixels: Vec<u8>,
}

/// WEBP decoder options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WebpDecodeOptions {
    /// Color dithering strength, 0-100
    pub dithering_strength: u8,
    /// Alpha dithering strength, 0-100
    pub alpha_dithering_strength: u8,
}

impl Default for WebpDecodeOptions {
    fn default() -> Self {
        Self {
            dithering_strength: 50,
            alpha_dithering_strength: 100,
        }
    }
}

/// Image decoding collaborator
pub trait ImageCodec: Send + Sync {
    /// Decode a PNG or JPEG into BGRA pixels
    fn decode(&self, format: EncodedImageFormat, bytes: &[u8]) -> Option<DecodedImage>;

    /// Decode the first frame of a WEBP into RGBA pixels
    fn decode_webp(&self, bytes: &[u8], options: &WebpDecodeOptions) -> Option<DecodedImage>;
}

/// Route `bytes` to the codec by signature
pub fn decode_image(codec: &dyn ImageCodec, bytes: &[u8], webp: &WebpDecodeOptions) -> Option<DecodedImage> {
    match sniff_image_format(bytes) {
        Some(EncodedImageFormat::Webp) => codec.decode_webp(bytes, webp),
        Some(format) => codec.decode(format, bytes),
        None => {
            crate::engine_debug!("vectorflow::ImageDecode", "Invalid decode image header");
            None
        }
    }
}

/// Default codec backed by the `image` crate
///
/// The `image` crate's WEBP decoder does not dither, so the dithering
/// strengths are accepted but have no effect here.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultImageCodec;

impl DefaultImageCodec {
    fn load(bytes: &[u8], format: ImageFormat) -> Option<image::RgbaImage> {
        match image::load_from_memory_with_format(bytes, format) {
            Ok(decoded) => Some(decoded.to_rgba8()),
            Err(err) => {
                crate::engine_debug!("vectorflow::ImageDecode", "{:?} decode failed: {}", format, err);
                None
            }
        }
    }
}

impl ImageCodec for DefaultImageCodec {
    fn decode(&self, format: EncodedImageFormat, bytes: &[u8]) -> Option<DecodedImage> {
        let format = match format {
            EncodedImageFormat::Png => ImageFormat::Png,
            EncodedImageFormat::Jpeg => ImageFormat::Jpeg,
            EncodedImageFormat::Webp => ImageFormat::WebP,
        };
        let rgba = Self::load(bytes, format)?;
        let (width, height) = rgba.dimensions();
        let mut pixels = rgba.into_raw();
        for texel in pixels.chunks_exact_mut(4) {
            texel.swap(0, 2);
        }
        Some(DecodedImage { width, height, format: TextureFormat::B8G8R8A8_UNORM, pixels })
    }

    fn decode_webp(&self, bytes: &[u8], _options: &WebpDecodeOptions) -> Option<DecodedImage> {
        let rgba = Self::load(bytes, ImageFormat::WebP)?;
        let (width, height) = rgba.dimensions();
        Some(DecodedImage {
            width,
            height,
            format: TextureFormat::R8G8B8A8_UNORM,
            pixels: rgba.into_raw(),
        })
    }
}

#[cfg(test)]
#[path = "image_decode_tests.rs"]
mod tests;
