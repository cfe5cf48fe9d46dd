//! Image encoding: `DynamicImage` → JPEG bytes → base64 / data URI.
//!
//! Both external services take the page inline: the vision API as a base64
//! image part, the Docs API as a `data:image/jpeg;base64,…` URI. JPEG keeps
//! the inline payload small enough for a batchUpdate request body; alpha is
//! dropped because JPEG has no alpha channel.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use edgequake_llm::ImageData;
use image::codecs::jpeg::JpegEncoder;
use image::DynamicImage;
use tracing::debug;

const JPEG_MIME: &str = "image/jpeg";
const JPEG_DATA_URI_PREFIX: &str = "data:image/jpeg;base64,";

/// Encode a rasterised page as JPEG at the given quality.
pub fn encode_jpeg(img: &DynamicImage, quality: u8) -> Result<Vec<u8>, image::ImageError> {
    let rgb = img.to_rgb8();
    let mut buf = Vec::new();
    rgb.write_with_encoder(JpegEncoder::new_with_quality(&mut buf, quality))?;
    debug!("Encoded {}x{} page → {} bytes JPEG", rgb.width(), rgb.height(), buf.len());
    Ok(buf)
}

/// File name a page has inside a render workspace or output directory.
pub fn page_file_name(page_num: usize) -> String {
    format!("page_{page_num}.jpg")
}

pub fn to_base64(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

pub fn from_base64(b64: &str) -> Result<Vec<u8>, base64::DecodeError> {
    STANDARD.decode(b64)
}

/// `data:image/jpeg;base64,<payload>`.
pub fn jpeg_data_uri(bytes: &[u8]) -> String {
    format!("{JPEG_DATA_URI_PREFIX}{}", to_base64(bytes))
}

/// Inverse of [`jpeg_data_uri`]. `None` if the prefix or payload is wrong.
pub fn decode_jpeg_data_uri(uri: &str) -> Option<Vec<u8>> {
    uri.strip_prefix(JPEG_DATA_URI_PREFIX)
        .and_then(|b64| from_base64(b64).ok())
}

/// Wrap JPEG bytes as an image attachment for the vision provider.
pub fn to_image_data(bytes: &[u8]) -> ImageData {
    ImageData::new(to_base64(bytes), JPEG_MIME)
}
