//! `data:` URL decoding for submitted images

use crate::types::ImageData;
use base64::Engine as _;
use regex::Regex;
use std::sync::LazyLock;

/// MIME type assumed for bare base64 payloads
pub const DEFAULT_MIME_TYPE: &str = "image/jpeg";

#[allow(clippy::expect_used)]
static DATA_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)^data:(.+);base64,(.+)$").expect("data URL pattern is valid")
});

/// Split a data URL into `(mime_type, base64_payload)`
pub fn parse_data_url(input: &str) -> Option<(&str, &str)> {
    let captures = DATA_URL.captures(input)?;
    let mime = captures.get(1)?.as_str();
    let payload = captures.get(2)?.as_str();
    Some((mime, payload))
}

/// Decode an image given as a data URL or as bare base64
///
/// Returns the reason on failure so callers can report which image was bad.
pub fn decode_image(input: &str) -> Result<ImageData, String> {
    let input = input.trim();
    if input.is_empty() {
        return Err("image payload is empty".to_string());
    }

    let (mime_type, payload) = match parse_data_url(input) {
        Some((mime, payload)) => (mime.trim(), payload),
        None if input.starts_with("data:") => {
            return Err("malformed data URL, expected data:<mime>;base64,<payload>".to_string());
        }
        None => (DEFAULT_MIME_TYPE, input),
    };

    let compact: String = payload
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(compact.as_bytes())
        .map_err(|e| format!("invalid base64: {}", e))?;
    if bytes.is_empty() {
        return Err("image payload is empty".to_string());
    }

    Ok(ImageData::new(mime_type, bytes))
}
