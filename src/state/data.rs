/// Shared data structures for the session
///
/// These structs flow between the session database, the state machine and
/// the UI layer.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};

use super::poses::CameraPose;

/// MIME type assumed when none was stored alongside the original image
pub const DEFAULT_MIME_TYPE: &str = "image/png";

/// The uploaded reference image
#[derive(Debug, Clone, PartialEq)]
pub struct SourceImage {
    /// Raw base64 payload (no `data:` prefix)
    pub base64: String,
    /// e.g. "image/jpeg"
    pub mime_type: String,
}

impl SourceImage {
    pub fn from_bytes(bytes: &[u8], mime_type: impl Into<String>) -> Self {
        Self {
            base64: BASE64.encode(bytes),
            mime_type: mime_type.into(),
        }
    }

    /// Decoded image bytes, `None` if the payload is not valid base64
    pub fn bytes(&self) -> Option<Vec<u8>> {
        BASE64.decode(&self.base64).ok()
    }
}

/// Everything persisted across restarts
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionSnapshot {
    pub poses: Vec<CameraPose>,
    pub active_id: Option<String>,
    pub original: Option<SourceImage>,
    /// Most recent generated image as a data URL
    pub generated: Option<String>,
}

impl SessionSnapshot {
    /// True when nothing from a previous session was found
    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.poses.is_empty()
            && self.active_id.is_none()
            && self.original.is_none()
            && self.generated.is_none()
    }
}

pub fn to_data_url(mime_type: &str, base64: &str) -> String {
    format!("data:{};base64,{}", mime_type, base64)
}

/// Split a base64 data URL into its MIME type and decoded bytes
pub fn decode_data_url(url: &str) -> Option<(String, Vec<u8>)> {
    let rest = url.strip_prefix("data:")?;
    let (mime_type, payload) = rest.split_once(";base64,")?;
    let bytes = BASE64.decode(payload.trim()).ok()?;
    Some((mime_type.to_string(), bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_image_round_trips_bytes() {
        let image = SourceImage::from_bytes(b"\x89PNG", "image/png");
        assert_eq!(image.base64, "iVBORw==");
        assert_eq!(
            to_data_url(&image.mime_type, &image.base64),
            "data:image/png;base64,iVBORw=="
        );
        assert_eq!(image.bytes().unwrap(), b"\x89PNG");
    }

    #[test]
    fn test_decode_data_url() {
        let (mime, bytes) = decode_data_url("data:image/webp;base64,AAEC").unwrap();
        assert_eq!(mime, "image/webp");
        assert_eq!(bytes, vec![0, 1, 2]);
    }

    #[test]
    fn test_decode_rejects_plain_text() {
        assert!(decode_data_url("not a data url").is_none());
        assert!(decode_data_url("data:image/png,raw").is_none());
        assert!(decode_data_url("data:image/png;base64,@@@").is_none());
    }

    #[test]
    fn test_empty_snapshot() {
        assert!(SessionSnapshot::default().is_empty());
    }
}
