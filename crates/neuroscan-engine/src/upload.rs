use std::path::Path;

use anyhow::Context;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use thiserror::Error;

/// Uploads of this many bytes or more are refused.
pub const MAX_UPLOAD_BYTES: u64 = 5 * 1024 * 1024;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UploadError {
    #[error("Please upload a valid image file (PNG, JPG, JPEG).")]
    NotAnImage,

    #[error("Image size too large. Please upload an image under 5MB.")]
    TooLarge,

    #[error("Finish or reset the current analysis before uploading another image.")]
    NotIdle,
}

/// A user-supplied file as the picker hands it over: a name, the declared
/// media type and the raw bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageUpload {
    pub file_name: String,
    pub media_type: String,
    pub bytes: Vec<u8>,
}

impl ImageUpload {
    pub fn new(
        file_name: impl Into<String>,
        media_type: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            media_type: media_type.into(),
            bytes,
        }
    }

    /// Reads `path`, declaring its media type from the file extension.
    pub fn from_path(path: &Path) -> anyhow::Result<Self> {
        let bytes =
            std::fs::read(path).with_context(|| format!("failed reading {}", path.display()))?;
        let media_type = mime_guess::from_path(path)
            .first_or_octet_stream()
            .essence_str()
            .to_string();
        let file_name = path
            .file_name()
            .and_then(|value| value.to_str())
            .unwrap_or("upload")
            .to_string();
        Ok(Self::new(file_name, media_type, bytes))
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    pub fn validate(&self) -> Result<(), UploadError> {
        if !self.media_type.to_ascii_lowercase().starts_with("image/") {
            return Err(UploadError::NotAnImage);
        }
        if self.size() >= MAX_UPLOAD_BYTES {
            return Err(UploadError::TooLarge);
        }
        Ok(())
    }

    /// Display-ready preview: `data:<media type>;base64,<bytes>`.
    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", self.media_type, BASE64.encode(&self.bytes))
    }
}

/// Image bytes as submitted to the classifier: base64 data plus its type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImagePayload {
    pub mime_type: String,
    pub data: String,
}

impl ImagePayload {
    /// Splits a base64 data URI into its media type and payload.
    pub fn from_data_url(data_url: &str) -> Option<Self> {
        let rest = data_url.strip_prefix("data:")?;
        let (header, data) = rest.split_once(',')?;
        let mime_type = header.strip_suffix(";base64")?;
        if data.is_empty() {
            return None;
        }
        Some(Self {
            mime_type: if mime_type.is_empty() {
                "image/png".to_string()
            } else {
                mime_type.to_string()
            },
            data: data.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{ImagePayload, ImageUpload, UploadError, MAX_UPLOAD_BYTES};

    #[test]
    fn non_image_media_type_is_rejected() {
        let upload = ImageUpload::new("notes.pdf", "application/pdf", vec![1, 2, 3]);
        assert_eq!(upload.validate(), Err(UploadError::NotAnImage));
    }

    #[test]
    fn size_limit_is_exclusive() {
        let at_limit = ImageUpload::new(
            "big.png",
            "image/png",
            vec![0; MAX_UPLOAD_BYTES as usize],
        );
        assert_eq!(at_limit.validate(), Err(UploadError::TooLarge));

        let under = ImageUpload::new(
            "ok.png",
            "image/png",
            vec![0; MAX_UPLOAD_BYTES as usize - 1],
        );
        assert_eq!(under.validate(), Ok(()));
    }

    #[test]
    fn data_url_round_trips_through_payload() {
        let upload = ImageUpload::new("scan.jpg", "image/jpeg", b"jpeg-bytes".to_vec());
        let preview = upload.to_data_url();
        assert!(preview.starts_with("data:image/jpeg;base64,"));

        let payload = ImagePayload::from_data_url(&preview).unwrap();
        assert_eq!(payload.mime_type, "image/jpeg");
        assert_eq!(payload.data, "anBlZy1ieXRlcw==");
    }

    #[test]
    fn malformed_data_url_has_no_payload() {
        assert_eq!(ImagePayload::from_data_url("image/png,AAAA"), None);
        assert_eq!(ImagePayload::from_data_url("data:image/png;base64,"), None);
        assert_eq!(ImagePayload::from_data_url("data:image/png,AAAA"), None);
    }

    #[test]
    fn from_path_guesses_media_type_from_extension() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let png = temp.path().join("xray.png");
        let txt = temp.path().join("readme.txt");
        std::fs::write(&png, b"png")?;
        std::fs::write(&txt, b"text")?;

        let image = ImageUpload::from_path(&png)?;
        assert_eq!(image.file_name, "xray.png");
        assert_eq!(image.media_type, "image/png");
        assert_eq!(image.size(), 3);

        let text = ImageUpload::from_path(&txt)?;
        assert_eq!(text.validate(), Err(UploadError::NotAnImage));
        Ok(())
    }
}
