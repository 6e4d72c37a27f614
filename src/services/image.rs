use base64::{engine::general_purpose, Engine};
use std::path::Path;

use crate::error::UploadError;

pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 5 * 1024 * 1024;

/// MIME type for a picked file, judged by its extension.
pub fn mime_for_path(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        "webp" => Some("image/webp"),
        "gif" => Some("image/gif"),
        "bmp" => Some("image/bmp"),
        _ => None,
    }
}

/// Rejects non-images and oversized files before anything goes over the network.
/// Returns the file size on success.
pub fn validate_upload(path: &Path, max_bytes: u64) -> Result<u64, UploadError> {
    let display = path.display().to_string();

    if mime_for_path(path).is_none() {
        return Err(UploadError::NotAnImage { path: display });
    }

    let metadata = std::fs::metadata(path).map_err(|source| UploadError::Unreadable {
        path: display.clone(),
        source,
    })?;

    if !metadata.is_file() {
        return Err(UploadError::NotAnImage { path: display });
    }

    if metadata.len() == 0 {
        return Err(UploadError::Empty { path: display });
    }

    if metadata.len() > max_bytes {
        return Err(UploadError::TooLarge {
            path: display,
            size: metadata.len(),
            limit: max_bytes,
        });
    }

    Ok(metadata.len())
}

/// A photo in the wire form the relay expects: a base64 data URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageEncoding {
    data_url: String,
}

impl ImageEncoding {
    pub fn from_bytes(bytes: &[u8], mime_type: &str) -> Self {
        let base64_image = general_purpose::STANDARD.encode(bytes);
        Self {
            data_url: format!("data:{};base64,{}", mime_type, base64_image),
        }
    }

    pub async fn from_file(path: &Path) -> Result<Self, UploadError> {
        let image_data = tokio::fs::read(path)
            .await
            .map_err(|source| UploadError::Unreadable {
                path: path.display().to_string(),
                source,
            })?;

        if image_data.is_empty() {
            return Err(UploadError::Empty {
                path: path.display().to_string(),
            });
        }

        let mime_type = mime_for_path(path).unwrap_or("image/jpeg");
        log::debug!("📊 Image file size: {} bytes ({})", image_data.len(), mime_type);

        let encoding = Self::from_bytes(&image_data, mime_type);
        log::debug!("🔄 Data URL size: {} bytes", encoding.data_url.len());
        Ok(encoding)
    }

    pub fn as_str(&self) -> &str {
        &self.data_url
    }

    /// True when the file had no bytes to encode.
    pub fn is_empty(&self) -> bool {
        self.data_url.ends_with("base64,")
    }
}

/// Strips a `data:<mime>;base64,` prefix, leaving bare base64 untouched.
pub fn strip_data_url(image: &str) -> &str {
    if image.starts_with("data:") {
        if let Some((_, payload)) = image.split_once(";base64,") {
            return payload;
        }
    }
    image
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_mime_for_path() {
        assert_eq!(mime_for_path(Path::new("dish.JPG")), Some("image/jpeg"));
        assert_eq!(mime_for_path(Path::new("dish.png")), Some("image/png"));
        assert_eq!(mime_for_path(Path::new("dish.webp")), Some("image/webp"));
        assert_eq!(mime_for_path(Path::new("notes.txt")), None);
        assert_eq!(mime_for_path(Path::new("no_extension")), None);
    }

    #[test]
    fn test_validate_upload_rejects_non_image() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("menu.txt");
        std::fs::write(&path, "not a photo").unwrap();

        let err = validate_upload(&path, DEFAULT_MAX_UPLOAD_BYTES).unwrap_err();
        assert!(matches!(err, UploadError::NotAnImage { .. }));
    }

    #[test]
    fn test_validate_upload_rejects_oversized() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("big.jpg");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(&vec![0u8; 2048]).unwrap();

        let err = validate_upload(&path, 1024).unwrap_err();
        assert!(matches!(err, UploadError::TooLarge { size: 2048, limit: 1024, .. }));

        assert_eq!(validate_upload(&path, 4096).unwrap(), 2048);
    }

    #[test]
    fn test_validate_upload_rejects_empty_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.jpg");
        std::fs::File::create(&path).unwrap();

        let err = validate_upload(&path, DEFAULT_MAX_UPLOAD_BYTES).unwrap_err();
        assert!(matches!(err, UploadError::Empty { .. }));
    }

    #[test]
    fn test_validate_upload_missing_file() {
        let err = validate_upload(Path::new("/nonexistent/dish.png"), DEFAULT_MAX_UPLOAD_BYTES)
            .unwrap_err();
        assert!(matches!(err, UploadError::Unreadable { .. }));
    }

    #[test]
    fn test_from_bytes_builds_data_url() {
        let encoding = ImageEncoding::from_bytes(b"abc", "image/png");
        assert_eq!(encoding.as_str(), "data:image/png;base64,YWJj");
        assert!(!encoding.is_empty());
        assert!(ImageEncoding::from_bytes(b"", "image/png").is_empty());
    }

    #[tokio::test]
    async fn test_from_file_unreadable() {
        let err = ImageEncoding::from_file(Path::new("/nonexistent/soup.jpg"))
            .await
            .unwrap_err();
        assert!(matches!(err, UploadError::Unreadable { .. }));
    }

    #[tokio::test]
    async fn test_from_file_rejects_empty_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.png");
        std::fs::write(&path, b"").unwrap();

        let err = ImageEncoding::from_file(&path).await.unwrap_err();
        assert!(matches!(err, UploadError::Empty { .. }));
    }

    #[test]
    fn test_strip_data_url() {
        assert_eq!(strip_data_url("data:image/jpeg;base64,QUJD"), "QUJD");
        assert_eq!(strip_data_url("QUJD"), "QUJD");
    }
}
