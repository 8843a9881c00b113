//! Image ingress: hand the client's image to storage and get a public URL back.

use crate::storage::StorageService;
use crate::{Error, Result};

const FALLBACK_CONTENT_TYPE: &str = "application/octet-stream";

/// Best-effort MIME type from the image's magic bytes.
pub fn detect_content_type(bytes: &[u8]) -> &'static str {
    match image::guess_format(bytes) {
        Ok(format) => format.to_mime_type(),
        Err(_) => {
            tracing::warn!(
                "Unrecognized image format (first 4 bytes: {:02X?}), uploading as {}",
                &bytes[..bytes.len().min(4)],
                FALLBACK_CONTENT_TYPE
            );
            FALLBACK_CONTENT_TYPE
        }
    }
}

/// Upload the source image and return its public URL.
///
/// Every storage failure, including a missing URL, is reported as
/// [`Error::Upload`]; nothing downstream runs without a URL.
pub async fn upload_source_image(storage: &dyn StorageService, bytes: &[u8]) -> Result<String> {
    if bytes.is_empty() {
        return Err(Error::InvalidRequest("image file is empty".to_string()));
    }

    let content_type = detect_content_type(bytes);
    tracing::info!("Uploading source image ({} bytes, {})", bytes.len(), content_type);

    let url = storage
        .upload_image(bytes, content_type)
        .await
        .map_err(|e| match e {
            Error::Upload(message) => Error::Upload(message),
            other => Error::Upload(other.to_string()),
        })?;

    let url = url.trim();
    if url.is_empty() {
        tracing::error!("Storage accepted the image but returned no URL");
        return Err(Error::Upload(
            "storage returned no public URL for the image".to_string(),
        ));
    }

    tracing::info!("Source image available at {}", url);
    Ok(url.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MockStorageClient;

    const PNG_HEADER: &[u8] = &[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00];
    const JPEG_HEADER: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10];

    #[test]
    fn test_detect_png_and_jpeg() {
        assert_eq!(detect_content_type(PNG_HEADER), "image/png");
        assert_eq!(detect_content_type(JPEG_HEADER), "image/jpeg");
    }

    #[test]
    fn test_unknown_bytes_fall_back() {
        assert_eq!(
            detect_content_type(&[0x00, 0x01, 0x02, 0x03]),
            FALLBACK_CONTENT_TYPE
        );
    }

    #[tokio::test]
    async fn test_upload_passes_detected_type() {
        let storage = MockStorageClient::new();
        let url = upload_source_image(&storage, PNG_HEADER).await.unwrap();

        assert!(url.ends_with(".png"));
        assert_eq!(storage.get_uploads()[0].0, "image/png");
    }

    #[tokio::test]
    async fn test_empty_body_never_reaches_storage() {
        let storage = MockStorageClient::new();
        let err = upload_source_image(&storage, &[]).await.unwrap_err();

        assert!(matches!(err, Error::InvalidRequest(_)));
        assert_eq!(storage.get_upload_count(), 0);
    }

    #[tokio::test]
    async fn test_missing_url_is_upload_error() {
        let storage = MockStorageClient::new().without_url();
        let err = upload_source_image(&storage, PNG_HEADER).await.unwrap_err();
        assert!(matches!(err, Error::Upload(_)));
    }

    #[tokio::test]
    async fn test_storage_fault_keeps_collaborator_message() {
        let storage = MockStorageClient::new().failing("access denied");
        let err = upload_source_image(&storage, PNG_HEADER).await.unwrap_err();
        assert!(matches!(err, Error::Upload(ref m) if m == "access denied"));
    }
}
