use super::{extension_for, StorageService};
use crate::{Error, Result};
use async_trait::async_trait;
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, PartialEq)]
enum MockBehavior {
    Store,
    EmptyUrl,
    Fail(String),
}

/// In-memory storage double.
#[derive(Clone)]
pub struct MockStorageClient {
    uploads: Arc<Mutex<Vec<(String, Vec<u8>)>>>,
    base_url: String,
    behavior: MockBehavior,
    upload_count: Arc<Mutex<usize>>,
    recording: bool,
}

impl MockStorageClient {
    pub fn new() -> Self {
        Self {
            uploads: Arc::new(Mutex::new(Vec::new())),
            base_url: "https://mock-storage.example.com".to_string(),
            behavior: MockBehavior::Store,
            upload_count: Arc::new(Mutex::new(0)),
            recording: true,
        }
    }

    /// Count uploads but keep none of their bytes. Used by the dry-run server.
    pub fn discarding(mut self) -> Self {
        self.recording = false;
        self
    }

    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }

    /// Every upload fails with the given message.
    pub fn failing(mut self, message: &str) -> Self {
        self.behavior = MockBehavior::Fail(message.to_string());
        self
    }

    /// Uploads "succeed" but hand back no URL.
    pub fn without_url(mut self) -> Self {
        self.behavior = MockBehavior::EmptyUrl;
        self
    }

    pub fn get_upload_count(&self) -> usize {
        *self.upload_count.lock().unwrap()
    }

    /// Content types and bodies of every stored upload, in order.
    pub fn get_uploads(&self) -> Vec<(String, Vec<u8>)> {
        self.uploads.lock().unwrap().clone()
    }
}

impl Default for MockStorageClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StorageService for MockStorageClient {
    async fn upload_image(&self, data: &[u8], content_type: &str) -> Result<String> {
        let count = {
            let mut count = self.upload_count.lock().unwrap();
            *count += 1;
            *count
        };

        match &self.behavior {
            MockBehavior::Fail(message) => Err(Error::Upload(message.clone())),
            MockBehavior::EmptyUrl => Ok(String::new()),
            MockBehavior::Store => {
                if self.recording {
                    self.uploads
                        .lock()
                        .unwrap()
                        .push((content_type.to_string(), data.to_vec()));
                }
                Ok(format!(
                    "{}/uploads/{}.{}",
                    self.base_url,
                    count,
                    extension_for(content_type)
                ))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_storage_upload() {
        let client = MockStorageClient::new();

        let url = client.upload_image(b"png-bytes", "image/png").await.unwrap();

        assert_eq!(url, "https://mock-storage.example.com/uploads/1.png");
        assert_eq!(client.get_upload_count(), 1);
        assert_eq!(
            client.get_uploads(),
            vec![("image/png".to_string(), b"png-bytes".to_vec())]
        );
    }

    #[tokio::test]
    async fn test_mock_storage_with_custom_base_url() {
        let client = MockStorageClient::new().with_base_url("https://img.test".to_string());
        let url = client.upload_image(b"x", "image/jpeg").await.unwrap();
        assert_eq!(url, "https://img.test/uploads/1.jpg");
    }

    #[tokio::test]
    async fn test_mock_storage_failing() {
        let client = MockStorageClient::new().failing("bucket gone");
        let err = client.upload_image(b"x", "image/png").await.unwrap_err();

        assert!(err.to_string().contains("bucket gone"));
        assert_eq!(client.get_upload_count(), 1);
        assert!(client.get_uploads().is_empty());
    }

    #[tokio::test]
    async fn test_discarding_storage_keeps_no_bytes() {
        let client = MockStorageClient::new().discarding();
        let image = vec![0u8; 1024 * 1024];

        for n in 1..=50 {
            let url = client.upload_image(&image, "image/png").await.unwrap();
            assert_eq!(url, format!("https://mock-storage.example.com/uploads/{}.png", n));
        }

        assert_eq!(client.get_upload_count(), 50);
        assert!(client.get_uploads().is_empty());
    }

    #[tokio::test]
    async fn test_mock_storage_without_url() {
        let client = MockStorageClient::new().without_url();
        let url = client.upload_image(b"x", "image/png").await.unwrap();
        assert!(url.is_empty());
    }
}
