//! Object storage for uploaded source images
//!
//! Providers fetch the source image by URL, so every upload must come back
//! as a publicly retrievable address. Uploaded objects are never cleaned up
//! by the relay.

pub mod cloudinary;
pub mod mock;
pub mod s3;

pub use cloudinary::{CloudinaryClient, CloudinaryCredentials};
pub use mock::MockStorageClient;
pub use s3::S3StorageClient;

use crate::Result;
use async_trait::async_trait;

#[async_trait]
pub trait StorageService: Send + Sync {
    /// Store `data` and return its public URL.
    async fn upload_image(&self, data: &[u8], content_type: &str) -> Result<String>;
}

/// File extension used in object keys for a given MIME type.
pub(crate) fn extension_for(content_type: &str) -> &'static str {
    match content_type {
        "image/png" => "png",
        "image/jpeg" => "jpg",
        "image/webp" => "webp",
        "image/gif" => "gif",
        "image/bmp" => "bmp",
        "image/tiff" => "tiff",
        _ => "bin",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_for_known_types() {
        assert_eq!(extension_for("image/png"), "png");
        assert_eq!(extension_for("image/jpeg"), "jpg");
        assert_eq!(extension_for("application/octet-stream"), "bin");
    }
}
