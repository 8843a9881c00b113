use super::{extension_for, StorageService};
use crate::{Error, Result};
use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::{config::Region, types::ObjectCannedAcl, Client as S3Client};
use chrono::Utc;
use uuid::Uuid;

/// Settings for an S3-compatible bucket with a public base URL.
#[derive(Debug, Clone, PartialEq)]
pub struct S3Settings {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub endpoint: String,
    pub region: String,
    pub bucket: String,
    pub public_base_url: String,
}

pub struct S3StorageClient {
    client: S3Client,
    bucket: String,
    public_base_url: String,
}

impl S3StorageClient {
    pub async fn new(settings: S3Settings) -> Result<Self> {
        let credentials = aws_sdk_s3::config::Credentials::new(
            settings.access_key_id,
            settings.secret_access_key,
            None,
            None,
            "image3d-relay",
        );

        let config = aws_config::defaults(BehaviorVersion::latest())
            .credentials_provider(credentials)
            .region(Region::new(settings.region))
            .endpoint_url(settings.endpoint)
            .load()
            .await;

        let client = S3Client::new(&config);

        Ok(Self {
            client,
            bucket: settings.bucket,
            public_base_url: settings.public_base_url.trim_end_matches('/').to_string(),
        })
    }

    fn object_key(content_type: &str) -> String {
        format!(
            "uploads/{}/{}.{}",
            Utc::now().format("%Y/%m/%d"),
            Uuid::new_v4(),
            extension_for(content_type)
        )
    }

    fn get_public_url(&self, key: &str) -> String {
        format!("{}/{}", self.public_base_url, key)
    }
}

#[async_trait]
impl StorageService for S3StorageClient {
    async fn upload_image(&self, data: &[u8], content_type: &str) -> Result<String> {
        let key = Self::object_key(content_type);
        let body = ByteStream::from(data.to_vec());

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .body(body)
            .content_type(content_type)
            .acl(ObjectCannedAcl::PublicRead)
            .send()
            .await
            .map_err(|e| Error::Upload(format!("Failed to upload to bucket {}: {}", self.bucket, e)))?;

        tracing::debug!("Stored {} bytes at s3://{}/{}", data.len(), self.bucket, key);
        Ok(self.get_public_url(&key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_key_layout() {
        let key = S3StorageClient::object_key("image/png");
        assert!(key.starts_with("uploads/"));
        assert!(key.ends_with(".png"));
        // uploads/YYYY/MM/DD/<uuid>.png
        assert_eq!(key.split('/').count(), 5);
    }

    #[tokio::test]
    async fn test_public_url_strips_trailing_slash() {
        let client = S3StorageClient::new(S3Settings {
            access_key_id: "key".to_string(),
            secret_access_key: "secret".to_string(),
            endpoint: "http://127.0.0.1:9000".to_string(),
            region: "us-east-1".to_string(),
            bucket: "uploads".to_string(),
            public_base_url: "https://cdn.test/".to_string(),
        })
        .await
        .unwrap();

        assert_eq!(
            client.get_public_url("uploads/a.png"),
            "https://cdn.test/uploads/a.png"
        );
    }
}
