use anyhow::Result;
use async_trait::async_trait;
use aws_config::Region;
use aws_sdk_s3::config::Credentials;
use aws_sdk_s3::primitives::ByteStream;
use tracing::info;
use uuid::Uuid;

use crate::config::S3Config;

/// Keeps a copy of the extracted source text behind each knowledge-base build.
#[async_trait]
pub trait SourceArchive: Send + Sync {
    /// Stores `text` for build `build_id` and returns the object key.
    async fn store(&self, build_id: Uuid, text: &str) -> Result<String>;
}

pub fn archive_key(build_id: Uuid) -> String {
    format!("knowledge/{build_id}.md")
}

pub struct S3Archive {
    client: aws_sdk_s3::Client,
    bucket: String,
}

impl S3Archive {
    /// Constructs an S3 client configured for MinIO (local) or AWS (production).
    pub async fn connect(config: &S3Config) -> Self {
        let credentials = Credentials::new(
            &config.access_key_id,
            &config.secret_access_key,
            None,
            None,
            "compass-static",
        );

        let s3_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(Region::new("us-east-1"))
            .credentials_provider(credentials)
            .endpoint_url(&config.endpoint)
            .load()
            .await;

        Self {
            client: aws_sdk_s3::Client::new(&s3_config),
            bucket: config.bucket.clone(),
        }
    }
}

#[async_trait]
impl SourceArchive for S3Archive {
    async fn store(&self, build_id: Uuid, text: &str) -> Result<String> {
        let key = archive_key(build_id);
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .body(ByteStream::from(text.as_bytes().to_vec()))
            .content_type("text/markdown")
            .send()
            .await
            .map_err(|e| anyhow::anyhow!("S3 upload failed: {e}"))?;

        info!("Archived knowledge base source to s3://{}/{}", self.bucket, key);
        Ok(key)
    }
}
