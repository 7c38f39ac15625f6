//! S3-compatible object store client.

use std::time::Duration;

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_credential_types::Credentials;
use aws_sdk_s3::config::{Builder, Region};
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use aws_types::SdkConfig;
use tracing::{debug, info};

use crate::error::{StorageError, StorageResult};
use crate::keys::validate_key;
use crate::store::ObjectStore;

/// Longest validity a SigV4 presigned URL may have.
const MAX_PRESIGN_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Configuration for the S3 store.
#[derive(Debug, Clone)]
pub struct S3Config {
    /// Custom S3 API endpoint (R2, MinIO); `None` for AWS S3
    pub endpoint_url: Option<String>,
    /// Static credentials; the default AWS chain is used when absent
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    /// Bucket name
    pub bucket_name: String,
    /// Region ("auto" for R2)
    pub region: String,
    /// Public CDN base; fetch URLs are presigned when unset
    pub public_base_url: Option<String>,
    /// Validity of presigned fetch URLs
    pub url_ttl: Duration,
}

impl Default for S3Config {
    fn default() -> Self {
        Self {
            endpoint_url: None,
            access_key_id: None,
            secret_access_key: None,
            bucket_name: "adreel".to_string(),
            region: "us-east-1".to_string(),
            public_base_url: None,
            url_ttl: Duration::from_secs(6 * 60 * 60),
        }
    }
}

impl S3Config {
    /// Create config from environment variables.
    pub fn from_env() -> StorageResult<Self> {
        let defaults = Self::default();

        let public_base_url = std::env::var("STORAGE_PUBLIC_BASE_URL")
            .ok()
            .filter(|s| !s.trim().is_empty());
        if let Some(base) = &public_base_url {
            url::Url::parse(base).map_err(|e| {
                StorageError::config_error(format!("STORAGE_PUBLIC_BASE_URL invalid: {e}"))
            })?;
        }

        let url_ttl = std::env::var("STORAGE_URL_TTL_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(defaults.url_ttl)
            .min(MAX_PRESIGN_TTL);

        Ok(Self {
            endpoint_url: std::env::var("STORAGE_ENDPOINT_URL").ok(),
            access_key_id: std::env::var("STORAGE_ACCESS_KEY_ID").ok(),
            secret_access_key: std::env::var("STORAGE_SECRET_ACCESS_KEY").ok(),
            bucket_name: std::env::var("STORAGE_BUCKET_NAME")
                .map_err(|_| StorageError::config_error("STORAGE_BUCKET_NAME not set"))?,
            region: std::env::var("STORAGE_REGION").unwrap_or(defaults.region),
            public_base_url,
            url_ttl,
        })
    }
}

/// Build a public URL by appending the percent-encoded key to `base`.
pub fn public_url(base: &str, key: &str) -> String {
    let encoded: Vec<String> = key
        .split('/')
        .map(|part| urlencoding::encode(part).into_owned())
        .collect();
    format!("{}/{}", base.trim_end_matches('/'), encoded.join("/"))
}

/// Object store backed by an S3-compatible service.
#[derive(Clone)]
pub struct S3Store {
    client: Client,
    bucket: String,
    public_base_url: Option<String>,
    url_ttl: Duration,
}

impl S3Store {
    /// Create a new store from configuration.
    pub async fn new(config: S3Config) -> StorageResult<Self> {
        let mut builder = match (&config.access_key_id, &config.secret_access_key) {
            (Some(key_id), Some(secret)) => {
                let credentials = Credentials::new(key_id, secret, None, None, "adreel-storage");
                Builder::new()
                    .behavior_version(BehaviorVersion::latest())
                    .credentials_provider(credentials)
            }
            _ => {
                let shared: SdkConfig = aws_config::defaults(BehaviorVersion::latest())
                    .load()
                    .await;
                Builder::from(&shared)
            }
        };

        builder = builder
            .region(Region::new(config.region.clone()))
            .force_path_style(true);
        if let Some(endpoint) = &config.endpoint_url {
            builder = builder.endpoint_url(endpoint);
        }

        info!(
            bucket = %config.bucket_name,
            endpoint = config.endpoint_url.as_deref().unwrap_or("aws"),
            "Object store configured"
        );

        Ok(Self {
            client: Client::from_conf(builder.build()),
            bucket: config.bucket_name,
            public_base_url: config.public_base_url,
            url_ttl: config.url_ttl.min(MAX_PRESIGN_TTL),
        })
    }

    /// Create from environment variables.
    pub async fn from_env() -> StorageResult<Self> {
        let config = S3Config::from_env()?;
        Self::new(config).await
    }

    /// Generate a presigned URL for GET.
    pub async fn presign_get(&self, key: &str, expires_in: Duration) -> StorageResult<String> {
        let presign_config = PresigningConfig::expires_in(expires_in)
            .map_err(|e| StorageError::PresignFailed(e.to_string()))?;

        let presigned = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .presigned(presign_config)
            .await
            .map_err(|e| StorageError::PresignFailed(e.to_string()))?;

        Ok(presigned.uri().to_string())
    }

    /// Check connectivity by performing a head bucket operation.
    pub async fn check_connectivity(&self) -> StorageResult<()> {
        self.client
            .head_bucket()
            .bucket(&self.bucket)
            .send()
            .await
            .map_err(|e| StorageError::AwsSdk(format!("connectivity check failed: {}", e)))?;
        Ok(())
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    async fn put(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> StorageResult<String> {
        validate_key(key)?;
        debug!("Uploading {} bytes to {}", bytes.len(), key);

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(bytes))
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| StorageError::upload_failed(e.to_string()))?;

        self.fetch_url(key).await
    }

    async fn get(&self, key: &str) -> StorageResult<Vec<u8>> {
        validate_key(key)?;
        debug!("Downloading {}", key);

        let response = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                if e.to_string().contains("NoSuchKey") {
                    StorageError::not_found(key)
                } else {
                    StorageError::DownloadFailed(e.to_string())
                }
            })?;

        let bytes = response
            .body
            .collect()
            .await
            .map_err(|e| StorageError::DownloadFailed(e.to_string()))?
            .into_bytes()
            .to_vec();

        Ok(bytes)
    }

    async fn fetch_url(&self, key: &str) -> StorageResult<String> {
        validate_key(key)?;
        match &self.public_base_url {
            Some(base) => Ok(public_url(base, key)),
            None => self.presign_get(key, self.url_ttl).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn clear_env() {
        for var in [
            "STORAGE_ENDPOINT_URL",
            "STORAGE_ACCESS_KEY_ID",
            "STORAGE_SECRET_ACCESS_KEY",
            "STORAGE_BUCKET_NAME",
            "STORAGE_REGION",
            "STORAGE_PUBLIC_BASE_URL",
            "STORAGE_URL_TTL_SECS",
        ] {
            std::env::remove_var(var);
        }
    }

    #[test]
    fn test_public_url_encodes_segments() {
        assert_eq!(
            public_url("https://cdn.example.com/", "u1/p1/my clip.mp4"),
            "https://cdn.example.com/u1/p1/my%20clip.mp4"
        );
    }

    #[test]
    #[serial]
    fn test_from_env_requires_bucket() {
        clear_env();
        assert!(matches!(
            S3Config::from_env(),
            Err(StorageError::ConfigError(_))
        ));
    }

    #[test]
    #[serial]
    fn test_from_env_caps_ttl() {
        clear_env();
        std::env::set_var("STORAGE_BUCKET_NAME", "ads");
        std::env::set_var("STORAGE_URL_TTL_SECS", "99999999");
        std::env::set_var("STORAGE_PUBLIC_BASE_URL", "https://cdn.example.com");

        let config = S3Config::from_env().unwrap();
        assert_eq!(config.bucket_name, "ads");
        assert_eq!(config.url_ttl, MAX_PRESIGN_TTL);
        assert_eq!(config.public_base_url.as_deref(), Some("https://cdn.example.com"));
        assert_eq!(config.region, "us-east-1");
        clear_env();
    }

    #[test]
    #[serial]
    fn test_from_env_rejects_bad_public_base() {
        clear_env();
        std::env::set_var("STORAGE_BUCKET_NAME", "ads");
        std::env::set_var("STORAGE_PUBLIC_BASE_URL", "not a url");
        assert!(S3Config::from_env().is_err());
        clear_env();
    }
}
