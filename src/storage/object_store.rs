//! src/storage/object_store.rs
//!
//! ObjectStore — the bridge to the external S3-compatible store. This file
//! intentionally contains **no** naming policy or request validation; it
//! exposes the primitive operations (put, delete, stat, URL issuance) and
//! hides connection bootstrap plus transient-failure handling behind the
//! retry combinator in [`super::retry`].
//!
//! The store is reached through two independently configured clients that
//! share credentials and bucket: the *internal* client carries data-plane
//! traffic over the service's private pathway, while the *public* client
//! exists only so presigned URLs are signed against the address end
//! clients can actually reach. Presigning is a local computation, so the
//! public client never opens a connection.

use std::time::Duration;

use aws_sdk_s3::Client;
use aws_sdk_s3::config::{BehaviorVersion, Credentials, Region};
use aws_sdk_s3::presigning::{PresigningConfig, PresigningConfigError};
use aws_sdk_s3::primitives::ByteStream;
use thiserror::Error;
use tracing::{debug, info};

use crate::config::AppConfig;
use crate::storage::retry::{RetryError, RetryPolicy, retry_fixed};

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("bucket `{bucket}` bootstrap call failed")]
    Bucket {
        bucket: String,
        #[source]
        source: aws_sdk_s3::Error,
    },
    #[error("failed to store object `{key}`")]
    Put {
        key: String,
        #[source]
        source: aws_sdk_s3::Error,
    },
    #[error("failed to delete object `{key}`")]
    Delete {
        key: String,
        #[source]
        source: aws_sdk_s3::Error,
    },
    #[error("failed to stat object `{key}`")]
    Stat {
        key: String,
        #[source]
        source: aws_sdk_s3::Error,
    },
    #[error("failed to presign URL for object `{key}`")]
    Presign {
        key: String,
        #[source]
        source: aws_sdk_s3::Error,
    },
    #[error("signed-URL expiry is not presignable")]
    PresignExpiry(#[from] PresigningConfigError),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Metadata returned by [`ObjectStore::stat`].
#[derive(Debug, Clone)]
pub struct ObjectStat {
    pub size_bytes: i64,
    pub content_type: Option<String>,
}

/// Gateway to the S3-compatible object store.
///
/// Cheap to clone: the underlying SDK clients are handles over shared
/// connection state and are safe for concurrent use.
#[derive(Clone)]
pub struct ObjectStore {
    internal: Client,
    public: Client,
    bucket: String,
    public_base_url: String,
    url_expiry: Duration,
}

impl ObjectStore {
    /// Build the client handles without touching the network.
    ///
    /// The returned store is usable for URL composition and for issuing
    /// calls, but the target bucket has not been verified; production
    /// startup goes through [`ObjectStore::connect`] instead.
    pub fn connect_lazy(cfg: &AppConfig) -> Self {
        let credentials = Credentials::new(
            cfg.access_key.clone(),
            cfg.secret_key.clone(),
            None,
            None,
            "static",
        );

        let base = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(cfg.region.clone()))
            .credentials_provider(credentials)
            // MinIO and friends route on the path, not the subdomain.
            .force_path_style(true);

        let internal_url = endpoint_url(cfg.use_tls, &cfg.endpoint);
        let public_url = endpoint_url(cfg.use_tls, &cfg.public_endpoint);

        let internal = Client::from_conf(base.clone().endpoint_url(internal_url).build());
        let public = Client::from_conf(base.endpoint_url(public_url.clone()).build());

        Self {
            internal,
            public,
            bucket: cfg.bucket.clone(),
            public_base_url: public_url,
            url_expiry: Duration::from_secs(cfg.expiry_hours * 3600),
        }
    }

    /// Connect to the store and make the bucket usable.
    ///
    /// Verifies the bucket exists, creates it if absent, and applies a
    /// public-read policy. The three steps run as a unit under the
    /// bootstrap retry policy, since each depends on connectivity;
    /// exhausting the retries is fatal to startup. Re-running against an
    /// already provisioned bucket only performs the existence check and
    /// re-applies the same policy.
    pub async fn connect(cfg: &AppConfig) -> Result<Self, RetryError<StorageError>> {
        let store = Self::connect_lazy(cfg);
        retry_fixed(RetryPolicy::bootstrap(), "bucket bootstrap", || {
            store.ensure_bucket()
        })
        .await?;
        Ok(store)
    }

    /// One bootstrap pass: head → create if absent → set read policy.
    async fn ensure_bucket(&self) -> StorageResult<()> {
        let exists = match self.internal.head_bucket().bucket(&self.bucket).send().await {
            Ok(_) => true,
            Err(err) if err.as_service_error().is_some_and(|e| e.is_not_found()) => false,
            Err(err) => {
                return Err(StorageError::Bucket {
                    bucket: self.bucket.clone(),
                    source: err.into(),
                });
            }
        };

        if exists {
            debug!(bucket = %self.bucket, "bucket already present");
        } else {
            match self.internal.create_bucket().bucket(&self.bucket).send().await {
                Ok(_) => info!(bucket = %self.bucket, "created bucket"),
                // Lost a create race with another instance; the bucket is there.
                Err(err)
                    if err
                        .as_service_error()
                        .is_some_and(|e| e.is_bucket_already_owned_by_you()) => {}
                Err(err) => {
                    return Err(StorageError::Bucket {
                        bucket: self.bucket.clone(),
                        source: err.into(),
                    });
                }
            }
        }

        self.internal
            .put_bucket_policy()
            .bucket(&self.bucket)
            .policy(public_read_policy(&self.bucket))
            .send()
            .await
            .map_err(|err| StorageError::Bucket {
                bucket: self.bucket.clone(),
                source: err.into(),
            })?;

        Ok(())
    }

    /// Cheap probe used by the readiness endpoint.
    pub async fn bucket_reachable(&self) -> StorageResult<()> {
        self.internal
            .head_bucket()
            .bucket(&self.bucket)
            .send()
            .await
            .map_err(|err| StorageError::Bucket {
                bucket: self.bucket.clone(),
                source: err.into(),
            })?;
        Ok(())
    }

    /// Stream `body` to the store under `key`, creating or overwriting.
    ///
    /// `size_bytes` is used for transfer framing and must match the body
    /// exactly; an inaccurate size can hang or truncate the transfer. This
    /// is a hard input contract, not an internal detail.
    pub async fn put(
        &self,
        key: &str,
        body: ByteStream,
        size_bytes: i64,
        content_type: &str,
    ) -> StorageResult<()> {
        self.internal
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(body)
            .content_length(size_bytes)
            .content_type(content_type)
            .send()
            .await
            .map_err(|err| StorageError::Put {
                key: key.to_string(),
                source: err.into(),
            })?;
        Ok(())
    }

    /// Remove the object at `key`.
    pub async fn delete(&self, key: &str) -> StorageResult<()> {
        self.internal
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|err| StorageError::Delete {
                key: key.to_string(),
                source: err.into(),
            })?;
        Ok(())
    }

    /// Best-effort delete: failures are logged and swallowed.
    ///
    /// Used by the delete-then-overwrite replace idiom, where the common
    /// failure is simply that the prior object never existed and the
    /// subsequent write must not be blocked.
    pub async fn delete_quietly(&self, key: &str) {
        if let Err(err) = self.delete(key).await {
            debug!(key, error = %err, "best-effort delete failed, continuing");
        }
    }

    /// Stat `key`, distinguishing absence from faults.
    ///
    /// Returns `Ok(None)` only when the store positively reports the
    /// object missing; transient failures (network outage, auth problems)
    /// surface as `Err` so callers can tell the two apart.
    pub async fn stat(&self, key: &str) -> StorageResult<Option<ObjectStat>> {
        match self
            .internal
            .head_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
        {
            Ok(out) => Ok(Some(ObjectStat {
                size_bytes: out.content_length().unwrap_or(0),
                content_type: out.content_type().map(str::to_string),
            })),
            Err(err) if err.as_service_error().is_some_and(|e| e.is_not_found()) => Ok(None),
            Err(err) => Err(StorageError::Stat {
                key: key.to_string(),
                source: err.into(),
            }),
        }
    }

    /// Lossy existence check: any stat failure collapses to `false`.
    ///
    /// Callers that must distinguish a transient fault from genuine
    /// absence use [`ObjectStore::stat`] instead.
    pub async fn exists(&self, key: &str) -> bool {
        match self.stat(key).await {
            Ok(found) => found.is_some(),
            Err(err) => {
                debug!(key, error = %err, "stat failed, treating object as absent");
                false
            }
        }
    }

    /// Mint a time-limited signed GET URL for `key`.
    ///
    /// Signed against the public endpoint so the URL is valid on the
    /// pathway end clients use, which may differ from the internal one.
    pub async fn presigned_get_url(&self, key: &str) -> StorageResult<String> {
        let presigning = PresigningConfig::expires_in(self.url_expiry)?;
        let request = self
            .public
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .presigned(presigning)
            .await
            .map_err(|err| StorageError::Presign {
                key: key.to_string(),
                source: err.into(),
            })?;
        Ok(request.uri().to_string())
    }

    /// Permanent URL under the public-read bucket policy. Pure string
    /// composition — no network call.
    pub fn public_url(&self, key: &str) -> String {
        format!(
            "{}/{}/{}",
            self.public_base_url.trim_end_matches('/'),
            self.bucket,
            key
        )
    }
}

/// Prefix `endpoint` with a scheme according to the TLS toggle, unless the
/// configuration already spelled one out.
fn endpoint_url(use_tls: bool, endpoint: &str) -> String {
    if endpoint.contains("://") {
        endpoint.to_string()
    } else if use_tls {
        format!("https://{}", endpoint)
    } else {
        format!("http://{}", endpoint)
    }
}

/// Bucket policy document granting anonymous GET on every object.
fn public_read_policy(bucket: &str) -> String {
    serde_json::json!({
        "Version": "2012-10-17",
        "Statement": [{
            "Effect": "Allow",
            "Principal": { "AWS": ["*"] },
            "Action": ["s3:GetObject"],
            "Resource": [format!("arn:aws:s3:::{}/*", bucket)],
        }],
    })
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::tests::test_config;

    #[test]
    fn test_endpoint_url_scheme_follows_tls_toggle() {
        assert_eq!(endpoint_url(false, "minio:9000"), "http://minio:9000");
        assert_eq!(endpoint_url(true, "minio:9000"), "https://minio:9000");
        assert_eq!(
            endpoint_url(true, "http://already.example"),
            "http://already.example"
        );
    }

    #[test]
    fn test_public_read_policy_names_the_bucket() {
        let policy = public_read_policy("media");
        assert!(policy.contains("arn:aws:s3:::media/*"));
        assert!(policy.contains("s3:GetObject"));
    }

    #[test]
    fn test_public_url_composition() {
        let store = ObjectStore::connect_lazy(&test_config());
        assert_eq!(
            store.public_url("u1/avatar.jpg"),
            "http://public.example:9000/media/u1/avatar.jpg"
        );
    }
}
