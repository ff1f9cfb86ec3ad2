//! src/services/upload_service.rs
//!
//! UploadService — naming, batching, and translation of storage outcomes
//! into caller-visible URLs. This file intentionally does **not** talk to
//! the network itself; every store interaction goes through
//! [`ObjectStore`], and the service's own job is deciding keys and
//! orchestrating the per-item sequence.

use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::KeyScheme;
use crate::models::upload::UploadItem;
use crate::storage::object_store::{ObjectStore, StorageError};

/// Upper bound on items per photo batch.
pub const MAX_BATCH_SIZE: usize = 5;

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("photo batch is empty")]
    EmptyBatch,
    #[error("photo batch holds {0} items, limit is {MAX_BATCH_SIZE}")]
    BatchTooLarge(usize),
    #[error("photo `{0}` not found")]
    PhotoNotFound(String),
    #[error("photo lookup is only served under the `random` key scheme")]
    LookupUnsupported,
    #[error("failed to upload avatar")]
    Avatar(#[source] StorageError),
    #[error("failed to upload photo {index}")]
    Photo {
        index: usize,
        #[source]
        source: StorageError,
    },
    #[error("failed to issue URL for photo {index}")]
    PhotoUrl {
        index: usize,
        #[source]
        source: StorageError,
    },
    #[error("failed to look up photo `{photo_id}`")]
    Lookup {
        photo_id: String,
        #[source]
        source: StorageError,
    },
    #[error("failed to issue URL")]
    Url(#[source] StorageError),
}

pub type UploadResult<T> = Result<T, UploadError>;

/// UploadService maps inbound content onto object keys and URLs:
/// - Upload an avatar (one item, deterministic or random key per scheme)
/// - Upload a photo batch (1..=5 items, strictly sequential)
/// - Resolve a previously stored photo id back to a URL
///
/// The addressing scheme is fixed per deployment by configuration; see
/// [`KeyScheme`] for the two observed variants.
#[derive(Clone)]
pub struct UploadService {
    store: Arc<ObjectStore>,
    scheme: KeyScheme,
}

impl UploadService {
    pub fn new(store: Arc<ObjectStore>, scheme: KeyScheme) -> Self {
        Self { store, scheme }
    }

    pub fn store(&self) -> &ObjectStore {
        &self.store
    }

    /// Store an avatar for `owner_id` and return its retrieval URL.
    ///
    /// Under the `form` scheme the key is fixed per owner, so any previous
    /// avatar is removed best-effort first and the new content overwrites
    /// it; the URL is presigned. Under `random` every upload gets a fresh
    /// key and the permanent public URL is returned.
    pub async fn upload_avatar(&self, owner_id: &str, item: UploadItem) -> UploadResult<String> {
        let ext = item.extension();
        let UploadItem {
            body,
            size_bytes,
            content_type,
            ..
        } = item;

        match self.scheme {
            KeyScheme::Form => {
                let key = avatar_key(owner_id, &ext);
                // Overwrite-by-replace. The lossy existence check is the
                // right one here: if it collapses a fault to "absent" we
                // skip the delete and the put overwrites anyway.
                if self.store.exists(&key).await {
                    self.store.delete_quietly(&key).await;
                }
                self.store
                    .put(&key, body, size_bytes, &content_type)
                    .await
                    .map_err(UploadError::Avatar)?;
                let url = self
                    .store
                    .presigned_get_url(&key)
                    .await
                    .map_err(UploadError::Url)?;
                info!(owner_id, %key, "avatar uploaded");
                Ok(url)
            }
            KeyScheme::Random => {
                let key = random_photo_key(owner_id, &ext);
                self.store
                    .put(&key, body, size_bytes, &content_type)
                    .await
                    .map_err(UploadError::Avatar)?;
                info!(owner_id, %key, "avatar uploaded");
                Ok(self.store.public_url(&key))
            }
        }
    }

    /// Store a batch of photos for `owner_id`, returning one URL per item
    /// in input order.
    ///
    /// The batch size is validated before any network call. Uploads run
    /// strictly sequentially; the first failure aborts the call with the
    /// item's 1-based index, and objects already written in this batch
    /// stay in the store — there is no rollback.
    pub async fn upload_photos(
        &self,
        owner_id: &str,
        items: Vec<UploadItem>,
    ) -> UploadResult<Vec<String>> {
        validate_batch_size(items.len())?;

        let mut urls = Vec::with_capacity(items.len());
        for (index, item) in items.into_iter().enumerate() {
            let ordinal = index + 1;
            let ext = item.extension();
            let key = match self.scheme {
                KeyScheme::Form => {
                    form_photo_key(owner_id, index, Utc::now().timestamp(), &ext)
                }
                KeyScheme::Random => random_photo_key(owner_id, &ext),
            };

            let UploadItem {
                body,
                size_bytes,
                content_type,
                ..
            } = item;
            self.store
                .put(&key, body, size_bytes, &content_type)
                .await
                .map_err(|source| UploadError::Photo {
                    index: ordinal,
                    source,
                })?;

            let url = match self.scheme {
                KeyScheme::Form => self.store.presigned_get_url(&key).await.map_err(|source| {
                    UploadError::PhotoUrl {
                        index: ordinal,
                        source,
                    }
                })?,
                KeyScheme::Random => self.store.public_url(&key),
            };
            urls.push(url);
        }

        info!(owner_id, count = urls.len(), "photo batch uploaded");
        Ok(urls)
    }

    /// Resolve a stored photo id to a signed URL (`random` scheme only).
    ///
    /// Uses the fault-distinguishing stat so a missing photo surfaces as
    /// [`UploadError::PhotoNotFound`] while a transient store fault stays
    /// an internal error.
    pub async fn get_photo_url(&self, owner_id: &str, photo_id: &str) -> UploadResult<String> {
        if self.scheme != KeyScheme::Random {
            return Err(UploadError::LookupUnsupported);
        }

        let key = stored_photo_key(owner_id, photo_id);
        match self.store.stat(&key).await {
            Ok(Some(stat)) => {
                debug!(
                    owner_id,
                    photo_id,
                    size_bytes = stat.size_bytes,
                    content_type = stat.content_type.as_deref().unwrap_or("unknown"),
                    "photo found"
                );
                self.store
                    .presigned_get_url(&key)
                    .await
                    .map_err(UploadError::Url)
            }
            Ok(None) => Err(UploadError::PhotoNotFound(photo_id.to_string())),
            Err(source) => Err(UploadError::Lookup {
                photo_id: photo_id.to_string(),
                source,
            }),
        }
    }
}

fn validate_batch_size(len: usize) -> UploadResult<()> {
    if len == 0 {
        return Err(UploadError::EmptyBatch);
    }
    if len > MAX_BATCH_SIZE {
        return Err(UploadError::BatchTooLarge(len));
    }
    Ok(())
}

/// Fixed avatar key: `{owner}/avatar{ext}`. Re-upload overwrites.
fn avatar_key(owner_id: &str, ext: &str) -> String {
    format!("{}/avatar{}", owner_id, ext)
}

/// Ordinal+time photo key: `{owner}/form/{index}_{timestamp}{ext}`.
/// Distinct within a batch by index, across batches by timestamp.
fn form_photo_key(owner_id: &str, index: usize, timestamp: i64, ext: &str) -> String {
    format!("{}/form/{}_{}{}", owner_id, index, timestamp, ext)
}

/// Random-id photo key: `{owner}/photos/{uuid}{ext}`. Collision-resistant
/// across concurrent uploads and repeated uploads by the same owner.
fn random_photo_key(owner_id: &str, ext: &str) -> String {
    format!("{}/photos/{}{}", owner_id, Uuid::new_v4(), ext)
}

/// Key for a photo id previously handed out by the `random` scheme.
fn stored_photo_key(owner_id: &str, photo_id: &str) -> String {
    format!("{}/photos/{}", owner_id, photo_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_size_bounds() {
        assert!(matches!(
            validate_batch_size(0),
            Err(UploadError::EmptyBatch)
        ));
        assert!(matches!(
            validate_batch_size(6),
            Err(UploadError::BatchTooLarge(6))
        ));
        for len in 1..=MAX_BATCH_SIZE {
            assert!(validate_batch_size(len).is_ok());
        }
    }

    #[test]
    fn test_avatar_key_is_owner_scoped_and_keeps_extension() {
        let key = avatar_key("u1", ".jpg");
        assert_eq!(key, "u1/avatar.jpg");
        assert!(key.starts_with("u1/"));
        assert!(key.ends_with(".jpg"));
    }

    #[test]
    fn test_form_keys_distinct_within_a_batch() {
        // Same owner, same timestamp, identical filenames: the index alone
        // must keep the keys apart.
        let a = form_photo_key("u2", 0, 1700000000, ".png");
        let b = form_photo_key("u2", 1, 1700000000, ".png");
        assert_ne!(a, b);
        assert_eq!(a, "u2/form/0_1700000000.png");
    }

    #[test]
    fn test_random_keys_never_collide() {
        let a = random_photo_key("u1", ".jpg");
        let b = random_photo_key("u1", ".jpg");
        assert_ne!(a, b);
        assert!(a.starts_with("u1/photos/"));
        assert!(a.ends_with(".jpg"));
    }

    #[test]
    fn test_stored_photo_key_composition() {
        assert_eq!(
            stored_photo_key("u1", "abc123.jpg"),
            "u1/photos/abc123.jpg"
        );
    }

    #[test]
    fn test_batch_errors_carry_one_based_index() {
        let err = UploadError::Photo {
            index: 2,
            source: storage_error(),
        };
        assert!(err.to_string().contains("photo 2"));
    }

    fn storage_error() -> crate::storage::object_store::StorageError {
        use aws_sdk_s3::presigning::PresigningConfig;
        use std::time::Duration;

        // Expiries beyond one week are rejected by the SDK; a convenient
        // way to manufacture a real StorageError without a network call.
        let err = PresigningConfig::expires_in(Duration::from_secs(8 * 24 * 3600)).unwrap_err();
        crate::storage::object_store::StorageError::PresignExpiry(err)
    }
}
