//! In-memory `ObjectStore` used by tests across the workspace.
//!
//! ETags follow single-part S3 semantics: the quoted MD5 of the body,
//! so change detection behaves exactly like the real store.

use crate::error::StoreError;
use crate::store::ObjectStore;
use crate::types::{BucketInfo, BucketState, DirListing, FetchedObject, ObjectInfo};
use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};
use tokio::sync::RwLock;

#[derive(Debug, Clone)]
struct StoredObject {
    body: Bytes,
    content_type: String,
    etag: String,
    last_modified: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct MemoryBucket {
    created_at: Option<DateTime<Utc>>,
    objects: BTreeMap<String, StoredObject>,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    buckets: RwLock<HashMap<String, MemoryBucket>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Convenience for test setup: creates the bucket if needed and
    /// stores the object in one call.
    pub async fn seed(&self, bucket: &str, key: &str, body: &[u8]) {
        let mut buckets = self.buckets.write().await;
        let entry = buckets
            .entry(bucket.to_string())
            .or_insert_with(|| MemoryBucket {
                created_at: Some(Utc::now()),
                objects: BTreeMap::new(),
            });
        entry.objects.insert(
            key.to_string(),
            StoredObject {
                body: Bytes::copy_from_slice(body),
                content_type: "application/octet-stream".to_string(),
                etag: quoted_md5(body),
                last_modified: Utc::now(),
            },
        );
    }

    /// Removes a bucket outright, regardless of contents. Lets tests
    /// simulate a bucket disappearing between poll cycles.
    pub async fn drop_bucket(&self, bucket: &str) {
        self.buckets.write().await.remove(bucket);
    }
}

fn quoted_md5(body: &[u8]) -> String {
    format!("\"{:x}\"", md5::compute(body))
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn list_buckets(&self) -> Result<Vec<BucketInfo>, StoreError> {
        let buckets = self.buckets.read().await;
        let mut out: Vec<BucketInfo> = buckets
            .iter()
            .map(|(name, b)| BucketInfo {
                name: name.clone(),
                creation_date: b.created_at,
            })
            .collect();
        out.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(out)
    }

    async fn create_bucket(&self, bucket: &str) -> Result<(), StoreError> {
        let mut buckets = self.buckets.write().await;
        if buckets.contains_key(bucket) {
            return Err(StoreError::Api {
                code: "BucketAlreadyOwnedByYou".to_string(),
                message: format!("Bucket '{}' already exists", bucket),
                status: 409,
            });
        }
        buckets.insert(
            bucket.to_string(),
            MemoryBucket {
                created_at: Some(Utc::now()),
                objects: BTreeMap::new(),
            },
        );
        Ok(())
    }

    async fn delete_bucket(&self, bucket: &str) -> Result<(), StoreError> {
        let mut buckets = self.buckets.write().await;
        match buckets.get(bucket) {
            None => Err(StoreError::NoSuchBucket(bucket.to_string())),
            Some(b) if !b.objects.is_empty() => Err(StoreError::BucketNotEmpty),
            Some(_) => {
                buckets.remove(bucket);
                Ok(())
            }
        }
    }

    async fn list_dir(&self, bucket: &str, prefix: &str) -> Result<DirListing, StoreError> {
        let buckets = self.buckets.read().await;
        let b = buckets
            .get(bucket)
            .ok_or_else(|| StoreError::NoSuchBucket(bucket.to_string()))?;

        let mut listing = DirListing::default();
        let mut seen_folders = std::collections::BTreeSet::new();

        for (key, object) in b.objects.range(prefix.to_string()..) {
            if !key.starts_with(prefix) {
                break;
            }
            if key == prefix {
                continue;
            }

            let remainder = &key[prefix.len()..];
            match remainder.find('/') {
                Some(idx) => {
                    seen_folders.insert(format!("{}{}/", prefix, &remainder[..idx]));
                }
                None => listing.objects.push(ObjectInfo {
                    key: key.clone(),
                    etag: object.etag.clone(),
                    size: object.body.len() as u64,
                    last_modified: Some(object.last_modified),
                }),
            }
        }

        listing.folders = seen_folders.into_iter().collect();
        Ok(listing)
    }

    async fn bucket_state(&self, bucket: &str) -> Result<BucketState, StoreError> {
        let buckets = self.buckets.read().await;
        let b = buckets
            .get(bucket)
            .ok_or_else(|| StoreError::NoSuchBucket(bucket.to_string()))?;

        Ok(b.objects
            .iter()
            .map(|(k, o)| (k.clone(), o.etag.clone()))
            .collect())
    }

    async fn get_object(&self, bucket: &str, key: &str) -> Result<FetchedObject, StoreError> {
        let buckets = self.buckets.read().await;
        let b = buckets
            .get(bucket)
            .ok_or_else(|| StoreError::NoSuchBucket(bucket.to_string()))?;
        let object = b
            .objects
            .get(key)
            .ok_or_else(|| StoreError::NoSuchKey(key.to_string()))?;

        Ok(FetchedObject {
            body: object.body.clone(),
            content_type: Some(object.content_type.clone()),
        })
    }

    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Bytes,
        content_type: &str,
    ) -> Result<(), StoreError> {
        let mut buckets = self.buckets.write().await;
        let b = buckets
            .get_mut(bucket)
            .ok_or_else(|| StoreError::NoSuchBucket(bucket.to_string()))?;

        let etag = quoted_md5(&body);
        b.objects.insert(
            key.to_string(),
            StoredObject {
                body,
                content_type: content_type.to_string(),
                etag,
                last_modified: Utc::now(),
            },
        );
        Ok(())
    }

    async fn delete_object(&self, bucket: &str, key: &str) -> Result<(), StoreError> {
        let mut buckets = self.buckets.write().await;
        let b = buckets
            .get_mut(bucket)
            .ok_or_else(|| StoreError::NoSuchBucket(bucket.to_string()))?;

        // Deleting a missing key succeeds, like the real API.
        b.objects.remove(key);
        Ok(())
    }

    async fn delete_prefix(&self, bucket: &str, prefix: &str) -> Result<usize, StoreError> {
        let mut buckets = self.buckets.write().await;
        let b = buckets
            .get_mut(bucket)
            .ok_or_else(|| StoreError::NoSuchBucket(bucket.to_string()))?;

        let doomed: Vec<String> = b
            .objects
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect();
        for key in &doomed {
            b.objects.remove(key);
        }
        Ok(doomed.len())
    }

    async fn check(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
