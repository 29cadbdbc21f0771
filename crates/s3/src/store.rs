use crate::error::StoreError;
use crate::types::{BucketInfo, BucketState, DirListing, FetchedObject};
use async_trait::async_trait;
use bytes::Bytes;

/// The operations the rest of the service performs against an
/// S3-compatible store. `S3Client` is the real implementation;
/// `MemoryStore` backs tests.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn list_buckets(&self) -> Result<Vec<BucketInfo>, StoreError>;

    async fn create_bucket(&self, bucket: &str) -> Result<(), StoreError>;

    async fn delete_bucket(&self, bucket: &str) -> Result<(), StoreError>;

    /// Lists one level of a bucket with `/` as delimiter.
    async fn list_dir(&self, bucket: &str, prefix: &str) -> Result<DirListing, StoreError>;

    /// Snapshots every object in the bucket as key → ETag. Fails as a
    /// whole if any listing page fails; a partial snapshot would be
    /// indistinguishable from mass deletion.
    async fn bucket_state(&self, bucket: &str) -> Result<BucketState, StoreError>;

    async fn get_object(&self, bucket: &str, key: &str) -> Result<FetchedObject, StoreError>;

    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Bytes,
        content_type: &str,
    ) -> Result<(), StoreError>;

    async fn delete_object(&self, bucket: &str, key: &str) -> Result<(), StoreError>;

    /// Deletes every object under `prefix`, returning how many went.
    async fn delete_prefix(&self, bucket: &str, prefix: &str) -> Result<usize, StoreError>;

    /// Connectivity probe; ListBuckets under the hood.
    async fn check(&self) -> Result<(), StoreError>;
}
