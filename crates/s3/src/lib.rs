pub mod client;
pub mod error;
pub mod memory;
pub mod sigv4;
pub mod store;
pub mod types;
pub mod xml;

pub use client::S3Client;
pub use error::StoreError;
pub use memory::MemoryStore;
pub use store::ObjectStore;
pub use types::{BucketInfo, BucketState, DirListing, FetchedObject, ObjectInfo};
