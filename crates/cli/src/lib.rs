pub mod cli;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = "bucketwatch";
