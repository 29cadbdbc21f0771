pub mod content_type;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;

pub use error::ApiError;
pub use routes::build_router;
pub use state::AppState;

pub const SERVICE_NAME: &str = "bucketwatch";
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
