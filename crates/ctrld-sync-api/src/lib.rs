pub mod client;
pub mod executor;
pub mod fetcher;
pub mod responses;

pub use client::{ControlDClient, DEFAULT_API_BASE};
pub use executor::{HTTP_TIMEOUT, RequestExecutor, http_client};
pub use fetcher::HttpDefinitionSource;
