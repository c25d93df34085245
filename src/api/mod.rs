pub mod client;
pub mod error;
pub mod queue;
pub mod transport;

pub use client::{ApiClient, Fetched, Freshness};
pub use error::ApiError;
