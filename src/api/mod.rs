//! API layer: transport abstraction, error taxonomy, and the dispatching
//! client that every feature flow goes through.

pub mod client;
pub mod error;
pub mod transport;

pub use client::ApiClient;
pub use error::{ApiError, ErrorBody};
