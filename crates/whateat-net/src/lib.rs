// Typed JSON transport for the whatEat backend over reqwest.

pub mod client;
pub mod error;
pub mod failure;

pub use client::{ApiClient, Query};
pub use error::{ApiError, Result};
pub use failure::{redact_headers, FailureRecord};
