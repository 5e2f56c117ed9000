//! # whateat-shared
//!
//! Domain models and the tolerant recipe codec shared by every whatEat crate.
//!
//! The backend is not consistent about payload shapes: field names arrive in
//! snake_case or camelCase, amounts arrive as strings or numbers, lists are
//! wrapped in a handful of different envelopes.  Everything in [`codec`]
//! normalizes those variations into the canonical [`models::Recipe`].

pub mod codec;
pub mod constants;
pub mod error;
pub mod models;
pub mod types;

pub use error::CodecError;
pub use models::*;
pub use types::{MealType, SaveSource};
