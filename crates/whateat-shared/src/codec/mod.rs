//! Tolerant decoding of backend recipe payloads and encoding of outbound
//! requests.
//!
//! Inbound flow: JSON -> wire structs ([`wire`]) -> canonical models via
//! [`mapper`]. Envelope unwrapping for list and save responses lives in
//! [`envelopes`].

pub mod envelopes;
pub mod mapper;
pub mod payloads;
pub mod wire;

pub use envelopes::*;
pub use mapper::{
    decode_recipe, format_minutes, format_prep_time, map_ingredients, map_steps,
    meal_type_for, normalized_text, parse_minutes,
};
pub use payloads::*;
pub use wire::{RecipeData, RecipeMedia, RecipeMetadata, WireIngredient, WireStep};
