//! # whateat-client
//!
//! Client core of the whatEat app: Sign in with Apple session handling,
//! daily suggestions, saved recipes, the recipe editor and cover photo
//! uploads. Each store publishes its state through a `tokio::sync::watch`
//! channel for the UI layer to observe.

pub mod auth;
pub mod client;
pub mod config;
pub mod editor;
pub mod error;
pub mod home;
pub mod recipes;
pub mod saved;
pub mod session;
pub mod uploader;

use tracing_subscriber::{fmt, EnvFilter};

pub use auth::{AccessTokenProvider, AppleCredential, AuthManager, AuthSnapshot, AuthState};
pub use client::WhatEatClient;
pub use config::ClientConfig;
pub use editor::{CoverPhoto, DraftLine, EditorState, RecipeDraft, RecipeEditor};
pub use error::{AuthError, ClientError, Result, UploadError};
pub use home::{HomeState, HomeSuggestions};
pub use recipes::RecipesApi;
pub use saved::{SavedRecipesState, SavedRecipesStore};
pub use uploader::CoverImageUploader;

/// Install the global `tracing` subscriber. `RUST_LOG` overrides the
/// default filter.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new("whateat_client=debug,whateat_net=info,whateat_store=info,warn")
    });

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();
}
