//! # whateat-store
//!
//! Local secret storage for the whatEat client.
//!
//! Auth credentials live in a small SQLite database. Values are sealed with
//! XChaCha20-Poly1305 under a key derived from a per-device key file, so the
//! database alone does not reveal them. [`MemorySecretStore`] offers the same
//! contract without touching disk.

pub mod crypto;
pub mod database;
pub mod memory;
pub mod migrations;
pub mod secrets;

mod error;

pub use database::{default_data_dir, Database};
pub use error::{Result, StoreError};
pub use memory::MemorySecretStore;
pub use secrets::{SecretSlot, SecretStore, SecretStoreExt, SqliteSecretStore};
