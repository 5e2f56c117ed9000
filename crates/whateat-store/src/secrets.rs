//! Durable key/value secret storage, namespaced by service.

use std::path::Path;

use rusqlite::{params, OptionalExtension};

use crate::crypto::{self, SymmetricKey};
use crate::database::{self, Database};
use crate::error::{Result, StoreError};

/// Fixed slots used by the auth layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SecretSlot {
    AppleUserIdentifier,
    AppleUserEmail,
    AppleUserFullName,
    AccessToken,
    RefreshToken,
    ExpiresAt,
}

impl SecretSlot {
    pub const ALL: [SecretSlot; 6] = [
        SecretSlot::AppleUserIdentifier,
        SecretSlot::AppleUserEmail,
        SecretSlot::AppleUserFullName,
        SecretSlot::AccessToken,
        SecretSlot::RefreshToken,
        SecretSlot::ExpiresAt,
    ];

    pub fn key(self) -> &'static str {
        match self {
            SecretSlot::AppleUserIdentifier => "appleUserIdentifier",
            SecretSlot::AppleUserEmail => "appleUserEmail",
            SecretSlot::AppleUserFullName => "appleUserFullName",
            SecretSlot::AccessToken => "accessToken",
            SecretSlot::RefreshToken => "refreshToken",
            SecretSlot::ExpiresAt => "expiresAt",
        }
    }
}

/// A namespaced secret store. Writes overwrite; reading a missing slot is
/// `Ok(None)`.
pub trait SecretStore: Send + Sync {
    fn put(&self, slot: &str, value: &[u8]) -> Result<()>;
    fn get(&self, slot: &str) -> Result<Option<Vec<u8>>>;
    fn delete(&self, slot: &str) -> Result<()>;
    /// Remove every slot in this store's namespace.
    fn clear_all(&self) -> Result<()>;
}

/// Typed helpers over any [`SecretStore`].
pub trait SecretStoreExt: SecretStore {
    fn put_string(&self, slot: SecretSlot, value: &str) -> Result<()> {
        self.put(slot.key(), value.as_bytes())
    }

    fn get_string(&self, slot: SecretSlot) -> Result<Option<String>> {
        self.get(slot.key())?
            .map(|bytes| String::from_utf8(bytes).map_err(|_| StoreError::InvalidUtf8))
            .transpose()
    }

    fn delete_slot(&self, slot: SecretSlot) -> Result<()> {
        self.delete(slot.key())
    }
}

impl<T: SecretStore + ?Sized> SecretStoreExt for T {}

// ---------------------------------------------------------------------------
// SQLite backend
// ---------------------------------------------------------------------------

/// Secrets in SQLite, encrypted with a key derived from the device key and
/// the service name.
pub struct SqliteSecretStore {
    db: Database,
    service: String,
    key: SymmetricKey,
}

impl SqliteSecretStore {
    /// Open the store in the platform data directory.
    pub fn open_default(service: &str) -> Result<Self> {
        Self::open_in(&database::default_data_dir()?, service)
    }

    /// Open the store in `data_dir`, creating the database and device key
    /// if needed.
    pub fn open_in(data_dir: &Path, service: &str) -> Result<Self> {
        let db = Database::open_in(data_dir)?;
        let device_key = crypto::load_or_create_device_key(data_dir)?;
        Ok(Self::with_database(db, service, &device_key))
    }

    pub fn with_database(db: Database, service: &str, device_key: &SymmetricKey) -> Self {
        Self {
            db,
            service: service.to_string(),
            key: crypto::derive_service_key(device_key, service),
        }
    }

    pub fn service(&self) -> &str {
        &self.service
    }
}

impl SecretStore for SqliteSecretStore {
    fn put(&self, slot: &str, value: &[u8]) -> Result<()> {
        let sealed = crypto::encrypt(&self.key, value)?;
        self.db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO secrets (service, slot, value, updated_at)
                 VALUES (?1, ?2, ?3, strftime('%s', 'now'))
                 ON CONFLICT(service, slot) DO UPDATE SET
                    value = excluded.value,
                    updated_at = excluded.updated_at",
                params![self.service, slot, sealed],
            )
        })?;
        Ok(())
    }

    fn get(&self, slot: &str) -> Result<Option<Vec<u8>>> {
        let sealed: Option<Vec<u8>> = self.db.with_conn(|conn| {
            conn.query_row(
                "SELECT value FROM secrets WHERE service = ?1 AND slot = ?2",
                params![self.service, slot],
                |row| row.get(0),
            )
            .optional()
        })?;
        sealed
            .map(|bytes| crypto::decrypt(&self.key, &bytes))
            .transpose()
    }

    fn delete(&self, slot: &str) -> Result<()> {
        self.db.with_conn(|conn| {
            conn.execute(
                "DELETE FROM secrets WHERE service = ?1 AND slot = ?2",
                params![self.service, slot],
            )
        })?;
        Ok(())
    }

    fn clear_all(&self) -> Result<()> {
        let removed = self.db.with_conn(|conn| {
            conn.execute(
                "DELETE FROM secrets WHERE service = ?1",
                params![self.service],
            )
        })?;
        tracing::debug!(service = %self.service, removed, "cleared secret store");
        Ok(())
    }
}
