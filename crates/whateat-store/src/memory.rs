use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use crate::error::{Result, StoreError};
use crate::secrets::SecretStore;

/// Process-local secret store. Nothing is persisted; used by tests and
/// by hosts that manage credentials elsewhere.
#[derive(Debug, Default)]
pub struct MemorySecretStore {
    slots: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemorySecretStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.slots.lock().map(|s| s.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<String, Vec<u8>>>> {
        self.slots
            .lock()
            .map_err(|_| StoreError::BackendFault("lock poisoned".into()))
    }
}

impl SecretStore for MemorySecretStore {
    fn put(&self, slot: &str, value: &[u8]) -> Result<()> {
        let mut slots = self.lock()?;
        slots.insert(slot.to_string(), value.to_vec());
        Ok(())
    }

    fn get(&self, slot: &str) -> Result<Option<Vec<u8>>> {
        let slots = self.lock()?;
        Ok(slots.get(slot).cloned())
    }

    fn delete(&self, slot: &str) -> Result<()> {
        let mut slots = self.lock()?;
        slots.remove(slot);
        Ok(())
    }

    fn clear_all(&self) -> Result<()> {
        let mut slots = self.lock()?;
        slots.clear();
        Ok(())
    }
}
