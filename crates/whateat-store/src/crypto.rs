use std::fs;
use std::io::Write;
use std::path::Path;

use chacha20poly1305::{
    aead::{Aead, KeyInit},
    XChaCha20Poly1305, XNonce,
};
use rand::RngCore;

use crate::error::{Result, StoreError};

pub const NONCE_SIZE: usize = 24;
pub const DEVICE_KEY_FILE: &str = "device.key";
const KDF_CONTEXT_SECRET_STORE: &str = "whatEat 2026 secret store v1";

pub type SymmetricKey = [u8; 32];

pub fn generate_symmetric_key() -> SymmetricKey {
    let mut key = [0u8; 32];
    rand::rngs::OsRng.fill_bytes(&mut key);
    key
}

fn generate_nonce() -> [u8; NONCE_SIZE] {
    let mut nonce = [0u8; NONCE_SIZE];
    rand::rngs::OsRng.fill_bytes(&mut nonce);
    nonce
}

// Returns nonce || ciphertext (24 bytes nonce prepended)
pub fn encrypt(key: &SymmetricKey, plaintext: &[u8]) -> Result<Vec<u8>> {
    let cipher = XChaCha20Poly1305::new(key.into());
    let nonce_bytes = generate_nonce();
    let nonce = XNonce::from_slice(&nonce_bytes);

    let ciphertext = cipher
        .encrypt(nonce, plaintext)
        .map_err(|_| StoreError::BackendFault("encryption failed".into()))?;

    let mut output = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
    output.extend_from_slice(&nonce_bytes);
    output.extend_from_slice(&ciphertext);
    Ok(output)
}

pub fn decrypt(key: &SymmetricKey, data: &[u8]) -> Result<Vec<u8>> {
    if data.len() < NONCE_SIZE {
        return Err(StoreError::BackendFault("sealed value too short".into()));
    }

    let (nonce_bytes, ciphertext) = data.split_at(NONCE_SIZE);
    let cipher = XChaCha20Poly1305::new(key.into());
    let nonce = XNonce::from_slice(nonce_bytes);

    cipher
        .decrypt(nonce, ciphertext)
        .map_err(|_| StoreError::BackendFault("sealed value did not authenticate".into()))
}

// BLAKE3 KDF with domain separation per service namespace
pub fn derive_service_key(device_key: &SymmetricKey, service: &str) -> SymmetricKey {
    let mut hasher = blake3::Hasher::new_derive_key(KDF_CONTEXT_SECRET_STORE);
    hasher.update(device_key);
    hasher.update(service.as_bytes());
    *hasher.finalize().as_bytes()
}

/// Read the hex device key from `dir`, creating it (mode 0600 on unix) on
/// first use. The key never leaves this machine.
pub fn load_or_create_device_key(dir: &Path) -> Result<SymmetricKey> {
    let path = dir.join(DEVICE_KEY_FILE);
    if path.exists() {
        let text = fs::read_to_string(&path)?;
        let bytes = hex::decode(text.trim())?;
        return bytes
            .try_into()
            .map_err(|_| StoreError::MalformedDeviceKey);
    }

    fs::create_dir_all(dir)?;
    let key = generate_symmetric_key();
    let mut file = create_private_file(&path)?;
    file.write_all(hex::encode(key).as_bytes())?;
    tracing::info!(path = %path.display(), "created device key");
    Ok(key)
}

#[cfg(unix)]
fn create_private_file(path: &Path) -> std::io::Result<fs::File> {
    use std::os::unix::fs::OpenOptionsExt;
    fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .mode(0o600)
        .open(path)
}

#[cfg(not(unix))]
fn create_private_file(path: &Path) -> std::io::Result<fs::File> {
    fs::OpenOptions::new().write(true).create_new(true).open(path)
}
