//! v001: the `secrets` table, one encrypted value per (service, slot).

pub(crate) const UP_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS secrets (
    service     TEXT NOT NULL,                -- namespace, e.g. com.whatEat.auth
    slot        TEXT NOT NULL,                -- stable slot key
    value       BLOB NOT NULL,                -- nonce || XChaCha20-Poly1305 ciphertext
    updated_at  INTEGER NOT NULL DEFAULT (strftime('%s', 'now')),
    PRIMARY KEY (service, slot)
);
"#;
