//! Schema versions of the secret database, tracked in `PRAGMA user_version`.

pub mod v001_initial;

use rusqlite::Connection;

use crate::error::{Result, StoreError};

/// `(version, name, sql)` in ascending version order. Append to add a
/// schema change; never edit a shipped entry.
const MIGRATIONS: &[(u32, &str, &str)] = &[(1, "secrets_table", v001_initial::UP_SQL)];

/// Bring the schema up to the newest version. Each step runs in its own
/// transaction together with its `user_version` bump.
pub fn run_migrations(conn: &Connection) -> Result<()> {
    let applied: u32 = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;

    for &(version, name, sql) in MIGRATIONS.iter().filter(|(v, _, _)| *v > applied) {
        tracing::info!(version, name, "applying secret store migration");
        conn.execute_batch(&format!(
            "BEGIN;\n{}\nPRAGMA user_version = {};\nCOMMIT;",
            sql, version
        ))
        .map_err(|e| {
            let _ = conn.execute_batch("ROLLBACK;");
            StoreError::Migration(format!("{} (v{}): {}", name, version, e))
        })?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_database_reaches_latest_version() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();

        let version: u32 = conn
            .pragma_query_value(None, "user_version", |row| row.get(0))
            .unwrap();
        assert_eq!(version, MIGRATIONS.last().map(|m| m.0).unwrap());

        let columns: Vec<String> = conn
            .prepare("SELECT name FROM pragma_table_info('secrets')")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<rusqlite::Result<_>>()
            .unwrap();
        assert_eq!(columns, vec!["service", "slot", "value", "updated_at"]);
    }

    #[test]
    fn test_versions_are_ascending() {
        assert!(MIGRATIONS.windows(2).all(|w| w[0].0 < w[1].0));
    }
}
