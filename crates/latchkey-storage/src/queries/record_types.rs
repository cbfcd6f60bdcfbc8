// SPDX-FileCopyrightText: 2026 Latchkey Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Record categories seeded by the initial migration.

use latchkey_core::LatchkeyError;
use rusqlite::Connection;

use crate::models::RecordTypeInfo;

/// Every known record type, ordered by name.
pub fn list(conn: &Connection) -> Result<Vec<RecordTypeInfo>, LatchkeyError> {
    let mut stmt = conn
        .prepare("SELECT id, name, display_name FROM vault_types ORDER BY name")
        .map_err(LatchkeyError::storage)?;
    let rows = stmt
        .query_map([], |row| {
            Ok(RecordTypeInfo {
                id: row.get(0)?,
                name: row.get(1)?,
                display_name: row.get(2)?,
            })
        })
        .map_err(LatchkeyError::storage)?;
    rows.collect::<Result<Vec<_>, _>>()
        .map_err(LatchkeyError::storage)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeded_types_are_listed_by_name() {
        let mut conn = Connection::open_in_memory().unwrap();
        crate::migrations::run_migrations(&mut conn).unwrap();

        let names: Vec<String> = list(&conn).unwrap().into_iter().map(|t| t.name).collect();
        assert_eq!(names, vec!["email", "note", "ssh", "web"]);
    }
}
