//! Read-only character catalog lookups.
//!
//! The catalog is owned by migrations; the core never writes to it.

use crate::StoreError;
use parley_types::Character;
use rusqlite::{Connection, OptionalExtension, Row};

/// Lists all characters, ordered by name.
pub fn list_characters(conn: &Connection) -> Result<Vec<Character>, StoreError> {
    let mut stmt =
        conn.prepare("SELECT id, name, trait FROM characters ORDER BY name ASC")?;

    let rows = stmt.query_map([], map_row_to_character)?;
    let mut characters = Vec::new();
    for row in rows {
        characters.push(row?);
    }
    Ok(characters)
}

/// Looks up a single character by id. Returns `None` when absent; the
/// caller decides whether that is an error.
pub fn get_character(conn: &Connection, id: i64) -> Result<Option<Character>, StoreError> {
    let character = conn
        .query_row(
            "SELECT id, name, trait FROM characters WHERE id = ?1",
            [id],
            map_row_to_character,
        )
        .optional()?;
    Ok(character)
}

fn map_row_to_character(row: &Row) -> rusqlite::Result<Character> {
    Ok(Character {
        id: row.get(0)?,
        name: row.get(1)?,
        trait_desc: row.get(2)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use parley_db::run_migrations;
    use rusqlite::Connection;

    fn setup_db() -> Connection {
        let conn = Connection::open_in_memory().expect("failed to open in-memory db");
        run_migrations(&conn).expect("failed to run migrations");
        conn
    }

    #[test]
    fn seeded_catalog_lists_by_name() {
        let conn = setup_db();

        let characters = list_characters(&conn).expect("list failed");
        assert!(characters.len() >= 3);

        let mut names: Vec<String> = characters.iter().map(|c| c.name.clone()).collect();
        let sorted = {
            let mut s = names.clone();
            s.sort();
            s
        };
        assert_eq!(names, sorted, "catalog should be name-ordered");
        names.dedup();
        assert_eq!(names.len(), characters.len());
    }

    #[test]
    fn get_character_round_trip() {
        let conn = setup_db();

        let all = list_characters(&conn).expect("list failed");
        let first = &all[0];

        let fetched = get_character(&conn, first.id)
            .expect("get failed")
            .expect("seeded character should exist");
        assert_eq!(&fetched, first);
    }

    #[test]
    fn get_character_missing_is_none() {
        let conn = setup_db();
        let missing = get_character(&conn, 9_999).expect("get failed");
        assert!(missing.is_none());
    }
}
