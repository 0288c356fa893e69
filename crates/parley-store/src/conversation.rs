//! The per-user conversation log.
//!
//! Messages are append-only and totally ordered within a partition by
//! `(created_at, id)`; `id` alone realizes that order because rowids are
//! assigned in insertion order.

use crate::StoreError;
use parley_types::Role;
use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};

/// A persisted conversation turn.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoredMessage {
    /// Internal database ID; also the insertion-order tiebreaker.
    pub id: i64,
    /// Owner of the partition this message belongs to.
    pub user_id: String,
    /// Author of the turn.
    pub role: Role,
    /// Message text.
    pub content: String,
    /// Creation timestamp (ISO 8601, UTC).
    pub created_at: String,
}

/// Derives the partition key for a user id.
///
/// The key is the user id itself — deterministic and injective. Ids
/// containing anything outside `[A-Za-z0-9_]` (or empty ids) are rejected
/// so a partition key can never carry query syntax, and the rejection
/// happens before any storage call.
pub fn partition_key(user_id: &str) -> Result<&str, StoreError> {
    let valid = !user_id.is_empty()
        && user_id
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_');
    if !valid {
        return Err(StoreError::InvalidPartition(user_id.to_string()));
    }
    Ok(user_id)
}

/// Idempotently registers the user's partition.
///
/// Calling this twice is equivalent to calling it once; the registration
/// survives [`clear_partition`].
pub fn ensure_partition(conn: &Connection, user_id: &str) -> Result<(), StoreError> {
    let key = partition_key(user_id)?;
    conn.execute("INSERT OR IGNORE INTO users (user_id) VALUES (?1)", [key])?;
    Ok(())
}

/// Appends one message to the user's partition, creating the partition if
/// it does not exist yet.
///
/// Empty (or whitespace-only) content is a validation error, rejected
/// before any storage access. The insert is synchronous: the returned
/// message is durable once this returns `Ok`.
pub fn append_message(
    conn: &Connection,
    user_id: &str,
    role: Role,
    content: &str,
) -> Result<StoredMessage, StoreError> {
    let key = partition_key(user_id)?;
    if content.trim().is_empty() {
        return Err(StoreError::Validation {
            field: "content",
            reason: "message content must not be empty".to_string(),
        });
    }

    ensure_partition(conn, key)?;

    let message = conn.query_row(
        "INSERT INTO messages (user_id, role, content) VALUES (?1, ?2, ?3)
         RETURNING id, user_id, role, content, created_at",
        params![key, role.as_str(), content],
        map_row_to_message,
    )?;

    tracing::debug!(
        user_id = key,
        role = role.as_str(),
        message_id = message.id,
        "message appended"
    );

    Ok(message)
}

/// Returns up to `limit` most recent messages of the user's partition in
/// chronological order (oldest first).
///
/// An unknown or empty partition yields an empty vec, not an error.
pub fn recent_messages(
    conn: &Connection,
    user_id: &str,
    limit: usize,
) -> Result<Vec<StoredMessage>, StoreError> {
    let key = partition_key(user_id)?;

    let mut stmt = conn.prepare(
        "SELECT id, user_id, role, content, created_at
         FROM messages
         WHERE user_id = ?1
         ORDER BY id DESC
         LIMIT ?2",
    )?;

    let rows = stmt.query_map(params![key, limit as i64], map_row_to_message)?;
    let mut messages = Vec::new();
    for row in rows {
        messages.push(row?);
    }
    // The query walks newest-first to honor the limit; flip back to
    // chronological order for the caller.
    messages.reverse();
    Ok(messages)
}

/// Deletes every message in the user's partition. The partition itself
/// persists for future appends. Returns the number of deleted messages.
pub fn clear_partition(conn: &Connection, user_id: &str) -> Result<usize, StoreError> {
    let key = partition_key(user_id)?;
    let deleted = conn.execute("DELETE FROM messages WHERE user_id = ?1", [key])?;
    tracing::debug!(user_id = key, deleted, "partition cleared");
    Ok(deleted)
}

fn map_row_to_message(row: &Row) -> rusqlite::Result<StoredMessage> {
    let role_label: String = row.get(2)?;
    let role = Role::parse(&role_label).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            2,
            rusqlite::types::Type::Text,
            format!("unknown message role: {role_label}").into(),
        )
    })?;

    Ok(StoredMessage {
        id: row.get(0)?,
        user_id: row.get(1)?,
        role,
        content: row.get(3)?,
        created_at: row.get(4)?,
    })
}
