//! The per-user session settings store.

use crate::conversation::partition_key;
use crate::StoreError;
use parley_types::SessionSettings;
use rusqlite::{params, Connection, OptionalExtension};
use serde::Deserialize;

/// A partial settings update. `None` fields keep their prior value (or
/// the default, when no settings row exists yet).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SettingsUpdate {
    /// New persona text, if provided.
    pub persona_text: Option<String>,
    /// New history window size, if provided. Must be positive.
    pub window_size: Option<u32>,
}

/// Returns the user's session settings, falling back to
/// [`SessionSettings::default`] when no row exists. The fallback is a
/// value, not an error.
pub fn get_settings(conn: &Connection, user_id: &str) -> Result<SessionSettings, StoreError> {
    let key = partition_key(user_id)?;

    let stored = conn
        .query_row(
            "SELECT persona_text, window_size FROM user_settings WHERE user_id = ?1",
            [key],
            |row| {
                Ok(SessionSettings {
                    persona_text: row.get(0)?,
                    window_size: row.get(1)?,
                })
            },
        )
        .optional()?;

    Ok(stored.unwrap_or_default())
}

/// Upserts the provided settings fields for a user.
///
/// Runs as one statement: on first write the absent fields take their
/// defaults, on later writes they keep their stored value — no
/// read-modify-write window. A zero `window_size` is a validation error
/// rejected before any store access, leaving prior settings unchanged.
pub fn update_settings(
    conn: &Connection,
    user_id: &str,
    update: &SettingsUpdate,
) -> Result<(), StoreError> {
    let key = partition_key(user_id)?;

    if update.window_size == Some(0) {
        return Err(StoreError::Validation {
            field: "window_size",
            reason: "window size must be positive".to_string(),
        });
    }

    let defaults = SessionSettings::default();
    conn.execute(
        "INSERT INTO user_settings (user_id, persona_text, window_size)
         VALUES (?1, COALESCE(?2, ?4), COALESCE(?3, ?5))
         ON CONFLICT(user_id) DO UPDATE SET
             persona_text = COALESCE(?2, persona_text),
             window_size = COALESCE(?3, window_size),
             updated_at = datetime('now')",
        params![
            key,
            update.persona_text,
            update.window_size,
            defaults.persona_text,
            defaults.window_size,
        ],
    )?;

    tracing::debug!(user_id = key, "session settings updated");
    Ok(())
}
