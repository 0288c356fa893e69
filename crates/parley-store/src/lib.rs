//! Per-user conversation persistence and session state for Parley.
//!
//! Implements the conversation store (append-only per-user message log),
//! the session settings store (persona text and history window size), the
//! pure history windower, and read-only character catalog lookups.
//!
//! All users share one `messages` table; a user's conversation partition
//! is the `user_id` filter predicate over it, backed by the
//! `(user_id, id)` index. The user id doubles as the partition key and is
//! validated against a strict allow-list before any storage access, so a
//! partition key can never alter the shape of a query.
//!
//! Every operation is a single synchronous statement against the given
//! connection: when a call returns `Ok`, the write is durable; when it
//! returns `Err`, the operation did not happen.

use thiserror::Error;

pub mod catalog;
pub mod conversation;
pub mod settings;
pub mod window;

pub use conversation::{partition_key, StoredMessage};
pub use settings::SettingsUpdate;
pub use window::window;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The partition key derived from a user id failed the allow-list
    /// check. Never silently coerced; the operation is rejected before
    /// any storage access.
    #[error("invalid conversation partition for user id {0:?}: only ASCII letters, digits and '_' are allowed")]
    InvalidPartition(String),

    /// Caller input rejected before touching storage.
    #[error("invalid {field}: {reason}")]
    Validation {
        /// Name of the offending input field.
        field: &'static str,
        /// Human-readable rejection reason.
        reason: String,
    },

    /// The persistence layer failed; the operation must be considered
    /// not done.
    #[error("storage unavailable: {0}")]
    Storage(#[from] rusqlite::Error),
}
