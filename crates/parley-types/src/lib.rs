//! Shared types and constants for the Parley platform.
//!
//! This crate provides the foundational types used across all Parley
//! crates: the message role model, the character catalog entry, and the
//! per-user session settings with their value-typed defaults.
//!
//! No crate in the workspace depends on anything *except* `parley-types`
//! for cross-cutting type definitions. This keeps the dependency graph
//! clean and prevents circular dependencies.

use serde::{Deserialize, Serialize};

/// The author of a conversation turn.
///
/// Stored as lowercase text in the message log and sent verbatim as the
/// `role` field of chat-completion requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// A system instruction (persona text).
    System,
    /// The human participant.
    User,
    /// The model's reply.
    Assistant,
}

impl Role {
    /// Returns the lowercase wire/storage label for this role.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }

    /// Attempts to parse a storage label back into a `Role`.
    ///
    /// Returns `None` for anything other than the three known labels.
    pub fn parse(label: &str) -> Option<Self> {
        match label {
            "system" => Some(Self::System),
            "user" => Some(Self::User),
            "assistant" => Some(Self::Assistant),
            _ => None,
        }
    }
}

/// A character catalog entry.
///
/// The catalog is read-only from the core's perspective: rows are seeded
/// by migration and looked up when building a roleplay persona prompt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Character {
    /// Internal database ID.
    pub id: i64,
    /// Display name.
    pub name: String,
    /// Free-form personality description.
    #[serde(rename = "trait")]
    pub trait_desc: String,
}

/// Default persona used when a user has not configured one.
pub const DEFAULT_PERSONA: &str =
    "你是一个友善的智能助手，请用简洁自然的中文回答用户的问题。";

/// Default number of recent turns supplied to the model.
pub const DEFAULT_WINDOW_SIZE: u32 = 4;

/// Per-user mutable session configuration.
///
/// A missing settings row reads as `SessionSettings::default()` — the
/// fallback is a value, not an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSettings {
    /// Persona text prepended to the model prompt as the system turn.
    pub persona_text: String,
    /// Bound on how many recent turns the history window may contain.
    pub window_size: u32,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            persona_text: DEFAULT_PERSONA.to_string(),
            window_size: DEFAULT_WINDOW_SIZE,
        }
    }
}
