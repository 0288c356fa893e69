//! Assistant flows for the Parley platform.
//!
//! Ties the stores and the task layer to the language model: the chat
//! flow (persona + windowed history → completion → persisted turn), the
//! voice-command flow (recognized text → intent → dispatched tasks →
//! spoken reply), the OpenAI-compatible chat client, and best-effort
//! intent decoding.
//!
//! Speech itself stays outside: this crate consumes recognized text and
//! produces reply text. Upstream model failure never propagates out of a
//! flow — it degrades to a fixed user-visible fallback reply.

mod chat;
mod command;
mod error;
mod intent;
mod llm;
mod persona;

pub use chat::{respond, EMPTY_REPLY, FALLBACK_REPLY};
pub use command::{handle_command, CommandOutcome, UNHEARD_REPLY};
pub use error::AssistantError;
pub use intent::{decode_intent, Intent};
pub use llm::{ChatBackend, ChatClient, ChatMessage, LlmConfig, Sampling};
pub use persona::{intent_prompt, roleplay_prompt};
