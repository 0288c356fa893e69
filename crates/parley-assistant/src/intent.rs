//! Best-effort decoding of the model's intent reply.
//!
//! The model is asked for strict JSON but does not always comply. The
//! decoder tries the whole reply first, then the outermost brace span,
//! and otherwise treats the reply as plain chat — a soft fallback, so the
//! voice loop always has something to say.

use parley_dispatch::{Task, TaskKind};
use serde::Deserialize;
use serde_json::{Map, Value};

/// The raw JSON shape the intent prompt demands from the model.
#[derive(Debug, Clone, Deserialize, PartialEq)]
struct IntentReply {
    #[serde(default)]
    intent: String,
    #[serde(default)]
    action: String,
    #[serde(default)]
    parameters: Map<String, Value>,
    #[serde(default)]
    response: String,
    #[serde(default)]
    needs_confirmation: bool,
}

/// A decoded model reply.
#[derive(Debug, Clone, PartialEq)]
pub enum Intent {
    /// A structured command: the tasks to run and the reply to speak.
    Command {
        tasks: Vec<Task>,
        reply: String,
        needs_confirmation: bool,
    },
    /// No parseable command; the text is the reply itself.
    Chat(String),
}

/// Decodes a model reply into an [`Intent`].
///
/// Total: anything that does not decode into a known command becomes
/// `Intent::Chat`.
pub fn decode_intent(raw: &str) -> Intent {
    let Some(reply) = parse_reply(raw) else {
        tracing::warn!("intent reply was not JSON, treating as chat");
        return Intent::Chat(raw.trim().to_string());
    };

    let fallback_reply = if reply.response.trim().is_empty() {
        raw.trim().to_string()
    } else {
        reply.response.clone()
    };

    if reply.intent == "task" {
        // Multi-step sequence: the tasks ride in parameters.tasks.
        let tasks = reply
            .parameters
            .get("tasks")
            .and_then(|value| serde_json::from_value::<Vec<Task>>(value.clone()).ok())
            .unwrap_or_default();
        if tasks.is_empty() {
            tracing::warn!("task intent carried no decodable tasks, treating as chat");
            return Intent::Chat(fallback_reply);
        }
        return Intent::Command {
            tasks,
            reply: reply.response,
            needs_confirmation: reply.needs_confirmation,
        };
    }

    match TaskKind::parse(&reply.intent) {
        Some(kind) => {
            let action = Some(reply.action).filter(|a| !a.is_empty());
            let task = Task {
                kind,
                action,
                parameters: reply.parameters,
            };
            Intent::Command {
                tasks: vec![task],
                reply: reply.response,
                needs_confirmation: reply.needs_confirmation,
            }
        }
        // Covers "chat" and anything else the model invents.
        None => Intent::Chat(fallback_reply),
    }
}

fn parse_reply(raw: &str) -> Option<IntentReply> {
    if let Ok(reply) = serde_json::from_str(raw) {
        return Some(reply);
    }
    // The model often wraps the JSON in prose; take the outermost brace
    // span and try again.
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    if end <= start {
        return None;
    }
    serde_json::from_str(&raw[start..=end]).ok()
}
