//! The roleplay chat flow.

use crate::error::AssistantError;
use crate::llm::{ChatBackend, ChatMessage, ROLEPLAY_SAMPLING};
use crate::persona;
use parley_db::DbPool;
use parley_store::{conversation, settings, window, StoreError, StoredMessage};
use parley_types::{Character, Role, SessionSettings};

/// Spoken/shown when the model service is unreachable or errors out.
pub const FALLBACK_REPLY: &str = "抱歉，我遇到了一些技术问题，请稍后再试。";

/// Spoken/shown when the model answers with nothing usable.
pub const EMPTY_REPLY: &str = "嗯……我暂时不知道该怎么回答。";

/// Upper bound on how many stored messages one turn ever fetches; the
/// windower applies the user's actual bound on top.
const HISTORY_FETCH_LIMIT: usize = 50;

/// Runs one chat turn end to end: settings → windowed history → model →
/// persisted user/assistant turns.
///
/// With a `character`, the system turn is that character's roleplay
/// prompt; otherwise it is the user's configured persona. Model failure
/// degrades to [`FALLBACK_REPLY`] instead of failing the turn, and the
/// exchange is recorded either way.
pub async fn respond(
    pool: &DbPool,
    backend: &dyn ChatBackend,
    user_id: &str,
    character: Option<&Character>,
    user_message: &str,
) -> Result<String, AssistantError> {
    if user_message.trim().is_empty() {
        return Err(AssistantError::Store(StoreError::Validation {
            field: "user_message",
            reason: "message content must not be empty".to_string(),
        }));
    }

    let (settings, history) = load_context(pool, user_id).await?;

    let persona = match character {
        Some(character) => persona::roleplay_prompt(character),
        None => settings.persona_text.clone(),
    };
    let messages = build_messages(&persona, &settings, &history, user_message);

    let reply = match backend.chat(&messages, ROLEPLAY_SAMPLING).await {
        Ok(text) => text,
        Err(AssistantError::MalformedReply(reason)) => {
            tracing::warn!(reason, "model returned an unusable reply");
            EMPTY_REPLY.to_string()
        }
        Err(e) => {
            tracing::error!(error = %e, "chat completion failed, using fallback reply");
            FALLBACK_REPLY.to_string()
        }
    };

    record_exchange(pool, user_id, user_message, &reply).await?;
    Ok(reply)
}

/// Fetches the user's settings and recent history on the blocking pool.
pub(crate) async fn load_context(
    pool: &DbPool,
    user_id: &str,
) -> Result<(SessionSettings, Vec<StoredMessage>), AssistantError> {
    let pool = pool.clone();
    let user_id = user_id.to_string();
    tokio::task::spawn_blocking(move || -> Result<_, AssistantError> {
        let conn = pool.get()?;
        let settings = settings::get_settings(&conn, &user_id)?;
        let history = conversation::recent_messages(&conn, &user_id, HISTORY_FETCH_LIMIT)?;
        Ok((settings, history))
    })
    .await?
}

/// Appends the user turn and the reply on the blocking pool.
pub(crate) async fn record_exchange(
    pool: &DbPool,
    user_id: &str,
    user_message: &str,
    reply: &str,
) -> Result<(), AssistantError> {
    let pool = pool.clone();
    let user_id = user_id.to_string();
    let user_message = user_message.to_string();
    let reply = reply.to_string();
    tokio::task::spawn_blocking(move || -> Result<(), AssistantError> {
        let conn = pool.get()?;
        conversation::append_message(&conn, &user_id, Role::User, &user_message)?;
        conversation::append_message(&conn, &user_id, Role::Assistant, &reply)?;
        Ok(())
    })
    .await?
}

/// Assembles the prompt: system persona, then the windowed history, then
/// the new user message.
pub(crate) fn build_messages(
    persona: &str,
    settings: &SessionSettings,
    history: &[StoredMessage],
    user_message: &str,
) -> Vec<ChatMessage> {
    let windowed = window(history, settings.window_size as usize);

    let mut messages = Vec::with_capacity(windowed.len() + 2);
    messages.push(ChatMessage::new(Role::System, persona));
    for turn in windowed {
        messages.push(ChatMessage::new(turn.role, turn.content.clone()));
    }
    messages.push(ChatMessage::new(Role::User, user_message));
    messages
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::Sampling;
    use async_trait::async_trait;
    use parley_db::{create_pool, run_migrations, PoolSettings};
    use parley_store::SettingsUpdate;
    use std::sync::Mutex;

    /// Backend stub: returns a fixed outcome and records what it saw.
    struct StubBackend {
        reply: Result<String, fn() -> AssistantError>,
        seen: Mutex<Vec<ChatMessage>>,
    }

    impl StubBackend {
        fn replying(text: &str) -> Self {
            Self {
                reply: Ok(text.to_string()),
                seen: Mutex::new(Vec::new()),
            }
        }

        fn failing(make: fn() -> AssistantError) -> Self {
            Self {
                reply: Err(make),
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ChatBackend for StubBackend {
        async fn chat(
            &self,
            messages: &[ChatMessage],
            _sampling: Sampling,
        ) -> Result<String, AssistantError> {
            *self.seen.lock().unwrap() = messages.to_vec();
            match &self.reply {
                Ok(text) => Ok(text.clone()),
                Err(make) => Err(make()),
            }
        }
    }

    fn setup_pool() -> (tempfile::TempDir, DbPool) {
        let dir = tempfile::tempdir().expect("should create temp dir");
        let path = dir.path().join("assistant.db");
        let pool = create_pool(path.to_str().unwrap(), PoolSettings::default())
            .expect("pool creation should succeed");
        {
            let conn = pool.get().expect("should get a connection");
            run_migrations(&conn).expect("migrations should succeed");
        }
        (dir, pool)
    }

    #[tokio::test]
    async fn reply_is_returned_and_exchange_recorded() {
        let (_dir, pool) = setup_pool();
        let backend = StubBackend::replying("很高兴认识你。");

        let reply = respond(&pool, &backend, "alice_01", None, "你好")
            .await
            .expect("respond failed");
        assert_eq!(reply, "很高兴认识你。");

        let conn = pool.get().unwrap();
        let history = conversation::recent_messages(&conn, "alice_01", 10).unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].role, Role::User);
        assert_eq!(history[0].content, "你好");
        assert_eq!(history[1].role, Role::Assistant);
        assert_eq!(history[1].content, "很高兴认识你。");
    }

    #[tokio::test]
    async fn prompt_respects_window_size() {
        let (_dir, pool) = setup_pool();
        {
            let conn = pool.get().unwrap();
            settings::update_settings(
                &conn,
                "alice_01",
                &SettingsUpdate {
                    persona_text: None,
                    window_size: Some(2),
                },
            )
            .unwrap();
            for content in ["一", "二", "三", "四", "五"] {
                conversation::append_message(&conn, "alice_01", Role::User, content).unwrap();
            }
        }

        let backend = StubBackend::replying("好的。");
        respond(&pool, &backend, "alice_01", None, "六")
            .await
            .expect("respond failed");

        let seen = backend.seen.lock().unwrap();
        // system + 2 windowed turns + the new user message
        assert_eq!(seen.len(), 4);
        assert_eq!(seen[0].role, Role::System);
        assert_eq!(seen[1].content, "四");
        assert_eq!(seen[2].content, "五");
        assert_eq!(seen[3].content, "六");
    }

    #[tokio::test]
    async fn character_overrides_persona() {
        let (_dir, pool) = setup_pool();
        let backend = StubBackend::replying("认识你很高兴。");
        let character = Character {
            id: 7,
            name: "苏格拉底".to_string(),
            trait_desc: "古希腊哲学家".to_string(),
        };

        respond(&pool, &backend, "alice_01", Some(&character), "你是谁？")
            .await
            .expect("respond failed");

        let seen = backend.seen.lock().unwrap();
        assert!(seen[0].content.contains("你正在扮演 苏格拉底。"));
    }

    #[tokio::test]
    async fn upstream_failure_degrades_to_fallback() {
        let (_dir, pool) = setup_pool();
        let backend = StubBackend::failing(|| AssistantError::Upstream {
            status: 503,
            detail: "overloaded".to_string(),
        });

        let reply = respond(&pool, &backend, "alice_01", None, "你好")
            .await
            .expect("respond should not fail");
        assert_eq!(reply, FALLBACK_REPLY);

        // The degraded exchange is still recorded.
        let conn = pool.get().unwrap();
        let history = conversation::recent_messages(&conn, "alice_01", 10).unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[1].content, FALLBACK_REPLY);
    }

    #[tokio::test]
    async fn malformed_reply_degrades_to_empty_reply() {
        let (_dir, pool) = setup_pool();
        let backend =
            StubBackend::failing(|| AssistantError::MalformedReply("empty completion".to_string()));

        let reply = respond(&pool, &backend, "alice_01", None, "你好")
            .await
            .expect("respond should not fail");
        assert_eq!(reply, EMPTY_REPLY);
    }

    #[tokio::test]
    async fn empty_message_is_a_validation_error() {
        let (_dir, pool) = setup_pool();
        let backend = StubBackend::replying("不该到这里");

        let err = respond(&pool, &backend, "alice_01", None, "   ")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AssistantError::Store(StoreError::Validation { field: "user_message", .. })
        ));

        // Nothing recorded, model never called.
        assert!(backend.seen.lock().unwrap().is_empty());
        let conn = pool.get().unwrap();
        assert!(conversation::recent_messages(&conn, "alice_01", 10)
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn hostile_user_id_is_rejected() {
        let (_dir, pool) = setup_pool();
        let backend = StubBackend::replying("不该到这里");

        let err = respond(&pool, &backend, "alice;--", None, "你好")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AssistantError::Store(StoreError::InvalidPartition(_))
        ));
    }
}
