//! The voice-command flow: recognized text in, spoken reply and task
//! results out.

use crate::chat::{build_messages, load_context, record_exchange, EMPTY_REPLY, FALLBACK_REPLY};
use crate::error::AssistantError;
use crate::intent::{decode_intent, Intent};
use crate::llm::{ChatBackend, INTENT_SAMPLING};
use crate::persona;
use parley_db::DbPool;
use parley_dispatch::{Orchestrator, TaskResult};
use serde::Serialize;

/// Spoken when recognition produced no usable text.
pub const UNHEARD_REPLY: &str = "我没有听清楚，请重新说话。";

/// Outcome of one voice command exchange.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CommandOutcome {
    /// Text to hand to the speech-output channel.
    pub reply: String,
    /// One result per dispatched task; empty for plain chat.
    pub results: Vec<TaskResult>,
}

/// Handles one recognized utterance: classifies it through the model,
/// runs any resulting tasks through the orchestrator, and records the
/// exchange.
///
/// Model failure degrades to [`FALLBACK_REPLY`]; an unparseable intent
/// reply degrades to plain chat. The caller always gets something
/// speakable.
pub async fn handle_command(
    pool: &DbPool,
    backend: &dyn ChatBackend,
    orchestrator: &Orchestrator,
    user_id: &str,
    text: &str,
) -> Result<CommandOutcome, AssistantError> {
    if text.trim().is_empty() {
        return Ok(CommandOutcome {
            reply: UNHEARD_REPLY.to_string(),
            results: Vec::new(),
        });
    }

    let (settings, history) = load_context(pool, user_id).await?;
    let messages = build_messages(persona::intent_prompt(), &settings, &history, text);

    let outcome = match backend.chat(&messages, INTENT_SAMPLING).await {
        Ok(raw) => match decode_intent(&raw) {
            Intent::Chat(reply) => CommandOutcome {
                reply: non_empty(reply),
                results: Vec::new(),
            },
            Intent::Command { tasks, reply, .. } => {
                let results = orchestrator.execute_sequence(tasks).await;
                let reply = spoken_reply(&results, reply);
                CommandOutcome { reply, results }
            }
        },
        Err(e) => {
            tracing::error!(error = %e, "intent classification failed, using fallback reply");
            CommandOutcome {
                reply: FALLBACK_REPLY.to_string(),
                results: Vec::new(),
            }
        }
    };

    record_exchange(pool, user_id, text, &outcome.reply).await?;
    Ok(outcome)
}

/// Picks the text to speak: a lone textual task result speaks for
/// itself, anything else falls back to the model's reply.
fn spoken_reply(results: &[TaskResult], model_reply: String) -> String {
    if let [single] = results {
        if let Some(text) = single.message.as_text() {
            return text.to_string();
        }
    }
    non_empty(model_reply)
}

fn non_empty(reply: String) -> String {
    if reply.trim().is_empty() {
        EMPTY_REPLY.to_string()
    } else {
        reply
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{ChatMessage, Sampling};
    use async_trait::async_trait;
    use parley_db::{create_pool, run_migrations, PoolSettings};
    use parley_dispatch::{DispatchConfig, Dispatcher, TaskKind, TextGenerator};
    use parley_store::conversation;
    use parley_types::Role;
    use std::sync::Arc;

    struct StubBackend {
        reply: Result<String, ()>,
    }

    #[async_trait]
    impl ChatBackend for StubBackend {
        async fn chat(
            &self,
            _messages: &[ChatMessage],
            _sampling: Sampling,
        ) -> Result<String, AssistantError> {
            match &self.reply {
                Ok(text) => Ok(text.clone()),
                Err(()) => Err(AssistantError::Upstream {
                    status: 500,
                    detail: "boom".to_string(),
                }),
            }
        }
    }

    struct StubGenerator;

    #[async_trait]
    impl TextGenerator for StubGenerator {
        async fn generate(&self, prompt: &str) -> anyhow::Result<String> {
            Ok(format!("生成: {prompt}"))
        }
        async fn summarize(&self, text: &str) -> anyhow::Result<String> {
            Ok(format!("总结: {text}"))
        }
        async fn translate(&self, text: &str, target: &str) -> anyhow::Result<String> {
            Ok(format!("{target}: {text}"))
        }
    }

    struct Fixture {
        _dir: tempfile::TempDir,
        pool: DbPool,
        orchestrator: Orchestrator,
    }

    fn setup() -> Fixture {
        let dir = tempfile::tempdir().expect("should create temp dir");
        let path = dir.path().join("command.db");
        let pool = create_pool(path.to_str().unwrap(), PoolSettings::default())
            .expect("pool creation should succeed");
        {
            let conn = pool.get().expect("should get a connection");
            run_migrations(&conn).expect("migrations should succeed");
        }
        let config = DispatchConfig {
            music_dir: dir.path().join("music"),
            player_command: "parley-test-no-such-player".to_string(),
            documents_dir: dir.path().join("docs"),
        };
        let dispatcher = Dispatcher::new(config, Arc::new(StubGenerator));
        Fixture {
            _dir: dir,
            pool,
            orchestrator: Orchestrator::new(Arc::new(dispatcher)),
        }
    }

    #[tokio::test]
    async fn empty_utterance_asks_to_repeat() {
        let f = setup();
        let backend = StubBackend {
            reply: Ok("unused".to_string()),
        };

        let outcome = handle_command(&f.pool, &backend, &f.orchestrator, "alice_01", "  ")
            .await
            .expect("handle failed");
        assert_eq!(outcome.reply, UNHEARD_REPLY);
        assert!(outcome.results.is_empty());

        // Nothing recorded for an unheard utterance.
        let conn = f.pool.get().unwrap();
        assert!(conversation::recent_messages(&conn, "alice_01", 10)
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn chat_intent_passes_reply_through() {
        let f = setup();
        let backend = StubBackend {
            reply: Ok(r#"{"intent": "chat", "response": "今天很晴朗。"}"#.to_string()),
        };

        let outcome = handle_command(&f.pool, &backend, &f.orchestrator, "alice_01", "今天天气怎么样")
            .await
            .expect("handle failed");
        assert_eq!(outcome.reply, "今天很晴朗。");
        assert!(outcome.results.is_empty());
    }

    #[tokio::test]
    async fn command_intent_dispatches_and_speaks_task_message() {
        let f = setup();
        let backend = StubBackend {
            reply: Ok(r#"{
                "intent": "music",
                "action": "play",
                "response": "好的，马上播放。"
            }"#
            .to_string()),
        };

        let outcome = handle_command(&f.pool, &backend, &f.orchestrator, "alice_01", "放点音乐")
            .await
            .expect("handle failed");
        // The music directory is empty, so the task's own message wins.
        assert_eq!(outcome.reply, "未找到音乐文件");
        assert_eq!(outcome.results.len(), 1);
        assert!(!outcome.results[0].success);
        assert_eq!(outcome.results[0].task.kind, TaskKind::Music);
    }

    #[tokio::test]
    async fn multi_step_sequence_keeps_model_reply() {
        let f = setup();
        let backend = StubBackend {
            reply: Ok(r#"{
                "intent": "task",
                "response": "两件事都安排好了。",
                "parameters": {
                    "tasks": [
                        {"type": "file", "action": "create", "parameters": {"path": "a.txt", "content": "一"}},
                        {"type": "text", "parameters": {"prompt": "写一句诗"}}
                    ]
                }
            }"#
            .to_string()),
        };

        let outcome = handle_command(&f.pool, &backend, &f.orchestrator, "alice_01", "先建文件再写诗")
            .await
            .expect("handle failed");
        assert_eq!(outcome.results.len(), 2);
        assert!(outcome.results[0].success);
        assert!(outcome.results[1].success);
        // More than one result: the model's own reply is spoken.
        assert_eq!(outcome.reply, "两件事都安排好了。");
    }

    #[tokio::test]
    async fn unparseable_reply_becomes_chat() {
        let f = setup();
        let backend = StubBackend {
            reply: Ok("抱歉我只想聊聊天。".to_string()),
        };

        let outcome = handle_command(&f.pool, &backend, &f.orchestrator, "alice_01", "随便说说")
            .await
            .expect("handle failed");
        assert_eq!(outcome.reply, "抱歉我只想聊聊天。");
        assert!(outcome.results.is_empty());
    }

    #[tokio::test]
    async fn upstream_failure_degrades_to_fallback() {
        let f = setup();
        let backend = StubBackend { reply: Err(()) };

        let outcome = handle_command(&f.pool, &backend, &f.orchestrator, "alice_01", "放点音乐")
            .await
            .expect("handle should not fail");
        assert_eq!(outcome.reply, FALLBACK_REPLY);
        assert!(outcome.results.is_empty());
    }

    #[tokio::test]
    async fn exchange_is_recorded() {
        let f = setup();
        let backend = StubBackend {
            reply: Ok(r#"{"intent": "chat", "response": "你好。"}"#.to_string()),
        };

        handle_command(&f.pool, &backend, &f.orchestrator, "alice_01", "你好")
            .await
            .expect("handle failed");

        let conn = f.pool.get().unwrap();
        let history = conversation::recent_messages(&conn, "alice_01", 10).unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].role, Role::User);
        assert_eq!(history[0].content, "你好");
        assert_eq!(history[1].role, Role::Assistant);
        assert_eq!(history[1].content, "你好。");
    }
}
