//! The task dispatcher: a total function from [`Task`] to [`TaskResult`].

use crate::file::FileTasks;
use crate::music::MusicPlayer;
use crate::system::SystemTasks;
use crate::task::{Task, TaskError, TaskKind, TaskOutput, TaskResult};
use crate::text::TextGenerator;
use std::path::PathBuf;
use std::sync::Arc;

/// Filesystem and player configuration for the task handlers.
#[derive(Debug, Clone)]
pub struct DispatchConfig {
    /// Directory searched for playable music files.
    pub music_dir: PathBuf,
    /// External binary used for audio playback.
    pub player_command: String,
    /// Base directory for relative document paths.
    pub documents_dir: PathBuf,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            music_dir: PathBuf::from("Music"),
            player_command: "mpv".to_string(),
            documents_dir: PathBuf::from("Documents"),
        }
    }
}

/// Routes tasks to their handlers by exact `(kind, action)` match.
///
/// `dispatch` never fails: unknown actions, missing parameters, and every
/// handler error come back as `TaskResult { success: false, .. }` so a
/// caller holding a sequence of tasks always gets one result per task.
pub struct Dispatcher {
    music: MusicPlayer,
    files: FileTasks,
    system: SystemTasks,
    text: Arc<dyn TextGenerator>,
}

impl Dispatcher {
    pub fn new(config: DispatchConfig, text: Arc<dyn TextGenerator>) -> Self {
        Self {
            music: MusicPlayer::new(config.music_dir, config.player_command),
            files: FileTasks::new(config.documents_dir),
            system: SystemTasks::new(),
            text,
        }
    }

    /// Runs one task to completion and reports the outcome.
    pub async fn dispatch(&self, task: Task) -> TaskResult {
        match self.run(&task).await {
            Ok(output) => TaskResult::ok(task, output),
            Err(e) => {
                tracing::warn!(kind = ?task.kind, action = task.action(), error = %e, "task failed");
                TaskResult::fail(task, e.to_string())
            }
        }
    }

    /// Read access to the system handlers (reminder registry).
    pub fn system(&self) -> &SystemTasks {
        &self.system
    }

    async fn run(&self, task: &Task) -> Result<TaskOutput, TaskError> {
        let action = task.action();
        match task.kind {
            TaskKind::Music => match action {
                "play" => self.music.play(task.param_str("path")),
                "stop" => self.music.stop(),
                "pause" => self.music.pause(),
                "resume" => self.music.resume(),
                other => Err(unsupported(task.kind, other)),
            },
            TaskKind::File => {
                let path = || {
                    task.param_str("path")
                        .ok_or(TaskError::MissingParameter("path"))
                };
                let content = task.param_str("content").unwrap_or_default();
                match action {
                    "create" => self.files.create(path()?, content),
                    "read" => self.files.read(path()?),
                    "write" => self.files.write(path()?, content),
                    other => Err(unsupported(task.kind, other)),
                }
            }
            TaskKind::Text => {
                let prompt = task
                    .param_str("prompt")
                    .ok_or(TaskError::MissingParameter("prompt"))?;
                let generated = match action {
                    "generate" => self.text.generate(prompt).await,
                    "summarize" => self.text.summarize(prompt).await,
                    "translate" => {
                        let target = task.param_str("target_language").unwrap_or("英文");
                        self.text.translate(prompt, target).await
                    }
                    other => return Err(unsupported(task.kind, other)),
                };
                generated
                    .map(TaskOutput::Text)
                    .map_err(|e| TaskError::TextGeneration(e.to_string()))
            }
            TaskKind::System => match action {
                "info" => self.system.info(),
                "open_app" => {
                    let app_name = task
                        .param_str("app_name")
                        .ok_or(TaskError::MissingParameter("app_name"))?;
                    self.system.open_application(app_name)
                }
                "reminder" => {
                    let message = task
                        .param_str("message")
                        .ok_or(TaskError::MissingParameter("message"))?;
                    let delay = task.param_u64("delay_minutes").unwrap_or(5);
                    self.system.set_reminder(message, delay)
                }
                other => Err(unsupported(task.kind, other)),
            },
        }
    }
}

fn unsupported(kind: TaskKind, action: &str) -> TaskError {
    TaskError::UnsupportedAction {
        kind: kind.label(),
        action: action.to_string(),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use async_trait::async_trait;

    /// Stub generator: echoes its inputs, or fails on demand.
    pub(crate) struct StubGenerator {
        pub fail: bool,
    }

    #[async_trait]
    impl TextGenerator for StubGenerator {
        async fn generate(&self, prompt: &str) -> anyhow::Result<String> {
            if self.fail {
                anyhow::bail!("model offline");
            }
            Ok(format!("生成: {prompt}"))
        }

        async fn summarize(&self, text: &str) -> anyhow::Result<String> {
            Ok(format!("总结: {text}"))
        }

        async fn translate(&self, text: &str, target_language: &str) -> anyhow::Result<String> {
            Ok(format!("{target_language}: {text}"))
        }
    }

    pub(crate) fn test_dispatcher(dir: &std::path::Path, fail_text: bool) -> Dispatcher {
        let config = DispatchConfig {
            music_dir: dir.join("music"),
            player_command: "parley-test-no-such-player".to_string(),
            documents_dir: dir.join("docs"),
        };
        Dispatcher::new(config, Arc::new(StubGenerator { fail: fail_text }))
    }

    #[tokio::test]
    async fn music_play_with_no_files_fails_without_raising() {
        let dir = tempfile::tempdir().expect("should create temp dir");
        let dispatcher = test_dispatcher(dir.path(), false);

        let result = dispatcher
            .dispatch(Task::with_action(TaskKind::Music, "play"))
            .await;
        assert!(!result.success);
        assert_eq!(result.message.as_text(), Some("未找到音乐文件"));
    }

    #[tokio::test]
    async fn missing_action_defaults_per_kind() {
        let dir = tempfile::tempdir().expect("should create temp dir");
        let dispatcher = test_dispatcher(dir.path(), false);

        // Music with no action defaults to play — observable through the
        // play-specific failure message.
        let result = dispatcher.dispatch(Task::new(TaskKind::Music)).await;
        assert_eq!(result.message.as_text(), Some("未找到音乐文件"));

        // Text with no action defaults to generate.
        let result = dispatcher
            .dispatch(Task::new(TaskKind::Text).param("prompt", "写一首诗"))
            .await;
        assert!(result.success);
        assert_eq!(result.message.as_text(), Some("生成: 写一首诗"));
    }

    #[tokio::test]
    async fn unknown_action_reports_unsupported() {
        let dir = tempfile::tempdir().expect("should create temp dir");
        let dispatcher = test_dispatcher(dir.path(), false);

        let result = dispatcher
            .dispatch(Task::with_action(TaskKind::Music, "rewind"))
            .await;
        assert!(!result.success);
        assert_eq!(result.message.as_text(), Some("不支持的音乐操作: rewind"));
    }

    #[tokio::test]
    async fn file_create_and_read_through_dispatch() {
        let dir = tempfile::tempdir().expect("should create temp dir");
        let dispatcher = test_dispatcher(dir.path(), false);

        let result = dispatcher
            .dispatch(
                Task::with_action(TaskKind::File, "create")
                    .param("path", "todo.txt")
                    .param("content", "练习听力"),
            )
            .await;
        assert!(result.success, "create failed: {:?}", result.message);

        let result = dispatcher
            .dispatch(Task::with_action(TaskKind::File, "read").param("path", "todo.txt"))
            .await;
        assert!(result.success);
        assert_eq!(result.message.as_text(), Some("练习听力"));
    }

    #[tokio::test]
    async fn missing_required_parameter_fails_cleanly() {
        let dir = tempfile::tempdir().expect("should create temp dir");
        let dispatcher = test_dispatcher(dir.path(), false);

        let result = dispatcher
            .dispatch(Task::with_action(TaskKind::File, "read"))
            .await;
        assert!(!result.success);
        assert_eq!(result.message.as_text(), Some("缺少参数: path"));
    }

    #[tokio::test]
    async fn text_handler_converts_model_failure() {
        let dir = tempfile::tempdir().expect("should create temp dir");
        let dispatcher = test_dispatcher(dir.path(), true);

        let result = dispatcher
            .dispatch(Task::with_action(TaskKind::Text, "generate").param("prompt", "p"))
            .await;
        assert!(!result.success);
        assert_eq!(
            result.message.as_text(),
            Some("文本处理失败: model offline")
        );
    }

    #[tokio::test]
    async fn translate_defaults_target_language() {
        let dir = tempfile::tempdir().expect("should create temp dir");
        let dispatcher = test_dispatcher(dir.path(), false);

        let result = dispatcher
            .dispatch(Task::with_action(TaskKind::Text, "translate").param("prompt", "你好"))
            .await;
        assert!(result.success);
        assert_eq!(result.message.as_text(), Some("英文: 你好"));
    }

    #[tokio::test]
    async fn system_info_through_dispatch() {
        let dir = tempfile::tempdir().expect("should create temp dir");
        let dispatcher = test_dispatcher(dir.path(), false);

        let result = dispatcher.dispatch(Task::new(TaskKind::System)).await;
        assert!(result.success);
        assert!(matches!(result.message, TaskOutput::Table(_)));
    }

    #[tokio::test]
    async fn result_echoes_originating_task() {
        let dir = tempfile::tempdir().expect("should create temp dir");
        let dispatcher = test_dispatcher(dir.path(), false);

        let task = Task::with_action(TaskKind::System, "reminder")
            .param("message", "开会")
            .param("delay_minutes", 1);
        let result = dispatcher.dispatch(task.clone()).await;
        assert!(result.success);
        assert_eq!(result.task, task);
    }
}
