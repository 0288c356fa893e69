//! The task model: what to do, and what came of it.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use thiserror::Error;

/// Kinds of operation the assistant can be asked to perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskKind {
    /// Media playback control.
    Music,
    /// Local document operations.
    File,
    /// Model-backed text work (generation, summary, translation).
    Text,
    /// Host system operations (info, applications, reminders).
    System,
}

impl TaskKind {
    /// The action assumed when a task omits one.
    pub fn default_action(self) -> &'static str {
        match self {
            Self::Music => "play",
            Self::File => "create",
            Self::Text => "generate",
            Self::System => "info",
        }
    }

    /// Attempts to parse an intent label into a kind.
    pub fn parse(label: &str) -> Option<Self> {
        match label {
            "music" => Some(Self::Music),
            "file" => Some(Self::File),
            "text" => Some(Self::Text),
            "system" => Some(Self::System),
            _ => None,
        }
    }

    /// Chinese display label, used in unsupported-action messages.
    pub fn label(self) -> &'static str {
        match self {
            Self::Music => "音乐",
            Self::File => "文件",
            Self::Text => "文本",
            Self::System => "系统",
        }
    }
}

/// A transient, structured instruction. Exists only for the duration of
/// one dispatch; never persisted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Task {
    /// What family of operation this is.
    #[serde(rename = "type")]
    pub kind: TaskKind,
    /// The concrete action. `None` or empty falls back to the kind's
    /// default action.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    /// Free-form handler parameters.
    #[serde(default)]
    pub parameters: Map<String, Value>,
}

impl Task {
    /// Creates a task with no action (the kind default applies) and no
    /// parameters.
    pub fn new(kind: TaskKind) -> Self {
        Self {
            kind,
            action: None,
            parameters: Map::new(),
        }
    }

    /// Creates a task with an explicit action.
    pub fn with_action(kind: TaskKind, action: impl Into<String>) -> Self {
        Self {
            kind,
            action: Some(action.into()),
            parameters: Map::new(),
        }
    }

    /// Adds one parameter, builder style.
    pub fn param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.parameters.insert(key.into(), value.into());
        self
    }

    /// The effective action after defaulting.
    pub fn action(&self) -> &str {
        self.action
            .as_deref()
            .filter(|a| !a.is_empty())
            .unwrap_or_else(|| self.kind.default_action())
    }

    /// String parameter lookup.
    pub fn param_str(&self, key: &str) -> Option<&str> {
        self.parameters.get(key).and_then(Value::as_str)
    }

    /// Unsigned integer parameter lookup.
    pub fn param_u64(&self, key: &str) -> Option<u64> {
        self.parameters.get(key).and_then(Value::as_u64)
    }
}

/// What a completed task has to say for itself: plain text, or a
/// key/value table (system info).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum TaskOutput {
    /// A user-facing message or produced text.
    Text(String),
    /// Structured fields, rendered as a table by the caller.
    Table(BTreeMap<String, String>),
}

impl TaskOutput {
    /// The text form, if this output is plain text.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::Table(_) => None,
        }
    }
}

/// The uniform outcome of one dispatched task. Transient, one per task,
/// in input order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaskResult {
    /// Whether the handler succeeded.
    pub success: bool,
    /// The handler's message or payload.
    pub message: TaskOutput,
    /// The originating task, echoed back for the caller.
    pub task: Task,
}

impl TaskResult {
    /// A successful result.
    pub fn ok(task: Task, message: TaskOutput) -> Self {
        Self {
            success: true,
            message,
            task,
        }
    }

    /// A failed result carrying a text description.
    pub fn fail(task: Task, message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: TaskOutput::Text(message.into()),
            task,
        }
    }
}

/// Failures a handler can produce. The dispatcher converts every variant
/// into a failed [`TaskResult`]; none of these ever reach a caller as an
/// `Err`.
#[derive(Debug, Error)]
pub enum TaskError {
    /// No playable files under the music directory.
    #[error("未找到音乐文件")]
    NoMusicFiles,

    /// Starting or controlling the player process failed.
    #[error("播放音乐失败: {0}")]
    Playback(String),

    /// Stop requested but the player could not be stopped.
    #[error("停止音乐失败: {0}")]
    StopPlayback(String),

    /// Pause requested but the player could not be paused.
    #[error("暂停音乐失败: {0}")]
    PausePlayback(String),

    /// Resume requested but the player could not be resumed.
    #[error("恢复音乐失败: {0}")]
    ResumePlayback(String),

    /// File creation failed.
    #[error("创建文件失败: {0}")]
    CreateFile(String),

    /// File read failed.
    #[error("读取文件失败: {0}")]
    ReadFile(String),

    /// File write failed.
    #[error("写入文件失败: {0}")]
    WriteFile(String),

    /// The application name is not in the supported set.
    #[error("不支持打开{0}")]
    UnknownApplication(String),

    /// Launching a supported application failed.
    #[error("打开应用失败: {0}")]
    LaunchFailed(String),

    /// Querying host state failed.
    #[error("获取系统信息失败: {0}")]
    SystemInfo(String),

    /// Scheduling a reminder failed.
    #[error("设置提醒失败: {0}")]
    Reminder(String),

    /// The language model could not complete the text task.
    #[error("文本处理失败: {0}")]
    TextGeneration(String),

    /// A required parameter was absent.
    #[error("缺少参数: {0}")]
    MissingParameter(&'static str),

    /// The `(kind, action)` combination has no handler.
    #[error("不支持的{kind}操作: {action}")]
    UnsupportedAction {
        /// Chinese kind label.
        kind: &'static str,
        /// The requested action.
        action: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_defaults_per_kind() {
        assert_eq!(Task::new(TaskKind::Music).action(), "play");
        assert_eq!(Task::new(TaskKind::File).action(), "create");
        assert_eq!(Task::new(TaskKind::Text).action(), "generate");
        assert_eq!(Task::new(TaskKind::System).action(), "info");

        // An empty action string also falls back.
        let task = Task::with_action(TaskKind::Music, "");
        assert_eq!(task.action(), "play");

        let task = Task::with_action(TaskKind::Music, "stop");
        assert_eq!(task.action(), "stop");
    }

    #[test]
    fn task_deserializes_from_intent_json() {
        let task: Task = serde_json::from_value(serde_json::json!({
            "type": "file",
            "action": "read",
            "parameters": { "path": "notes.txt" }
        }))
        .expect("should deserialize");

        assert_eq!(task.kind, TaskKind::File);
        assert_eq!(task.action(), "read");
        assert_eq!(task.param_str("path"), Some("notes.txt"));
    }

    #[test]
    fn task_deserializes_without_action_or_parameters() {
        let task: Task =
            serde_json::from_value(serde_json::json!({ "type": "music" })).expect("should deserialize");
        assert_eq!(task.kind, TaskKind::Music);
        assert_eq!(task.action(), "play");
        assert!(task.parameters.is_empty());
    }

    #[test]
    fn unknown_kind_fails_to_deserialize() {
        let result: Result<Task, _> =
            serde_json::from_value(serde_json::json!({ "type": "teleport" }));
        assert!(result.is_err());
    }

    #[test]
    fn output_serializes_untagged() {
        let text = serde_json::to_value(TaskOutput::Text("好的".to_string())).unwrap();
        assert_eq!(text, serde_json::json!("好的"));

        let mut table = BTreeMap::new();
        table.insert("操作系统".to_string(), "Linux".to_string());
        let value = serde_json::to_value(TaskOutput::Table(table)).unwrap();
        assert_eq!(value, serde_json::json!({ "操作系统": "Linux" }));
    }

    #[test]
    fn error_messages_match_feedback_strings() {
        assert_eq!(TaskError::NoMusicFiles.to_string(), "未找到音乐文件");
        assert_eq!(
            TaskError::UnsupportedAction {
                kind: TaskKind::Music.label(),
                action: "rewind".to_string()
            }
            .to_string(),
            "不支持的音乐操作: rewind"
        );
        assert_eq!(
            TaskError::UnknownApplication("画图".to_string()).to_string(),
            "不支持打开画图"
        );
    }
}
