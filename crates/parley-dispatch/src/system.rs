//! Host system operations: info queries, application launching, and
//! delayed reminders.

use crate::task::{TaskError, TaskOutput};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::process::{Command, Stdio};
use std::sync::Mutex;
use std::time::Duration;

/// A scheduled reminder, kept for listing until the process exits.
#[derive(Debug, Clone, PartialEq)]
pub struct Reminder {
    /// What to remind about.
    pub message: String,
    /// Delay from creation, in minutes.
    pub delay_minutes: u64,
    /// When the reminder was created.
    pub created_at: DateTime<Utc>,
}

#[derive(Default)]
struct ReminderBook {
    counter: u64,
    entries: Vec<(String, Reminder)>,
}

/// Host system task handlers.
///
/// The reminder registry is per-instance state, scoped to the dispatcher
/// that owns it — not process-wide.
#[derive(Default)]
pub struct SystemTasks {
    reminders: Mutex<ReminderBook>,
}

impl SystemTasks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Collects a snapshot of host state as a key/value table.
    pub fn info(&self) -> Result<TaskOutput, TaskError> {
        use sysinfo::{Disks, System};

        let mut sys = System::new_all();
        sys.refresh_all();

        let mut table = BTreeMap::new();
        table.insert(
            "操作系统".to_string(),
            System::name().unwrap_or_else(|| "unknown".to_string()),
        );
        table.insert(
            "系统版本".to_string(),
            System::os_version().unwrap_or_else(|| "unknown".to_string()),
        );
        table.insert(
            "处理器".to_string(),
            sys.cpus()
                .first()
                .map(|c| c.brand().to_string())
                .unwrap_or_else(|| std::env::consts::ARCH.to_string()),
        );

        let total = sys.total_memory();
        let memory_percent = if total == 0 {
            0.0
        } else {
            sys.used_memory() as f64 / total as f64 * 100.0
        };
        table.insert("内存使用率".to_string(), format!("{memory_percent:.1}%"));
        table.insert(
            "CPU使用率".to_string(),
            format!("{:.1}%", sys.global_cpu_usage()),
        );

        let disks = Disks::new_with_refreshed_list();
        let (disk_total, disk_available) = disks
            .iter()
            .fold((0u64, 0u64), |(total, available), disk| {
                (total + disk.total_space(), available + disk.available_space())
            });
        let disk_percent = if disk_total == 0 {
            0.0
        } else {
            (disk_total - disk_available) as f64 / disk_total as f64 * 100.0
        };
        table.insert("磁盘使用率".to_string(), format!("{disk_percent:.1}%"));

        Ok(TaskOutput::Table(table))
    }

    /// Launches one of the supported applications by its Chinese name.
    pub fn open_application(&self, app_name: &str) -> Result<TaskOutput, TaskError> {
        let (program, args) = application_command(app_name)
            .ok_or_else(|| TaskError::UnknownApplication(app_name.to_string()))?;

        Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| TaskError::LaunchFailed(e.to_string()))?;

        tracing::info!(app = app_name, program, "application launched");
        Ok(TaskOutput::Text(format!("正在打开{app_name}")))
    }

    /// Schedules a reminder that fires after `delay_minutes`.
    ///
    /// The notification is emitted through the log; callers that want a
    /// richer channel can watch the registry. Must run inside a tokio
    /// runtime.
    pub fn set_reminder(
        &self,
        message: &str,
        delay_minutes: u64,
    ) -> Result<TaskOutput, TaskError> {
        if delay_minutes == 0 {
            return Err(TaskError::Reminder("提醒时间必须大于0分钟".to_string()));
        }

        let mut book = self
            .reminders
            .lock()
            .map_err(|_| TaskError::Reminder("提醒注册表已损坏".to_string()))?;
        book.counter += 1;
        let id = format!("reminder_{}", book.counter);
        book.entries.push((
            id.clone(),
            Reminder {
                message: message.to_string(),
                delay_minutes,
                created_at: Utc::now(),
            },
        ));
        drop(book);

        let text = message.to_string();
        let fire_id = id.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(delay_minutes * 60)).await;
            tracing::info!(id = fire_id, message = %text, "提醒");
        });

        Ok(TaskOutput::Text(format!(
            "提醒已设置: {delay_minutes}分钟后提醒 - {message}"
        )))
    }

    /// Snapshot of all scheduled reminders, in creation order.
    pub fn reminders(&self) -> Vec<(String, Reminder)> {
        self.reminders
            .lock()
            .map(|book| book.entries.clone())
            .unwrap_or_default()
    }
}

/// Per-platform launch commands for the supported application names.
fn application_command(app_name: &str) -> Option<(&'static str, &'static [&'static str])> {
    let command = if cfg!(target_os = "windows") {
        match app_name {
            "浏览器" => ("cmd", &["/C", "start", "chrome"] as &[&str]),
            "记事本" => ("notepad", &[] as &[&str]),
            "文件管理器" => ("explorer", &[] as &[&str]),
            "计算器" => ("calc", &[] as &[&str]),
            "终端" => ("cmd", &[] as &[&str]),
            _ => return None,
        }
    } else if cfg!(target_os = "macos") {
        match app_name {
            "浏览器" => ("open", &["-a", "Safari"] as &[&str]),
            "记事本" => ("open", &["-a", "TextEdit"] as &[&str]),
            "文件管理器" => ("open", &["-a", "Finder"] as &[&str]),
            "计算器" => ("open", &["-a", "Calculator"] as &[&str]),
            "终端" => ("open", &["-a", "Terminal"] as &[&str]),
            _ => return None,
        }
    } else {
        match app_name {
            "浏览器" => ("xdg-open", &["https://www.baidu.com"] as &[&str]),
            "记事本" => ("gedit", &[] as &[&str]),
            "文件管理器" => ("nautilus", &[] as &[&str]),
            "计算器" => ("gnome-calculator", &[] as &[&str]),
            "终端" => ("gnome-terminal", &[] as &[&str]),
            _ => return None,
        }
    };
    Some(command)
}
