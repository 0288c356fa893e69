//! Music playback through an external player process.
//!
//! The player binary (configurable, e.g. `mpv` or `ffplay`) is spawned
//! per track; stop kills the child, pause/resume deliver SIGSTOP/SIGCONT
//! on unix. Only one track plays at a time.

use crate::task::{TaskError, TaskOutput};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::sync::Mutex;
use walkdir::WalkDir;

/// File extensions considered playable.
const MUSIC_EXTENSIONS: &[&str] = &["mp3", "wav", "flac", "m4a", "ogg"];

#[derive(Default)]
struct PlayerState {
    child: Option<Child>,
    paused: bool,
}

/// Controls playback of local music files.
pub struct MusicPlayer {
    music_dir: PathBuf,
    player_command: String,
    state: Mutex<PlayerState>,
}

impl MusicPlayer {
    /// Creates a player over `music_dir` using `player_command` as the
    /// playback binary.
    pub fn new(music_dir: impl Into<PathBuf>, player_command: impl Into<String>) -> Self {
        Self {
            music_dir: music_dir.into(),
            player_command: player_command.into(),
            state: Mutex::new(PlayerState::default()),
        }
    }

    /// Starts playing the first discovered music file, replacing any
    /// current playback. `path` overrides the configured music directory.
    pub fn play(&self, path: Option<&str>) -> Result<TaskOutput, TaskError> {
        let dir = path.map_or_else(|| self.music_dir.clone(), PathBuf::from);

        let files = find_music_files(&dir);
        let file = files.first().ok_or(TaskError::NoMusicFiles)?;

        let child = Command::new(&self.player_command)
            .arg(file)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| TaskError::Playback(format!("无法启动播放器 {}: {e}", self.player_command)))?;

        let mut state = self.lock_state(TaskError::Playback)?;
        stop_child(&mut state);
        state.child = Some(child);
        state.paused = false;

        let name = file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| file.display().to_string());
        tracing::info!(file = %file.display(), "music playback started");
        Ok(TaskOutput::Text(format!("正在播放: {name}")))
    }

    /// Stops playback. Idempotent: stopping an idle player succeeds.
    pub fn stop(&self) -> Result<TaskOutput, TaskError> {
        let mut state = self.lock_state(TaskError::StopPlayback)?;
        stop_child(&mut state);
        Ok(TaskOutput::Text("音乐已停止".to_string()))
    }

    /// Pauses the running player by suspending its process.
    pub fn pause(&self) -> Result<TaskOutput, TaskError> {
        let mut state = self.lock_state(TaskError::PausePlayback)?;
        let child = state
            .child
            .as_ref()
            .ok_or_else(|| TaskError::PausePlayback("没有正在播放的音乐".to_string()))?;

        signal_child(child, Signal::Suspend)
            .map_err(|e| TaskError::PausePlayback(e.to_string()))?;
        state.paused = true;
        Ok(TaskOutput::Text("音乐已暂停".to_string()))
    }

    /// Resumes a paused player.
    pub fn resume(&self) -> Result<TaskOutput, TaskError> {
        let mut state = self.lock_state(TaskError::ResumePlayback)?;
        if !state.paused {
            return Err(TaskError::ResumePlayback("音乐未处于暂停状态".to_string()));
        }
        let child = state
            .child
            .as_ref()
            .ok_or_else(|| TaskError::ResumePlayback("没有正在播放的音乐".to_string()))?;

        signal_child(child, Signal::Resume)
            .map_err(|e| TaskError::ResumePlayback(e.to_string()))?;
        state.paused = false;
        Ok(TaskOutput::Text("音乐已恢复".to_string()))
    }

    fn lock_state<F>(&self, wrap: F) -> Result<std::sync::MutexGuard<'_, PlayerState>, TaskError>
    where
        F: FnOnce(String) -> TaskError,
    {
        self.state
            .lock()
            .map_err(|_| wrap("播放器状态已损坏".to_string()))
    }
}

impl Drop for MusicPlayer {
    fn drop(&mut self) {
        if let Ok(mut state) = self.state.lock() {
            stop_child(&mut state);
        }
    }
}

fn stop_child(state: &mut PlayerState) {
    if let Some(mut child) = state.child.take() {
        // A paused child never exits; resume it so the kill lands.
        if state.paused {
            let _ = signal_child(&child, Signal::Resume);
        }
        let _ = child.kill();
        let _ = child.wait();
    }
    state.paused = false;
}

/// Recursively discovers playable files under `dir`, sorted by path so
/// the pick is deterministic.
fn find_music_files(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .follow_links(false)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| {
            entry
                .path()
                .extension()
                .and_then(|ext| ext.to_str())
                .map(|ext| {
                    let ext = ext.to_ascii_lowercase();
                    MUSIC_EXTENSIONS.iter().any(|known| *known == ext)
                })
                .unwrap_or(false)
        })
        .map(|entry| entry.into_path())
        .collect();
    files.sort();
    files
}

enum Signal {
    Suspend,
    Resume,
}

#[cfg(unix)]
fn signal_child(child: &Child, signal: Signal) -> std::io::Result<()> {
    let sig = match signal {
        Signal::Suspend => libc::SIGSTOP,
        Signal::Resume => libc::SIGCONT,
    };
    // Safety: plain kill(2) on a pid we spawned and still own.
    let rc = unsafe { libc::kill(child.id() as libc::pid_t, sig) };
    if rc == 0 {
        Ok(())
    } else {
        Err(std::io::Error::last_os_error())
    }
}

#[cfg(not(unix))]
fn signal_child(_child: &Child, _signal: Signal) -> std::io::Result<()> {
    Err(std::io::Error::new(
        std::io::ErrorKind::Unsupported,
        "当前系统不支持暂停播放器进程",
    ))
}
