//! Local document operations.

use crate::task::{TaskError, TaskOutput};
use std::fs;
use std::path::{Path, PathBuf};

/// Creates, reads, and writes documents. Relative paths resolve against
/// the configured documents directory; absolute paths are used as given.
pub struct FileTasks {
    documents_dir: PathBuf,
}

impl FileTasks {
    pub fn new(documents_dir: impl Into<PathBuf>) -> Self {
        Self {
            documents_dir: documents_dir.into(),
        }
    }

    fn resolve(&self, path: &str) -> PathBuf {
        let path = Path::new(path);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.documents_dir.join(path)
        }
    }

    /// Creates a file with the given content, creating parent directories
    /// as needed. An existing file is overwritten.
    pub fn create(&self, path: &str, content: &str) -> Result<TaskOutput, TaskError> {
        let target = self.resolve(path);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(|e| TaskError::CreateFile(e.to_string()))?;
        }
        fs::write(&target, content).map_err(|e| TaskError::CreateFile(e.to_string()))?;
        Ok(TaskOutput::Text(format!("文件已创建: {}", target.display())))
    }

    /// Reads a file and returns its content as the task message.
    pub fn read(&self, path: &str) -> Result<TaskOutput, TaskError> {
        let target = self.resolve(path);
        let content =
            fs::read_to_string(&target).map_err(|e| TaskError::ReadFile(e.to_string()))?;
        Ok(TaskOutput::Text(content))
    }

    /// Overwrites a file with the given content. Unlike [`create`], the
    /// parent directory must already exist.
    ///
    /// [`create`]: FileTasks::create
    pub fn write(&self, path: &str, content: &str) -> Result<TaskOutput, TaskError> {
        let target = self.resolve(path);
        fs::write(&target, content).map_err(|e| TaskError::WriteFile(e.to_string()))?;
        Ok(TaskOutput::Text(format!("文件已保存: {}", target.display())))
    }
}
