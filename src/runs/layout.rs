// Filesystem layout for training logs
//
// <base>/train/train_logs/<title>.log   stdout/stderr of the training process
// <base>/train/tb_logs/<username>/      TensorBoard event files, one dir per owner

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

const TRAIN_DIR: &str = "train";
const TRAIN_LOGS_DIR: &str = "train_logs";
const TB_LOGS_DIR: &str = "tb_logs";

/// Maps run titles and owners to log paths under a configured base directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogLayout {
    base_dir: PathBuf,
}

impl LogLayout {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Directory holding one `<title>.log` per run
    pub fn train_logs_dir(&self) -> PathBuf {
        self.base_dir.join(TRAIN_DIR).join(TRAIN_LOGS_DIR)
    }

    /// Directory holding one subdirectory per owner
    pub fn tb_logs_dir(&self) -> PathBuf {
        self.base_dir.join(TRAIN_DIR).join(TB_LOGS_DIR)
    }

    /// Log file for a run title. Pure path computation, the file may not exist.
    pub fn log_file_path(&self, title: &str) -> PathBuf {
        self.train_logs_dir().join(format!("{}.log", title))
    }

    pub fn tensorboard_log_directory(&self, username: &str) -> PathBuf {
        self.tb_logs_dir().join(username)
    }

    /// Create both log roots
    pub fn ensure_dirs(&self) -> io::Result<()> {
        for dir in [self.train_logs_dir(), self.tb_logs_dir()] {
            fs::create_dir_all(&dir)?;
            tracing::debug!(path = %dir.display(), "Log directory ready");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_log_file_path() {
        let layout = LogLayout::new("/srv/app");
        assert_eq!(
            layout.log_file_path("exp1"),
            PathBuf::from("/srv/app/train/train_logs/exp1.log")
        );
    }

    #[test]
    fn test_tensorboard_directory() {
        let layout = LogLayout::new("/srv/app");
        assert_eq!(
            layout.tensorboard_log_directory("alice"),
            PathBuf::from("/srv/app/train/tb_logs/alice")
        );
    }

    #[test]
    fn test_paths_do_not_touch_disk() {
        let temp_dir = TempDir::new().unwrap();
        let layout = LogLayout::new(temp_dir.path());

        let path = layout.log_file_path("never-run");
        assert!(!path.exists());
        assert!(!layout.train_logs_dir().exists());
    }

    #[test]
    fn test_ensure_dirs() {
        let temp_dir = TempDir::new().unwrap();
        let layout = LogLayout::new(temp_dir.path());

        layout.ensure_dirs().unwrap();
        assert!(layout.train_logs_dir().is_dir());
        assert!(layout.tb_logs_dir().is_dir());

        // Second call is a no-op
        layout.ensure_dirs().unwrap();
    }
}
