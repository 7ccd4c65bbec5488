use crate::config::settings::{default_settings, ReviewSettings, ReviewType};
use crate::utils::error::{ReviewError, Result};
use std::path::{Path, PathBuf};
use tracing::info;

/// Filesystem layout of a review project.
#[derive(Debug, Clone)]
pub struct ProjectPaths {
    pub root: PathBuf,
}

impl ProjectPaths {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn settings_file(&self) -> PathBuf {
        self.root.join("review.toml")
    }

    pub fn records_file(&self) -> PathBuf {
        self.root.join("data").join("records.json")
    }

    pub fn search_dir(&self) -> PathBuf {
        self.root.join("data").join("search")
    }

    pub fn output_dir(&self) -> PathBuf {
        self.root.join("output")
    }

    pub fn history_file(&self) -> PathBuf {
        self.output_dir().join("history.json")
    }

    pub fn load_settings(&self) -> Result<ReviewSettings> {
        ReviewSettings::from_file(self.settings_file())
    }

    /// Fails when the directory does not hold an initialized project.
    pub fn require_project(&self) -> Result<()> {
        if !self.settings_file().is_file() {
            return Err(ReviewError::RepoSetup(format!(
                "No review.toml found in {} (run `litrev init` first)",
                self.root.display()
            )));
        }
        Ok(())
    }
}

/// Sets up a new project: settings file, empty dataset and directories.
/// Refuses to touch a directory that already has content besides `.git`.
pub fn init_project(paths: &ProjectPaths, title: &str, review_type: ReviewType) -> Result<()> {
    if paths.root.exists() {
        let non_git: Vec<String> = std::fs::read_dir(&paths.root)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.file_name().to_string_lossy().to_string())
            .filter(|name| name != ".git")
            .collect();
        if !non_git.is_empty() {
            return Err(ReviewError::NonEmptyDirectory(format!(
                "{} ({})",
                paths.root.display(),
                non_git.join(", ")
            )));
        }
    }

    std::fs::create_dir_all(paths.search_dir())?;
    std::fs::create_dir_all(paths.output_dir())?;

    let settings = default_settings(title, review_type);
    settings.save(paths.settings_file())?;
    std::fs::write(paths.records_file(), "[]\n")?;

    info!("Initialized review project at {}", paths.root.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_init_creates_project_layout() {
        let dir = TempDir::new().unwrap();
        let paths = ProjectPaths::new(dir.path());

        init_project(&paths, "Test review", ReviewType::Literature).unwrap();

        assert!(paths.settings_file().is_file());
        assert!(paths.records_file().is_file());
        assert!(paths.search_dir().is_dir());
        assert!(paths.output_dir().is_dir());
        paths.require_project().unwrap();

        let settings = paths.load_settings().unwrap();
        assert_eq!(settings.project.title, "Test review");
    }

    #[test]
    fn test_init_refuses_non_empty_directory() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("notes.txt"), "hello").unwrap();

        let paths = ProjectPaths::new(dir.path());
        let err = init_project(&paths, "Test", ReviewType::Literature).unwrap_err();
        assert!(matches!(err, ReviewError::NonEmptyDirectory(_)));
    }

    #[test]
    fn test_require_project_fails_without_settings() {
        let dir = TempDir::new().unwrap();
        let paths = ProjectPaths::new(dir.path());
        assert!(paths.require_project().is_err());
    }
}
