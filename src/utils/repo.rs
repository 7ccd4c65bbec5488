use crate::utils::error::{ReviewError, Result};
use std::path::Path;
use std::process::Command;

pub fn is_git_repo(root: &Path) -> bool {
    root.join(".git").is_dir()
}

/// Worktree has to be clean before a record-mutating operation,
/// because operations may rewrite the dataset. Untracked files are
/// not considered.
pub fn require_clean_worktree(root: &Path, force: bool) -> Result<()> {
    if force {
        return Ok(());
    }
    if !is_git_repo(root) {
        tracing::debug!("Not a git repository, skipping worktree check");
        return Ok(());
    }

    let output = Command::new("git")
        .arg("-C")
        .arg(root)
        .args(["status", "--porcelain"])
        .output();

    match output {
        Ok(out) if out.status.success() => {
            let changed: Vec<String> = String::from_utf8_lossy(&out.stdout)
                .lines()
                .filter(|line| !line.is_empty() && !line.starts_with("??"))
                .map(|line| line.trim().to_string())
                .collect();
            if changed.is_empty() {
                Ok(())
            } else {
                Err(ReviewError::UnstagedChanges(changed.join(", ")))
            }
        }
        _ => {
            tracing::warn!("git status failed, skipping worktree check");
            Ok(())
        }
    }
}

/// Best-effort commit after an operation. Failures are logged, never fatal.
pub fn commit_all(root: &Path, message: &str) {
    if !is_git_repo(root) {
        tracing::debug!("Not a git repository, skipping commit");
        return;
    }

    let add_status = Command::new("git")
        .arg("-C")
        .arg(root)
        .args(["add", "-A"])
        .status();
    match add_status {
        Ok(s) if s.success() => {}
        _ => {
            tracing::warn!("git add failed, skipping commit");
            return;
        }
    }

    match Command::new("git")
        .arg("-C")
        .arg(root)
        .args(["commit", "--quiet", "-m", message])
        .status()
    {
        Ok(s) if s.success() => tracing::info!("Created commit: {}", message),
        Ok(_) => tracing::debug!("Nothing to commit"),
        Err(e) => tracing::warn!("Failed to launch git process: {}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_non_git_directory_passes_clean_check() {
        let temp_dir = TempDir::new().unwrap();
        assert!(!is_git_repo(temp_dir.path()));
        assert!(require_clean_worktree(temp_dir.path(), false).is_ok());
    }

    #[test]
    fn test_commit_in_non_git_directory_is_noop() {
        let temp_dir = TempDir::new().unwrap();
        commit_all(temp_dir.path(), "litrev search");
        assert!(!temp_dir.path().join(".git").exists());
    }
}
