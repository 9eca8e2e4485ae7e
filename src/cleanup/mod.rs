// src/cleanup/mod.rs
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use tracing::{info, warn};

/// Delete the scratch download directory, but only after an explicit yes.
///
/// `ask` supplies one raw answer per call (stdin in the binary, scripted in
/// tests); `y`/`yes` deletes, `n`/`no` keeps, anything else repeats the
/// question. The default path is non-destructive: nothing is removed until
/// the affirmative actually arrives. Returns whether the directory was
/// removed.
pub fn remove_downloads<F>(dir: &Path, mut ask: F) -> Result<bool>
where
    F: FnMut(&str) -> Result<String>,
{
    loop {
        let answer = ask("Remove downloads folder? (y/n): ")?;
        match answer.trim().to_lowercase().as_str() {
            "y" | "yes" => {
                if dir.exists() {
                    fs::remove_dir_all(dir)
                        .with_context(|| format!("removing {}", dir.display()))?;
                }
                info!(dir = %dir.display(), "downloads folder removed");
                return Ok(true);
            }
            "n" | "no" => {
                info!(dir = %dir.display(), "downloads folder kept");
                return Ok(false);
            }
            other => {
                warn!(answer = other, "not a valid option, try again");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn scripted(answers: &[&str]) -> impl FnMut(&str) -> Result<String> {
        let mut queue: Vec<String> = answers.iter().rev().map(|s| s.to_string()).collect();
        move |_question| Ok(queue.pop().unwrap_or_else(|| "n".to_string()))
    }

    #[test]
    fn yes_removes_the_directory() {
        let root = TempDir::new().unwrap();
        let downloads = root.path().join("downloads");
        fs::create_dir_all(&downloads).unwrap();
        fs::write(downloads.join("module 01 1997.zip"), b"zip").unwrap();

        let removed = remove_downloads(&downloads, scripted(&["yes"])).unwrap();

        assert!(removed);
        assert!(!downloads.exists());
    }

    #[test]
    fn no_keeps_the_directory() {
        let root = TempDir::new().unwrap();
        let downloads = root.path().join("downloads");
        fs::create_dir_all(&downloads).unwrap();

        let removed = remove_downloads(&downloads, scripted(&["n"])).unwrap();

        assert!(!removed);
        assert!(downloads.exists());
    }

    #[test]
    fn invalid_answers_repeat_the_question() {
        let root = TempDir::new().unwrap();
        let downloads = root.path().join("downloads");
        fs::create_dir_all(&downloads).unwrap();

        let removed = remove_downloads(&downloads, scripted(&["maybe", "", "y"])).unwrap();

        assert!(removed);
        assert!(!downloads.exists());
    }
}
