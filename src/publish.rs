//! Publishing a written document: stage, commit, push.

use crate::activity::DATE_FORMAT;
use crate::error::DevlogError;
use chrono::NaiveDate;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::info;

/// Runs an external program in a working directory
pub trait CommandRunner: Send + Sync {
    /// Run `program args..` in `cwd`; a non-zero exit is an error carrying stderr.
    fn run(&self, program: &str, args: &[String], cwd: &Path) -> Result<String, DevlogError>;
}

fn render_command(program: &str, args: &[String]) -> String {
    let mut parts = vec![program.to_string()];
    parts.extend(args.iter().map(|a| {
        if a.contains(' ') {
            format!("\"{}\"", a)
        } else {
            a.clone()
        }
    }));
    parts.join(" ")
}

#[derive(Debug, Clone, Default)]
pub struct SystemCommandRunner;

impl CommandRunner for SystemCommandRunner {
    fn run(&self, program: &str, args: &[String], cwd: &Path) -> Result<String, DevlogError> {
        let output = Command::new(program)
            .args(args)
            .current_dir(cwd)
            .output()
            .map_err(|e| DevlogError::GitCommand {
                command: render_command(program, args),
                stderr: e.to_string(),
            })?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            let stderr = if stderr.is_empty() {
                String::from_utf8_lossy(&output.stdout).trim().to_string()
            } else {
                stderr
            };
            return Err(DevlogError::GitCommand {
                command: render_command(program, args),
                stderr,
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Commits a single document in the content repository and pushes it
pub struct GitPublisher<R: CommandRunner> {
    runner: R,
    repo_root: PathBuf,
    message_prefix: String,
}

impl<R: CommandRunner> GitPublisher<R> {
    pub fn new(runner: R, repo_root: impl Into<PathBuf>, message_prefix: impl Into<String>) -> Self {
        Self {
            runner,
            repo_root: repo_root.into(),
            message_prefix: message_prefix.into(),
        }
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    pub fn commit_message(&self, date: NaiveDate) -> String {
        format!("{} {}", self.message_prefix, date.format(DATE_FORMAT))
    }

    /// Stage, commit (scoped to `path` only), and push.
    ///
    /// Stops at the first failing step; nothing is rolled back.
    pub fn publish(&self, path: &Path, date: NaiveDate) -> Result<(), DevlogError> {
        let relative = path
            .strip_prefix(&self.repo_root)
            .unwrap_or(path)
            .display()
            .to_string();

        self.git(&["add".to_string(), relative.clone()])?;
        self.git(&[
            "commit".to_string(),
            "-m".to_string(),
            self.commit_message(date),
            "--".to_string(),
            relative.clone(),
        ])?;
        self.git(&["push".to_string()])?;

        info!(path = %relative, "Published document");
        Ok(())
    }

    fn git(&self, args: &[String]) -> Result<String, DevlogError> {
        self.runner.run("git", args, &self.repo_root)
    }
}
