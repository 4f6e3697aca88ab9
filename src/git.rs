//! Local version-control queries.
//!
//! Shells out to `git` via `std::process::Command`. Only the current revision
//! is needed: it guards against publishing builds of a stale evaluation.

use anyhow::{Context, Result, bail};
use std::path::PathBuf;
use std::process::Command;

/// Anything that can report the revision the working tree is at.
pub trait RevisionSource {
    fn current_revision(&self) -> Result<String>;
}

/// A git working tree. `None` means the process working directory.
#[derive(Debug, Clone, Default)]
pub struct GitRepo {
    dir: Option<PathBuf>,
}

impl GitRepo {
    pub fn current_dir() -> Self {
        Self { dir: None }
    }

    pub fn at(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: Some(dir.into()),
        }
    }

    /// Run a git command and return its stdout as a trimmed `String`.
    /// Returns an error if the command exits with a non-zero status.
    fn output(&self, args: &[&str]) -> Result<String> {
        let mut cmd = Command::new("git");
        if let Some(dir) = &self.dir {
            cmd.arg("-C").arg(dir);
        }
        let output = cmd.args(args).output().context("failed to execute git")?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!(
                "git {} failed (exit {}): {}",
                args.join(" "),
                output.status,
                stderr.trim()
            );
        }

        let stdout = String::from_utf8(output.stdout).context("git output was not valid UTF-8")?;
        Ok(stdout.trim().to_string())
    }

    /// Return the full 40-character SHA of HEAD.
    pub fn head_hash(&self) -> Result<String> {
        self.output(&["rev-parse", "HEAD"])
    }
}

impl RevisionSource for GitRepo {
    fn current_revision(&self) -> Result<String> {
        self.head_hash()
    }
}
