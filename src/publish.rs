//! Creating the draft GitHub release.
//!
//! Goes through the `gh` CLI so that authentication stays with `gh` itself
//! (`gh auth login` or `GH_TOKEN`). Releases are always created as drafts and
//! promoted by hand.

use anyhow::Result;
use std::ffi::OsString;
use std::path::PathBuf;
use std::process::Command;

use crate::error::ReleaseError;
use crate::output;

/// Everything needed to create one draft release.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DraftRelease {
    pub tag: String,
    pub title: String,
    pub notes: String,
    pub files: Vec<PathBuf>,
}

impl DraftRelease {
    /// Tag `<version>`, title `v<version>`, notes naming the product.
    pub fn new(release_name: &str, version: &str, files: Vec<PathBuf>) -> Self {
        Self {
            tag: version.to_string(),
            title: format!("v{version}"),
            notes: format!("Release {release_name} v{version}"),
            files,
        }
    }
}

pub trait Publisher {
    fn publish(&self, release: &DraftRelease) -> Result<()>;
}

/// Publishes with `gh release create --draft`.
#[derive(Debug, Clone)]
pub struct GhCli {
    program: OsString,
}

impl Default for GhCli {
    fn default() -> Self {
        Self {
            program: OsString::from("gh"),
        }
    }
}

impl GhCli {
    /// Use a different executable in place of `gh`.
    pub fn with_program(program: impl Into<OsString>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn args(release: &DraftRelease) -> Vec<OsString> {
        let mut args: Vec<OsString> = [
            "release",
            "create",
            "--notes",
            release.notes.as_str(),
            "--title",
            release.title.as_str(),
            "--draft",
            release.tag.as_str(),
        ]
        .into_iter()
        .map(OsString::from)
        .collect();
        args.extend(release.files.iter().map(|f| f.clone().into_os_string()));
        args
    }
}

impl Publisher for GhCli {
    fn publish(&self, release: &DraftRelease) -> Result<()> {
        let args = Self::args(release);
        output::detail(&format!(
            "{} {}",
            self.program.to_string_lossy(),
            args.iter()
                .map(|a| a.to_string_lossy())
                .collect::<Vec<_>>()
                .join(" ")
        ));

        let status = Command::new(&self.program)
            .args(&args)
            .status()
            .map_err(|e| {
                ReleaseError::Publish(format!(
                    "failed to execute {}: {e}",
                    self.program.to_string_lossy()
                ))
            })?;

        if !status.success() {
            return Err(ReleaseError::Publish(format!(
                "gh release create exited with {status}"
            ))
            .into());
        }
        Ok(())
    }
}
