//! Staging the release files in a temporary directory.
//!
//! The staging directory is owned by the returned [`Bundle`] and removed when
//! the bundle is dropped, whichever way the run ends.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use crate::output;
use crate::template::safe_substitute;

/// A realized build output and the platform it was built for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub store_path: PathBuf,
    pub system: String,
}

/// What goes into the bundle besides the artifacts.
#[derive(Debug, Clone)]
pub struct BundleSpec<'a> {
    /// Binary name inside each artifact, also the staged file prefix.
    pub tool_name: &'a str,
    pub template_path: &'a Path,
    pub placeholder: &'a str,
    pub version: &'a str,
}

#[derive(Debug)]
pub struct Bundle {
    dir: TempDir,
    files: Vec<PathBuf>,
}

/// Staged file name for one platform, e.g. `nix-installer-x86_64-linux`.
pub fn artifact_file_name(tool_name: &str, system: &str) -> String {
    format!("{tool_name}-{system}")
}

impl Bundle {
    /// Copy each artifact's `bin/<tool>` into a fresh staging directory and
    /// write the version-substituted template next to them.
    ///
    /// A platform that appears more than once keeps the last artifact's binary
    /// and is listed once.
    pub fn stage(artifacts: &[Artifact], spec: &BundleSpec<'_>) -> Result<Self> {
        let dir = tempfile::Builder::new()
            .prefix("assemble-installer")
            .tempdir()
            .context("failed to create staging directory")?;
        let mut files: Vec<PathBuf> = Vec::new();

        for artifact in artifacts {
            let source = artifact.store_path.join("bin").join(spec.tool_name);
            let dest = dir
                .path()
                .join(artifact_file_name(spec.tool_name, &artifact.system));
            output::action(
                "Copying",
                &format!("{} to {}", source.display(), dest.display()),
            );
            copy_binary(&source, &dest)?;
            if !files.contains(&dest) {
                files.push(dest);
            }
        }

        let script_name = spec
            .template_path
            .file_name()
            .with_context(|| {
                format!("template path {} has no file name", spec.template_path.display())
            })?;
        let template = std::fs::read_to_string(spec.template_path).with_context(|| {
            format!("failed to read installer template {}", spec.template_path.display())
        })?;
        let script = safe_substitute(&template, spec.placeholder, spec.version);
        let script_path = dir.path().join(script_name);
        std::fs::write(&script_path, script)
            .with_context(|| format!("failed to write {}", script_path.display()))?;
        files.push(script_path);

        Ok(Self { dir, files })
    }

    pub fn dir(&self) -> &Path {
        self.dir.path()
    }

    /// Absolute paths of every staged file, binaries first, script last.
    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }
}

fn copy_binary(source: &Path, dest: &Path) -> Result<()> {
    // Store files are read-only; drop an earlier copy so the overwrite succeeds.
    if dest.exists() {
        std::fs::remove_file(dest)
            .with_context(|| format!("failed to replace {}", dest.display()))?;
    }
    std::fs::copy(source, dest).with_context(|| {
        format!("failed to copy {} to {}", source.display(), dest.display())
    })?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(dest, std::fs::Permissions::from_mode(0o755))
            .with_context(|| format!("failed to set permissions on {}", dest.display()))?;
    }
    Ok(())
}
