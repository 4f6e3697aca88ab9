//! Release configuration.
//!
//! Settings come from an optional TOML file (`assemble-installer.toml` in the
//! working directory unless `--config` points elsewhere). Every field is
//! optional; absent fields fall back to the defaults for the experimental Nix
//! installer jobset. The Hydra URL can additionally be overridden from the
//! environment and the command line.

use anyhow::{Context, Result, bail};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default Hydra instance.
pub const DEFAULT_HYDRA_URL: &str = "https://hydra.nixos.org";

/// Default `<project>/<jobset>` path queried for evaluations.
pub const DEFAULT_JOBSET: &str = "experimental-nix-installer/experimental-installer";

/// Default config file name, resolved against the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "assemble-installer.toml";

const DEFAULT_MANIFEST_PATH: &str = "Cargo.toml";
const DEFAULT_TEMPLATE_PATH: &str = "nix-installer.sh";
const DEFAULT_TOOL_NAME: &str = "nix-installer";
const DEFAULT_PLACEHOLDER: &str = "assemble_installer_templated_version";
const DEFAULT_RELEASE_NAME: &str = "experimental nix installer";

/// Environment variable name for overriding the Hydra URL.
const HYDRA_URL_ENV_VAR: &str = "ASSEMBLE_INSTALLER_HYDRA_URL";

/// On-disk configuration. Mirrors the TOML file one-to-one.
#[derive(Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ReleaseConfig {
    pub hydra_url: Option<String>,
    pub jobset: Option<String>,
    pub manifest_path: Option<PathBuf>,
    pub template_path: Option<PathBuf>,
    /// Binary name inside each artifact (`bin/<tool_name>`) and the prefix of
    /// the staged file names.
    pub tool_name: Option<String>,
    pub placeholder: Option<String>,
    /// Human-readable product name used in the release notes.
    pub release_name: Option<String>,
    /// `wait`, `fail`, or a duration such as `24h` / `2d`.
    pub unfinished_builds: Option<String>,
}

/// What to do when an evaluation still has unfinished builds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnfinishedPolicy {
    /// Stop early and successfully; a later run picks it up.
    #[default]
    Wait,
    /// Abort the run with an error.
    Fail,
    /// Wait while the evaluation is younger than the duration, fail after.
    FailAfter(Duration),
}

impl UnfinishedPolicy {
    pub fn parse(s: &str) -> Result<Self> {
        match s.trim() {
            "wait" => Ok(Self::Wait),
            "fail" => Ok(Self::Fail),
            other => parse_duration_string(other)
                .map(Self::FailAfter)
                .with_context(|| {
                    format!("invalid unfinished_builds policy '{other}': expected 'wait', 'fail', or a duration like '24h'")
                }),
        }
    }
}

/// Fully resolved settings passed into the assembler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub hydra_url: String,
    pub jobset: String,
    pub manifest_path: PathBuf,
    pub template_path: PathBuf,
    pub tool_name: String,
    pub placeholder: String,
    pub release_name: String,
    pub unfinished: UnfinishedPolicy,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            hydra_url: DEFAULT_HYDRA_URL.to_string(),
            jobset: DEFAULT_JOBSET.to_string(),
            manifest_path: PathBuf::from(DEFAULT_MANIFEST_PATH),
            template_path: PathBuf::from(DEFAULT_TEMPLATE_PATH),
            tool_name: DEFAULT_TOOL_NAME.to_string(),
            placeholder: DEFAULT_PLACEHOLDER.to_string(),
            release_name: DEFAULT_RELEASE_NAME.to_string(),
            unfinished: UnfinishedPolicy::Wait,
        }
    }
}

impl ReleaseConfig {
    /// Load config from a specific path. Returns defaults if the file does not exist.
    ///
    /// Parse errors and I/O errors other than file-not-found are hard failures.
    pub fn load_from(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(contents) => toml::from_str(&contents)
                .with_context(|| format!("failed to parse config file at {}", path.display())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => {
                Err(e).with_context(|| format!("failed to read config file at {}", path.display()))
            }
        }
    }

    /// Resolve into [`Settings`].
    ///
    /// The Hydra URL follows layered precedence (highest wins):
    /// 1. `cli_override` (`--hydra-url`)
    /// 2. `ASSEMBLE_INSTALLER_HYDRA_URL`
    /// 3. `hydra_url` from the file
    /// 4. [`DEFAULT_HYDRA_URL`]
    ///
    /// Blank values at any layer fall through to the next one.
    pub fn resolve(&self, cli_override: Option<&str>) -> Result<Settings> {
        self.resolve_with_env(cli_override, std::env::var(HYDRA_URL_ENV_VAR).ok())
    }

    fn resolve_with_env(
        &self,
        cli_override: Option<&str>,
        env_value: Option<String>,
    ) -> Result<Settings> {
        let defaults = Settings::default();

        let hydra_url = non_empty_trimmed(cli_override.map(|s| s.to_string()))
            .or_else(|| non_empty_trimmed(env_value))
            .or_else(|| non_empty_trimmed(self.hydra_url.clone()))
            .unwrap_or(defaults.hydra_url);

        let jobset = non_empty_trimmed(self.jobset.clone())
            .map(|j| j.trim_matches('/').to_string())
            .unwrap_or(defaults.jobset);
        if jobset.split('/').count() != 2 {
            bail!("jobset must have the form '<project>/<jobset>', got '{jobset}'");
        }

        let unfinished = match non_empty_trimmed(self.unfinished_builds.clone()) {
            Some(s) => UnfinishedPolicy::parse(&s)?,
            None => defaults.unfinished,
        };

        Ok(Settings {
            hydra_url,
            jobset,
            manifest_path: self.manifest_path.clone().unwrap_or(defaults.manifest_path),
            template_path: self.template_path.clone().unwrap_or(defaults.template_path),
            tool_name: non_empty_trimmed(self.tool_name.clone()).unwrap_or(defaults.tool_name),
            placeholder: non_empty_trimmed(self.placeholder.clone())
                .unwrap_or(defaults.placeholder),
            release_name: non_empty_trimmed(self.release_name.clone())
                .unwrap_or(defaults.release_name),
            unfinished,
        })
    }
}

/// Parses a human-readable duration string into a `Duration`.
///
/// Accepted formats: `<positive-integer>h` (hours) or `<positive-integer>d` (days).
/// Zero is rejected.
///
/// ```
/// # use std::time::Duration;
/// assert_eq!(assemble_installer::config::parse_duration_string("8h").unwrap(), Duration::from_secs(28800));
/// assert_eq!(assemble_installer::config::parse_duration_string("1d").unwrap(), Duration::from_secs(86400));
/// assert!(assemble_installer::config::parse_duration_string("0h").is_err());
/// ```
pub fn parse_duration_string(s: &str) -> Result<Duration> {
    let s = s.trim();
    if s.is_empty() {
        bail!("Duration string is empty");
    }

    let Some(unit) = s.chars().last() else {
        bail!("Duration string is empty");
    };
    let num_str = &s[..s.len() - unit.len_utf8()];
    let multiplier: u64 = match unit {
        'h' => 3600,
        'd' => 86400,
        _ => bail!("Invalid duration unit '{unit}' in '{s}'. Expected 'h' (hours) or 'd' (days)"),
    };

    if num_str.is_empty() {
        bail!("Missing numeric value in duration '{s}'");
    }

    let value: u64 = num_str
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid numeric value in duration '{s}': {e}"))?;

    if value == 0 {
        bail!("Duration must be positive, got '{s}'");
    }

    value
        .checked_mul(multiplier)
        .map(Duration::from_secs)
        .ok_or_else(|| {
            anyhow::anyhow!("Duration overflow: '{s}' exceeds maximum representable duration")
        })
}

/// Return the trimmed value if non-empty after trimming, otherwise `None`.
fn non_empty_trimmed(value: Option<String>) -> Option<String> {
    value.and_then(|v| {
        let trimmed = v.trim().to_string();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed)
        }
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
