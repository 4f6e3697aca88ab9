//! The release pipeline.
//!
//! Steps, strictly in order:
//! 1. Fetch the jobset's evaluations and pick one.
//! 2. Walk its builds; every build must be finished, and each finished build's
//!    output is materialized (one retry, dropped with a warning on failure).
//! 3. Read the version from the manifest.
//! 4. Stage binaries and the installer script in a temporary directory.
//! 5. Create the draft release.
//!
//! An unfinished build ends the run early with [`Outcome::NotReady`] under the
//! default policy, before anything is staged.

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::bundle::{Artifact, Bundle, BundleSpec};
use crate::config::{Settings, UnfinishedPolicy};
use crate::error::ReleaseError;
use crate::git::RevisionSource;
use crate::hydra::{CiSource, Evaluation};
use crate::manifest;
use crate::output;
use crate::publish::{DraftRelease, Publisher};
use crate::resolve::resolve_evaluation;
use crate::store::{Materializer, realize_with_retry};

/// How a run ended, when it did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// A draft release was created.
    Published {
        eval_id: u64,
        tag: String,
        title: String,
        /// File names attached to the release.
        files: Vec<String>,
    },
    /// A build is still running; nothing was published. Re-run later.
    NotReady {
        eval_id: u64,
        build_id: u64,
        status_url: String,
    },
}

/// Result of walking an evaluation's builds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildScan {
    Ready(Vec<Artifact>),
    NotReady { build_id: u64 },
}

/// Whether an unfinished build of an evaluation created at `eval_timestamp`
/// should stop the run with an error. `Err` carries the reason.
pub fn check_unfinished(
    policy: UnfinishedPolicy,
    eval_timestamp: Option<i64>,
    now: i64,
) -> std::result::Result<(), String> {
    match policy {
        UnfinishedPolicy::Wait => Ok(()),
        UnfinishedPolicy::Fail => Err("unfinished builds are configured to fail".to_string()),
        UnfinishedPolicy::FailAfter(limit) => {
            let Some(created) = eval_timestamp else {
                return Ok(());
            };
            let age = now.saturating_sub(created).max(0) as u64;
            if age > limit.as_secs() {
                Err(format!(
                    "evaluation is {}h old, past the {}h limit",
                    age / 3600,
                    limit.as_secs() / 3600
                ))
            } else {
                Ok(())
            }
        }
    }
}

fn now_secs() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

/// Drives one release run against the given collaborators.
pub struct Assembler<'a> {
    settings: &'a Settings,
    ci: &'a dyn CiSource,
    revisions: &'a dyn RevisionSource,
    materializer: &'a dyn Materializer,
    publisher: &'a dyn Publisher,
}

impl<'a> Assembler<'a> {
    pub fn new(
        settings: &'a Settings,
        ci: &'a dyn CiSource,
        revisions: &'a dyn RevisionSource,
        materializer: &'a dyn Materializer,
        publisher: &'a dyn Publisher,
    ) -> Self {
        Self {
            settings,
            ci,
            revisions,
            materializer,
            publisher,
        }
    }

    /// Run the whole pipeline. `eval_id` of `None` or `""` selects the latest
    /// evaluation, which must match the current revision.
    pub fn run(&self, eval_id: Option<&str>) -> Result<Outcome> {
        output::action("Fetching", &format!("evaluations of {}", self.settings.jobset));
        let evals = self
            .ci
            .evaluations()
            .context("failed to fetch evaluations")?;
        let eval = resolve_evaluation(&evals, eval_id, self.revisions)?;
        output::success(
            "Selected",
            &format!(
                "evaluation {} ({} builds) from {}",
                eval.id,
                eval.builds.len(),
                eval.flake
            ),
        );

        let artifacts = match self.collect_artifacts(&eval)? {
            BuildScan::Ready(artifacts) => artifacts,
            BuildScan::NotReady { build_id } => {
                let status_url = self.ci.unfinished_url(eval.id);
                output::note(&format!(
                    "Build {build_id} not finished. Check status at {status_url}"
                ));
                return Ok(Outcome::NotReady {
                    eval_id: eval.id,
                    build_id,
                    status_url,
                });
            }
        };

        let version = manifest::read_version(&self.settings.manifest_path)?;
        output::success("Version", &version);

        let bundle = Bundle::stage(
            &artifacts,
            &BundleSpec {
                tool_name: &self.settings.tool_name,
                template_path: &self.settings.template_path,
                placeholder: &self.settings.placeholder,
                version: &version,
            },
        )?;

        let release = DraftRelease::new(
            &self.settings.release_name,
            &version,
            bundle.files().to_vec(),
        );
        output::action(
            "Publishing",
            &format!("draft release {} with {} files", release.title, release.files.len()),
        );
        self.publisher.publish(&release)?;
        output::success("Published", &format!("draft release {}", release.title));

        Ok(Outcome::Published {
            eval_id: eval.id,
            tag: release.tag,
            title: release.title,
            files: file_names(&release.files),
        })
    }

    /// Fetch every build of `eval` in order and materialize the finished ones.
    ///
    /// Stops at the first unfinished build. Builds whose output cannot be
    /// materialized are left out with a warning.
    pub fn collect_artifacts(&self, eval: &Evaluation) -> Result<BuildScan> {
        let mut artifacts = Vec::with_capacity(eval.builds.len());

        for &build_id in &eval.builds {
            let build = self
                .ci
                .build(build_id)
                .with_context(|| format!("failed to fetch build {build_id}"))?;

            if !build.is_finished() {
                if let Err(reason) =
                    check_unfinished(self.settings.unfinished, eval.timestamp, now_secs())
                {
                    return Err(ReleaseError::BuildUnfinished {
                        build_id,
                        eval_id: eval.id,
                        reason,
                    }
                    .into());
                }
                return Ok(BuildScan::NotReady { build_id });
            }

            let store_path = build.out_path()?;
            output::action("Realizing", &format!("{store_path} ({})", build.system));
            match realize_with_retry(self.materializer, store_path) {
                Ok(()) => artifacts.push(Artifact {
                    store_path: PathBuf::from(store_path),
                    system: build.system.clone(),
                }),
                Err(e) => {
                    output::note(&format!("dropping build {build_id} ({}): {e}", build.system));
                }
            }
        }

        Ok(BuildScan::Ready(artifacts))
    }
}

fn file_names(paths: &[PathBuf]) -> Vec<String> {
    paths
        .iter()
        .filter_map(|p| p.file_name())
        .map(|n| n.to_string_lossy().into_owned())
        .collect()
}
