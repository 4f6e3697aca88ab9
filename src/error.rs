//! Typed failure kinds for the release pipeline.
//!
//! Collaborator failures (HTTP, git, I/O) travel as `anyhow::Error` with
//! context. The conditions below are the ones callers and tests need to tell
//! apart, so they get their own variants and can be recovered with
//! `anyhow::Error::downcast_ref::<ReleaseError>()`.

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum ReleaseError {
    /// An explicit evaluation ID was requested but Hydra does not list it.
    #[error("evaluation {id} not found in jobset")]
    EvalNotFound { id: u64 },

    /// The jobset has no evaluations at all.
    #[error("jobset has no evaluations")]
    NoEvaluations,

    /// The requested evaluation ID is not an integer.
    #[error("invalid evaluation id '{0}': expected an integer")]
    InvalidEvalId(String),

    /// The latest evaluation was built from a different revision than HEAD.
    #[error("expected flake with rev {rev} but found flake {flake}")]
    RevisionMismatch { rev: String, flake: String },

    /// The version manifest is missing, malformed, or lacks `package.version`.
    #[error("cannot read version from {}: {reason}", .path.display())]
    Manifest { path: PathBuf, reason: String },

    /// A store path could not be realized after every allowed attempt.
    #[error("failed to materialize {path} after {attempts} attempts: {reason}")]
    Materialization {
        path: String,
        attempts: u32,
        reason: String,
    },

    /// The release-hosting CLI reported failure.
    #[error("release creation failed: {0}")]
    Publish(String),

    /// A build is still unfinished and the policy says to stop waiting.
    #[error("build {build_id} in evaluation {eval_id} is not finished: {reason}")]
    BuildUnfinished {
        build_id: u64,
        eval_id: u64,
        reason: String,
    },
}
