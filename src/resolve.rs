//! Choosing which evaluation to release.

use anyhow::Result;

use crate::error::ReleaseError;
use crate::git::RevisionSource;
use crate::hydra::Evaluation;

/// Pick the evaluation to release from `evals` (newest first).
///
/// With a non-empty `requested` ID the matching evaluation is returned as-is.
/// Without one, the newest evaluation is used, but only if its flake reference
/// contains the current revision; the revision is not queried otherwise.
pub fn resolve_evaluation(
    evals: &[Evaluation],
    requested: Option<&str>,
    revisions: &dyn RevisionSource,
) -> Result<Evaluation> {
    if let Some(raw) = requested.map(str::trim).filter(|s| !s.is_empty()) {
        let id: u64 = raw
            .parse()
            .map_err(|_| ReleaseError::InvalidEvalId(raw.to_string()))?;
        return evals
            .iter()
            .find(|e| e.id == id)
            .cloned()
            .ok_or_else(|| ReleaseError::EvalNotFound { id }.into());
    }

    let latest = evals.first().ok_or(ReleaseError::NoEvaluations)?;
    let rev = revisions.current_revision()?;
    if rev.is_empty() || !latest.flake.contains(&rev) {
        return Err(ReleaseError::RevisionMismatch {
            rev,
            flake: latest.flake.clone(),
        }
        .into());
    }
    Ok(latest.clone())
}
