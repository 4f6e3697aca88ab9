//! Realizing store paths locally.
//!
//! Hydra only reports where a build output lives in the Nix store; the
//! artifact has to be substituted into the local store before its files can
//! be copied. `nix-store -r` is idempotent, so a failed attempt can simply be
//! repeated.

use anyhow::{Context, Result, bail};
use std::process::Command;

use crate::error::ReleaseError;
use crate::output;

/// Total attempts per store path: the first try plus one retry.
pub const MAX_ATTEMPTS: u32 = 2;

pub trait Materializer {
    /// Make `store_path` available on the local filesystem.
    fn realize(&self, store_path: &str) -> Result<()>;
}

/// Materializes via `nix-store -r`.
#[derive(Debug, Clone, Default)]
pub struct NixStore;

impl Materializer for NixStore {
    fn realize(&self, store_path: &str) -> Result<()> {
        output::detail(&format!("nix-store -r {store_path}"));
        let status = Command::new("nix-store")
            .args(["-r", store_path])
            .status()
            .context("failed to execute nix-store")?;
        if !status.success() {
            bail!("nix-store -r {store_path} exited with {status}");
        }
        Ok(())
    }
}

/// Realize `store_path`, retrying immediately once on failure.
///
/// The returned error carries the last failure's message.
pub fn realize_with_retry(
    materializer: &dyn Materializer,
    store_path: &str,
) -> std::result::Result<(), ReleaseError> {
    let mut last_err = None;
    for attempt in 1..=MAX_ATTEMPTS {
        match materializer.realize(store_path) {
            Ok(()) => return Ok(()),
            Err(e) => {
                if attempt < MAX_ATTEMPTS {
                    output::detail(&format!("attempt {attempt} failed: {e:#}; retrying"));
                }
                last_err = Some(e);
            }
        }
    }
    Err(ReleaseError::Materialization {
        path: store_path.to_string(),
        attempts: MAX_ATTEMPTS,
        reason: last_err.map(|e| format!("{e:#}")).unwrap_or_default(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    /// Fails the first `failures` calls, then succeeds.
    struct Flaky {
        failures: u32,
        calls: Cell<u32>,
    }

    impl Flaky {
        fn new(failures: u32) -> Self {
            Self {
                failures,
                calls: Cell::new(0),
            }
        }
    }

    impl Materializer for Flaky {
        fn realize(&self, store_path: &str) -> Result<()> {
            let n = self.calls.get() + 1;
            self.calls.set(n);
            if n <= self.failures {
                bail!("substituter unavailable for {store_path} (call {n})");
            }
            Ok(())
        }
    }

    #[test]
    fn test_succeeds_first_time_without_retry() {
        let m = Flaky::new(0);
        realize_with_retry(&m, "/nix/store/a").unwrap();
        assert_eq!(m.calls.get(), 1);
    }

    #[test]
    fn test_retries_once_after_failure() {
        let m = Flaky::new(1);
        realize_with_retry(&m, "/nix/store/a").unwrap();
        assert_eq!(m.calls.get(), 2);
    }

    #[test]
    fn test_gives_up_after_two_attempts() {
        let m = Flaky::new(u32::MAX);
        let err = realize_with_retry(&m, "/nix/store/a").unwrap_err();
        assert_eq!(m.calls.get(), MAX_ATTEMPTS);
        match err {
            ReleaseError::Materialization {
                path,
                attempts,
                reason,
            } => {
                assert_eq!(path, "/nix/store/a");
                assert_eq!(attempts, 2);
                assert!(reason.contains("call 2"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
