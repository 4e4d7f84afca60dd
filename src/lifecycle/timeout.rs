//! Timeout executor.
//!
//! Runs a hook callback on its own task and races it against an absolute deadline. Spawning
//! onto its own task (rather than just `tokio::time::timeout`-wrapping the future in place)
//! is what lets the executor hand back a deterministic "the callback never returned" error
//! when the callback's task panics, the same way `LifecycleManager` in the teacher crate
//! distinguished a `Result::Err` from an outright failure.

use crate::error::{Error, Result};
use std::future::Future;
use std::time::Instant;

/// Run `fut` to completion, racing it against `deadline` (an absolute instant shared across
/// every hook invoked in the same Start/Stop call — the budget is never subdivided per hook).
/// `phase` names the call for the deadline error ("start hook \"db\"", "stop").
///
/// If `fut` completes at or after `deadline` has already elapsed, the deadline error is
/// returned instead of `fut`'s own result — ties are broken in the deadline's favor so tests
/// that race a hook against its timeout never flake on scheduling.
pub(crate) async fn execute<F>(deadline: Option<Instant>, phase: &str, fut: F) -> Result<()>
where
    F: Future<Output = Result<()>> + Send + 'static,
{
    let handle = tokio::spawn(fut);

    let joined = match deadline {
        None => handle.await,
        Some(deadline) => {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match tokio::time::timeout(remaining, handle).await {
                Ok(joined) => joined,
                Err(_elapsed) => return Err(Error::deadline(phase)),
            }
        }
    };

    if let Some(deadline) = deadline {
        if Instant::now() >= deadline {
            return Err(Error::deadline(phase));
        }
    }

    match joined {
        Ok(result) => result,
        Err(join_err) => Err(Error::hook(phase, format!("callback exited without returning: {join_err}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn succeeds_without_deadline() {
        let result = execute(None, "start", async { Ok(()) }).await;
        assert!(result.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn times_out_when_callback_outlives_deadline() {
        let deadline = Instant::now() + Duration::from_millis(10);
        let result = execute(Some(deadline), "start", async {
            tokio::time::sleep(Duration::from_millis(100)).await;
            Ok(())
        })
        .await;
        assert!(matches!(result, Err(Error::Deadline { .. })));
    }

    #[tokio::test]
    async fn propagates_callback_error() {
        let result = execute(None, "start", async { Err(Error::hook("svc", "boom")) }).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn propagates_panic_as_hook_error() {
        let result = execute(None, "start", async {
            panic!("kaboom");
            #[allow(unreachable_code)]
            Ok(())
        })
        .await;
        assert!(matches!(result, Err(Error::Hook { .. })));
    }
}
