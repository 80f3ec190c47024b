//! SyncGuard - bring the target up to date and refuse to land on top of
//! unpublished local work
//!
//! The divergence check is the last line before mutation: a local target
//! carrying commits the remote has never seen would silently ride along
//! with the push, publishing work nobody asked to land.

use crate::backend::VcsBackend;
use crate::error::{Error, Result};
use crate::land::engine::LandSession;
use crate::types::{LandRequest, PullOutcome};
use tracing::{debug, info};

/// Check out the target, fast-forward it from the remote, and verify the
/// local tip is not ahead of the remote.
///
/// Returns the target tip after the pull; the session records it as the
/// rollback point for every later mutation.
pub fn sync_target(
    backend: &dyn VcsBackend,
    request: &LandRequest,
    session: &mut LandSession,
) -> Result<String> {
    backend.checkout(&request.target)?;
    session.note_checkout_moved();

    let outcome = backend.pull_fast_forward_only(&request.remote, &request.target)?;
    match outcome {
        PullOutcome::FastForwarded => {
            info!(target = %request.target, remote = %request.remote, "target fast-forwarded");
        }
        PullOutcome::NoRemoteChanges => {
            debug!(target = %request.target, "remote had no new changes");
        }
    }

    let ahead = backend.local_commits_ahead_of_remote(&request.target, &request.remote)?;
    if !ahead.is_empty() {
        return Err(Error::Divergence {
            target: request.target.clone(),
            remote: request.remote.clone(),
            commits: ahead.iter().map(ToString::to_string).collect(),
        });
    }

    let tip = backend.resolve_commit(&request.target)?;
    session.note_target_tip(tip.clone());
    Ok(tip)
}
