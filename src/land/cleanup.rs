//! CleanupManager - retire the landed ref and restore the checkout
//!
//! Runs only after a successful push. Deletion is preceded by resolving the
//! ref so the report can carry an exact recreate command; losing work to
//! cleanup must always be recoverable by pasting one line.

use crate::backend::VcsBackend;
use crate::error::Result;
use crate::types::{LandRequest, WorkingCopyState};
use tracing::info;

/// What cleanup did, for the final summary
#[derive(Debug, Clone, Default)]
pub struct CleanupReport {
    /// Commit the deleted source pointed at, with the recreate command
    pub deleted_source: Option<(String, String)>,
    /// The remote counterpart was deleted too
    pub deleted_remote: bool,
    /// The ref checked out at the end, when it changed
    pub restored: Option<String>,
}

/// Delete the landed source ref (unless kept), optionally its remote
/// counterpart, and put the user back where they started.
pub fn cleanup(
    backend: &dyn VcsBackend,
    request: &LandRequest,
    original: &WorkingCopyState,
    effective_keep: bool,
) -> Result<CleanupReport> {
    let mut report = CleanupReport::default();

    let delete_source = !effective_keep && request.source != request.target;
    if delete_source {
        let commit = backend.resolve_commit(&request.source)?;
        let hint = backend.recover_hint(&request.source, request.source_kind, &commit);
        backend.delete_ref(&request.source, request.source_kind)?;
        info!(source = %request.source, %commit, "deleted landed ref");
        report.deleted_source = Some((commit, hint));

        if request.flags.delete_remote && backend.can_delete_remote(request.source_kind) {
            backend.delete_remote_ref(&request.source, &request.remote, request.source_kind)?;
            report.deleted_remote = true;
        }
    }

    // Go back to where the user was, unless that ref was the source and is
    // gone now - then the target, where the landed change lives, is the
    // sensible place to stay.
    let original_still_exists = effective_keep || original.ref_name != request.source;
    if original.ref_name != request.target && original_still_exists {
        backend.checkout(&original.ref_name)?;
        report.restored = Some(original.ref_name.clone());
    }

    Ok(report)
}
