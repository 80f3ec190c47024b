//! AlternateBranchHandler - keep sibling forks alive through a squash
//!
//! A collapse rewrites the landing ref's history. On backends whose
//! branches fork at arbitrary ancestor changesets, sibling work hanging off
//! the middle of that history would be orphaned or destroyed. The user has
//! to pick an outcome; there is no silent default.

use crate::error::{Error, Result};
use crate::interact::UserInteraction;
use crate::types::CommitInfo;

/// What to do about detected sibling forks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlternateDecision {
    /// Preserve the original ref and its history instead of deleting it
    Keep,
    /// Relocate every fork onto the changeset that results from the land
    Rebase,
}

/// Present the keep/rebase/abort choice for a non-empty set of forks.
///
/// Abort and any invalid selection are fatal; the caller unwinds through
/// the normal rollback path.
pub fn resolve_alternates(
    interact: &dyn UserInteraction,
    source: &str,
    forks: &[CommitInfo],
) -> Result<AlternateDecision> {
    let listing = forks
        .iter()
        .map(|fork| format!("  {fork}"))
        .collect::<Vec<_>>()
        .join("\n");
    let prompt = format!(
        "squashing '{source}' would orphan {} sibling fork(s):\n{listing}\n\
         keep the original ref, rebase the forks onto the landed changeset, or abort?",
        forks.len()
    );

    let choice = interact
        .choose(&prompt, &["keep", "rebase", "abort"])
        .map_err(|e| Error::UserAbort(format!("no valid choice for sibling forks: {e}")))?;

    match choice {
        0 => Ok(AlternateDecision::Keep),
        1 => Ok(AlternateDecision::Rebase),
        2 => Err(Error::UserAbort(format!(
            "landing stopped; resolve these forks of '{source}' manually:\n{listing}"
        ))),
        other => Err(Error::UserAbort(format!(
            "invalid choice {other} for sibling forks"
        ))),
    }
}
