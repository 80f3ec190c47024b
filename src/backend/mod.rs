//! Version-control backends
//!
//! The landing pipeline consumes the [`VcsBackend`] capability trait; the
//! concrete implementations drive the `git` and `hg` command-line tools.
//! Capability flags (rebase support, history mutability, forking branches)
//! replace any type-checks on a concrete backend, so the engine never asks
//! "is this git?", only "can this backend do X?".

mod git;
mod hg;
mod run;

pub use git::GitBackend;
pub use hg::HgBackend;

use crate::error::{Error, Result};
use crate::types::{CommitInfo, PullOutcome, RefKind, Upstream};
use std::path::Path;

/// Result of a rebase attempt.
///
/// A conflicting rebase is aborted by the backend before this is returned,
/// so `Conflict` always means "the working copy is back where it was".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RebaseOutcome {
    /// The source now sits on the target tip
    Completed,
    /// The rebase hit conflicts and was aborted
    Conflict,
}

/// Result of collapsing the source history onto the target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollapseOutcome {
    /// Whether the collapse already created the changeset. When false the
    /// result is staged and the pipeline commits it with the final message.
    pub committed: bool,
    /// The landed changeset, when one was created
    pub landed_commit: Option<String>,
}

/// Result of a no-fast-forward merge without auto-commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    /// Merge result is staged, ready for the final commit
    Merged,
    /// The merge conflicted; the working copy is left mid-merge
    Conflict,
}

/// Capability contract the landing pipeline consumes.
///
/// Only the operations the pipeline uses are here; this is not a
/// general-purpose VCS abstraction. Mutating operations are modeled
/// atomic-or-failed and are never retried by the caller.
pub trait VcsBackend {
    /// Short backend name for messages ("git", "hg").
    fn name(&self) -> &'static str;

    /// Root directory of the working copy.
    fn root(&self) -> &Path;

    /// Conventional integration ref when nothing else determines one.
    fn default_target(&self) -> &'static str;

    /// Conventional remote name when nothing else determines one.
    fn default_remote(&self) -> &'static str;

    // --- capability flags -------------------------------------------------

    /// Whether history can be rewritten with a rebase.
    fn supports_rebase(&self) -> bool;

    /// Whether the backend's convention treats history as immutable
    /// (favoring merge over squash).
    fn has_immutable_history(&self) -> bool;

    /// Whether branches can fork at arbitrary ancestor commits, making
    /// alternate-fork preservation necessary before a collapse.
    fn has_forking_branches(&self) -> bool;

    /// Whether the backend distinguishes bookmarks from branches.
    fn supports_bookmarks(&self) -> bool;

    /// Whether source and target must be the same ref kind.
    fn requires_homogeneous_ref_kinds(&self) -> bool;

    /// Whether a no-fast-forward merge without auto-commit is available.
    fn supports_strict_merge(&self) -> bool;

    /// Whether the backend's collapse operation relocates the source onto
    /// the target by itself, making a separate rebase step unnecessary.
    fn collapse_relocates(&self) -> bool;

    /// Whether a remote counterpart of the given ref kind can be deleted.
    fn can_delete_remote(&self, kind: RefKind) -> bool;

    // --- queries ----------------------------------------------------------

    /// The currently checked-out ref.
    fn current_ref(&self) -> Result<String>;

    /// Whether the working copy has no pending changes.
    fn is_working_copy_clean(&self) -> Result<bool>;

    /// Kind of a named ref.
    fn ref_kind(&self, name: &str) -> Result<RefKind>;

    /// Resolve a ref to a full commit id.
    fn resolve_commit(&self, name: &str) -> Result<String>;

    /// Greatest common ancestor of two refs.
    fn merge_base(&self, a: &str, b: &str) -> Result<String>;

    /// Upstream tracking relationship of a local ref, if configured.
    fn upstream_of(&self, name: &str) -> Result<Option<Upstream>>;

    /// Fetch ref of a mirrored foreign (centralized) upstream, if this
    /// working copy mirrors one.
    fn foreign_mirror_target(&self) -> Result<Option<String>>;

    /// Commits reachable from `to` but not from `from`, newest first.
    fn log_range(&self, from: &str, to: &str) -> Result<Vec<CommitInfo>>;

    /// Commits on the local target that the remote does not have.
    ///
    /// Detection mechanics differ per backend (commit-range comparison for
    /// Git, changeset-phase inspection for Mercurial); the contract is
    /// compare-then-abort, strictly before any mutation.
    fn local_commits_ahead_of_remote(
        &self,
        target: &str,
        remote: &str,
    ) -> Result<Vec<CommitInfo>>;

    /// Tips of sibling forks: commits descending from `root` that are
    /// neither ancestors nor descendants of `tip`.
    fn forked_descendants(&self, root: &str, tip: &str) -> Result<Vec<CommitInfo>>;

    // --- mutations --------------------------------------------------------

    /// Check out a ref.
    fn checkout(&self, name: &str) -> Result<()>;

    /// Fast-forward-only pull of `target` from `remote`.
    ///
    /// A remote with nothing new is a success
    /// ([`PullOutcome::NoRemoteChanges`]), not an error.
    fn pull_fast_forward_only(&self, remote: &str, target: &str) -> Result<PullOutcome>;

    /// Rebase the source ref onto the target tip. On conflict the backend
    /// aborts the in-flight rebase before returning.
    fn rebase(&self, source: &str, target: &str) -> Result<RebaseOutcome>;

    /// Collapse the full source history into a single changeset on the
    /// target tip, recording `message` where the backend commits as part of
    /// the fold. With `keep` the original changesets survive.
    fn collapse(
        &self,
        source: &str,
        target: &str,
        message: &str,
        keep: bool,
    ) -> Result<CollapseOutcome>;

    /// No-fast-forward merge of `source` into the current checkout without
    /// auto-committing. A conflict leaves the working copy mid-merge.
    fn merge_no_commit(&self, source: &str) -> Result<MergeOutcome>;

    /// Relocate a fork onto `dest`: move the changesets reachable from
    /// `fork_tip` but not from `exclude` (the landing ref), leaving the
    /// shared prefix behind.
    fn relocate(&self, fork_tip: &str, exclude: &str, dest: &str) -> Result<()>;

    /// Remove the original source changesets rooted at `root` once their
    /// content has been landed and any forks relocated off them.
    fn discard_history(&self, root: &str) -> Result<()>;

    /// Commit staged state with the given message.
    fn commit(&self, message: &str) -> Result<()>;

    /// Publish the target ref to the remote.
    fn push(&self, target: &str, remote: &str) -> Result<()>;

    /// Compensating rollback: restore the target ref (and working copy) to
    /// `commit`, discarding anything created on it since.
    fn rollback_target_to(&self, target: &str, commit: &str) -> Result<()>;

    /// Delete a local ref.
    fn delete_ref(&self, name: &str, kind: RefKind) -> Result<()>;

    /// Delete the ref's counterpart on the remote.
    fn delete_remote_ref(&self, name: &str, remote: &str, kind: RefKind) -> Result<()>;

    /// The exact command recreating `name` at `commit`, for recovery
    /// messages printed before destructive cleanup.
    fn recover_hint(&self, name: &str, kind: RefKind, commit: &str) -> String;
}

/// Open the repository containing `path`, detecting its backend.
///
/// Walks up from `path` looking for a `.git` or `.hg` directory, the same
/// way both tools locate their own repositories.
pub fn detect_backend(path: &Path) -> Result<Box<dyn VcsBackend>> {
    let start = path
        .canonicalize()
        .map_err(|e| Error::Backend(format!("cannot access {}: {e}", path.display())))?;

    let mut dir: Option<&Path> = Some(&start);
    while let Some(candidate) = dir {
        if candidate.join(".git").exists() {
            return Ok(Box::new(GitBackend::new(candidate.to_path_buf())));
        }
        if candidate.join(".hg").exists() {
            return Ok(Box::new(HgBackend::new(candidate.to_path_buf())));
        }
        dir = candidate.parent();
    }

    Err(Error::Backend(format!(
        "no git or hg repository found above {}",
        start.display()
    )))
}
