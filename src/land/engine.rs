//! MergeEngine - execute the chosen strategy, tracking what to undo
//!
//! The engine is a small state machine:
//!
//! ```text
//! INIT -> REBASED (squash only, conditional) -> COLLAPSED_OR_MERGED
//!      -> COMMITTED -> PUSHED
//! ```
//!
//! Any failure after the first mutating call rolls the working copy back to
//! the state captured at invocation start. The one exception is a
//! conflicting strict merge, which is deliberately left in place with
//! resolve-or-abort instructions.

use crate::backend::{CollapseOutcome, MergeOutcome, RebaseOutcome, VcsBackend};
use crate::error::{Error, Result};
use crate::interact::UserInteraction;
use crate::land::alternates::{resolve_alternates, AlternateDecision};
use crate::types::{CommitInfo, LandRequest, Strategy, WorkingCopyState};
use tracing::{debug, info, warn};

/// Pipeline progress, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum EngineState {
    /// Nothing mutated yet
    Init,
    /// Source rebased onto the target tip
    Rebased,
    /// Source collapsed or merged onto the target
    CollapsedOrMerged,
    /// Final changeset committed
    Committed,
    /// Target pushed to the remote
    Pushed,
    /// A failure was compensated
    RolledBack,
}

/// Mutable run state: the rollback snapshot plus how far execution got.
///
/// This is the only mutable state threaded through the pipeline; the
/// request itself stays immutable after resolution.
#[derive(Debug)]
pub struct LandSession {
    original: WorkingCopyState,
    state: EngineState,
    target_tip_before: Option<String>,
    checkout_moved: bool,
    leave_in_place: bool,
}

impl LandSession {
    /// Start a session rolling back to `original`.
    pub fn new(original: WorkingCopyState) -> Self {
        Self {
            original,
            state: EngineState::Init,
            target_tip_before: None,
            checkout_moved: false,
            leave_in_place: false,
        }
    }

    /// The checkout captured at invocation start.
    pub fn original(&self) -> &WorkingCopyState {
        &self.original
    }

    /// Current pipeline state.
    pub fn state(&self) -> EngineState {
        self.state
    }

    /// Record that the working copy left the original checkout.
    pub fn note_checkout_moved(&mut self) {
        self.checkout_moved = true;
    }

    /// Record the target tip the rollback restores.
    pub fn note_target_tip(&mut self, tip: String) {
        self.target_tip_before = Some(tip);
    }

    /// Advance the state machine.
    pub fn advance(&mut self, state: EngineState) {
        debug!(from = ?self.state, to = ?state, "engine state");
        self.state = state;
    }

    fn mark_leave_in_place(&mut self) {
        self.leave_in_place = true;
    }

    /// Whether a failure now requires compensation.
    pub fn needs_rollback(&self) -> bool {
        !self.leave_in_place
            && (self.checkout_moved || self.state > EngineState::Init)
    }

    /// Undo whatever the failed run left behind, best effort.
    ///
    /// Content mutations are reverted by restoring the target tip recorded
    /// before the first mutation; a push that already succeeded is not
    /// undone, only the checkout is restored. Rollback failures are logged,
    /// not raised - the original error stays the primary one.
    pub fn rollback(&mut self, backend: &dyn VcsBackend, target: &str) {
        if !self.needs_rollback() {
            debug!("nothing to roll back");
            return;
        }

        if self.state > EngineState::Init && self.state < EngineState::Pushed {
            if let Some(ref tip) = self.target_tip_before {
                info!(%target, %tip, "restoring target after failure");
                if let Err(e) = backend.rollback_target_to(target, tip) {
                    warn!(error = %e, "failed to restore '{target}'; restore it manually to {tip}");
                }
            }
        }

        if self.checkout_moved {
            if let Err(e) = backend.checkout(&self.original.ref_name) {
                warn!(
                    error = %e,
                    "failed to restore checkout of '{}'",
                    self.original.ref_name
                );
            }
        }

        self.advance(EngineState::RolledBack);
    }
}

/// What the engine produced for the later pipeline stages
#[derive(Debug, Clone)]
pub struct EngineOutcome {
    /// The collapse already committed (Mercurial fold); PublishGuard skips
    /// its commit step
    pub committed: bool,
    /// The landed changeset, when it exists already
    pub landed_commit: Option<String>,
    /// `keep` after alternate handling possibly forced it on
    pub effective_keep: bool,
}

/// Execute the chosen strategy.
///
/// `commits` is the source history being landed (newest first), computed
/// before any mutation; its oldest entry is the landing ref's root, which
/// anchors fork detection.
pub fn execute_strategy(
    backend: &dyn VcsBackend,
    interact: &dyn UserInteraction,
    request: &LandRequest,
    session: &mut LandSession,
    commits: &[CommitInfo],
    message: &str,
) -> Result<EngineOutcome> {
    match request.strategy {
        Strategy::Squash => squash(backend, interact, request, session, commits, message),
        Strategy::Merge => strict_merge(backend, request, session),
    }
}

fn squash(
    backend: &dyn VcsBackend,
    interact: &dyn UserInteraction,
    request: &LandRequest,
    session: &mut LandSession,
    commits: &[CommitInfo],
    message: &str,
) -> Result<EngineOutcome> {
    let root = commits
        .last()
        .map(|c| c.id.clone())
        .ok_or_else(|| Error::Internal("squash invoked with no commits to land".to_string()))?;

    // Sibling forks must be dealt with before the collapse rewrites the
    // history they hang off.
    let mut keep = request.flags.keep;
    let mut forks_to_relocate: Vec<CommitInfo> = Vec::new();
    if !keep && backend.has_forking_branches() {
        let forks = backend.forked_descendants(&root, &request.source)?;
        if !forks.is_empty() {
            match resolve_alternates(interact, &request.source, &forks)? {
                AlternateDecision::Keep => keep = true,
                AlternateDecision::Rebase => forks_to_relocate = forks,
            }
        }
    }

    let target_tip = session
        .target_tip_before
        .clone()
        .ok_or_else(|| Error::Internal("squash before sync".to_string()))?;
    let base = backend.merge_base(&request.source, &request.target)?;

    if base == target_tip {
        debug!("target tip unchanged since fork point; rebase skipped");
    } else if backend.collapse_relocates() {
        debug!("collapse relocates the source itself; separate rebase skipped");
    } else {
        match backend.rebase(&request.source, &request.target)? {
            RebaseOutcome::Completed => session.advance(EngineState::Rebased),
            RebaseOutcome::Conflict => {
                return Err(Error::Conflict {
                    operation: "rebase".to_string(),
                    guidance: format!(
                        "the rebase was aborted; rebase '{}' onto '{}' manually, \
                         resolve the conflicts, and run land again",
                        request.source, request.target
                    ),
                });
            }
        }
    }

    // Forks pending relocation still hang off the originals, so the
    // collapse must leave those originals in place until the forks move.
    let keep_through_collapse = keep || !forks_to_relocate.is_empty();
    let CollapseOutcome {
        committed,
        landed_commit,
    } = backend.collapse(&request.source, &request.target, message, keep_through_collapse)?;
    session.advance(EngineState::CollapsedOrMerged);
    if committed {
        session.advance(EngineState::Committed);
    }

    if !forks_to_relocate.is_empty() {
        let dest = landed_commit
            .clone()
            .unwrap_or_else(|| request.target.clone());
        for fork in &forks_to_relocate {
            info!(fork = %fork.id, %dest, "relocating sibling fork");
            backend.relocate(&fork.id, &request.source, &dest)?;
        }
        if !keep {
            backend.discard_history(&root)?;
        }
    }

    Ok(EngineOutcome {
        committed,
        landed_commit,
        effective_keep: keep,
    })
}

fn strict_merge(
    backend: &dyn VcsBackend,
    request: &LandRequest,
    session: &mut LandSession,
) -> Result<EngineOutcome> {
    if !backend.supports_strict_merge() {
        return Err(Error::UnsupportedStrategy(format!(
            "{} cannot merge without fast-forwarding",
            backend.name()
        )));
    }

    backend.checkout(&request.target)?;
    match backend.merge_no_commit(&request.source)? {
        MergeOutcome::Merged => {
            session.advance(EngineState::CollapsedOrMerged);
            Ok(EngineOutcome {
                committed: false,
                landed_commit: None,
                effective_keep: request.flags.keep,
            })
        }
        MergeOutcome::Conflict => {
            // The half-done merge carries the user's conflict markers;
            // throwing it away would discard their only way to resolve.
            session.mark_leave_in_place();
            Err(Error::Conflict {
                operation: "merge".to_string(),
                guidance: format!(
                    "the working copy is mid-merge; resolve the conflicts and \
                     commit, or abort the merge to restore '{}'",
                    request.target
                ),
            })
        }
    }
}
