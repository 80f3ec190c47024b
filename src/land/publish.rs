//! PublishGuard - review gates, the build gate, commit, and push
//!
//! Two groups of gates live here. The preflight gates run before any
//! mutation: revision lookup, review-status confirmation, open-dependency
//! confirmation, and fetching the final commit message. The build gate runs
//! last before the push, against the freshest build information available.

use crate::backend::VcsBackend;
use crate::error::{Error, Result};
use crate::interact::UserInteraction;
use crate::land::engine::{EngineOutcome, EngineState, LandSession};
use crate::review::ReviewService;
use crate::types::{BuildState, BuildStatus, LandPolicy, LandRequest, RevisionRecord, RevisionStatus};
use tracing::{debug, info};

/// Revision metadata plus the message destined for the landed changeset
#[derive(Debug, Clone)]
pub struct ReviewedChange {
    /// The revision being landed
    pub revision: RevisionRecord,
    /// Commit message rendered by the review service
    pub message: String,
}

/// How publication ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishOutcome {
    /// Committed and pushed; the revision was finalized
    Pushed,
    /// Committed locally and held back from the remote (`--hold`)
    Held,
}

/// Resolve the revision and run every before-mutation review gate.
///
/// Gate order: ambiguity, review status, open dependencies. The commit
/// message is fetched here too so a review-service outage aborts before
/// anything has been touched.
#[allow(clippy::future_not_send)]
pub async fn preflight_review(
    review: &dyn ReviewService,
    interact: &dyn UserInteraction,
    request: &LandRequest,
) -> Result<ReviewedChange> {
    let revision = resolve_revision(review, request).await?;
    info!(revision = %revision.id, title = %revision.title, "landing revision");

    if revision.status != RevisionStatus::Accepted {
        let prompt = format!(
            "revision {} ({}) is in status '{}', not accepted; land anyway?",
            revision.id, revision.title, revision.status
        );
        if !interact.confirm(&prompt, false)? {
            return Err(Error::UserAbort(format!(
                "revision {} is not accepted",
                revision.id
            )));
        }
    }

    let dependencies = review.query_open_dependencies(&revision.id).await?;
    if !dependencies.is_empty() {
        let listing = dependencies
            .iter()
            .map(|d| format!("  {}: {}", d.id, d.title))
            .collect::<Vec<_>>()
            .join("\n");
        let prompt = format!(
            "revision {} depends on open revision(s):\n{listing}\nland anyway?",
            revision.id
        );
        if !interact.confirm(&prompt, false)? {
            return Err(Error::UserAbort(format!(
                "revision {} has open dependencies",
                revision.id
            )));
        }
    }

    let message = review.build_commit_message(&revision.id).await?;
    Ok(ReviewedChange { revision, message })
}

/// Find the one revision this request lands.
///
/// An explicit `--revision` id wins; otherwise exactly one open revision
/// must be associated with the source ref. Zero matches point at missing
/// setup, several matches are listed for the user to disambiguate. Either
/// way nothing has been mutated yet.
#[allow(clippy::future_not_send)]
pub async fn resolve_revision(
    review: &dyn ReviewService,
    request: &LandRequest,
) -> Result<RevisionRecord> {
    match request.revision_override {
        Some(ref id) => review.revision_by_id(id).await,
        None => {
            let mut matches = review.resolve_revision_for_ref(&request.source).await?;
            match matches.len() {
                0 => Err(Error::Config(format!(
                    "no open revision found for '{}'; pass --revision <id>",
                    request.source
                ))),
                1 => Ok(matches.remove(0)),
                _ => Err(Error::AmbiguousRevision(
                    matches.into_iter().map(|r| (r.id, r.title)).collect(),
                )),
            }
        }
    }
}

/// The builds whose state should stop and ask before a land.
///
/// A build is filtered out when it passed, when its plan opted out of land
/// warnings, or when the plan's condition does not match the build's
/// completeness: a `building` policy only cares about builds still running,
/// a `complete` policy only about finished ones.
pub fn builds_requiring_confirmation(builds: &[BuildStatus]) -> Vec<&BuildStatus> {
    builds
        .iter()
        .filter(|build| {
            if build.state == BuildState::Passed {
                return false;
            }
            match build.policy {
                LandPolicy::Never => false,
                LandPolicy::Always => true,
                LandPolicy::Building => build.state == BuildState::Building,
                LandPolicy::Complete => build.state != BuildState::Building,
            }
        })
        .collect()
}

/// Gate on builds, attach the final message, push, and finalize.
///
/// A failed push is compensated by the caller's rollback (strip the fresh
/// commit, restore the original checkout); this function reports it as
/// [`Error::PushFailure`] with the backend's own message.
#[allow(clippy::future_not_send)]
pub async fn publish(
    backend: &dyn VcsBackend,
    review: &dyn ReviewService,
    interact: &dyn UserInteraction,
    request: &LandRequest,
    session: &mut LandSession,
    engine_outcome: &EngineOutcome,
    change: &ReviewedChange,
) -> Result<PublishOutcome> {
    // Build gate. Missing buildable information never blocks.
    if let Some(ref diff_id) = change.revision.diff_id {
        let builds = review.query_build_status(diff_id).await?;
        let pending = builds_requiring_confirmation(&builds);
        if pending.is_empty() {
            debug!(diff = %diff_id, total = builds.len(), "no builds require confirmation");
        } else {
            let listing = pending
                .iter()
                .map(|b| format!("  {} ({})", b.plan, b.state))
                .collect::<Vec<_>>()
                .join("\n");
            let prompt = format!(
                "builds for {} are not green:\n{listing}\nland anyway?",
                change.revision.id
            );
            if !interact.confirm(&prompt, false)? {
                return Err(Error::UserAbort(format!(
                    "builds for {} are not green",
                    change.revision.id
                )));
            }
        }
    }

    if !engine_outcome.committed {
        backend.commit(&change.message)?;
        session.advance(EngineState::Committed);
    }

    if request.flags.hold {
        info!(target = %request.target, "holding; nothing pushed");
        return Ok(PublishOutcome::Held);
    }

    if let Err(e) = backend.push(&request.target, &request.remote) {
        return Err(Error::PushFailure {
            remote: request.remote.clone(),
            message: e.to_string(),
        });
    }
    session.advance(EngineState::Pushed);

    review.finalize_revision(&change.revision.id).await?;
    Ok(PublishOutcome::Pushed)
}
