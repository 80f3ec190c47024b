//! The landing pipeline
//!
//! Orchestration of the full publish step:
//!
//! 1. Gather - clean check, original-checkout snapshot, config, tracking
//! 2. Resolve - source/target/remote/strategy into an immutable request
//! 3. Review preflight - revision lookup, status/dependency gates, message
//! 4. Execute - sync, squash or merge, build gate, commit, push, cleanup
//!
//! Stages either advance or raise a typed fatal error; any error after the
//! first mutating call unwinds through [`engine::LandSession::rollback`].

pub mod alternates;
pub mod cleanup;
pub mod engine;
pub mod publish;
pub mod resolve;
pub mod sync;

pub use alternates::{resolve_alternates, AlternateDecision};
pub use cleanup::{cleanup, CleanupReport};
pub use engine::{execute_strategy, EngineOutcome, EngineState, LandSession};
pub use publish::{
    builds_requiring_confirmation, preflight_review, publish, resolve_revision, PublishOutcome,
    ReviewedChange,
};
pub use resolve::{
    resolve_refs, resolve_remote_for_target, resolve_source, select_strategy, tracking_chain,
    validate_refs, ResolutionContext, ResolvedRefs, StrategyContext,
};
pub use sync::sync_target;

use crate::backend::VcsBackend;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::interact::UserInteraction;
use crate::review::ReviewService;
use crate::types::{
    CommitInfo, LandFlags, LandRequest, RevisionRecord, WorkingCopyState,
};
use tracing::{debug, info};

/// Raw command-line inputs to a land
#[derive(Debug, Clone, Default)]
pub struct LandOptions {
    /// Positional refs (0 or 1 expected)
    pub refs: Vec<String>,
    /// `--onto`
    pub onto: Option<String>,
    /// `--remote`
    pub remote: Option<String>,
    /// `--merge`
    pub merge: bool,
    /// `--squash`
    pub squash: bool,
    /// `--keep-branch`
    pub keep_branch: bool,
    /// `--delete-remote`
    pub delete_remote: bool,
    /// `--revision <id>`
    pub revision: Option<String>,
    /// `--hold`
    pub hold: bool,
    /// `--preview`
    pub preview: bool,
}

/// How a land run ended
#[derive(Debug)]
pub enum LandOutcome {
    /// `--preview`: nothing was touched
    Previewed {
        /// The resolved request
        request: LandRequest,
        /// The revision that would land
        revision: RevisionRecord,
        /// The commits that would land, newest first
        commits: Vec<CommitInfo>,
    },
    /// `--hold`: committed locally, nothing pushed or finalized
    Held {
        /// The resolved request
        request: LandRequest,
        /// The revision that was committed
        revision: RevisionRecord,
    },
    /// Pushed, finalized, and cleaned up
    Landed {
        /// The resolved request
        request: LandRequest,
        /// The landed revision
        revision: RevisionRecord,
        /// What cleanup did
        cleanup: CleanupReport,
    },
}

/// Run the full landing pipeline.
#[allow(clippy::too_many_lines, clippy::future_not_send)]
pub async fn land(
    backend: &dyn VcsBackend,
    review: &dyn ReviewService,
    interact: &dyn UserInteraction,
    config: &Config,
    options: &LandOptions,
) -> Result<LandOutcome> {
    // ========================================================================
    // Phase 1: GATHER - precondition checks and resolution inputs
    // ========================================================================

    if !backend.is_working_copy_clean()? {
        return Err(Error::Precondition(
            "the working copy has uncommitted changes; commit or shelve them first".to_string(),
        ));
    }

    let current_ref = match backend.current_ref() {
        Ok(name) => Some(name),
        // A detached or unnamed checkout only matters when it has to stand
        // in for the source.
        Err(Error::Precondition(_)) => None,
        Err(e) => return Err(e),
    };

    let original = match current_ref {
        Some(ref name) => WorkingCopyState {
            ref_name: name.clone(),
            commit: backend.resolve_commit(name)?,
        },
        None => {
            return Err(Error::Config(
                "cannot land from a detached checkout; check out a branch or bookmark"
                    .to_string(),
            ));
        }
    };

    let mut ctx = ResolutionContext {
        explicit_refs: options.refs.clone(),
        current_ref,
        onto_flag: options.onto.clone(),
        remote_flag: options.remote.clone(),
        configured_onto: config.land.onto.clone(),
        configured_remote: config.land.remote.clone(),
        source_tracking: None,
        mirror_target: backend.foreign_mirror_target()?,
        convention_target: backend.default_target().to_string(),
        convention_remote: backend.default_remote().to_string(),
    };

    // ========================================================================
    // Phase 2: RESOLVE - the immutable request
    // ========================================================================

    let source = resolve_source(&ctx)?;
    ctx.source_tracking = tracking_chain(backend, &source)?;

    let refs = resolve_refs(&ctx)?;
    let remote = resolve_remote_for_target(backend, &ctx, &refs.target, &refs.remote)?;

    let strategy = select_strategy(StrategyContext {
        merge_flag: options.merge,
        squash_flag: options.squash,
        immutable_history: backend.has_immutable_history(),
        supports_rebase: backend.supports_rebase(),
        supports_strict_merge: backend.supports_strict_merge(),
    })?;

    let source_kind = backend.ref_kind(&refs.source)?;
    let target_kind = backend.ref_kind(&refs.target)?;
    validate_refs(
        &refs.source,
        &refs.target,
        source_kind,
        target_kind,
        backend.requires_homogeneous_ref_kinds(),
    )?;

    let request = LandRequest {
        source: refs.source,
        source_kind,
        target: refs.target,
        remote,
        strategy,
        flags: LandFlags {
            keep: options.keep_branch,
            hold: options.hold,
            preview: options.preview,
            delete_remote: options.delete_remote,
        },
        revision_override: options.revision.clone(),
    };
    info!(
        source = %request.source,
        target = %request.target,
        remote = %request.remote,
        strategy = %request.strategy,
        "resolved land request"
    );

    let commits = backend.log_range(&request.target, &request.source)?;
    if commits.is_empty() {
        return Err(Error::Precondition(format!(
            "'{}' has no commits that are not already on '{}'; nothing to land",
            request.source, request.target
        )));
    }

    if request.flags.preview {
        let revision = resolve_revision(review, &request).await?;
        return Ok(LandOutcome::Previewed {
            request,
            revision,
            commits,
        });
    }

    // ========================================================================
    // Phase 3: REVIEW PREFLIGHT - gates that run before any mutation
    // ========================================================================

    let change = preflight_review(review, interact, &request).await?;

    // ========================================================================
    // Phase 4: EXECUTE - mutations, compensated on failure
    // ========================================================================

    let mut session = LandSession::new(original);
    let result = execute(
        backend, review, interact, &request, &change, &commits, &mut session,
    )
    .await;

    match result {
        Ok(outcome) => Ok(outcome),
        Err(e) => {
            debug!(state = ?session.state(), "landing failed; compensating");
            session.rollback(backend, &request.target);
            Err(e)
        }
    }
}

/// The mutating tail of the pipeline, separated so the caller can unwind
/// the session on any error.
#[allow(clippy::future_not_send)]
async fn execute(
    backend: &dyn VcsBackend,
    review: &dyn ReviewService,
    interact: &dyn UserInteraction,
    request: &LandRequest,
    change: &ReviewedChange,
    commits: &[CommitInfo],
    session: &mut LandSession,
) -> Result<LandOutcome> {
    sync_target(backend, request, session)?;

    let engine_outcome = execute_strategy(
        backend,
        interact,
        request,
        session,
        commits,
        &change.message,
    )?;

    let publish_outcome = publish(
        backend,
        review,
        interact,
        request,
        session,
        &engine_outcome,
        change,
    )
    .await?;

    match publish_outcome {
        PublishOutcome::Held => Ok(LandOutcome::Held {
            request: request.clone(),
            revision: change.revision.clone(),
        }),
        PublishOutcome::Pushed => {
            let original = session.original().clone();
            let report = cleanup(backend, request, &original, engine_outcome.effective_keep)?;
            Ok(LandOutcome::Landed {
                request: request.clone(),
                revision: change.revision.clone(),
                cleanup: report,
            })
        }
    }
}
