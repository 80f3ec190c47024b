//! Target, remote, and strategy resolution - pure functions
//!
//! This module contains the pure, testable logic deciding what lands where.
//! No I/O happens in the core functions - the pipeline gathers everything
//! (current ref, tracking chain, mirror target, config) beforehand and
//! passes it in, so the precedence rules are easy to unit test.

use crate::backend::VcsBackend;
use crate::error::{Error, Result};
use crate::types::{RefKind, Strategy, Upstream};
use std::collections::HashSet;
use tracing::debug;

/// Upper bound on tracking-chain hops; anything deeper is a config cycle.
const MAX_TRACKING_DEPTH: usize = 10;

/// Everything resolution needs, gathered before any decision
#[derive(Debug, Clone, Default)]
pub struct ResolutionContext {
    /// Positional refs from the command line (0 or 1 expected)
    pub explicit_refs: Vec<String>,
    /// The currently checked-out ref, when one could be determined
    pub current_ref: Option<String>,
    /// `--onto` flag
    pub onto_flag: Option<String>,
    /// `--remote` flag
    pub remote_flag: Option<String>,
    /// Configured default target
    pub configured_onto: Option<String>,
    /// Configured default remote
    pub configured_remote: Option<String>,
    /// Recursively resolved upstream of the source ref
    pub source_tracking: Option<Upstream>,
    /// Fetch ref of a mirrored centralized upstream (git-svn)
    pub mirror_target: Option<String>,
    /// Backend convention target ("master" / "default")
    pub convention_target: String,
    /// Backend convention remote ("origin" / "default")
    pub convention_remote: String,
}

/// Resolved source/target/remote triple
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedRefs {
    /// The ref being landed
    pub source: String,
    /// The integration ref
    pub target: String,
    /// The remote to publish to
    pub remote: String,
}

/// Decide source, target, and remote from the gathered context.
///
/// Target precedence: flag > mirror fetch ref > tracking > configured >
/// convention. Remote precedence: flag > remote implied by the target's
/// tracking (supplied by the caller via [`resolve_remote_for_target`]) >
/// configured > convention; this function applies the flag/configured/
/// convention part and leaves the tracking-implied hole to the caller
/// because it needs a backend query against the resolved target.
pub fn resolve_refs(ctx: &ResolutionContext) -> Result<ResolvedRefs> {
    let source = resolve_source(ctx)?;

    let target = ctx
        .onto_flag
        .clone()
        .or_else(|| ctx.mirror_target.clone())
        .or_else(|| ctx.source_tracking.as_ref().map(|u| u.ref_name.clone()))
        .or_else(|| ctx.configured_onto.clone())
        .unwrap_or_else(|| ctx.convention_target.clone());

    let remote = ctx
        .remote_flag
        .clone()
        .or_else(|| ctx.source_tracking.as_ref().and_then(|u| u.remote.clone()))
        .or_else(|| ctx.configured_remote.clone())
        .unwrap_or_else(|| ctx.convention_remote.clone());

    debug!(%source, %target, %remote, "resolved refs");
    Ok(ResolvedRefs {
        source,
        target,
        remote,
    })
}

/// Determine the source ref alone: the single explicit positional ref, or
/// the current checkout. Anything else is a configuration error.
///
/// Exposed separately because the source must be known before its tracking
/// chain can be gathered into the [`ResolutionContext`].
pub fn resolve_source(ctx: &ResolutionContext) -> Result<String> {
    match ctx.explicit_refs.len() {
        0 => ctx.current_ref.clone().ok_or_else(|| {
            Error::Config(
                "cannot determine a source ref from the current checkout; \
                 name the ref to land explicitly"
                    .to_string(),
            )
        }),
        1 => Ok(ctx.explicit_refs[0].clone()),
        n => Err(Error::Config(format!(
            "exactly one source ref expected, got {n}: {}",
            ctx.explicit_refs.join(", ")
        ))),
    }
}

/// Refine the remote using the resolved target's own tracking relationship.
///
/// Applies the "remote implied by the resolved target's upstream tracking
/// ref" step of the precedence order, which can only run once the target is
/// known. Flag and configuration still win; only a convention-default
/// remote is replaced.
pub fn resolve_remote_for_target(
    backend: &dyn VcsBackend,
    ctx: &ResolutionContext,
    target: &str,
    remote: &str,
) -> Result<String> {
    let was_fallback = ctx.remote_flag.is_none()
        && ctx
            .source_tracking
            .as_ref()
            .is_none_or(|u| u.remote.is_none())
        && ctx.configured_remote.is_none();
    if !was_fallback {
        return Ok(remote.to_string());
    }

    if let Some(upstream) = tracking_chain(backend, target)? {
        if let Some(implied) = upstream.remote {
            debug!(%target, %implied, "remote implied by target tracking");
            return Ok(implied);
        }
    }
    Ok(remote.to_string())
}

/// Follow a ref's upstream tracking relationships until one names a remote.
///
/// Local-to-local tracking links are walked through; the first hop carrying
/// a remote terminates the walk. A chain that ends without naming a remote
/// yields its final local ref with `remote: None`.
pub fn tracking_chain(backend: &dyn VcsBackend, start: &str) -> Result<Option<Upstream>> {
    let mut seen = HashSet::new();
    let mut at = start.to_string();
    let mut last: Option<Upstream> = None;

    for _ in 0..MAX_TRACKING_DEPTH {
        if !seen.insert(at.clone()) {
            debug!(%start, "tracking chain cycles; stopping");
            break;
        }
        let Some(upstream) = backend.upstream_of(&at)? else {
            break;
        };
        if upstream.remote.is_some() {
            return Ok(Some(upstream));
        }
        at = upstream.ref_name.clone();
        last = Some(upstream);
    }

    Ok(last)
}

/// Inputs to strategy selection
#[derive(Debug, Clone, Copy)]
pub struct StrategyContext {
    /// `--merge` was given
    pub merge_flag: bool,
    /// `--squash` was given
    pub squash_flag: bool,
    /// Backend treats history as immutable
    pub immutable_history: bool,
    /// Backend can rebase
    pub supports_rebase: bool,
    /// Backend can merge without auto-committing
    pub supports_strict_merge: bool,
}

/// Pick squash or strict merge, honoring flags and backend conventions.
///
/// Squash is the default; an immutable-history backend flips the default to
/// merge and squashing there requires the explicit flag. Selecting an
/// unavailable mode fails before any mutation.
pub fn select_strategy(ctx: StrategyContext) -> Result<Strategy> {
    if ctx.merge_flag && ctx.squash_flag {
        return Err(Error::Validation(
            "--merge and --squash are mutually exclusive".to_string(),
        ));
    }

    let strategy = if ctx.merge_flag {
        Strategy::Merge
    } else if ctx.immutable_history && !ctx.squash_flag {
        Strategy::Merge
    } else {
        Strategy::Squash
    };

    match strategy {
        Strategy::Squash if !ctx.supports_rebase => Err(Error::Precondition(
            "this backend cannot rebase; land with --merge instead".to_string(),
        )),
        Strategy::Merge if !ctx.supports_strict_merge => Err(Error::UnsupportedStrategy(
            "this backend cannot create a no-fast-forward merge".to_string(),
        )),
        _ => Ok(strategy),
    }
}

/// Validate the resolved request before the first backend mutation.
pub fn validate_refs(
    source: &str,
    target: &str,
    source_kind: RefKind,
    target_kind: RefKind,
    requires_homogeneous: bool,
) -> Result<()> {
    if source == target {
        return Err(Error::Validation(format!(
            "refusing to land '{source}' onto itself"
        )));
    }
    if requires_homogeneous && source_kind != target_kind {
        return Err(Error::Validation(format!(
            "'{source}' is a {source_kind} but '{target}' is a {target_kind}; \
             this backend can only land like onto like"
        )));
    }
    Ok(())
}
