//! Core types for tarmac

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kind of a named ref
///
/// Git only has branches. Mercurial distinguishes movable bookmarks from
/// named branches, and requires the source and target of a land to be the
/// same kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RefKind {
    /// A named branch
    Branch,
    /// A movable bookmark pointing at a changeset
    Bookmark,
}

impl std::fmt::Display for RefKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Branch => write!(f, "branch"),
            Self::Bookmark => write!(f, "bookmark"),
        }
    }
}

/// How the source history lands on the target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Collapse the whole source history into one changeset on the target
    Squash,
    /// Always create a merge changeset preserving both parent histories
    Merge,
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Squash => write!(f, "squash"),
            Self::Merge => write!(f, "merge"),
        }
    }
}

/// Behavior flags carried on a [`LandRequest`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LandFlags {
    /// Keep the source ref after landing instead of deleting it
    pub keep: bool,
    /// Stop after the local commit; do not push or finalize
    pub hold: bool,
    /// Print what would land and exit before any mutation
    pub preview: bool,
    /// Also delete the source ref's remote counterpart
    pub delete_remote: bool,
}

/// A fully resolved landing request
///
/// Immutable once resolution finishes; every pipeline stage reads from it
/// and none writes back. Mutable run state lives in the engine's session
/// tracker instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LandRequest {
    /// The ref being landed
    pub source: String,
    /// Kind of the source ref
    pub source_kind: RefKind,
    /// The integration ref the source lands onto
    pub target: String,
    /// The remote the target is published to
    pub remote: String,
    /// Selected merge strategy
    pub strategy: Strategy,
    /// Behavior flags
    pub flags: LandFlags,
    /// Explicit revision id override from `--revision`
    pub revision_override: Option<String>,
}

/// The checkout captured at invocation start
///
/// Created once before any mutation and used as the rollback target. The
/// commit id lets recovery instructions name an exact changeset even after
/// the ref itself is gone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkingCopyState {
    /// Ref that was checked out when the land started
    pub ref_name: String,
    /// Commit the ref resolved to at that moment
    pub commit: String,
}

/// Review status of a revision
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RevisionStatus {
    /// Reviewers accepted the change
    Accepted,
    /// The author announced further changes
    ChangesPlanned,
    /// Any other state (needs review, rejected, ...) with its wire name
    #[serde(untagged)]
    Other(String),
}

impl std::fmt::Display for RevisionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Accepted => write!(f, "accepted"),
            Self::ChangesPlanned => write!(f, "changes-planned"),
            Self::Other(name) => write!(f, "{name}"),
        }
    }
}

/// Review metadata for the change being landed
///
/// Fetched once per run from the review service and treated as read-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RevisionRecord {
    /// Revision id (e.g. "D123")
    pub id: String,
    /// Revision title
    pub title: String,
    /// Current review status
    pub status: RevisionStatus,
    /// Author identity as the review service reports it
    pub author: String,
    /// Revision ids this change depends on that are still open
    #[serde(default)]
    pub open_dependencies: Vec<String>,
    /// Identifier of the diff whose builds gate the land
    #[serde(default)]
    pub diff_id: Option<String>,
    /// Web URI of the revision
    #[serde(default)]
    pub uri: Option<String>,
    /// When the revision was last modified
    #[serde(default)]
    pub modified_at: Option<DateTime<Utc>>,
}

/// Observed state of one build
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildState {
    /// Build finished green
    Passed,
    /// Build is still running
    Building,
    /// Build finished red
    Failed,
}

impl std::fmt::Display for BuildState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Passed => write!(f, "passed"),
            Self::Building => write!(f, "building"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// When a build plan wants to block or warn at land time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LandPolicy {
    /// Warn whenever the build is not green
    Always,
    /// Warn only while the build is still running
    Building,
    /// Warn only once the build has completed
    Complete,
    /// Never warn at land time
    Never,
}

/// Per-plan build status attached to the revision's diff
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildStatus {
    /// Name of the build plan
    pub plan: String,
    /// Observed build state
    pub state: BuildState,
    /// The plan's land-time policy
    pub policy: LandPolicy,
}

/// One commit in a log listing, used for previews and recovery hints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitInfo {
    /// Abbreviated commit id
    pub id: String,
    /// First line of the commit message
    pub summary: String,
}

impl std::fmt::Display for CommitInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.id, self.summary)
    }
}

/// Result of a fast-forward-only pull
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PullOutcome {
    /// The target moved forward to the remote tip
    FastForwarded,
    /// The remote had nothing new; treated as success
    NoRemoteChanges,
}

/// Upstream tracking information for a local ref
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upstream {
    /// The ref the local one tracks (local branch name, or the branch name
    /// on the remote)
    pub ref_name: String,
    /// Remote the tracked ref lives on; `None` for a local-to-local
    /// tracking relationship
    pub remote: Option<String>,
}
