//! Error types for tarmac
//!
//! Landing is all-or-nothing: every variant here is fatal and unwinds the
//! pipeline through the rollback path. The only normalized pseudo-error is a
//! fast-forward pull reporting "no changes", which the backends translate to
//! a successful [`crate::types::PullOutcome::NoRemoteChanges`].

use thiserror::Error;

/// Result type alias using our Error
pub type Result<T> = std::result::Result<T, Error>;

/// All errors the landing pipeline can surface
#[derive(Debug, Error)]
pub enum Error {
    /// Conflicting flags, self-land, or mismatched ref kinds
    #[error("invalid request: {0}")]
    Validation(String),

    /// Source/target/remote could not be determined, or config is unusable
    #[error("configuration error: {0}")]
    Config(String),

    /// More than one open revision matched the source ref
    #[error("multiple revisions match this ref:\n{}\nuse --revision to pick one", format_candidates(.0))]
    AmbiguousRevision(Vec<(String, String)>),

    /// A precondition failed before any mutation (dirty working copy,
    /// missing backend capability)
    #[error("precondition failed: {0}")]
    Precondition(String),

    /// The local target carries commits the remote does not have
    #[error(
        "local '{target}' is ahead of '{remote}'; landing would publish unrelated work:\n{}",
        format_commits(.commits)
    )]
    Divergence {
        /// The integration ref that diverged
        target: String,
        /// The remote it was compared against
        remote: String,
        /// One-line summaries of the commits only present locally
        commits: Vec<String>,
    },

    /// The requested strategy is not available on this backend
    #[error("unsupported strategy: {0}")]
    UnsupportedStrategy(String),

    /// A rebase or merge hit conflicts
    #[error("{operation} produced conflicts.\n{guidance}")]
    Conflict {
        /// The operation that conflicted ("rebase", "merge")
        operation: String,
        /// How to resolve or abort, for the user
        guidance: String,
    },

    /// The push was rejected or failed after the commit was created
    #[error("push to '{remote}' failed: {message}")]
    PushFailure {
        /// Remote the push targeted
        remote: String,
        /// Error text from the backend
        message: String,
    },

    /// The user declined a confirmation or made an invalid choice
    #[error("aborted: {0}")]
    UserAbort(String),

    /// A version-control subprocess failed
    #[error("vcs error: {0}")]
    Backend(String),

    /// The review service returned an error or unusable data
    #[error("review service error: {0}")]
    Review(String),

    /// Reading an interactive answer failed
    #[error("prompt error: {0}")]
    Interact(String),

    /// Internal invariant violation
    #[error("internal error: {0}")]
    Internal(String),
}

fn format_candidates(candidates: &[(String, String)]) -> String {
    candidates
        .iter()
        .map(|(id, title)| format!("  {id}: {title}"))
        .collect::<Vec<_>>()
        .join("\n")
}

fn format_commits(commits: &[String]) -> String {
    commits
        .iter()
        .map(|c| format!("  {c}"))
        .collect::<Vec<_>>()
        .join("\n")
}
