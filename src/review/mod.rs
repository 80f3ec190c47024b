//! Review service
//!
//! Provides a unified interface to the code-review server: revision lookup,
//! commit message construction, build status, and finalization. The
//! pipeline consumes the trait; tests inject a recording mock.

mod http;

pub use http::HttpReviewService;

use crate::error::Result;
use crate::types::{BuildStatus, RevisionRecord};
use async_trait::async_trait;

/// Review-system operations the landing pipeline consumes
#[async_trait]
pub trait ReviewService: Send + Sync {
    /// All open revisions associated with a source ref.
    ///
    /// Zero or multiple matches are not errors here; the caller decides
    /// (zero is a configuration problem, multiple is an ambiguity the user
    /// resolves with `--revision`).
    async fn resolve_revision_for_ref(&self, ref_name: &str) -> Result<Vec<RevisionRecord>>;

    /// Look up one revision by id.
    async fn revision_by_id(&self, id: &str) -> Result<RevisionRecord>;

    /// The commit message the review system renders for a revision. This is
    /// the message recorded on the landed changeset.
    async fn build_commit_message(&self, revision_id: &str) -> Result<String>;

    /// Build statuses attached to a diff. An empty list means no buildable
    /// information exists, which never blocks a land.
    async fn query_build_status(&self, diff_id: &str) -> Result<Vec<BuildStatus>>;

    /// Revisions this one depends on that are still open.
    async fn query_open_dependencies(&self, revision_id: &str) -> Result<Vec<RevisionRecord>>;

    /// Mark the revision as landed/closed after a successful push.
    async fn finalize_revision(&self, revision_id: &str) -> Result<()>;
}
