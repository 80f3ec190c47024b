//! Shared test fixtures
//!
//! These are test utilities - not all may be used by every test file.

#![allow(dead_code)]

mod mock;

pub use mock::{MockReviewService, MockVcsBackend, ScriptedPrompter};

use tarmac::types::{
    BuildState, BuildStatus, CommitInfo, LandPolicy, RevisionRecord, RevisionStatus,
};

/// A commit with an id and one-line summary.
pub fn make_commit(id: &str, summary: &str) -> CommitInfo {
    CommitInfo {
        id: id.to_string(),
        summary: summary.to_string(),
    }
}

/// An accepted revision with a diff attached.
pub fn make_accepted_revision(id: &str, title: &str) -> RevisionRecord {
    make_revision(id, title, RevisionStatus::Accepted)
}

/// A revision in an arbitrary status.
pub fn make_revision(id: &str, title: &str, status: RevisionStatus) -> RevisionRecord {
    RevisionRecord {
        id: id.to_string(),
        title: title.to_string(),
        status,
        author: "alice".to_string(),
        open_dependencies: vec![],
        diff_id: Some(format!("diff-{id}")),
        uri: Some(format!("https://review.example.com/{id}")),
        modified_at: None,
    }
}

/// A build status row.
pub fn make_build(plan: &str, state: BuildState, policy: LandPolicy) -> BuildStatus {
    BuildStatus {
        plan: plan.to_string(),
        state,
        policy,
    }
}
