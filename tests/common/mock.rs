//! Mock services for testing
//!
//! Hand-rolled mocks with call recording and error injection, so pipeline
//! tests can assert what was (and was not) touched. The VCS mock holds a
//! tiny model of a repository: ref kinds, commit ids, the history to land,
//! local-ahead commits, and sibling forks.

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tarmac::backend::{CollapseOutcome, MergeOutcome, RebaseOutcome, VcsBackend};
use tarmac::error::{Error, Result};
use tarmac::interact::UserInteraction;
use tarmac::review::ReviewService;
use tarmac::types::{
    BuildStatus, CommitInfo, PullOutcome, RefKind, RevisionRecord, Upstream,
};

/// Capability switches for the mock backend
#[derive(Debug, Clone, Copy)]
#[allow(clippy::struct_excessive_bools)]
struct Caps {
    supports_rebase: bool,
    immutable_history: bool,
    forking_branches: bool,
    bookmarks: bool,
    homogeneous_kinds: bool,
    strict_merge: bool,
    collapse_relocates: bool,
}

/// Scriptable VCS backend with call recording
///
/// Every operation appends a descriptor like `"push master origin"` to the
/// call log; tests assert on presence, absence, and relative order.
pub struct MockVcsBackend {
    name: &'static str,
    root: PathBuf,
    caps: Caps,
    current_ref: Mutex<String>,
    clean: Mutex<bool>,
    kinds: Mutex<HashMap<String, RefKind>>,
    commits: Mutex<HashMap<String, String>>,
    merge_bases: Mutex<HashMap<(String, String), String>>,
    upstreams: Mutex<HashMap<String, Upstream>>,
    mirror_target: Mutex<Option<String>>,
    history: Mutex<Vec<CommitInfo>>,
    ahead: Mutex<Vec<CommitInfo>>,
    forks: Mutex<Vec<CommitInfo>>,
    pull_outcome: Mutex<PullOutcome>,
    rebase_outcome: Mutex<RebaseOutcome>,
    merge_outcome: Mutex<MergeOutcome>,
    collapse_commits: bool,
    error_on_push: Mutex<Option<String>>,
    calls: Mutex<Vec<String>>,
}

impl MockVcsBackend {
    /// A mutable-history backend: squash by default, staged collapse.
    pub fn git_like() -> Self {
        Self::with_caps(
            "git",
            Caps {
                supports_rebase: true,
                immutable_history: false,
                forking_branches: false,
                bookmarks: false,
                homogeneous_kinds: false,
                strict_merge: true,
                collapse_relocates: false,
            },
            false,
        )
    }

    /// An immutable-history backend: merge by default, committing collapse,
    /// forking branches.
    pub fn hg_like() -> Self {
        Self::with_caps(
            "hg",
            Caps {
                supports_rebase: true,
                immutable_history: true,
                forking_branches: true,
                bookmarks: true,
                homogeneous_kinds: true,
                strict_merge: true,
                collapse_relocates: true,
            },
            true,
        )
    }

    /// Disable rebase support (builder style).
    pub fn without_rebase(mut self) -> Self {
        self.caps.supports_rebase = false;
        self
    }

    /// Disable no-fast-forward merge support (builder style).
    pub fn without_strict_merge(mut self) -> Self {
        self.caps.strict_merge = false;
        self
    }

    fn with_caps(name: &'static str, caps: Caps, collapse_commits: bool) -> Self {
        Self {
            name,
            root: PathBuf::from("/mock/repo"),
            caps,
            current_ref: Mutex::new("feature".to_string()),
            clean: Mutex::new(true),
            kinds: Mutex::new(HashMap::new()),
            commits: Mutex::new(HashMap::new()),
            merge_bases: Mutex::new(HashMap::new()),
            upstreams: Mutex::new(HashMap::new()),
            mirror_target: Mutex::new(None),
            history: Mutex::new(vec![
                CommitInfo {
                    id: "c2".to_string(),
                    summary: "Second commit".to_string(),
                },
                CommitInfo {
                    id: "c1".to_string(),
                    summary: "First commit".to_string(),
                },
            ]),
            ahead: Mutex::new(Vec::new()),
            forks: Mutex::new(Vec::new()),
            pull_outcome: Mutex::new(PullOutcome::FastForwarded),
            rebase_outcome: Mutex::new(RebaseOutcome::Completed),
            merge_outcome: Mutex::new(MergeOutcome::Merged),
            collapse_commits,
            error_on_push: Mutex::new(None),
            calls: Mutex::new(Vec::new()),
        }
    }

    // === Configuration ===

    /// Set the checked-out ref (the rollback target of the run).
    pub fn set_current_ref(&self, name: &str) {
        *self.current_ref.lock().unwrap() = name.to_string();
    }

    /// Make the working copy dirty.
    pub fn set_dirty(&self) {
        *self.clean.lock().unwrap() = false;
    }

    /// Classify a ref.
    pub fn set_ref_kind(&self, name: &str, kind: RefKind) {
        self.kinds.lock().unwrap().insert(name.to_string(), kind);
    }

    /// Pin the commit a ref resolves to.
    pub fn set_commit(&self, name: &str, commit: &str) {
        self.commits
            .lock()
            .unwrap()
            .insert(name.to_string(), commit.to_string());
    }

    /// Pin the merge base of two refs (both argument orders).
    pub fn set_merge_base(&self, a: &str, b: &str, commit: &str) {
        let mut bases = self.merge_bases.lock().unwrap();
        bases.insert((a.to_string(), b.to_string()), commit.to_string());
        bases.insert((b.to_string(), a.to_string()), commit.to_string());
    }

    /// Configure an upstream tracking relationship.
    pub fn set_upstream(&self, name: &str, tracked: &str, remote: Option<&str>) {
        self.upstreams.lock().unwrap().insert(
            name.to_string(),
            Upstream {
                ref_name: tracked.to_string(),
                remote: remote.map(ToString::to_string),
            },
        );
    }

    /// Configure a centralized-mirror fetch ref.
    pub fn set_mirror_target(&self, target: &str) {
        *self.mirror_target.lock().unwrap() = Some(target.to_string());
    }

    /// The history that would land (newest first).
    pub fn set_history(&self, commits: Vec<CommitInfo>) {
        *self.history.lock().unwrap() = commits;
    }

    /// Make the local target ahead of the remote.
    pub fn set_ahead(&self, commits: Vec<CommitInfo>) {
        *self.ahead.lock().unwrap() = commits;
    }

    /// Sibling forks hanging off the source history.
    pub fn set_forks(&self, forks: Vec<CommitInfo>) {
        *self.forks.lock().unwrap() = forks;
    }

    /// Script the rebase outcome.
    pub fn set_rebase_outcome(&self, outcome: RebaseOutcome) {
        *self.rebase_outcome.lock().unwrap() = outcome;
    }

    /// Script the merge outcome.
    pub fn set_merge_outcome(&self, outcome: MergeOutcome) {
        *self.merge_outcome.lock().unwrap() = outcome;
    }

    /// Make `push` fail.
    pub fn fail_push(&self, msg: &str) {
        *self.error_on_push.lock().unwrap() = Some(msg.to_string());
    }

    // === Verification ===

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    /// Every recorded call, in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// Index of the first call starting with `prefix`.
    pub fn call_index(&self, prefix: &str) -> Option<usize> {
        self.calls().iter().position(|c| c.starts_with(prefix))
    }

    /// Assert some call starts with `prefix`.
    pub fn assert_called(&self, prefix: &str) {
        assert!(
            self.call_index(prefix).is_some(),
            "expected a call starting with '{prefix}', got: {:?}",
            self.calls()
        );
    }

    /// Assert no call starts with `prefix`.
    pub fn assert_not_called(&self, prefix: &str) {
        assert!(
            self.call_index(prefix).is_none(),
            "expected no call starting with '{prefix}', got: {:?}",
            self.calls()
        );
    }

    /// Assert the call starting with `earlier` precedes the one starting
    /// with `later`.
    pub fn assert_order(&self, earlier: &str, later: &str) {
        let a = self
            .call_index(earlier)
            .unwrap_or_else(|| panic!("'{earlier}' never called: {:?}", self.calls()));
        let b = self
            .call_index(later)
            .unwrap_or_else(|| panic!("'{later}' never called: {:?}", self.calls()));
        assert!(a < b, "expected '{earlier}' before '{later}': {:?}", self.calls());
    }

    /// Count calls starting with `prefix`.
    pub fn call_count(&self, prefix: &str) -> usize {
        self.calls()
            .iter()
            .filter(|c| c.starts_with(prefix))
            .count()
    }

    /// The ref checked out when the run finished.
    pub fn checked_out(&self) -> String {
        self.current_ref.lock().unwrap().clone()
    }
}

impl VcsBackend for MockVcsBackend {
    fn name(&self) -> &'static str {
        self.name
    }

    fn root(&self) -> &Path {
        &self.root
    }

    fn default_target(&self) -> &'static str {
        if self.caps.immutable_history { "default" } else { "master" }
    }

    fn default_remote(&self) -> &'static str {
        if self.caps.immutable_history { "default" } else { "origin" }
    }

    fn supports_rebase(&self) -> bool {
        self.caps.supports_rebase
    }

    fn has_immutable_history(&self) -> bool {
        self.caps.immutable_history
    }

    fn has_forking_branches(&self) -> bool {
        self.caps.forking_branches
    }

    fn supports_bookmarks(&self) -> bool {
        self.caps.bookmarks
    }

    fn requires_homogeneous_ref_kinds(&self) -> bool {
        self.caps.homogeneous_kinds
    }

    fn supports_strict_merge(&self) -> bool {
        self.caps.strict_merge
    }

    fn collapse_relocates(&self) -> bool {
        self.caps.collapse_relocates
    }

    fn can_delete_remote(&self, kind: RefKind) -> bool {
        !self.caps.bookmarks || kind == RefKind::Bookmark
    }

    fn current_ref(&self) -> Result<String> {
        Ok(self.current_ref.lock().unwrap().clone())
    }

    fn is_working_copy_clean(&self) -> Result<bool> {
        Ok(*self.clean.lock().unwrap())
    }

    fn ref_kind(&self, name: &str) -> Result<RefKind> {
        Ok(self
            .kinds
            .lock()
            .unwrap()
            .get(name)
            .copied()
            .unwrap_or(RefKind::Branch))
    }

    fn resolve_commit(&self, name: &str) -> Result<String> {
        Ok(self
            .commits
            .lock()
            .unwrap()
            .get(name)
            .cloned()
            .unwrap_or_else(|| format!("{name}-sha")))
    }

    fn merge_base(&self, a: &str, b: &str) -> Result<String> {
        let bases = self.merge_bases.lock().unwrap();
        if let Some(base) = bases.get(&(a.to_string(), b.to_string())) {
            return Ok(base.clone());
        }
        // Default: the target tip is the base, i.e. nothing to rebase over.
        drop(bases);
        self.resolve_commit(b)
    }

    fn upstream_of(&self, name: &str) -> Result<Option<Upstream>> {
        Ok(self.upstreams.lock().unwrap().get(name).cloned())
    }

    fn foreign_mirror_target(&self) -> Result<Option<String>> {
        Ok(self.mirror_target.lock().unwrap().clone())
    }

    fn log_range(&self, _from: &str, _to: &str) -> Result<Vec<CommitInfo>> {
        Ok(self.history.lock().unwrap().clone())
    }

    fn local_commits_ahead_of_remote(
        &self,
        _target: &str,
        _remote: &str,
    ) -> Result<Vec<CommitInfo>> {
        Ok(self.ahead.lock().unwrap().clone())
    }

    fn forked_descendants(&self, _root: &str, _tip: &str) -> Result<Vec<CommitInfo>> {
        Ok(self.forks.lock().unwrap().clone())
    }

    fn checkout(&self, name: &str) -> Result<()> {
        self.record(format!("checkout {name}"));
        *self.current_ref.lock().unwrap() = name.to_string();
        Ok(())
    }

    fn pull_fast_forward_only(&self, remote: &str, target: &str) -> Result<PullOutcome> {
        self.record(format!("pull {remote} {target}"));
        Ok(*self.pull_outcome.lock().unwrap())
    }

    fn rebase(&self, source: &str, target: &str) -> Result<RebaseOutcome> {
        self.record(format!("rebase {source} {target}"));
        Ok(*self.rebase_outcome.lock().unwrap())
    }

    fn collapse(
        &self,
        source: &str,
        target: &str,
        _message: &str,
        keep: bool,
    ) -> Result<CollapseOutcome> {
        self.record(format!("collapse {source} {target} keep={keep}"));
        *self.current_ref.lock().unwrap() = target.to_string();
        if self.collapse_commits {
            Ok(CollapseOutcome {
                committed: true,
                landed_commit: Some("landed-sha".to_string()),
            })
        } else {
            Ok(CollapseOutcome {
                committed: false,
                landed_commit: None,
            })
        }
    }

    fn merge_no_commit(&self, source: &str) -> Result<MergeOutcome> {
        self.record(format!("merge {source}"));
        Ok(*self.merge_outcome.lock().unwrap())
    }

    fn relocate(&self, fork_tip: &str, exclude: &str, dest: &str) -> Result<()> {
        self.record(format!("relocate {fork_tip} {exclude} {dest}"));
        Ok(())
    }

    fn discard_history(&self, root: &str) -> Result<()> {
        self.record(format!("discard {root}"));
        Ok(())
    }

    fn commit(&self, _message: &str) -> Result<()> {
        self.record("commit".to_string());
        Ok(())
    }

    fn push(&self, target: &str, remote: &str) -> Result<()> {
        self.record(format!("push {target} {remote}"));
        if let Some(msg) = self.error_on_push.lock().unwrap().as_ref() {
            return Err(Error::Backend(msg.clone()));
        }
        Ok(())
    }

    fn rollback_target_to(&self, target: &str, commit: &str) -> Result<()> {
        self.record(format!("rollback {target} {commit}"));
        Ok(())
    }

    fn delete_ref(&self, name: &str, _kind: RefKind) -> Result<()> {
        self.record(format!("delete-ref {name}"));
        Ok(())
    }

    fn delete_remote_ref(&self, name: &str, remote: &str, _kind: RefKind) -> Result<()> {
        self.record(format!("delete-remote-ref {name} {remote}"));
        Ok(())
    }

    fn recover_hint(&self, name: &str, _kind: RefKind, commit: &str) -> String {
        format!("recreate {name} at {commit}")
    }
}

/// Scriptable review service with call recording
pub struct MockReviewService {
    revisions_for_ref: Mutex<HashMap<String, Vec<RevisionRecord>>>,
    revisions_by_id: Mutex<HashMap<String, RevisionRecord>>,
    messages: Mutex<HashMap<String, String>>,
    builds: Mutex<Vec<BuildStatus>>,
    dependencies: Mutex<HashMap<String, Vec<RevisionRecord>>>,
    finalize_calls: Mutex<Vec<String>>,
    error_on_finalize: Mutex<Option<String>>,
}

impl MockReviewService {
    /// An empty service; configure responses per test.
    pub fn new() -> Self {
        Self {
            revisions_for_ref: Mutex::new(HashMap::new()),
            revisions_by_id: Mutex::new(HashMap::new()),
            messages: Mutex::new(HashMap::new()),
            builds: Mutex::new(Vec::new()),
            dependencies: Mutex::new(HashMap::new()),
            finalize_calls: Mutex::new(Vec::new()),
            error_on_finalize: Mutex::new(None),
        }
    }

    /// Associate revisions with a source ref.
    pub fn set_revisions_for_ref(&self, ref_name: &str, revisions: Vec<RevisionRecord>) {
        for revision in &revisions {
            self.revisions_by_id
                .lock()
                .unwrap()
                .insert(revision.id.clone(), revision.clone());
        }
        self.revisions_for_ref
            .lock()
            .unwrap()
            .insert(ref_name.to_string(), revisions);
    }

    /// Register a revision by id only (for `--revision` overrides).
    pub fn set_revision(&self, revision: RevisionRecord) {
        self.revisions_by_id
            .lock()
            .unwrap()
            .insert(revision.id.clone(), revision);
    }

    /// Set the rendered commit message for a revision.
    pub fn set_message(&self, revision_id: &str, message: &str) {
        self.messages
            .lock()
            .unwrap()
            .insert(revision_id.to_string(), message.to_string());
    }

    /// Set the build statuses returned for any diff.
    pub fn set_builds(&self, builds: Vec<BuildStatus>) {
        *self.builds.lock().unwrap() = builds;
    }

    /// Set open dependencies of a revision.
    pub fn set_dependencies(&self, revision_id: &str, deps: Vec<RevisionRecord>) {
        self.dependencies
            .lock()
            .unwrap()
            .insert(revision_id.to_string(), deps);
    }

    /// Make `finalize_revision` fail.
    pub fn fail_finalize(&self, msg: &str) {
        *self.error_on_finalize.lock().unwrap() = Some(msg.to_string());
    }

    /// Revisions that were finalized.
    pub fn finalized(&self) -> Vec<String> {
        self.finalize_calls.lock().unwrap().clone()
    }
}

impl Default for MockReviewService {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ReviewService for MockReviewService {
    async fn resolve_revision_for_ref(&self, ref_name: &str) -> Result<Vec<RevisionRecord>> {
        Ok(self
            .revisions_for_ref
            .lock()
            .unwrap()
            .get(ref_name)
            .cloned()
            .unwrap_or_default())
    }

    async fn revision_by_id(&self, id: &str) -> Result<RevisionRecord> {
        self.revisions_by_id
            .lock()
            .unwrap()
            .get(id)
            .cloned()
            .ok_or_else(|| Error::Review(format!("no revision {id}")))
    }

    async fn build_commit_message(&self, revision_id: &str) -> Result<String> {
        Ok(self
            .messages
            .lock()
            .unwrap()
            .get(revision_id)
            .cloned()
            .unwrap_or_else(|| format!("Landed {revision_id}")))
    }

    async fn query_build_status(&self, _diff_id: &str) -> Result<Vec<BuildStatus>> {
        Ok(self.builds.lock().unwrap().clone())
    }

    async fn query_open_dependencies(&self, revision_id: &str) -> Result<Vec<RevisionRecord>> {
        Ok(self
            .dependencies
            .lock()
            .unwrap()
            .get(revision_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn finalize_revision(&self, revision_id: &str) -> Result<()> {
        self.finalize_calls
            .lock()
            .unwrap()
            .push(revision_id.to_string());
        if let Some(msg) = self.error_on_finalize.lock().unwrap().as_ref() {
            return Err(Error::Review(msg.clone()));
        }
        Ok(())
    }
}

/// Prompter answering from pre-scripted queues
///
/// An unexpected prompt (empty queue) fails the run loudly instead of
/// silently answering.
pub struct ScriptedPrompter {
    confirms: Mutex<VecDeque<bool>>,
    choices: Mutex<VecDeque<usize>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedPrompter {
    /// A prompter expecting no prompts at all.
    pub fn new() -> Self {
        Self {
            confirms: Mutex::new(VecDeque::new()),
            choices: Mutex::new(VecDeque::new()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Queue a confirm answer.
    pub fn push_confirm(&self, answer: bool) {
        self.confirms.lock().unwrap().push_back(answer);
    }

    /// Queue a choice answer.
    pub fn push_choice(&self, index: usize) {
        self.choices.lock().unwrap().push_back(index);
    }

    /// Every prompt that was shown, in order.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

impl Default for ScriptedPrompter {
    fn default() -> Self {
        Self::new()
    }
}

impl UserInteraction for ScriptedPrompter {
    fn confirm(&self, prompt: &str, _default: bool) -> Result<bool> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.confirms
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| Error::Interact(format!("unexpected confirm: {prompt}")))
    }

    fn choose(&self, prompt: &str, _options: &[&str]) -> Result<usize> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.choices
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| Error::Interact(format!("unexpected choice: {prompt}")))
    }
}
