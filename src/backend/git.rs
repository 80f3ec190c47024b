//! Git backend
//!
//! Drives the `git` CLI. History here is mutable and rebase-friendly:
//! squash is the natural strategy, the collapse stages with
//! `merge --squash` and the pipeline attaches the final message at commit
//! time. Branches never fork mid-ref in the Mercurial sense, so alternate
//! handling never triggers.

use super::run::{run, run_checked};
use super::{CollapseOutcome, MergeOutcome, RebaseOutcome, VcsBackend};
use crate::error::{Error, Result};
use crate::types::{CommitInfo, PullOutcome, RefKind, Upstream};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Git working copy rooted at a directory containing `.git`.
pub struct GitBackend {
    root: PathBuf,
}

impl GitBackend {
    /// Create a backend for the repository rooted at `root`.
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    fn git(&self, args: &[&str]) -> Result<String> {
        run_checked("git", args, &self.root)
    }

    fn remote_tracking_exists(&self, remote: &str, target: &str) -> Result<bool> {
        let spec = format!("refs/remotes/{remote}/{target}");
        let out = run("git", &["rev-parse", "--verify", "--quiet", &spec], &self.root)?;
        Ok(out.success)
    }

    fn parse_log(output: &str) -> Vec<CommitInfo> {
        output
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| {
                let (id, summary) = line.split_once(' ').unwrap_or((line, ""));
                CommitInfo {
                    id: id.to_string(),
                    summary: summary.to_string(),
                }
            })
            .collect()
    }
}

/// Extract the destination ref from an svn-remote fetch refspec
/// (`trunk:refs/remotes/origin/trunk` -> `refs/remotes/origin/trunk`).
fn svn_fetch_ref(refspec: &str) -> Option<String> {
    let (_, dest) = refspec.split_once(':')?;
    let dest = dest.trim();
    if dest.is_empty() { None } else { Some(dest.to_string()) }
}

/// Strip a `refs/heads/` prefix from an upstream merge ref.
fn upstream_branch_name(merge_ref: &str) -> String {
    merge_ref
        .strip_prefix("refs/heads/")
        .unwrap_or(merge_ref)
        .to_string()
}

impl VcsBackend for GitBackend {
    fn name(&self) -> &'static str {
        "git"
    }

    fn root(&self) -> &Path {
        &self.root
    }

    fn default_target(&self) -> &'static str {
        "master"
    }

    fn default_remote(&self) -> &'static str {
        "origin"
    }

    fn supports_rebase(&self) -> bool {
        true
    }

    fn has_immutable_history(&self) -> bool {
        false
    }

    fn has_forking_branches(&self) -> bool {
        false
    }

    fn supports_bookmarks(&self) -> bool {
        false
    }

    fn requires_homogeneous_ref_kinds(&self) -> bool {
        false
    }

    fn supports_strict_merge(&self) -> bool {
        true
    }

    fn collapse_relocates(&self) -> bool {
        false
    }

    fn can_delete_remote(&self, _kind: RefKind) -> bool {
        true
    }

    fn current_ref(&self) -> Result<String> {
        let out = run("git", &["symbolic-ref", "--short", "HEAD"], &self.root)?;
        if out.success {
            Ok(out.stdout.trim().to_string())
        } else {
            Err(Error::Precondition(
                "HEAD is detached; check out the branch you want to land".to_string(),
            ))
        }
    }

    fn is_working_copy_clean(&self) -> Result<bool> {
        let status = self.git(&["status", "--porcelain"])?;
        Ok(status.is_empty())
    }

    fn ref_kind(&self, _name: &str) -> Result<RefKind> {
        Ok(RefKind::Branch)
    }

    fn resolve_commit(&self, name: &str) -> Result<String> {
        self.git(&["rev-parse", name])
    }

    fn merge_base(&self, a: &str, b: &str) -> Result<String> {
        self.git(&["merge-base", a, b])
    }

    fn upstream_of(&self, name: &str) -> Result<Option<Upstream>> {
        let merge_key = format!("branch.{name}.merge");
        let merge = run("git", &["config", "--get", &merge_key], &self.root)?;
        if !merge.success {
            return Ok(None);
        }

        let remote_key = format!("branch.{name}.remote");
        let remote = run("git", &["config", "--get", &remote_key], &self.root)?;
        let remote_name = remote.stdout.trim();

        Ok(Some(Upstream {
            ref_name: upstream_branch_name(merge.stdout.trim()),
            // "." marks a local-to-local tracking relationship
            remote: if remote.success && remote_name != "." && !remote_name.is_empty() {
                Some(remote_name.to_string())
            } else {
                None
            },
        }))
    }

    fn foreign_mirror_target(&self) -> Result<Option<String>> {
        let out = run(
            "git",
            &["config", "--get-regexp", r"^svn-remote\..*\.fetch$"],
            &self.root,
        )?;
        if !out.success {
            return Ok(None);
        }

        // "svn-remote.svn.fetch trunk:refs/remotes/origin/trunk"
        let target = out
            .stdout
            .lines()
            .filter_map(|line| line.split_once(' '))
            .find_map(|(_, refspec)| svn_fetch_ref(refspec));

        if let Some(ref t) = target {
            debug!(target = %t, "resolved svn mirror fetch ref");
        }
        Ok(target)
    }

    fn log_range(&self, from: &str, to: &str) -> Result<Vec<CommitInfo>> {
        let range = format!("{from}..{to}");
        let out = self.git(&["log", "--format=%h %s", &range])?;
        Ok(Self::parse_log(&out))
    }

    fn local_commits_ahead_of_remote(
        &self,
        target: &str,
        remote: &str,
    ) -> Result<Vec<CommitInfo>> {
        // No remote counterpart means nothing can be ahead of it.
        if !self.remote_tracking_exists(remote, target)? {
            return Ok(Vec::new());
        }
        let tracking = format!("{remote}/{target}");
        self.log_range(&tracking, target)
    }

    fn forked_descendants(&self, _root: &str, _tip: &str) -> Result<Vec<CommitInfo>> {
        // Git branches do not fork mid-ref; collapse never orphans siblings.
        Ok(Vec::new())
    }

    fn checkout(&self, name: &str) -> Result<()> {
        self.git(&["checkout", name]).map(drop)
    }

    fn pull_fast_forward_only(&self, remote: &str, target: &str) -> Result<PullOutcome> {
        let out = run("git", &["pull", "--ff-only", remote, target], &self.root)?;
        if !out.success {
            return Err(Error::Backend(format!(
                "fast-forward pull of '{target}' from '{remote}' failed: {}",
                out.combined()
            )));
        }
        if out.combined().contains("Already up to date") {
            Ok(PullOutcome::NoRemoteChanges)
        } else {
            Ok(PullOutcome::FastForwarded)
        }
    }

    fn rebase(&self, source: &str, target: &str) -> Result<RebaseOutcome> {
        let out = run("git", &["rebase", target, source], &self.root)?;
        if out.success {
            return Ok(RebaseOutcome::Completed);
        }

        debug!(source, target, "rebase conflicted, aborting");
        let abort = run("git", &["rebase", "--abort"], &self.root)?;
        if !abort.success {
            return Err(Error::Backend(format!(
                "rebase of '{source}' conflicted and `git rebase --abort` failed: {}",
                abort.combined()
            )));
        }
        Ok(RebaseOutcome::Conflict)
    }

    fn collapse(
        &self,
        source: &str,
        target: &str,
        _message: &str,
        _keep: bool,
    ) -> Result<CollapseOutcome> {
        self.checkout(target)?;
        self.git(&["merge", "--squash", source])?;
        // Staged only; the pipeline commits with the final message.
        Ok(CollapseOutcome {
            committed: false,
            landed_commit: None,
        })
    }

    fn merge_no_commit(&self, source: &str) -> Result<MergeOutcome> {
        let out = run(
            "git",
            &["merge", "--no-ff", "--no-commit", source],
            &self.root,
        )?;
        if out.success {
            Ok(MergeOutcome::Merged)
        } else if out.combined().contains("CONFLICT") {
            Ok(MergeOutcome::Conflict)
        } else {
            Err(Error::Backend(format!(
                "merge of '{source}' failed: {}",
                out.combined()
            )))
        }
    }

    fn relocate(&self, fork_tip: &str, _exclude: &str, _dest: &str) -> Result<()> {
        Err(Error::Internal(format!(
            "git branches do not fork mid-ref; nothing to relocate for {fork_tip}"
        )))
    }

    fn discard_history(&self, _root: &str) -> Result<()> {
        // Unreachable commits are garbage-collected; deleting the branch in
        // cleanup is all the discarding git needs.
        Ok(())
    }

    fn commit(&self, message: &str) -> Result<()> {
        self.git(&["commit", "-m", message]).map(drop)
    }

    fn push(&self, target: &str, remote: &str) -> Result<()> {
        let refspec = format!("{target}:{target}");
        self.git(&["push", remote, &refspec]).map(drop)
    }

    fn rollback_target_to(&self, target: &str, commit: &str) -> Result<()> {
        // A conflicted merge in progress must be cleared before the reset
        // can restore the tip; ignore failure when no merge is in flight.
        let _ = run("git", &["merge", "--abort"], &self.root)?;
        self.checkout(target)?;
        self.git(&["reset", "--hard", commit]).map(drop)
    }

    fn delete_ref(&self, name: &str, _kind: RefKind) -> Result<()> {
        self.git(&["branch", "-D", name]).map(drop)
    }

    fn delete_remote_ref(&self, name: &str, remote: &str, _kind: RefKind) -> Result<()> {
        self.git(&["push", remote, "--delete", name]).map(drop)
    }

    fn recover_hint(&self, name: &str, _kind: RefKind, commit: &str) -> String {
        format!("git branch {name} {commit}")
    }
}
