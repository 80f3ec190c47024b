//! Mercurial backend
//!
//! Drives the `hg` CLI with `HGPLAIN` set. History is conventionally
//! immutable here, so strict merge is the default strategy and a squash has
//! to be asked for explicitly. Bookmarks and named branches both exist, and
//! branches can fork at arbitrary ancestor changesets, which is why the
//! alternate-fork handling only ever fires on this backend.
//!
//! The rebase and strip extensions ship with Mercurial but are off by
//! default; they are force-enabled per invocation with `--config`.

use super::run::{run, run_checked};
use super::{CollapseOutcome, MergeOutcome, RebaseOutcome, VcsBackend};
use crate::error::{Error, Result};
use crate::types::{CommitInfo, PullOutcome, RefKind, Upstream};
use std::path::{Path, PathBuf};
use tracing::debug;

const REBASE_EXT: &str = "extensions.rebase=";
const STRIP_EXT: &str = "extensions.strip=";

/// Log template producing `<short-node> <first-line>` rows.
const LOG_TEMPLATE: &str = "{node|short} {desc|firstline}\\n";

/// Mercurial working copy rooted at a directory containing `.hg`.
pub struct HgBackend {
    root: PathBuf,
}

impl HgBackend {
    /// Create a backend for the repository rooted at `root`.
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    fn hg(&self, args: &[&str]) -> Result<String> {
        run_checked("hg", args, &self.root)
    }

    fn log_revset(&self, revset: &str) -> Result<Vec<CommitInfo>> {
        let out = self.hg(&["log", "-r", revset, "-T", LOG_TEMPLATE])?;
        Ok(parse_log(&out))
    }

    fn is_bookmark(&self, name: &str) -> Result<bool> {
        let out = self.hg(&["bookmarks", "-T", "{bookmark}\\n"])?;
        Ok(out.lines().any(|b| b.trim() == name))
    }

    /// Root changeset of the history being landed: everything reachable
    /// from `source` but not from `target`.
    fn source_root(&self, source: &str, target: &str) -> Result<Option<String>> {
        let revset = format!("roots(only({source}, {target}))");
        let roots = self.log_revset(&revset)?;
        Ok(roots.first().map(|c| c.id.clone()))
    }
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

impl VcsBackend for HgBackend {
    fn name(&self) -> &'static str {
        "hg"
    }

    fn root(&self) -> &Path {
        &self.root
    }

    fn default_target(&self) -> &'static str {
        "default"
    }

    fn default_remote(&self) -> &'static str {
        "default"
    }

    fn supports_rebase(&self) -> bool {
        true
    }

    fn has_immutable_history(&self) -> bool {
        true
    }

    fn has_forking_branches(&self) -> bool {
        true
    }

    fn supports_bookmarks(&self) -> bool {
        true
    }

    fn requires_homogeneous_ref_kinds(&self) -> bool {
        true
    }

    fn supports_strict_merge(&self) -> bool {
        true
    }

    fn collapse_relocates(&self) -> bool {
        true
    }

    fn can_delete_remote(&self, kind: RefKind) -> bool {
        // Remote bookmarks can be deleted with `push -B`. A named branch is
        // closed by the land commit itself, so there is nothing to delete.
        kind == RefKind::Bookmark
    }

    fn current_ref(&self) -> Result<String> {
        let active = self.hg(&["log", "-r", ".", "-T", "{activebookmark}"])?;
        if !active.is_empty() {
            return Ok(active);
        }
        self.hg(&["branch"])
    }

    fn is_working_copy_clean(&self) -> Result<bool> {
        let status = self.hg(&[
            "status", "--modified", "--added", "--removed", "--deleted",
        ])?;
        Ok(status.is_empty())
    }

    fn ref_kind(&self, name: &str) -> Result<RefKind> {
        if self.is_bookmark(name)? {
            Ok(RefKind::Bookmark)
        } else {
            Ok(RefKind::Branch)
        }
    }

    fn resolve_commit(&self, name: &str) -> Result<String> {
        self.hg(&["log", "-r", name, "-T", "{node}"])
    }

    fn merge_base(&self, a: &str, b: &str) -> Result<String> {
        let revset = format!("ancestor({a}, {b})");
        self.hg(&["log", "-r", &revset, "-T", "{node}"])
    }

    fn upstream_of(&self, _name: &str) -> Result<Option<Upstream>> {
        // Mercurial has no per-ref tracking configuration.
        Ok(None)
    }

    fn foreign_mirror_target(&self) -> Result<Option<String>> {
        Ok(None)
    }

    fn log_range(&self, from: &str, to: &str) -> Result<Vec<CommitInfo>> {
        let revset = format!("reverse(only({to}, {from}))");
        self.log_revset(&revset)
    }

    fn local_commits_ahead_of_remote(
        &self,
        target: &str,
        _remote: &str,
    ) -> Result<Vec<CommitInfo>> {
        // Phases stand in for a commit-range comparison: a draft ancestor
        // of the target tip has not been published anywhere.
        let revset = format!("draft() and ancestors({target})");
        self.log_revset(&revset)
    }

    fn forked_descendants(&self, root: &str, tip: &str) -> Result<Vec<CommitInfo>> {
        let revset = format!(
            "heads(descendants({root}) - descendants({tip}) - ancestors({tip}))"
        );
        self.log_revset(&revset)
    }

    fn checkout(&self, name: &str) -> Result<()> {
        self.hg(&["update", name]).map(drop)
    }

    fn pull_fast_forward_only(&self, remote: &str, target: &str) -> Result<PullOutcome> {
        let out = run("hg", &["pull", remote], &self.root)?;
        let combined = out.combined();
        if !out.success && !combined.contains("no changes found") {
            return Err(Error::Backend(format!(
                "pull from '{remote}' failed: {combined}"
            )));
        }

        if combined.contains("no changes found") {
            Ok(PullOutcome::NoRemoteChanges)
        } else {
            // Move the checkout to the new target tip; pull itself never
            // touches the working directory.
            self.checkout(target)?;
            Ok(PullOutcome::FastForwarded)
        }
    }

    fn rebase(&self, source: &str, target: &str) -> Result<RebaseOutcome> {
        let out = run(
            "hg",
            &["--config", REBASE_EXT, "rebase", "-b", source, "-d", target],
            &self.root,
        )?;
        if out.success {
            return Ok(RebaseOutcome::Completed);
        }

        debug!(source, target, "rebase conflicted, aborting");
        let abort = run(
            "hg",
            &["--config", REBASE_EXT, "rebase", "--abort"],
            &self.root,
        )?;
        if !abort.success {
            return Err(Error::Backend(format!(
                "rebase of '{source}' conflicted and `hg rebase --abort` failed: {}",
                abort.combined()
            )));
        }
        Ok(RebaseOutcome::Conflict)
    }

    fn collapse(
        &self,
        source: &str,
        target: &str,
        message: &str,
        keep: bool,
    ) -> Result<CollapseOutcome> {
        let target_tip = self.resolve_commit(target)?;
        let root = self.source_root(source, target)?.ok_or_else(|| {
            Error::Precondition(format!(
                "'{source}' has no changesets that are not already on '{target}'"
            ))
        })?;
        let base = self.hg(&["log", "-r", &format!("parent({root})"), "-T", "{node}"])?;

        if base == target_tip {
            // Already based on the target tip; `hg rebase` would report
            // "nothing to rebase", so fold in place: commit the source's
            // content as one changeset on the target, then drop the
            // original draft run unless it is being kept.
            self.checkout(target)?;
            self.hg(&["revert", "--all", "--rev", source])?;
            self.hg(&["commit", "-m", message])?;
            if !keep {
                self.hg(&["--config", STRIP_EXT, "strip", "-r", &root])?;
            }
        } else {
            // Restrict the rebase set to the landing ref's own history;
            // `-b` would drag forked descendants into the fold.
            let revset = format!("only({source}, {target})");
            let mut args: Vec<&str> = vec![
                "--config", REBASE_EXT,
                "rebase", "-r", &revset, "-d", target,
                "--collapse", "-m", message,
            ];
            if keep {
                args.push("--keep");
            }
            let out = run("hg", &args, &self.root)?;
            if !out.success {
                let abort = run(
                    "hg",
                    &["--config", REBASE_EXT, "rebase", "--abort"],
                    &self.root,
                )?;
                if !abort.success {
                    return Err(Error::Backend(format!(
                        "collapse of '{source}' conflicted and `hg rebase --abort` failed: {}",
                        abort.combined()
                    )));
                }
                return Err(Error::Conflict {
                    operation: "collapse".to_string(),
                    guidance: format!(
                        "rebase '{source}' onto '{target}' manually, resolve the \
                         conflicts, and run land again"
                    ),
                });
            }
        }

        let landed = self.hg(&["log", "-r", "tip", "-T", "{node}"])?;

        // A bookmark target has to be moved onto the fold by hand; a named
        // branch tip already is the fold.
        if self.is_bookmark(target)? {
            self.hg(&["bookmark", "-f", target, "-r", &landed])?;
        }
        self.checkout(target)?;

        Ok(CollapseOutcome {
            committed: true,
            landed_commit: Some(landed),
        })
    }

    fn merge_no_commit(&self, source: &str) -> Result<MergeOutcome> {
        // `hg merge` never auto-commits, which is exactly what the strict
        // merge path needs.
        let out = run("hg", &["merge", "-r", source], &self.root)?;
        if out.success {
            Ok(MergeOutcome::Merged)
        } else if out.combined().contains("unresolved") {
            Ok(MergeOutcome::Conflict)
        } else {
            Err(Error::Backend(format!(
                "merge of '{source}' failed: {}",
                out.combined()
            )))
        }
    }

    fn relocate(&self, fork_tip: &str, exclude: &str, dest: &str) -> Result<()> {
        // Only the fork-specific changesets move; the prefix shared with the
        // landing ref stays where it is until discard_history drops it.
        let revset = format!("only({fork_tip}, {exclude})");
        self.hg(&[
            "--config", REBASE_EXT,
            "rebase", "-r", &revset, "-d", dest,
        ])
        .map(drop)
    }

    fn discard_history(&self, root: &str) -> Result<()> {
        self.hg(&["--config", STRIP_EXT, "strip", "-r", root])
            .map(drop)
    }

    fn commit(&self, message: &str) -> Result<()> {
        self.hg(&["commit", "-m", message]).map(drop)
    }

    fn push(&self, target: &str, remote: &str) -> Result<()> {
        let out = if self.is_bookmark(target)? {
            run("hg", &["push", "-B", target, remote], &self.root)?
        } else {
            run(
                "hg",
                &["push", "-r", target, "--new-branch", remote],
                &self.root,
            )?
        };

        // Exit code 1 with "no changes found" is Mercurial's way of saying
        // the remote already had everything.
        if out.success || out.combined().contains("no changes found") {
            Ok(())
        } else {
            Err(Error::Backend(out.combined()))
        }
    }

    fn rollback_target_to(&self, target: &str, commit: &str) -> Result<()> {
        // A clean update clears any merge or revert state first.
        self.hg(&["update", "-C", commit]).map(drop)?;

        let extra = self.log_revset(&format!("only({target}, {commit})"))?;
        if !extra.is_empty() {
            let revset = format!("only({target}, {commit})");
            self.hg(&["--config", STRIP_EXT, "strip", "-r", &revset])?;
        }
        if self.is_bookmark(target)? {
            self.hg(&["bookmark", "-f", target, "-r", commit])?;
        }
        Ok(())
    }

    fn delete_ref(&self, name: &str, kind: RefKind) -> Result<()> {
        match kind {
            RefKind::Bookmark => self.hg(&["bookmark", "--delete", name]).map(drop),
            // Closing is the idiomatic way to retire a named branch; the
            // changesets themselves are immutable.
            RefKind::Branch => {
                let current = self.current_ref()?;
                self.checkout(name)?;
                self.hg(&[
                    "commit",
                    "--close-branch",
                    "-m",
                    &format!("close branch {name} after landing"),
                ])?;
                self.checkout(&current)
            }
        }
    }

    fn delete_remote_ref(&self, name: &str, remote: &str, kind: RefKind) -> Result<()> {
        match kind {
            RefKind::Bookmark => {
                // Deleting locally then pushing the bookmark propagates the
                // deletion.
                self.hg(&["push", "-B", name, remote]).map(drop)
            }
            RefKind::Branch => Err(Error::Internal(
                "remote named branches are closed by the land commit, not deleted".to_string(),
            )),
        }
    }

    fn recover_hint(&self, name: &str, kind: RefKind, commit: &str) -> String {
        match kind {
            RefKind::Bookmark => format!("hg bookmark {name} -r {commit}"),
            RefKind::Branch => format!("hg update {commit}"),
        }
    }
}
