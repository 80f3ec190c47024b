//! Land command - publish an accepted revision onto the integration ref

use crate::cli::context::CommandContext;
use crate::cli::style::{check, hyperlink, Stylize};
use anstream::println;
use clap::Args;
use std::path::Path;
use tarmac::error::Result;
use tarmac::interact::TerminalPrompter;
use tarmac::land::{land, CleanupReport, LandOptions, LandOutcome};
use tarmac::types::{LandRequest, RevisionRecord};

/// Arguments for the land command
#[derive(Debug, Args)]
pub struct LandArgs {
    /// Ref to land (defaults to the current checkout)
    pub refs: Vec<String>,

    /// Integration ref to land onto
    #[arg(long, value_name = "REF")]
    pub onto: Option<String>,

    /// Remote to publish to
    #[arg(long, value_name = "REMOTE")]
    pub remote: Option<String>,

    /// Land with a no-fast-forward merge instead of squashing
    #[arg(long)]
    pub merge: bool,

    /// Squash even where the backend's convention prefers merges
    #[arg(long)]
    pub squash: bool,

    /// Keep the source ref after landing
    #[arg(long)]
    pub keep_branch: bool,

    /// Also delete the source ref's remote counterpart
    #[arg(long)]
    pub delete_remote: bool,

    /// Land a specific revision id instead of the one matching the ref
    #[arg(long, value_name = "ID")]
    pub revision: Option<String>,

    /// Stop after the local commit; do not push or finalize
    #[arg(long)]
    pub hold: bool,

    /// Show what would land without touching anything
    #[arg(long)]
    pub preview: bool,
}

impl LandArgs {
    fn into_options(self) -> LandOptions {
        LandOptions {
            refs: self.refs,
            onto: self.onto,
            remote: self.remote,
            merge: self.merge,
            squash: self.squash,
            keep_branch: self.keep_branch,
            delete_remote: self.delete_remote,
            revision: self.revision,
            hold: self.hold,
            preview: self.preview,
        }
    }
}

/// Run the land command
#[allow(clippy::future_not_send)]
pub async fn run_land(path: &Path, args: LandArgs) -> Result<()> {
    let ctx = CommandContext::new(path)?;
    let prompter = TerminalPrompter;
    let options = args.into_options();

    let outcome = land(
        ctx.backend.as_ref(),
        ctx.review.as_ref(),
        &prompter,
        &ctx.config,
        &options,
    )
    .await?;

    match outcome {
        LandOutcome::Previewed {
            request,
            revision,
            commits,
        } => {
            print_header("Would land", &request, &revision);
            println!();
            for commit in &commits {
                println!("  {commit}");
            }
            println!();
            println!("{}", "Run again without --preview to land.".muted());
        }
        LandOutcome::Held { request, revision } => {
            print_header("Committed", &request, &revision);
            println!(
                "{}",
                format!(
                    "held: '{}' carries the landed commit locally; push it to '{}' when ready",
                    request.target, request.remote
                )
                .warn()
            );
        }
        LandOutcome::Landed {
            request,
            revision,
            cleanup,
        } => {
            println!(
                "{} Landed {} onto {} ({})",
                check(),
                revision_label(&revision).accent(),
                request.target.accent(),
                request.remote.muted()
            );
            print_cleanup(&request, &cleanup);
        }
    }

    Ok(())
}

fn revision_label(revision: &RevisionRecord) -> String {
    match revision.uri {
        Some(ref uri) => hyperlink(&revision.id, uri),
        None => revision.id.clone(),
    }
}

fn print_header(verb: &str, request: &LandRequest, revision: &RevisionRecord) {
    println!(
        "{} {} ({}) onto {} via {} ({})",
        verb.emphasis(),
        request.source.accent(),
        revision_label(revision),
        request.target.accent(),
        request.remote.accent(),
        request.strategy.muted()
    );
    println!("  {}", revision.title.muted());
}

fn print_cleanup(request: &LandRequest, cleanup: &CleanupReport) {
    if let Some((commit, hint)) = &cleanup.deleted_source {
        println!(
            "   Deleted {} {} {}",
            request.source.accent(),
            format!("(was {})", &commit[..commit.len().min(12)]).muted(),
            format!("- restore with `{hint}`").muted()
        );
    }
    if cleanup.deleted_remote {
        println!(
            "   Deleted {} on {}",
            request.source.accent(),
            request.remote.accent()
        );
    }
    if let Some(restored) = &cleanup.restored {
        println!("   Checked out {}", restored.accent());
    }
}
