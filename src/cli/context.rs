//! Shared command context for CLI commands
//!
//! Performs the setup every land invocation needs: backend detection,
//! configuration loading, and review-service construction.

use std::path::Path;
use tarmac::backend::{detect_backend, VcsBackend};
use tarmac::config::{load_config, Config};
use tarmac::error::{Error, Result};
use tarmac::review::{HttpReviewService, ReviewService};

/// Shared context for commands that talk to the review service
pub struct CommandContext {
    /// The detected VCS backend
    pub backend: Box<dyn VcsBackend>,
    /// Merged repo + user configuration
    pub config: Config,
    /// Review service client
    pub review: Box<dyn ReviewService>,
}

impl CommandContext {
    /// Create a context for the repository containing `path`.
    ///
    /// Fails when no repository is found, when configuration is unparsable,
    /// or when the review API is unconfigured or missing its token.
    pub fn new(path: &Path) -> Result<Self> {
        let backend = detect_backend(path)?;
        let config = load_config(backend.root())?;

        let api = config.review.api.clone().ok_or_else(|| {
            Error::Config(
                "no review API configured; add `api` under [review] in .tarmac.toml".to_string(),
            )
        })?;
        let token = config.review_token()?.ok_or_else(|| {
            Error::Config(format!(
                "no review API token; export ${}",
                config.token_env()
            ))
        })?;

        let review = HttpReviewService::new(&api, &token)?;

        Ok(Self {
            backend,
            config,
            review: Box::new(review),
        })
    }
}
