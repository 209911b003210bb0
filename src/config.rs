//! # Configuration Module
//!
//! Loads console settings from the environment (and a `.env` file during
//! local development), on top of built-in defaults.

use anyhow::{Context, Result};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::poller::DEFAULT_POLL_INTERVAL_MS;

// =============================================================================
// CONFIGURATION STRUCT
// =============================================================================
/// Settings shared by every console command.
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the workflow orchestration service
    pub api_url: String,

    /// Poll cadence of the graph view
    pub poll_interval: Duration,

    /// Per-request timeout for the orchestration service
    pub request_timeout: Duration,

    /// Id of the topology node that takes human feedback
    pub feedback_node_id: String,

    /// Optional JSON catalog replacing the built-in workflows and topology
    pub catalog_path: Option<PathBuf>,

    /// Log level for the application
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            // Local orchestration service started with uvicorn
            api_url: "http://localhost:8000".to_string(),

            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),

            request_timeout: Duration::from_secs(crate::api::DEFAULT_TIMEOUT_SECS),

            // The Searcher agent in the research team topology
            feedback_node_id: "5".to_string(),

            catalog_path: None,

            log_level: "info".to_string(),
        }
    }
}

// =============================================================================
// CONFIGURATION LOADING
// =============================================================================
impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Example
    /// ```no_run
    /// let config = symphony_console::config::Config::from_env()?;
    /// println!("Polling {}", config.api_url);
    /// # Ok::<(), anyhow::Error>(())
    /// ```
    pub fn from_env() -> Result<Self> {
        // Load .env file if it exists (silently ignore if not found)
        let _ = dotenvy::dotenv();

        let mut config = Config::default();

        if let Ok(val) = env::var("SYMPHONY_API_URL") {
            config.api_url = val;
        }

        if let Ok(val) = env::var("SYMPHONY_POLL_INTERVAL_MS") {
            let millis: u64 = val
                .parse()
                .context("SYMPHONY_POLL_INTERVAL_MS must be a whole number of milliseconds (e.g., 3000)")?;
            config.poll_interval = Duration::from_millis(millis);
        }

        if let Ok(val) = env::var("SYMPHONY_REQUEST_TIMEOUT_SECS") {
            let secs: u64 = val
                .parse()
                .context("SYMPHONY_REQUEST_TIMEOUT_SECS must be a whole number of seconds")?;
            config.request_timeout = Duration::from_secs(secs);
        }

        if let Ok(val) = env::var("SYMPHONY_FEEDBACK_NODE") {
            config.feedback_node_id = val;
        }

        if let Ok(val) = env::var("SYMPHONY_CATALOG") {
            config.catalog_path = Some(PathBuf::from(val));
        }

        if let Ok(val) = env::var("RUST_LOG") {
            config.log_level = val;
        }

        Ok(config)
    }

    /// Validate the configuration before any component starts.
    pub fn validate(&self) -> Result<()> {
        let url = url::Url::parse(&self.api_url)
            .with_context(|| format!("SYMPHONY_API_URL is not a valid URL: {}", self.api_url))?;
        if !matches!(url.scheme(), "http" | "https") {
            anyhow::bail!("SYMPHONY_API_URL must use http or https, got: {}", url.scheme());
        }

        if self.poll_interval < Duration::from_millis(100) {
            anyhow::bail!(
                "Poll interval must be at least 100ms, got: {}ms",
                self.poll_interval.as_millis()
            );
        }

        if self.request_timeout < Duration::from_secs(1) {
            anyhow::bail!("Request timeout must be at least 1 second");
        }

        if self.feedback_node_id.is_empty() {
            anyhow::bail!("SYMPHONY_FEEDBACK_NODE cannot be empty");
        }

        Ok(())
    }
}
