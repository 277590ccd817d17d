use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use dom_fixture::HtmlDocument;
use sitelens_core_types::{system_clock, DocumentHost};
use sitelens_registry::install_default;
use tokio::fs;
use tracing::debug;

use super::commands::PageArgs;
use super::output::OutputFormat;
use crate::app_context::AppContext;
use crate::config::Config;

const BLANK_URL: &str = "about:blank";

pub struct CliContext {
    config: Config,
    config_path: PathBuf,
    config_found: bool,
    output: OutputFormat,
}

impl CliContext {
    pub fn new(config: Config, config_path: PathBuf, config_found: bool, output: OutputFormat) -> Self {
        Self {
            config,
            config_path,
            config_found,
            output,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn config_found(&self) -> bool {
        self.config_found
    }

    pub fn output(&self) -> OutputFormat {
        self.output
    }

    /// Context over a saved page.
    pub async fn app_for_page(&self, page: &PageArgs) -> Result<AppContext> {
        let html = fs::read_to_string(&page.html)
            .await
            .with_context(|| format!("Failed to read {}", page.html.display()))?;
        self.app_with(HtmlDocument::shared(page.url.as_str(), html))
    }

    /// Context over an empty document, for commands that never look at a page.
    pub fn app_blank(&self) -> Result<AppContext> {
        self.app_with(HtmlDocument::shared(BLANK_URL, "<html><body></body></html>"))
    }

    fn app_with(&self, host: Arc<dyn DocumentHost>) -> Result<AppContext> {
        let app = AppContext::new(self.config.clone(), host, system_clock())?;
        if install_default(Arc::clone(app.registry())).is_err() {
            debug!("default registry already installed");
        }
        Ok(app)
    }
}
