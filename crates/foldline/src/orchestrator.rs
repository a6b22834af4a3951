//! Multi-page critical CSS runs.
//!
//! The [`Orchestrator`] evaluates every configured URL in its own page, with
//! at most `concurrency` pages in flight. Each task moves through
//! [`TaskState`]s and ends with either a [`Partition`] of the source
//! stylesheet or a [`PageError`]. Once all tasks have settled, the successful
//! partitions are folded into one critical and one remaining stylesheet.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use foldline::prelude::*;
//!
//! let config = CriticalCssConfig::new(["https://example.com/", "https://example.com/about"])
//!     .with_css("dist/site.css")
//!     .with_concurrency(4);
//!
//! let orchestrator = Orchestrator::new(config)?;
//! let output = orchestrator.run(BrowserSession::Owned(browser)).await?;
//!
//! std::fs::write("critical.css", &output.critical)?;
//! for error in &output.errors {
//!     eprintln!("{}", error);
//! }
//! ```

use std::fmt;
use std::sync::Arc;

use foldline_css::parser::{CssCodec, CssParserCodec, PrintOptions};
use foldline_css::partition::{Partition, PartitionOptions, partition};
use foldline_css::rule_map::RuleMap;
use foldline_css::rules::Stylesheet;
use foldline_render::page::{Browser, NavigationOptions, Page, WaitUntil};
use foldline_render::probe::CriticalityProbe;
use foldline_render::{DeviceProfile, RenderError};
use futures_util::stream::{self, StreamExt};
use tracing::{Instrument, debug, error, info, info_span, trace, warn};

use crate::config::CriticalCssConfig;
use crate::error::{Error, PageError, Result};
use crate::logging::{span_names, targets};
use crate::source::{CssSource, PageTarget};

/// Retries after the first failed attempt to open a page.
pub const PAGE_ACQUIRE_RETRIES: usize = 3;

/// A browser session handed to a run.
#[derive(Clone)]
pub enum BrowserSession {
    /// Closed when the run ends.
    Owned(Arc<dyn Browser>),
    /// Left open for the caller.
    Shared(Arc<dyn Browser>),
}

impl BrowserSession {
    /// The underlying browser.
    pub fn browser(&self) -> &dyn Browser {
        match self {
            Self::Owned(browser) | Self::Shared(browser) => browser.as_ref(),
        }
    }

    async fn finish(&self) {
        if let Self::Owned(browser) = self
            && let Err(e) = browser.close().await
        {
            warn!(target: targets::ORCHESTRATOR, error = %e, "failed to close browser session");
        }
    }
}

impl fmt::Debug for BrowserSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Owned(_) => f.write_str("BrowserSession::Owned"),
            Self::Shared(_) => f.write_str("BrowserSession::Shared"),
        }
    }
}

/// Progress of one page task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskState {
    Pending,
    PageAcquired,
    PageConfigured,
    Navigated,
    Probed,
    Closed,
    Failed,
}

impl TaskState {
    /// Name used in logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::PageAcquired => "page-acquired",
            Self::PageConfigured => "page-configured",
            Self::Navigated => "navigated",
            Self::Probed => "probed",
            Self::Closed => "closed",
            Self::Failed => "failed",
        }
    }

    /// Whether the task has finished.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Closed | Self::Failed)
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of evaluating one URL.
#[derive(Debug)]
pub struct PageResult {
    pub url: String,
    /// Critical and remaining stylesheet of this page, or why there are none.
    pub outcome: std::result::Result<Partition, PageError>,
}

/// Result of a run.
#[derive(Debug, Default)]
pub struct RunOutput {
    /// CSS needed above the fold on any page.
    pub critical: String,
    /// Everything else; empty when remaining CSS output is disabled.
    pub rest: String,
    /// URLs that could not be evaluated.
    pub errors: Vec<PageError>,
}

/// Runs critical CSS extraction over the configured URLs.
pub struct Orchestrator {
    config: CriticalCssConfig,
    codec: Arc<dyn CssCodec>,
    probe: CriticalityProbe,
    device: DeviceProfile,
    user_agent: String,
    print: PrintOptions,
}

impl Orchestrator {
    /// Validate the configuration and prepare a run.
    pub fn new(config: CriticalCssConfig) -> Result<Self> {
        config.validate()?;

        let device = config.device.resolve()?;
        let user_agent = config.effective_user_agent(&device);
        let probe = CriticalityProbe::new(&config.probe_options())
            .map_err(|e| Error::configuration(format!("invalid selector pattern: {}", e)))?;

        Ok(Self {
            config,
            codec: Arc::new(CssParserCodec),
            probe,
            device,
            user_agent,
            print: PrintOptions::default(),
        })
    }

    /// Use another CSS codec.
    pub fn with_codec(mut self, codec: impl CssCodec + 'static) -> Self {
        self.codec = Arc::new(codec);
        self
    }

    /// Print results with these options.
    pub fn with_print_options(mut self, print: PrintOptions) -> Self {
        self.print = print;
        self
    }

    /// The run configuration.
    pub fn config(&self) -> &CriticalCssConfig {
        &self.config
    }

    /// Evaluate every URL and fold the results.
    ///
    /// Owned sessions are closed afterwards, whatever the outcome.
    pub async fn run(&self, session: BrowserSession) -> Result<RunOutput> {
        let span = info_span!(
            target: targets::ORCHESTRATOR,
            span_names::RUN,
            urls = self.config.urls.len(),
            concurrency = self.config.concurrency
        );
        let result = self.run_in(session.browser()).instrument(span).await;
        session.finish().await;
        result
    }

    async fn run_in(&self, browser: &dyn Browser) -> Result<RunOutput> {
        let css = self.source_css(browser).await?;
        let source = self.codec.parse(&css)?;
        info!(
            target: targets::ORCHESTRATOR,
            rules = source.len(),
            "parsed source CSS"
        );

        let results = self.evaluate_pages(browser, &source).await;
        self.fold(results)
    }

    /// Read the configured source CSS, or extract it from the first URL.
    pub async fn source_css(&self, browser: &dyn Browser) -> Result<String> {
        let source = CssSource::from_option(self.config.css.as_deref());
        if let Some(css) = source.read().await? {
            return Ok(css);
        }

        // `validate` guarantees at least one URL.
        let url = self.config.urls.first().map(String::as_str).unwrap_or_default();
        let css = self.extract_css(browser, url).await?;
        if css.trim().is_empty() {
            return Err(Error::css_source(url, "page has no stylesheets"));
        }
        debug!(
            target: targets::SOURCE,
            url,
            bytes = css.len(),
            "extracted source CSS from page"
        );
        Ok(css)
    }

    async fn extract_css(&self, browser: &dyn Browser, url: &str) -> Result<String> {
        let page = browser.new_page().await?;

        match self.read_stylesheets(page.as_ref(), url).await {
            Ok(text) => {
                page.close().await?;
                Ok(text)
            }
            Err(e) => {
                if let Err(close_error) = page.close().await {
                    trace!(
                        target: targets::ORCHESTRATOR,
                        error = %close_error,
                        "ignoring close failure of failed page"
                    );
                }
                Err(e.into())
            }
        }
    }

    async fn read_stylesheets(&self, page: &dyn Page, url: &str) -> std::result::Result<String, RenderError> {
        self.configure(page).await?;
        self.navigate(page, url, WaitUntil::Load).await?;
        page.stylesheet_text().await
    }

    /// Evaluate every URL against `source`, at most `concurrency` at a time.
    ///
    /// Results are returned in URL order.
    pub async fn evaluate_pages(&self, browser: &dyn Browser, source: &Stylesheet) -> Vec<PageResult> {
        let mut results: Vec<(usize, PageResult)> = stream::iter(self.config.urls.iter().enumerate())
            .map(|(index, url)| async move { (index, self.evaluate_page(browser, source, url).await) })
            .buffer_unordered(self.config.concurrency)
            .collect()
            .await;

        results.sort_by_key(|(index, _)| *index);
        results.into_iter().map(|(_, result)| result).collect()
    }

    /// Evaluate a single URL. Failures are captured in the result.
    pub async fn evaluate_page(&self, browser: &dyn Browser, source: &Stylesheet, url: &str) -> PageResult {
        let span = info_span!(target: targets::ORCHESTRATOR, span_names::PAGE, url);
        let outcome = self.page_task(browser, source, url).instrument(span).await;

        if let Err(e) = &outcome {
            warn!(
                target: targets::ORCHESTRATOR,
                url,
                state = %e.state(),
                error = %e,
                "page evaluation failed"
            );
        }

        PageResult {
            url: url.to_string(),
            outcome,
        }
    }

    async fn page_task(
        &self,
        browser: &dyn Browser,
        source: &Stylesheet,
        url: &str,
    ) -> std::result::Result<Partition, PageError> {
        let mut state = TaskState::Pending;
        let page = self.acquire_page(browser, url).await?;
        advance(&mut state, TaskState::PageAcquired);

        match self.drive(page.as_ref(), source, url, &mut state).await {
            Ok(split) => {
                page.close().await.map_err(|source| PageError::Close {
                    url: url.to_string(),
                    source,
                })?;
                advance(&mut state, TaskState::Closed);
                Ok(split)
            }
            Err(e) => {
                advance(&mut state, TaskState::Failed);
                if let Err(close_error) = page.close().await {
                    trace!(
                        target: targets::ORCHESTRATOR,
                        error = %close_error,
                        "ignoring close failure of failed page"
                    );
                }
                Err(e)
            }
        }
    }

    /// Open a page, retrying up to [`PAGE_ACQUIRE_RETRIES`] times.
    async fn acquire_page(
        &self,
        browser: &dyn Browser,
        url: &str,
    ) -> std::result::Result<Box<dyn Page>, PageError> {
        let mut attempts = 0;
        loop {
            attempts += 1;
            match browser.new_page().await {
                Ok(page) => return Ok(page),
                Err(source) => {
                    let retry = attempts <= PAGE_ACQUIRE_RETRIES
                        && !matches!(source, RenderError::SessionClosed);
                    if !retry {
                        return Err(PageError::Acquisition {
                            url: url.to_string(),
                            attempts,
                            source,
                        });
                    }
                    debug!(
                        target: targets::ORCHESTRATOR,
                        attempt = attempts,
                        error = %source,
                        "could not open page, retrying"
                    );
                }
            }
        }
    }

    async fn drive(
        &self,
        page: &dyn Page,
        source: &Stylesheet,
        url: &str,
        state: &mut TaskState,
    ) -> std::result::Result<Partition, PageError> {
        self.configure(page)
            .await
            .map_err(|source| PageError::Configure {
                url: url.to_string(),
                source,
            })?;
        advance(state, TaskState::PageConfigured);

        self.navigate(page, url, WaitUntil::NetworkIdle)
            .await
            .map_err(|source| PageError::Navigation {
                url: url.to_string(),
                source,
            })?;
        advance(state, TaskState::Navigated);

        if !self.config.render_delay.is_zero() {
            tokio::time::sleep(self.config.render_delay).await;
        }

        if self.config.screenshots.enabled {
            self.screenshot(page, url)
                .await
                .map_err(|source| PageError::Screenshot {
                    url: url.to_string(),
                    source,
                })?;
        }

        let critical = self
            .probe
            .run(page, source)
            .await
            .map_err(|source| PageError::Probe {
                url: url.to_string(),
                source,
            })?;
        advance(state, TaskState::Probed);

        let options = PartitionOptions::default().retain_keyframes(!self.config.drop_keyframes);
        Ok(partition(source, &critical, &options))
    }

    /// Apply cache, script, request, and device settings.
    async fn configure(&self, page: &dyn Page) -> std::result::Result<(), RenderError> {
        page.set_cache_enabled(self.config.enable_cache).await?;
        page.set_javascript_enabled(self.config.enable_javascript).await?;
        page.set_request_filter(self.config.blocklist()).await?;
        page.emulate(&self.device, &self.user_agent).await
    }

    async fn navigate(&self, page: &dyn Page, url: &str, wait_until: WaitUntil) -> std::result::Result<(), RenderError> {
        let options = NavigationOptions::new(self.config.timeout).wait_until(wait_until);

        match PageTarget::resolve(url, &self.config.base_dir()) {
            PageTarget::Remote(target) => page.goto(target.as_str(), &options).await,
            PageTarget::Local(path) => {
                let content = tokio::fs::read_to_string(&path)
                    .await
                    .map_err(|e| RenderError::io(&path, e))?;
                trace!(
                    target: targets::ORCHESTRATOR,
                    path = %path.display(),
                    "loading local file"
                );
                page.set_content(&content, &options).await
            }
        }
    }

    async fn screenshot(&self, page: &dyn Page, url: &str) -> std::result::Result<(), RenderError> {
        let path = self.config.screenshot_path(url);
        if let Some(dir) = path.parent()
            && !dir.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(dir)
                .await
                .map_err(|e| RenderError::io(dir, e))?;
        }
        page.screenshot(&path).await
    }

    /// Merge all successful partitions and print the result.
    pub fn fold(&self, results: Vec<PageResult>) -> Result<RunOutput> {
        let mut critical = RuleMap::new();
        let mut rest = RuleMap::new();
        let mut errors = Vec::new();
        let mut succeeded = 0usize;

        for result in results {
            match result.outcome {
                Ok(split) => {
                    critical.merge(&split.critical);
                    if self.config.output_remaining_css {
                        rest.merge(&split.rest);
                    }
                    succeeded += 1;
                }
                Err(e) => errors.push(e),
            }
        }

        if succeeded == 0 {
            error!(
                target: targets::ORCHESTRATOR,
                failed = errors.len(),
                "no page could be evaluated"
            );
            return Err(Error::AllTasksFailed { errors });
        }

        rest.subtract(&critical);

        let policy = self.config.invalid_rules;
        let critical_css = self.codec.stringify(&critical.assemble(policy), &self.print);
        let rest_css = if self.config.output_remaining_css {
            self.codec.stringify(&rest.assemble(policy), &self.print)
        } else {
            String::new()
        };

        info!(
            target: targets::ORCHESTRATOR,
            succeeded,
            failed = errors.len(),
            critical_bytes = critical_css.len(),
            rest_bytes = rest_css.len(),
            "critical CSS run finished"
        );

        Ok(RunOutput {
            critical: critical_css,
            rest: rest_css,
            errors,
        })
    }
}

fn advance(state: &mut TaskState, next: TaskState) {
    trace!(
        target: targets::ORCHESTRATOR,
        from = %state,
        to = %next,
        "task state"
    );
    *state = next;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_state_names() {
        assert_eq!(TaskState::PageAcquired.to_string(), "page-acquired");
        assert!(TaskState::Closed.is_terminal());
        assert!(TaskState::Failed.is_terminal());
        assert!(!TaskState::Probed.is_terminal());
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        assert!(matches!(
            Orchestrator::new(CriticalCssConfig::default()),
            Err(Error::Configuration(_))
        ));
    }

    #[test]
    fn test_fold_of_only_failures() {
        let orchestrator = Orchestrator::new(CriticalCssConfig::new(["a.html"])).unwrap();
        let results = vec![PageResult {
            url: "a.html".to_string(),
            outcome: Err(PageError::Probe {
                url: "a.html".to_string(),
                source: RenderError::NoDocument,
            }),
        }];

        match orchestrator.fold(results) {
            Err(Error::AllTasksFailed { errors }) => assert_eq!(errors.len(), 1),
            other => panic!("expected AllTasksFailed, got {:?}", other.map(|o| o.critical)),
        }
    }
}
