//! Run configuration.
//!
//! [`CriticalCssConfig`] holds every option of a critical CSS run. It can be
//! built in code or loaded from a TOML or JSON file with camelCase keys:
//!
//! ```toml
//! urls = ["https://example.com/", "https://example.com/about"]
//! css = "dist/styles.css"
//! concurrency = 4
//! pageLoadTimeout = 1500
//! keepSelectors = [".cookie-banner%"]
//! device = "iPhone X"
//! ```

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use foldline_css::rule_map::InvalidEntryPolicy;
use foldline_render::probe::ProbeOptions;
use foldline_render::{DEFAULT_BLOCKED_REQUESTS, DeviceProfile, RequestBlocklist};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default navigation timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(30_000);

/// Default time a page may load before it is stopped and probed.
pub const DEFAULT_PAGE_LOAD_TIMEOUT: Duration = Duration::from_millis(2_000);

/// Default settle time between navigation and probing.
pub const DEFAULT_RENDER_DELAY: Duration = Duration::from_millis(250);

/// Default number of pages evaluated at the same time.
pub const DEFAULT_CONCURRENCY: usize = 10;

/// User agent announced when neither the config nor the device sets one.
pub fn default_user_agent() -> String {
    format!("foldline {}", env!("CARGO_PKG_VERSION"))
}

/// Device to emulate: a built-in preset name or a full profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DeviceSetting {
    /// Name of a [`DeviceProfile::preset`].
    Preset(String),
    /// An explicit profile.
    Profile(DeviceProfile),
}

impl DeviceSetting {
    /// Resolve the setting to a profile.
    pub fn resolve(&self) -> Result<DeviceProfile> {
        match self {
            Self::Profile(profile) => Ok(profile.clone()),
            Self::Preset(name) => DeviceProfile::preset(name).ok_or_else(|| {
                Error::configuration(format!(
                    "unknown device '{}', expected one of: {}",
                    name,
                    DeviceProfile::preset_names().join(", ")
                ))
            }),
        }
    }
}

impl Default for DeviceSetting {
    fn default() -> Self {
        Self::Profile(DeviceProfile::default())
    }
}

/// Screenshot settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ScreenshotConfig {
    /// Take a screenshot of every page before probing.
    pub enabled: bool,
    /// Directory the screenshots are written to.
    pub path: PathBuf,
}

impl Default for ScreenshotConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            path: PathBuf::from("."),
        }
    }
}

/// Maps a URL to a screenshot file stem.
#[derive(Clone)]
pub struct ScreenshotNamer(Arc<dyn Fn(&str) -> String + Send + Sync>);

impl ScreenshotNamer {
    pub fn new(namer: impl Fn(&str) -> String + Send + Sync + 'static) -> Self {
        Self(Arc::new(namer))
    }

    pub fn name(&self, url: &str) -> String {
        (self.0)(url)
    }
}

impl fmt::Debug for ScreenshotNamer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ScreenshotNamer(..)")
    }
}

/// File stem used for screenshots when no namer is configured: every
/// character other than a word character or whitespace becomes `_`.
pub fn default_screenshot_name(url: &str) -> String {
    url.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c.is_whitespace() {
                c
            } else {
                '_'
            }
        })
        .collect()
}

mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

/// Options of a critical CSS run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CriticalCssConfig {
    /// Source CSS: a path ending in `.css`, literal CSS, or `None` to extract
    /// the stylesheets of the first URL.
    pub css: Option<String>,
    /// Pages to evaluate.
    pub urls: Vec<String>,
    /// Directory that relative local-file URLs are resolved against.
    pub base_dir: Option<PathBuf>,
    /// Navigation timeout in milliseconds.
    #[serde(with = "millis")]
    pub timeout: Duration,
    /// Time a page may load before it is stopped, in milliseconds.
    #[serde(with = "millis")]
    pub page_load_timeout: Duration,
    /// Settle time between navigation and probing, in milliseconds.
    #[serde(with = "millis")]
    pub render_delay: Duration,
    /// Maximum number of pages evaluated at the same time.
    pub concurrency: usize,
    /// Device to emulate.
    pub device: DeviceSetting,
    /// User agent; defaults to the device's own or `foldline <version>`.
    pub user_agent: Option<String>,
    /// Whether pages use the HTTP cache.
    pub enable_cache: bool,
    /// Whether pages run scripts.
    pub enable_javascript: bool,
    /// Selectors that are always critical (`%` matches any substring).
    pub keep_selectors: Vec<String>,
    /// Selectors that are never critical (`%` matches any substring).
    pub remove_selectors: Vec<String>,
    /// Requests whose URL contains any of these substrings are aborted.
    pub block_requests: Vec<String>,
    /// Leave top-level `@keyframes` out of the critical CSS.
    pub drop_keyframes: bool,
    /// Also produce the remaining (non-critical) CSS.
    pub output_remaining_css: bool,
    /// What to do with rules that cannot be printed.
    pub invalid_rules: InvalidEntryPolicy,
    /// Screenshot settings.
    pub screenshots: ScreenshotConfig,
    /// Custom screenshot file stems. Not serialized.
    #[serde(skip)]
    pub screenshot_namer: Option<ScreenshotNamer>,
}

impl Default for CriticalCssConfig {
    fn default() -> Self {
        Self {
            css: None,
            urls: Vec::new(),
            base_dir: None,
            timeout: DEFAULT_TIMEOUT,
            page_load_timeout: DEFAULT_PAGE_LOAD_TIMEOUT,
            render_delay: DEFAULT_RENDER_DELAY,
            concurrency: DEFAULT_CONCURRENCY,
            device: DeviceSetting::default(),
            user_agent: None,
            enable_cache: true,
            enable_javascript: true,
            keep_selectors: Vec::new(),
            remove_selectors: Vec::new(),
            block_requests: DEFAULT_BLOCKED_REQUESTS.iter().map(|s| s.to_string()).collect(),
            drop_keyframes: true,
            output_remaining_css: true,
            invalid_rules: InvalidEntryPolicy::default(),
            screenshots: ScreenshotConfig::default(),
            screenshot_namer: None,
        }
    }
}

impl CriticalCssConfig {
    /// Create a configuration for the given URLs.
    pub fn new<I, S>(urls: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            urls: urls.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Load a configuration file; the format follows the extension
    /// (`.toml` or `.json`).
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::configuration(format!("could not read '{}': {}", path.display(), e))
        })?;

        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase);
        match extension.as_deref() {
            Some("toml") => Self::from_toml(&content),
            Some("json") => Self::from_json(&content),
            _ => Err(Error::configuration(format!(
                "unsupported configuration format: '{}'",
                path.display()
            ))),
        }
    }

    /// Parse a TOML configuration.
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::configuration(e.to_string()))
    }

    /// Parse a JSON configuration.
    pub fn from_json(content: &str) -> Result<Self> {
        serde_json::from_str(content).map_err(|e| Error::configuration(e.to_string()))
    }

    pub fn with_css(mut self, css: impl Into<String>) -> Self {
        self.css = Some(css.into());
        self
    }

    pub fn with_base_dir(mut self, base_dir: impl Into<PathBuf>) -> Self {
        self.base_dir = Some(base_dir.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_page_load_timeout(mut self, timeout: Duration) -> Self {
        self.page_load_timeout = timeout;
        self
    }

    pub fn with_render_delay(mut self, delay: Duration) -> Self {
        self.render_delay = delay;
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    pub fn with_device(mut self, device: DeviceProfile) -> Self {
        self.device = DeviceSetting::Profile(device);
        self
    }

    pub fn with_device_preset(mut self, name: impl Into<String>) -> Self {
        self.device = DeviceSetting::Preset(name.into());
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    pub fn with_cache(mut self, enabled: bool) -> Self {
        self.enable_cache = enabled;
        self
    }

    pub fn with_javascript(mut self, enabled: bool) -> Self {
        self.enable_javascript = enabled;
        self
    }

    pub fn with_keep_selectors<I, S>(mut self, selectors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.keep_selectors = selectors.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_remove_selectors<I, S>(mut self, selectors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.remove_selectors = selectors.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_block_requests<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.block_requests = patterns.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_drop_keyframes(mut self, drop: bool) -> Self {
        self.drop_keyframes = drop;
        self
    }

    pub fn with_remaining_css(mut self, output: bool) -> Self {
        self.output_remaining_css = output;
        self
    }

    pub fn with_invalid_rules(mut self, policy: InvalidEntryPolicy) -> Self {
        self.invalid_rules = policy;
        self
    }

    /// Enable screenshots written to `path`.
    pub fn with_screenshots(mut self, path: impl Into<PathBuf>) -> Self {
        self.screenshots = ScreenshotConfig {
            enabled: true,
            path: path.into(),
        };
        self
    }

    pub fn with_screenshot_namer(
        mut self,
        namer: impl Fn(&str) -> String + Send + Sync + 'static,
    ) -> Self {
        self.screenshot_namer = Some(ScreenshotNamer::new(namer));
        self
    }

    /// Check the configuration before any work starts.
    pub fn validate(&self) -> Result<()> {
        if self.urls.is_empty() {
            return Err(Error::configuration("at least one URL is required"));
        }
        if let Some(url) = self.urls.iter().find(|url| url.trim().is_empty()) {
            return Err(Error::configuration(format!("empty URL in list: {:?}", url)));
        }
        if self.concurrency == 0 {
            return Err(Error::configuration("concurrency must be at least 1"));
        }
        if self.timeout.is_zero() {
            return Err(Error::configuration("timeout must be greater than zero"));
        }

        let device = self.device.resolve()?;
        if device.width == 0 || device.height == 0 {
            return Err(Error::configuration(format!(
                "device viewport must not be empty, got {}x{}",
                device.width, device.height
            )));
        }
        Ok(())
    }

    /// The user agent pages announce when emulating `device`.
    pub fn effective_user_agent(&self, device: &DeviceProfile) -> String {
        self.user_agent
            .clone()
            .or_else(|| device.user_agent.clone())
            .unwrap_or_else(default_user_agent)
    }

    /// The request blocklist.
    pub fn blocklist(&self) -> RequestBlocklist {
        RequestBlocklist::new(self.block_requests.iter().cloned())
    }

    /// Options for the above-the-fold probe.
    pub fn probe_options(&self) -> ProbeOptions {
        ProbeOptions::default()
            .keep_selectors(self.keep_selectors.iter().cloned())
            .remove_selectors(self.remove_selectors.iter().cloned())
            .load_timeout(self.page_load_timeout)
    }

    /// Directory relative local-file URLs are resolved against.
    pub fn base_dir(&self) -> PathBuf {
        self.base_dir.clone().unwrap_or_else(|| PathBuf::from("."))
    }

    /// Where the screenshot of `url` is written.
    pub fn screenshot_path(&self, url: &str) -> PathBuf {
        let stem = match &self.screenshot_namer {
            Some(namer) => namer.name(url),
            None => default_screenshot_name(url),
        };
        self.screenshots.path.join(format!("{}.png", stem))
    }
}
