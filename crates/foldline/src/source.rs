//! Resolving the source CSS and page targets.

use std::path::{Path, PathBuf};

use tracing::debug;
use url::Url;

use crate::error::{Error, Result};
use crate::logging::targets;

/// Where the source CSS comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CssSource {
    /// CSS text given directly.
    Inline(String),
    /// A stylesheet file.
    File(PathBuf),
    /// The stylesheets of the first page.
    FirstPage,
}

impl CssSource {
    /// Interpret the `css` option: a value ending in `.css` is a file path,
    /// any other value is CSS text.
    pub fn from_option(css: Option<&str>) -> Self {
        match css {
            None => Self::FirstPage,
            Some(css) if css.trim_end().ends_with(".css") => Self::File(PathBuf::from(css.trim())),
            Some(css) => Self::Inline(css.to_string()),
        }
    }

    /// Read inline or file CSS. Returns `None` for [`CssSource::FirstPage`].
    pub async fn read(&self) -> Result<Option<String>> {
        match self {
            Self::Inline(css) => Ok(Some(css.clone())),
            Self::File(path) => {
                let css = tokio::fs::read_to_string(path)
                    .await
                    .map_err(|e| Error::css_source(path, e.to_string()))?;
                if css.trim().is_empty() {
                    return Err(Error::css_source(path, "file is empty"));
                }
                debug!(
                    target: targets::SOURCE,
                    path = %path.display(),
                    bytes = css.len(),
                    "read source CSS"
                );
                Ok(Some(css))
            }
            Self::FirstPage => Ok(None),
        }
    }
}

/// How a URL from the configuration is loaded into a page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageTarget {
    /// A network URL, loaded with `goto`.
    Remote(Url),
    /// A local file, read and loaded with `set_content`.
    Local(PathBuf),
}

impl PageTarget {
    /// Classify a URL. `file:` URLs and anything that is not an absolute URL
    /// are local; relative paths are resolved against `base_dir` after the
    /// query string and fragment are removed.
    pub fn resolve(url: &str, base_dir: &Path) -> Self {
        if let Ok(parsed) = Url::parse(url) {
            if parsed.scheme() == "file"
                && let Ok(path) = parsed.to_file_path()
            {
                return Self::Local(path);
            }
            if parsed.scheme() != "file" && parsed.has_host() {
                return Self::Remote(parsed);
            }
        }

        let path = url.split(['?', '#']).next().unwrap_or_default();
        Self::Local(base_dir.join(path))
    }

    /// Whether the target is a local file.
    pub fn is_local(&self) -> bool {
        matches!(self, Self::Local(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_css_option() {
        assert_eq!(CssSource::from_option(None), CssSource::FirstPage);
        assert_eq!(
            CssSource::from_option(Some("dist/site.css")),
            CssSource::File(PathBuf::from("dist/site.css"))
        );
        assert_eq!(
            CssSource::from_option(Some(".a{color:red}")),
            CssSource::Inline(".a{color:red}".to_string())
        );
    }

    #[tokio::test]
    async fn test_read_css_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("site.css");

        std::fs::write(&path, ".a{color:red}").unwrap();
        let css = CssSource::File(path.clone()).read().await.unwrap();
        assert_eq!(css.as_deref(), Some(".a{color:red}"));

        std::fs::write(&path, "  \n").unwrap();
        assert!(matches!(
            CssSource::File(path).read().await,
            Err(Error::CssSource { .. })
        ));

        assert!(CssSource::File(dir.path().join("missing.css")).read().await.is_err());
        assert_eq!(CssSource::FirstPage.read().await.unwrap(), None);
    }

    #[test]
    fn test_page_targets() {
        let base = Path::new("/srv/site");

        assert!(matches!(
            PageTarget::resolve("https://example.com/a?b#c", base),
            PageTarget::Remote(url) if url.as_str() == "https://example.com/a?b#c"
        ));
        assert_eq!(
            PageTarget::resolve("about/index.html?lang=en#team", base),
            PageTarget::Local(PathBuf::from("/srv/site/about/index.html"))
        );
        assert_eq!(
            PageTarget::resolve("index.html", base),
            PageTarget::Local(PathBuf::from("/srv/site/index.html"))
        );
        assert!(PageTarget::resolve("file:///srv/site/index.html", base).is_local());
    }
}
