use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue};
use url::Url;

use crate::error::SiteError;

pub const DEFAULT_BASE_URL: &str = "https://musify.club";

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/142.0.0.0 Safari/537.36";

/// Size of the slices written to disk, and the granularity of progress events.
pub const DEFAULT_CHUNK_SIZE: usize = 1024;

/// How an existing destination file is treated when a track is downloaded again.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FileMode {
    /// Keep existing bytes and write after them. No offset or integrity check
    /// is made, so this is not a resume.
    #[default]
    Append,
    /// Start every download from an empty file.
    Truncate,
}

/// Configurable options for talking to the site
#[derive(Debug, Clone)]
pub struct SiteConfig {
    /// Root of the site; search, listing and track links are resolved against it
    pub base_url: Url,

    /// User agent string
    pub user_agent: String,

    /// Overall timeout for page requests. Zero disables it.
    ///
    /// Track streams are not bound by this timeout, only by `read_timeout`.
    pub timeout: Duration,

    /// Connection timeout (time to establish initial connection)
    pub connect_timeout: Duration,

    /// Maximum time between receiving data chunks
    pub read_timeout: Duration,

    /// Custom HTTP headers for requests
    pub headers: HeaderMap,

    pub chunk_size: usize,

    pub file_mode: FileMode,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            base_url: Url::parse(DEFAULT_BASE_URL).expect("default base URL is valid"),
            user_agent: DEFAULT_USER_AGENT.to_owned(),
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(30),
            read_timeout: Duration::from_secs(30),
            headers: SiteConfig::get_default_headers(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            file_mode: FileMode::default(),
        }
    }
}

impl SiteConfig {
    /// Replace the site root, e.g. for a mirror.
    pub fn with_base_url(mut self, base_url: &str) -> Result<Self, SiteError> {
        self.base_url =
            Url::parse(base_url).map_err(|e| SiteError::invalid_url(base_url, e.to_string()))?;
        Ok(self)
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn with_file_mode(mut self, file_mode: FileMode) -> Self {
        self.file_mode = file_mode;
        self
    }

    pub fn get_default_headers() -> HeaderMap {
        let mut default_headers = HeaderMap::new();

        default_headers.insert(
            reqwest::header::ACCEPT,
            HeaderValue::from_static(
                "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
            ),
        );

        default_headers.insert(
            reqwest::header::ACCEPT_LANGUAGE,
            HeaderValue::from_static("ru-RU,ru;q=0.9,en-US;q=0.5,en;q=0.3"),
        );
        default_headers
    }
}

/// Resolve a link found in a page against the site root.
pub(crate) fn join_link(base: &Url, href: &str) -> Result<Url, SiteError> {
    base.join(href)
        .map_err(|e| SiteError::invalid_url(href, e.to_string()))
}
