use reqwest::StatusCode;
use thiserror::Error;

/// Errors raised while fetching search results or listing pages.
#[derive(Debug, Error)]
pub enum SiteError {
    #[error("HTTP request failed: {source}")]
    Network {
        #[from]
        source: reqwest::Error,
    },

    #[error("request failed with HTTP {status} for {url}")]
    HttpStatus { status: StatusCode, url: String },

    #[error("invalid URL `{input}`: {reason}")]
    InvalidUrl { input: String, reason: String },

    #[error("operation cancelled")]
    Cancelled,
}

impl SiteError {
    pub fn invalid_url(input: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidUrl {
            input: input.into(),
            reason: reason.into(),
        }
    }

    pub fn http_status(status: StatusCode, url: impl Into<String>) -> Self {
        Self::HttpStatus {
            status,
            url: url.into(),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// Errors raised while downloading a single track.
///
/// Every variant except [`DownloadError::Cancelled`] is scoped to the track
/// that caused it; the crawl moves on to the next reference.
#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("no redirect location returned for {url}")]
    MissingRedirect { url: String },

    #[error("invalid redirect location `{location}`: {reason}")]
    InvalidRedirect { location: String, reason: String },

    #[error("request failed with HTTP {status} for {url}")]
    HttpStatus { status: StatusCode, url: String },

    #[error("stream failed: {source}")]
    Network {
        #[from]
        source: reqwest::Error,
    },

    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    #[error("download cancelled")]
    Cancelled,
}

impl DownloadError {
    pub fn missing_redirect(url: impl Into<String>) -> Self {
        Self::MissingRedirect { url: url.into() }
    }

    pub fn invalid_redirect(location: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidRedirect {
            location: location.into(),
            reason: reason.into(),
        }
    }

    pub fn http_status(status: StatusCode, url: impl Into<String>) -> Self {
        Self::HttpStatus {
            status,
            url: url.into(),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}
