//! # Site client
//!
//! The HTTP side of the crate. Resolver, crawler and downloader only talk to
//! the [`SiteClient`] trait, so tests can drive them with canned pages.

use async_trait::async_trait;
use bytes::Bytes;
use futures::{StreamExt, stream::BoxStream};
use reqwest::{
    Client, ClientBuilder, StatusCode,
    header::{HeaderMap, LOCATION},
};
use tracing::{debug, instrument};
use url::Url;

use crate::{
    config::SiteConfig,
    error::{DownloadError, SiteError},
};

/// Body of a track response, consumed chunk by chunk.
pub struct AssetStream {
    /// Value of the `Content-Length` header, when the server sent one
    pub content_length: Option<u64>,
    pub body: BoxStream<'static, Result<Bytes, DownloadError>>,
}

impl std::fmt::Debug for AssetStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssetStream")
            .field("content_length", &self.content_length)
            .finish_non_exhaustive()
    }
}

#[async_trait]
pub trait SiteClient: Send + Sync {
    /// GET a page and return its markup.
    async fn fetch_html(&self, url: &Url) -> Result<String, SiteError>;

    /// GET `url` without following redirects and return the `Location` header, if any.
    async fn probe_redirect(&self, url: &Url) -> Result<Option<String>, DownloadError>;

    /// GET `url` and hand back the body as a stream.
    async fn open_stream(&self, url: &Url) -> Result<AssetStream, DownloadError>;
}

/// [`SiteClient`] backed by reqwest.
#[derive(Debug, Clone)]
pub struct HttpSiteClient {
    /// Client for pages, bounded by the overall timeout
    client: Client,
    /// Same settings without redirect following, for the track link probe
    probe_client: Client,
    /// Client for track bodies, bounded only by the read timeout
    stream_client: Client,
}

impl HttpSiteClient {
    pub fn new(config: &SiteConfig) -> Result<Self, SiteError> {
        let mut page_builder = create_client_builder(config);
        let mut probe_builder =
            create_client_builder(config).redirect(reqwest::redirect::Policy::none());
        if !config.timeout.is_zero() {
            page_builder = page_builder.timeout(config.timeout);
            probe_builder = probe_builder.timeout(config.timeout);
        }

        Ok(Self {
            client: page_builder.build()?,
            probe_client: probe_builder.build()?,
            stream_client: create_client_builder(config).build()?,
        })
    }
}

/// Shared builder settings for every client the crate creates.
pub fn create_client_builder(config: &SiteConfig) -> ClientBuilder {
    let mut client_builder = Client::builder()
        .user_agent(&config.user_agent)
        .default_headers(config.headers.clone());

    if !config.connect_timeout.is_zero() {
        client_builder = client_builder.connect_timeout(config.connect_timeout);
    }

    if !config.read_timeout.is_zero() {
        client_builder = client_builder.read_timeout(config.read_timeout);
    }

    client_builder
}

/// `Location` of a probe response. Error statuses fail the probe; any other
/// status without the header yields `None`.
fn redirect_location(
    status: StatusCode,
    headers: &HeaderMap,
    url: &Url,
) -> Result<Option<String>, DownloadError> {
    if status.is_client_error() || status.is_server_error() {
        return Err(DownloadError::http_status(status, url.as_str()));
    }

    Ok(headers
        .get(LOCATION)
        .and_then(|value| value.to_str().ok())
        .map(str::to_owned))
}

#[async_trait]
impl SiteClient for HttpSiteClient {
    #[instrument(skip(self), fields(url = %url), level = "debug")]
    async fn fetch_html(&self, url: &Url) -> Result<String, SiteError> {
        let response = self.client.get(url.clone()).send().await?;

        if !response.status().is_success() {
            return Err(SiteError::http_status(response.status(), url.as_str()));
        }

        let body = response.text().await?;
        debug!(bytes = body.len(), "Page fetched");
        Ok(body)
    }

    #[instrument(skip(self), fields(url = %url), level = "debug")]
    async fn probe_redirect(&self, url: &Url) -> Result<Option<String>, DownloadError> {
        let response = self.probe_client.get(url.clone()).send().await?;
        let location = redirect_location(response.status(), response.headers(), url)?;

        debug!(status = %response.status(), location = ?location, "Redirect probe finished");
        Ok(location)
    }

    #[instrument(skip(self), fields(url = %url), level = "debug")]
    async fn open_stream(&self, url: &Url) -> Result<AssetStream, DownloadError> {
        let response = self.stream_client.get(url.clone()).send().await?;

        if !response.status().is_success() {
            return Err(DownloadError::http_status(response.status(), url.as_str()));
        }

        let content_length = response.content_length();
        let body = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(DownloadError::from))
            .boxed();

        Ok(AssetStream {
            content_length,
            body,
        })
    }
}
