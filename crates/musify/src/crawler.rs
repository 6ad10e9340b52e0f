//! # Page crawler
//!
//! Walks a catalog listing page by page and hands out one [`TrackReference`]
//! per call. A page is only fetched once every reference of the previous page
//! has been handed out, so the consumer can download each track before the
//! crawl moves on.
//!
//! The crawl stops when its [`CrawlBudget`] reaches zero, even in the middle of
//! a page, or when a page has no usable "next" link.

use std::{
    collections::{HashSet, VecDeque},
    sync::{Arc, LazyLock},
};

use futures::Stream;
use scraper::Selector;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use url::Url;

use crate::{
    client::SiteClient,
    config::join_link,
    document::{self, Document},
    error::SiteError,
    utils::sanitize_filename,
};

/// Marker text of a track the site will not serve.
pub const UNAVAILABLE_MARKER: &str = "Недоступен";

static ENTRY_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("div.playlist__item").unwrap());
static MARKER_SELECTOR: LazyLock<Selector> = LazyLock::new(|| Selector::parse("span").unwrap());
static AUDIO_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"a[itemprop="audio"]"#).unwrap());
static NEXT_PAGE_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("li.pagination-next a").unwrap());

/// How many more tracks the crawl may hand out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrawlBudget {
    Unbounded,
    Remaining(u64),
}

impl CrawlBudget {
    /// `None` means no limit.
    pub fn from_count(count: Option<u64>) -> Self {
        match count {
            Some(count) => CrawlBudget::Remaining(count),
            None => CrawlBudget::Unbounded,
        }
    }

    pub fn is_exhausted(&self) -> bool {
        matches!(self, CrawlBudget::Remaining(0))
    }

    /// Account for one handed-out track. Saturates at zero.
    pub fn consume(&mut self) {
        if let CrawlBudget::Remaining(remaining) = self {
            *remaining = remaining.saturating_sub(1);
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackReference {
    pub source_url: Url,
    /// Sanitized name for the file on disk
    pub file_name: String,
}

/// Everything the crawl needs from one listing page.
#[derive(Debug, Default)]
pub struct ListingPage {
    /// Eligible tracks in listing order
    pub tracks: Vec<TrackReference>,
    /// Entries skipped because they were marked unavailable
    pub unavailable: usize,
    pub next_page: Option<Url>,
}

/// Extract the eligible tracks and the "next" link from a listing page.
///
/// Links are resolved against `page_url`, the address the markup was fetched from.
pub fn parse_listing(markup: &str, page_url: &Url) -> ListingPage {
    let doc = Document::parse(markup);
    let mut page = ListingPage::default();

    for entry in doc.find_all(&ENTRY_SELECTOR) {
        let unavailable = entry
            .select(&MARKER_SELECTOR)
            .any(|span| document::text(&span) == UNAVAILABLE_MARKER);
        if unavailable {
            page.unavailable += 1;
            continue;
        }

        let Some(audio) = document::first_within(&entry, &AUDIO_SELECTOR) else {
            warn!("Listing entry has no audio link, skipping");
            continue;
        };
        let (Some(href), Some(download)) = (
            document::attr(&audio, "href"),
            document::attr(&audio, "download"),
        ) else {
            warn!("Audio link is missing href or download name, skipping");
            continue;
        };

        match join_link(page_url, href) {
            Ok(source_url) => page.tracks.push(TrackReference {
                source_url,
                file_name: sanitize_filename(download),
            }),
            Err(e) => warn!(error = %e, "Unusable track link, skipping"),
        }
    }

    page.next_page = doc
        .find_all(&NEXT_PAGE_SELECTOR)
        .next()
        .and_then(|link| document::attr(&link, "href"))
        .filter(|href| !href.trim().is_empty())
        .and_then(|href| match join_link(page_url, href) {
            Ok(url) => Some(url),
            Err(e) => {
                debug!(error = %e, "Malformed next page link, treating as last page");
                None
            }
        });

    page
}

enum CrawlState {
    FetchingPage(Url),
    ScanningItems {
        tracks: VecDeque<TrackReference>,
        next_page: Option<Url>,
    },
    Exhausted,
}

/// A single pass over a catalog listing.
///
/// Not restartable: once it returns `None` or an error it stays exhausted.
pub struct Crawl {
    client: Arc<dyn SiteClient>,
    budget: CrawlBudget,
    state: CrawlState,
    visited: HashSet<Url>,
    token: CancellationToken,
}

impl Crawl {
    pub fn new(
        client: Arc<dyn SiteClient>,
        start_page: Url,
        budget: CrawlBudget,
        token: CancellationToken,
    ) -> Self {
        Self {
            client,
            budget,
            state: CrawlState::FetchingPage(start_page),
            visited: HashSet::new(),
            token,
        }
    }

    /// Number of listing pages fetched so far.
    pub fn pages_fetched(&self) -> usize {
        self.visited.len()
    }

    /// Hand out the next track, fetching the next listing page when the
    /// current one is used up.
    pub async fn next_track(&mut self) -> Result<Option<TrackReference>, SiteError> {
        loop {
            if self.budget.is_exhausted() {
                self.state = CrawlState::Exhausted;
                return Ok(None);
            }

            match std::mem::replace(&mut self.state, CrawlState::Exhausted) {
                CrawlState::Exhausted => return Ok(None),
                CrawlState::FetchingPage(url) => {
                    if self.token.is_cancelled() {
                        return Err(SiteError::Cancelled);
                    }
                    if !self.visited.insert(url.clone()) {
                        warn!(url = %url, "Pagination loops back to a visited page, stopping");
                        return Ok(None);
                    }

                    let markup = self.client.fetch_html(&url).await?;
                    let page = parse_listing(&markup, &url);
                    info!(
                        url = %url,
                        tracks = page.tracks.len(),
                        unavailable = page.unavailable,
                        has_next = page.next_page.is_some(),
                        "Listing page fetched"
                    );

                    self.state = CrawlState::ScanningItems {
                        tracks: page.tracks.into(),
                        next_page: page.next_page,
                    };
                }
                CrawlState::ScanningItems {
                    mut tracks,
                    next_page,
                } => {
                    if let Some(track) = tracks.pop_front() {
                        self.budget.consume();
                        self.state = CrawlState::ScanningItems { tracks, next_page };
                        return Ok(Some(track));
                    }

                    self.state = match next_page {
                        Some(url) => CrawlState::FetchingPage(url),
                        None => {
                            debug!("No next page, crawl finished");
                            CrawlState::Exhausted
                        }
                    };
                }
            }
        }
    }

    /// The crawl as a stream of results; it ends after the first error.
    pub fn into_stream(self) -> impl Stream<Item = Result<TrackReference, SiteError>> {
        futures::stream::try_unfold(self, |mut crawl| async move {
            Ok::<_, SiteError>(crawl.next_track().await?.map(|track| (track, crawl)))
        })
    }
}
