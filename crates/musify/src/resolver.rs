//! # Target resolver
//!
//! Turns a free-text query into the catalog page it names, using the site's
//! search page. An artist query picks from the "artists" section, an album
//! query from the "album" section, and a combined query picks an entry from
//! the "albums" section whose embedded artist name matches as well.

use std::{fmt, sync::Arc, sync::LazyLock};

use scraper::Selector;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};
use url::Url;

use crate::{
    client::SiteClient,
    config::join_link,
    document::{self, Document},
    error::SiteError,
    utils::title_case,
};

static ANCHOR_SELECTOR: LazyLock<Selector> = LazyLock::new(|| Selector::parse("a").unwrap());
static ARTIST_NAME_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("small").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetKind {
    Artist,
    Album,
    ArtistAndAlbum,
}

impl TargetKind {
    /// `id` of the anchor that opens this kind's section in search results.
    pub fn section_id(self) -> &'static str {
        match self {
            TargetKind::Artist => "artists",
            TargetKind::Album => "album",
            TargetKind::ArtistAndAlbum => "albums",
        }
    }
}

impl fmt::Display for TargetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetKind::Artist => write!(f, "artist"),
            TargetKind::Album => write!(f, "album"),
            TargetKind::ArtistAndAlbum => write!(f, "artist and album"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    kind: TargetKind,
    raw_text: String,
}

impl SearchQuery {
    pub fn new(kind: TargetKind, raw_text: impl Into<String>) -> Self {
        Self {
            kind,
            raw_text: raw_text.into(),
        }
    }

    pub fn artist(name: impl Into<String>) -> Self {
        Self::new(TargetKind::Artist, name)
    }

    pub fn album(title: impl Into<String>) -> Self {
        Self::new(TargetKind::Album, title)
    }

    pub fn artist_and_album(artist: &str, album: &str) -> Self {
        Self::new(TargetKind::ArtistAndAlbum, format!("{artist} {album}"))
    }

    pub fn kind(&self) -> TargetKind {
        self.kind
    }

    pub fn raw_text(&self) -> &str {
        &self.raw_text
    }

    /// First whitespace-separated token, and the remaining tokens joined by
    /// single spaces.
    fn split_artist_album(&self) -> (&str, String) {
        let mut tokens = self.raw_text.split_whitespace();
        let artist = tokens.next().unwrap_or_default();
        let album = tokens.collect::<Vec<_>>().join(" ");
        (artist, album)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTarget {
    pub page_url: Url,
    /// Status line shown before the crawl starts
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotFoundReason {
    /// The search results have no section for the requested kind
    SectionMissing,
    /// The section has no entry with the requested title
    NoTitleMatch,
    /// An album matched by title, but under a different artist
    ArtistMismatch,
}

impl fmt::Display for NotFoundReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NotFoundReason::SectionMissing => write!(f, "no matching section in search results"),
            NotFoundReason::NoTitleMatch => write!(f, "no entry with that title"),
            NotFoundReason::ArtistMismatch => write!(f, "album belongs to a different artist"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Found(ResolvedTarget),
    NotFound(NotFoundReason),
}

pub struct Resolver {
    client: Arc<dyn SiteClient>,
    base_url: Url,
}

impl Resolver {
    pub fn new(client: Arc<dyn SiteClient>, base_url: Url) -> Self {
        Self { client, base_url }
    }

    /// Run one search request and pick the catalog page for `query`.
    #[instrument(skip(self, token), fields(kind = %query.kind(), text = %query.raw_text()))]
    pub async fn resolve(
        &self,
        query: &SearchQuery,
        token: &CancellationToken,
    ) -> Result<Resolution, SiteError> {
        if token.is_cancelled() {
            return Err(SiteError::Cancelled);
        }

        let url = search_url(&self.base_url, query.raw_text())?;
        debug!(url = %url, "Searching site");
        let markup = self.client.fetch_html(&url).await?;

        let resolution = parse_search_results(&markup, query, &self.base_url)?;
        match &resolution {
            Resolution::Found(target) => info!(page = %target.page_url, "Target resolved"),
            Resolution::NotFound(reason) => info!(reason = %reason, "Target not found"),
        }
        Ok(resolution)
    }
}

pub fn search_url(base_url: &Url, text: &str) -> Result<Url, SiteError> {
    let mut url = join_link(base_url, "/search")?;
    url.query_pairs_mut().append_pair("searchText", text);
    Ok(url)
}

/// Pick the catalog page for `query` out of a search results page.
pub fn parse_search_results(
    markup: &str,
    query: &SearchQuery,
    base_url: &Url,
) -> Result<Resolution, SiteError> {
    let doc = Document::parse(markup);

    let Some(section) = doc.find_first(&ANCHOR_SELECTOR, "id", query.kind().section_id()) else {
        return Ok(Resolution::NotFound(NotFoundReason::SectionMissing));
    };

    let (wanted_title, artist) = match query.kind() {
        TargetKind::Artist | TargetKind::Album => (title_case(query.raw_text()), None),
        TargetKind::ArtistAndAlbum => {
            let (artist, album) = query.split_artist_album();
            (title_case(&album), Some(artist))
        }
    };

    let Some(entry) = doc.find_next_after(section, &ANCHOR_SELECTOR, |el| {
        document::attr(el, "title").is_some_and(|title| title_case(title) == wanted_title)
            && document::attr(el, "href").is_some()
    }) else {
        return Ok(Resolution::NotFound(NotFoundReason::NoTitleMatch));
    };

    if let Some(artist) = artist {
        let entry_artist = document::first_within(&entry, &ARTIST_NAME_SELECTOR)
            .map(|small| document::text(&small));
        if entry_artist.as_deref() != Some(artist) {
            debug!(expected = %artist, found = ?entry_artist, "Album artist mismatch");
            return Ok(Resolution::NotFound(NotFoundReason::ArtistMismatch));
        }
    }

    // the predicate above guarantees `href`
    let href = document::attr(&entry, "href").unwrap_or_default();
    let page_url = join_link(base_url, href)?;

    let message = match query.kind() {
        TargetKind::Artist => format!("downloading songs by {}", query.raw_text()),
        TargetKind::Album => format!("downloading album {}", query.raw_text()),
        TargetKind::ArtistAndAlbum => format!(
            "downloading album {}",
            document::attr(&entry, "title").unwrap_or_default()
        ),
    };

    Ok(Resolution::Found(ResolvedTarget { page_url, message }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://musify.club").unwrap()
    }

    const ARTIST_RESULTS: &str = r#"
        <html><body>
            <a title="Test Artist" href="/artist/too-early">not in a section</a>
            <a id="artists">Исполнители</a>
            <div class="contacts">
                <a href="/artist/other-1" title="Other Artist">Other Artist</a>
                <a href="/artist/test-artist-42" title="Test Artist">Test Artist</a>
            </div>
        </body></html>
    "#;

    const ALBUM_RESULTS: &str = r#"
        <html><body>
            <a id="albums">Альбомы</a>
            <div class="album-list">
                <a href="/release/bar-album-2001" title="Bar Album">
                    <span>Bar Album</span>
                    <small> Foo </small>
                </a>
            </div>
        </body></html>
    "#;

    #[test]
    fn test_search_url_encodes_text() {
        let url = search_url(&base(), "Test Artist").unwrap();
        assert_eq!(url.as_str(), "https://musify.club/search?searchText=Test+Artist");
    }

    #[test]
    fn test_artist_found_in_section() {
        let query = SearchQuery::artist("Test Artist");
        let resolution = parse_search_results(ARTIST_RESULTS, &query, &base()).unwrap();

        let Resolution::Found(target) = resolution else {
            panic!("expected a match");
        };
        assert_eq!(
            target.page_url.as_str(),
            "https://musify.club/artist/test-artist-42"
        );
        assert_eq!(target.message, "downloading songs by Test Artist");
    }

    #[test]
    fn test_artist_title_comparison_ignores_case() {
        let query = SearchQuery::artist("TEST artist");
        let resolution = parse_search_results(ARTIST_RESULTS, &query, &base()).unwrap();
        assert!(matches!(resolution, Resolution::Found(_)));
    }

    #[test]
    fn test_artist_without_section() {
        let query = SearchQuery::album("Test Artist");
        let resolution = parse_search_results(ARTIST_RESULTS, &query, &base()).unwrap();
        assert_eq!(resolution, Resolution::NotFound(NotFoundReason::SectionMissing));
    }

    #[test]
    fn test_artist_without_title_match() {
        let query = SearchQuery::artist("Nobody");
        let resolution = parse_search_results(ARTIST_RESULTS, &query, &base()).unwrap();
        assert_eq!(resolution, Resolution::NotFound(NotFoundReason::NoTitleMatch));
    }

    #[test]
    fn test_album_section() {
        let markup = r#"
            <a id="album">Альбом</a>
            <a href="/release/dark-side-1973" title="Dark Side">Dark Side</a>
        "#;
        let query = SearchQuery::album("dark side");
        let Resolution::Found(target) = parse_search_results(markup, &query, &base()).unwrap()
        else {
            panic!("expected a match");
        };
        assert_eq!(
            target.page_url.as_str(),
            "https://musify.club/release/dark-side-1973"
        );
        assert_eq!(target.message, "downloading album dark side");
    }

    #[test]
    fn test_artist_and_album_requires_both() {
        let query = SearchQuery::artist_and_album("Foo", "Bar Album");
        let Resolution::Found(target) =
            parse_search_results(ALBUM_RESULTS, &query, &base()).unwrap()
        else {
            panic!("expected a match");
        };
        assert_eq!(
            target.page_url.as_str(),
            "https://musify.club/release/bar-album-2001"
        );
        assert_eq!(target.message, "downloading album Bar Album");

        // wrong artist, same album
        let query = SearchQuery::artist_and_album("Baz", "Bar Album");
        assert_eq!(
            parse_search_results(ALBUM_RESULTS, &query, &base()).unwrap(),
            Resolution::NotFound(NotFoundReason::ArtistMismatch)
        );

        // right artist, wrong album
        let query = SearchQuery::artist_and_album("Foo", "Other Album");
        assert_eq!(
            parse_search_results(ALBUM_RESULTS, &query, &base()).unwrap(),
            Resolution::NotFound(NotFoundReason::NoTitleMatch)
        );
    }

    #[test]
    fn test_artist_and_album_artist_is_case_sensitive() {
        let query = SearchQuery::artist_and_album("foo", "Bar Album");
        assert_eq!(
            parse_search_results(ALBUM_RESULTS, &query, &base()).unwrap(),
            Resolution::NotFound(NotFoundReason::ArtistMismatch)
        );
    }

    #[test]
    fn test_artist_and_album_mismatch_on_other_artist() {
        let markup = r#"
            <a id="albums">Альбомы</a>
            <a href="/release/bar-album" title="Bar Album">Bar Album <small>Baz</small></a>
        "#;
        let query = SearchQuery::new(TargetKind::ArtistAndAlbum, "Foo Bar Album");
        assert_eq!(
            parse_search_results(markup, &query, &base()).unwrap(),
            Resolution::NotFound(NotFoundReason::ArtistMismatch)
        );
    }

    #[test]
    fn test_split_artist_album() {
        let query = SearchQuery::new(TargetKind::ArtistAndAlbum, "  Foo   Bar  Album ");
        assert_eq!(query.split_artist_album(), ("Foo", "Bar Album".to_string()));
    }
}
