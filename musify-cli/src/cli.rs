use std::{path::PathBuf, time::Duration};

use clap::{ArgGroup, Parser};
use musify_parser::{
    CrawlBudget, FileMode, SearchQuery, SiteConfig, config::DEFAULT_BASE_URL,
};
use url::Url;

use crate::error::AppError;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(group(
    ArgGroup::new("target")
        .required(true)
        .multiple(true)
        .args(["page", "artist", "release"]),
))]
pub struct Args {
    /// Catalog page to download from, e.g. an artist's songs page
    #[arg(short, long, conflicts_with_all = ["artist", "release"])]
    pub page: Option<String>,

    /// Artist to search for
    #[arg(short, long)]
    pub artist: Option<String>,

    /// Album to search for; combined with --artist it must belong to that artist
    #[arg(short, long)]
    pub release: Option<String>,

    /// Maximum number of tracks to download. The sign is ignored; 0 means no limit
    #[arg(short, long, allow_negative_numbers = true)]
    pub count: Option<i64>,

    /// Directory the tracks are written to
    #[arg(short, long, default_value = ".")]
    pub directory: PathBuf,

    /// Truncate existing files instead of appending to them
    #[arg(long)]
    pub overwrite: bool,

    /// Site root
    #[arg(long, env = "MUSIFY_HOST", default_value = DEFAULT_BASE_URL)]
    pub host: String,

    /// Request timeout in seconds, 0 disables it
    #[arg(long, env = "MUSIFY_TIMEOUT", default_value_t = 30)]
    pub timeout: u64,

    /// Custom User-Agent header
    #[arg(long, env = "MUSIFY_USER_AGENT")]
    pub user_agent: Option<String>,

    /// Enable debug logging
    #[arg(short, long, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Only log errors and hide progress bars
    #[arg(short, long)]
    pub quiet: bool,
}

/// Where the crawl starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Page(Url),
    Search(SearchQuery),
}

impl Args {
    pub fn target(&self) -> Result<Target, AppError> {
        match (&self.page, &self.artist, &self.release) {
            (Some(page), _, _) => Url::parse(page)
                .map(Target::Page)
                .map_err(|e| AppError::InvalidInput(format!("invalid page URL `{page}`: {e}"))),
            (None, Some(artist), Some(release)) => Ok(Target::Search(
                SearchQuery::artist_and_album(artist, release),
            )),
            (None, Some(artist), None) => Ok(Target::Search(SearchQuery::artist(artist.as_str()))),
            (None, None, Some(release)) => Ok(Target::Search(SearchQuery::album(release.as_str()))),
            (None, None, None) => Err(AppError::InvalidInput(
                "one of --page, --artist or --release is required".to_string(),
            )),
        }
    }

    pub fn budget(&self) -> CrawlBudget {
        CrawlBudget::from_count(self.count.map(i64::unsigned_abs).filter(|&count| count != 0))
    }

    pub fn site_config(&self) -> Result<SiteConfig, AppError> {
        let file_mode = if self.overwrite {
            FileMode::Truncate
        } else {
            FileMode::Append
        };

        let mut config = SiteConfig::default()
            .with_base_url(&self.host)
            .map_err(|e| AppError::InvalidInput(e.to_string()))?
            .with_timeout(Duration::from_secs(self.timeout))
            .with_file_mode(file_mode);

        if let Some(user_agent) = &self.user_agent {
            config = config.with_user_agent(user_agent.as_str());
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use musify_parser::TargetKind;

    fn parse(args: &[&str]) -> Result<Args, clap::Error> {
        Args::try_parse_from(std::iter::once("musify").chain(args.iter().copied()))
    }

    #[test]
    fn test_requires_a_target() {
        assert!(parse(&[]).is_err());
        assert!(parse(&["-c", "3"]).is_err());
    }

    #[test]
    fn test_page_conflicts_with_search() {
        assert!(parse(&["-p", "https://musify.club/artist/x", "-a", "x"]).is_err());
        assert!(parse(&["-p", "https://musify.club/artist/x", "-r", "y"]).is_err());
    }

    #[test]
    fn test_artist_and_release_combine() {
        let args = parse(&["-a", "Foo", "-r", "Bar Album"]).unwrap();
        let Target::Search(query) = args.target().unwrap() else {
            panic!("expected a search target");
        };
        assert_eq!(query.kind(), TargetKind::ArtistAndAlbum);
        assert_eq!(query.raw_text(), "Foo Bar Album");
    }

    #[test]
    fn test_page_target() {
        let args = parse(&["--page", "https://musify.club/release/x-1"]).unwrap();
        assert_eq!(
            args.target().unwrap(),
            Target::Page(Url::parse("https://musify.club/release/x-1").unwrap())
        );

        let args = parse(&["--page", "not a url"]).unwrap();
        assert!(matches!(args.target(), Err(AppError::InvalidInput(_))));
    }

    #[test]
    fn test_count_sign_and_zero() {
        assert_eq!(parse(&["-a", "x"]).unwrap().budget(), CrawlBudget::Unbounded);
        assert_eq!(
            parse(&["-a", "x", "-c", "0"]).unwrap().budget(),
            CrawlBudget::Unbounded
        );
        assert_eq!(
            parse(&["-a", "x", "-c", "5"]).unwrap().budget(),
            CrawlBudget::Remaining(5)
        );
        assert_eq!(
            parse(&["-a", "x", "-c", "-5"]).unwrap().budget(),
            CrawlBudget::Remaining(5)
        );
    }

    #[test]
    fn test_site_config_from_flags() {
        let args = parse(&[
            "-a",
            "x",
            "--overwrite",
            "--host",
            "https://mirror.example.com",
            "--timeout",
            "5",
            "--user-agent",
            "test-agent",
        ])
        .unwrap();
        let config = args.site_config().unwrap();

        assert_eq!(config.base_url.as_str(), "https://mirror.example.com/");
        assert_eq!(config.file_mode, FileMode::Truncate);
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(config.user_agent, "test-agent");
    }

    #[test]
    fn test_defaults() {
        let args = parse(&["-r", "Album"]).unwrap();
        assert_eq!(args.directory, PathBuf::from("."));
        assert!(!args.overwrite);
        assert_eq!(args.site_config().unwrap().file_mode, FileMode::Append);
    }
}
