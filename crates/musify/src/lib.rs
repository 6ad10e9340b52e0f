pub mod client;
pub mod config;
pub mod crawler;
pub mod document;
pub mod downloader;
pub mod error;
pub mod resolver;
pub mod utils;

pub use client::{AssetStream, HttpSiteClient, SiteClient};
pub use config::{FileMode, SiteConfig};
pub use crawler::{Crawl, CrawlBudget, TrackReference};
pub use downloader::{DownloadOutcome, Downloader, ProgressCallback, ProgressEvent};
pub use error::{DownloadError, SiteError};
pub use resolver::{NotFoundReason, Resolution, ResolvedTarget, Resolver, SearchQuery, TargetKind};
