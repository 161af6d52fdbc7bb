//! Feedcards
//!
//! Renders a JSON feed into the card grid of an HTML page: each feed item is
//! stamped from the page's card template, missing fields fall back to
//! sensible defaults, and every thumbnail goes through a short retry ladder
//! before the card degrades to text only.
//!
//! # Features
//!
//! - **Template stamping**: the card markup lives in the page itself
//! - **Image fallback**: referrer-policy and cross-origin retries per thumbnail
//! - **Empty state**: a failed or empty feed hides the grid and shows a placeholder
//!
//! # Example
//!
//! ```no_run
//! use feedcards::{FeedPage, RendererConfig};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = RendererConfig {
//!     feed_url: "https://example.com/feed.json".to_string(),
//!     ..Default::default()
//! };
//!
//! let renderer = feedcards::new_renderer(config)?;
//! let mut page = FeedPage::parse(std::fs::read_to_string("index.html")?)?;
//! let report = renderer.load_and_render(&mut page).await?;
//! println!("rendered {} cards", report.rendered);
//! std::fs::write("index.rendered.html", page.to_html())?;
//! # Ok(())
//! # }
//! ```

use std::collections::HashMap;
use std::time::Duration;

pub mod error;
pub use error::{Error, Result};

pub(crate) mod dom;
pub mod format;
pub mod image;
pub mod item;
pub mod page;
pub mod render;
pub mod template;

pub use format::Locale;
pub use image::{ImageLoadState, ImageProbe, ReferrerPolicy};
pub use item::FeedItem;
pub use page::FeedPage;
pub use render::{FeedRenderer, RenderReport};
pub use template::{Card, CardTemplate, PillPlacement};

/// Feed location used when none is configured.
pub const DEFAULT_FEED_URL: &str = "https://dubu.github.io/spic/xxx.json";

/// Configuration for the feed renderer
///
/// The defaults match the page the renderer was built for: a Korean-language
/// feed, image hosts under `clien.net` that need an `origin` referrer, and
/// timestamps shown in KST.
///
/// # Examples
///
/// ```
/// let cfg = feedcards::RendererConfig::default();
/// assert!(cfg.probe_images);
/// assert_eq!(cfg.utc_offset_minutes, 540);
/// ```
#[derive(Debug, Clone)]
pub struct RendererConfig {
    /// JSON feed to fetch
    pub feed_url: String,
    /// User agent string to send with requests
    pub user_agent: String,
    /// Timeout for the feed and for each image probe, in milliseconds
    pub timeout_ms: u64,
    /// Custom HTTP headers
    pub headers: HashMap<String, String>,
    /// Whether to run the image ladder against the network. When disabled
    /// cards are left in their first loading state.
    pub probe_images: bool,
    /// Maximum number of image ladders running at once
    pub probe_concurrency: usize,
    /// URL substrings of image hosts that get the `origin` referrer first
    pub referrer_hosts: Vec<String>,
    /// Origin of the page the cards are shown on, sent as referrer/origin
    pub page_origin: Option<String>,
    /// Locale for placeholders, count suffix and dates
    pub locale: Locale,
    /// Offset of the display timezone from UTC, in minutes
    pub utc_offset_minutes: i32,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            feed_url: DEFAULT_FEED_URL.to_string(),
            user_agent: concat!("feedcards/", env!("CARGO_PKG_VERSION")).to_string(),
            timeout_ms: 30000,
            headers: HashMap::new(),
            probe_images: true,
            probe_concurrency: 8,
            referrer_hosts: vec!["clien.net".to_string(), "edgio.clien.net".to_string()],
            page_origin: Some("https://dubu.github.io".to_string()),
            locale: Locale::default(),
            utc_offset_minutes: 9 * 60,
        }
    }
}

impl RendererConfig {
    /// The display timezone.
    pub fn display_offset(&self) -> Result<chrono::FixedOffset> {
        chrono::FixedOffset::east_opt(self.utc_offset_minutes * 60).ok_or_else(|| {
            Error::ConfigError(format!("UTC offset out of range: {} minutes", self.utc_offset_minutes))
        })
    }

    /// HTTP client builder carrying the user agent, headers and timeout.
    pub(crate) fn client_builder(&self) -> Result<reqwest::ClientBuilder> {
        use reqwest::header::{HeaderMap, HeaderName, HeaderValue, USER_AGENT};

        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&self.user_agent)
                .map_err(|e| Error::ConfigError(format!("bad user agent: {}", e)))?,
        );
        for (k, v) in &self.headers {
            let name = HeaderName::from_bytes(k.as_bytes())
                .map_err(|e| Error::ConfigError(format!("bad header name '{}': {}", k, e)))?;
            let value = HeaderValue::from_str(v)
                .map_err(|e| Error::ConfigError(format!("bad header value for '{}': {}", k, e)))?;
            headers.insert(name, value);
        }

        Ok(reqwest::Client::builder()
            .timeout(Duration::from_millis(self.timeout_ms))
            .default_headers(headers))
    }
}

/// Create a renderer with the HTTP image probe (or none, when
/// `probe_images` is off).
pub fn new_renderer(config: RendererConfig) -> Result<FeedRenderer> {
    FeedRenderer::new(config)
}
