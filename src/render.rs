//! The render pass: fetch the feed, build cards, settle thumbnails, and
//! swap the result into the page.

use crate::image::{run_ladder, HttpImageProbe, ImageLoader, ImageProbe, ReferrerRule};
use crate::item::{decode_items, FeedItem};
use crate::page::FeedPage;
use crate::template::{Card, CardImage, PillPlacement};
use crate::{Error, RendererConfig, Result};
use chrono::FixedOffset;
use futures::stream::{self, StreamExt};
use reqwest::header::{CACHE_CONTROL, PRAGMA};
use reqwest::Client;
use serde_json::Value;

/// Outcome of one render pass.
#[derive(Debug, Default)]
pub struct RenderReport {
    /// Cards placed in the feed
    pub rendered: usize,
    /// Items that could not be turned into cards
    pub item_errors: Vec<Error>,
    /// Image load attempts made across all cards
    pub image_probes: usize,
    /// Whether the pass ended in the empty state
    pub empty: bool,
}

/// Renders feed items into a [`FeedPage`].
///
/// A pass needs `&mut FeedPage`, so two passes over the same page cannot
/// interleave; the last completed pass wins.
pub struct FeedRenderer {
    config: RendererConfig,
    client: Client,
    probe: Option<Box<dyn ImageProbe>>,
    rule: ReferrerRule,
    offset: FixedOffset,
}

impl FeedRenderer {
    /// Create a renderer that probes images over HTTP when
    /// `config.probe_images` is set.
    pub fn new(config: RendererConfig) -> Result<Self> {
        let probe: Option<Box<dyn ImageProbe>> = if config.probe_images {
            Some(Box::new(HttpImageProbe::new(&config)?))
        } else {
            None
        };
        Self::build(config, probe)
    }

    /// Create a renderer that uses `probe` for every image.
    pub fn with_probe(config: RendererConfig, probe: Box<dyn ImageProbe>) -> Result<Self> {
        Self::build(config, Some(probe))
    }

    fn build(config: RendererConfig, probe: Option<Box<dyn ImageProbe>>) -> Result<Self> {
        let client = config
            .client_builder()?
            .build()
            .map_err(|e| Error::ConfigError(format!("Failed to build HTTP client: {}", e)))?;
        let offset = config.display_offset()?;
        let rule = ReferrerRule::new(config.referrer_hosts.iter().cloned());
        Ok(Self {
            config,
            client,
            probe,
            rule,
            offset,
        })
    }

    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    /// Fetch the feed and render it.
    ///
    /// Any fetch failure puts the page in the empty state before the error
    /// is returned.
    pub async fn load_and_render(&self, page: &mut FeedPage) -> Result<RenderReport> {
        let doc = match self.fetch_feed().await {
            Ok(doc) => doc,
            Err(e) => {
                log::error!("failed to load feed {}: {}", self.config.feed_url, e);
                page.show_empty_state();
                return Err(e);
            }
        };
        Ok(self.render(page, &doc).await)
    }

    /// GET the feed document, bypassing caches.
    pub async fn fetch_feed(&self) -> Result<Value> {
        let res = self
            .client
            .get(&self.config.feed_url)
            .header(CACHE_CONTROL, "no-cache")
            .header(PRAGMA, "no-cache")
            .send()
            .await
            .map_err(|e| Error::LoadError(format!("HTTP GET failed: {}", e)))?;

        let status = res.status();
        if !status.is_success() {
            return Err(Error::LoadError(format!("HTTP {}", status.as_u16())));
        }

        let body = res
            .bytes()
            .await
            .map_err(|e| Error::LoadError(format!("Failed to read response body: {}", e)))?;
        Ok(serde_json::from_slice(&body)?)
    }

    /// Render a feed document into `page`.
    ///
    /// Anything other than a non-empty array shows the empty state. Items
    /// that fail to decode or whose brand cannot be derived are logged,
    /// reported, and left out; the rest are rendered.
    pub async fn render(&self, page: &mut FeedPage, doc: &Value) -> RenderReport {
        let Some(entries) = decode_items(doc) else {
            log::info!("feed has no items");
            page.show_empty_state();
            return RenderReport {
                empty: true,
                ..Default::default()
            };
        };

        let mut report = RenderReport::default();
        let mut cards = Vec::with_capacity(entries.len());
        for (index, entry) in entries.into_iter().enumerate() {
            let card = entry.and_then(|item| {
                self.build_card(&item).map_err(|e| Error::ItemError {
                    index,
                    reason: e.to_string(),
                })
            });
            match card {
                Ok(card) => cards.push(card),
                Err(e) => {
                    log::error!("skipping feed item: {}", e);
                    report.item_errors.push(e);
                }
            }
        }

        if cards.is_empty() {
            page.show_empty_state();
            report.empty = true;
            return report;
        }

        report.image_probes = self.settle_images(&mut cards).await;
        report.rendered = cards.len();
        log::debug!(
            "rendered {} cards ({} image probes, {} skipped)",
            report.rendered,
            report.image_probes,
            report.item_errors.len()
        );
        page.replace_cards(cards);
        report
    }

    /// Populate a card for `item` with its image ladder started.
    pub fn build_card(&self, item: &FeedItem) -> Result<Card> {
        let locale = self.config.locale;
        let brand = item.brand()?;

        let mut meta = brand.clone();
        if let Some(dt) = item.fetched_at(self.offset) {
            meta.push_str(" · ");
            meta.push_str(&locale.short_datetime(&dt));
        }

        let image = item.image_src().map(|src| {
            let mut loader = ImageLoader::new(src);
            loader.start(&self.rule);
            CardImage {
                alt: item.image_alt(locale).to_string(),
                loader,
            }
        });

        let mut card = Card {
            href: item.url.clone(),
            title: item.display_title(locale).to_string(),
            description: item.display_description().to_string(),
            click_label: item.click_label(locale),
            brand,
            meta,
            image,
            thumb_hidden: false,
            pill: PillPlacement::Template,
        };
        card.settle_image();
        Ok(card)
    }

    /// Run every card's image ladder to completion, concurrently.
    async fn settle_images(&self, cards: &mut [Card]) -> usize {
        let Some(probe) = self.probe.as_deref() else {
            return 0;
        };
        let limit = self.config.probe_concurrency.max(1);

        stream::iter(cards.iter_mut().filter(|c| c.image.is_some()))
            .map(|card| async move {
                let probes = match card.image.as_mut() {
                    Some(image) => run_ladder(&mut image.loader, probe).await,
                    None => 0,
                };
                card.settle_image();
                probes
            })
            .buffer_unordered(limit)
            .fold(0, |total, n| async move { total + n })
            .await
    }
}
