use anyhow::Context;
use clap::Parser;
use feedcards::{FeedPage, FeedRenderer, Locale, RendererConfig};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Render a JSON feed into the card grid of an HTML page.
#[derive(Parser, Debug)]
#[command(name = "feedcards", version, about)]
struct Args {
    /// Page containing #feed, #empty and the card template
    #[arg(long)]
    page: PathBuf,

    /// Feed document to fetch
    #[arg(long, default_value = feedcards::DEFAULT_FEED_URL)]
    feed_url: String,

    /// Where to write the rendered page (stdout when omitted)
    #[arg(long)]
    out: Option<PathBuf>,

    /// Skip image probing; cards keep their first loading state
    #[arg(long)]
    no_probe: bool,

    /// Display locale
    #[arg(long, value_enum, default_value_t = Locale::Korean)]
    locale: Locale,

    /// Request timeout in milliseconds
    #[arg(long, default_value_t = 30000)]
    timeout_ms: u64,

    /// User agent for the feed and image requests
    #[arg(long)]
    user_agent: Option<String>,

    /// Origin of the page, sent as referrer to hosts that need one
    #[arg(long)]
    page_origin: Option<String>,

    /// Display timezone offset from UTC in minutes
    #[arg(long, default_value_t = 540, allow_negative_numbers = true)]
    tz_offset_minutes: i32,
}

impl Args {
    fn config(&self) -> RendererConfig {
        let defaults = RendererConfig::default();
        RendererConfig {
            feed_url: self.feed_url.clone(),
            user_agent: self.user_agent.clone().unwrap_or(defaults.user_agent),
            timeout_ms: self.timeout_ms,
            probe_images: !self.no_probe,
            page_origin: self.page_origin.clone().or(defaults.page_origin),
            locale: self.locale,
            utc_offset_minutes: self.tz_offset_minutes,
            ..RendererConfig::default()
        }
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(Args::parse()).await {
        tracing::error!("{:#}", e);
        std::process::exit(1);
    }
}

async fn run(args: Args) -> anyhow::Result<()> {
    let source = std::fs::read_to_string(&args.page)
        .with_context(|| format!("reading page {}", args.page.display()))?;
    let mut page = FeedPage::parse(source).context("parsing page")?;
    let renderer = FeedRenderer::new(args.config())?;

    let loaded = renderer.load_and_render(&mut page).await;

    // The page is written either way; a failed load leaves it in the empty state.
    let html = page.to_html();
    match &args.out {
        Some(path) => std::fs::write(path, html).with_context(|| format!("writing {}", path.display()))?,
        None => print!("{}", html),
    }

    let report = loaded.context("loading feed")?;
    tracing::info!(
        rendered = report.rendered,
        skipped = report.item_errors.len(),
        image_probes = report.image_probes,
        "feed rendered"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_locale_and_overrides() {
        let args = Args::try_parse_from([
            "feedcards",
            "--page",
            "index.html",
            "--locale",
            "en",
            "--no-probe",
            "--tz-offset-minutes",
            "-300",
        ])
        .unwrap();
        let config = args.config();
        assert_eq!(config.locale, Locale::English);
        assert!(!config.probe_images);
        assert_eq!(config.utc_offset_minutes, -300);
        assert_eq!(config.feed_url, feedcards::DEFAULT_FEED_URL);
    }

    #[test]
    fn defaults_to_korean_and_rejects_unknown_locales() {
        let args = Args::try_parse_from(["feedcards", "--page", "p.html"]).unwrap();
        assert_eq!(args.config().locale, Locale::Korean);

        assert!(Args::try_parse_from(["feedcards", "--page", "p.html", "--locale", "fr"]).is_err());
    }
}
