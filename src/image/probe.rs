//! Image probes stand in for the browser's image load and error events.

use super::{Attempt, ReferrerPolicy};
use crate::{Error, RendererConfig, Result};
use futures::future::BoxFuture;
use reqwest::header::{ACCESS_CONTROL_ALLOW_ORIGIN, CONTENT_TYPE, ORIGIN, REFERER};
use reqwest::Client;
use url::Url;

/// Tries to load an image under a given request mode.
///
/// `Ok(())` corresponds to a load event, `Err` to an error event.
pub trait ImageProbe: Send + Sync {
    fn probe<'a>(&'a self, src: &'a str, attempt: Attempt) -> BoxFuture<'a, Result<()>>;
}

/// Probe that fetches the image over HTTP.
///
/// - `origin` referrer policy sends the configured page origin as `Referer`
/// - anonymous cross-origin sends `Origin` and requires a matching
///   `Access-Control-Allow-Origin`
/// - a response counts as an image when it is 2xx and its content type is
///   `image/*` or absent
/// - relative sources are resolved against the page origin
pub struct HttpImageProbe {
    client: Client,
    page_origin: Option<String>,
    base: Option<Url>,
}

impl HttpImageProbe {
    pub fn new(config: &RendererConfig) -> Result<Self> {
        let client = config
            .client_builder()?
            .referer(false)
            .build()
            .map_err(|e| Error::ConfigError(format!("Failed to build HTTP client: {}", e)))?;

        let base = config
            .page_origin
            .as_deref()
            .map(|origin| {
                Url::parse(origin)
                    .map_err(|e| Error::ConfigError(format!("bad page origin '{}': {}", origin, e)))
            })
            .transpose()?;

        Ok(Self {
            client,
            page_origin: config.page_origin.clone(),
            base,
        })
    }

    /// Absolute URL for `src`, as the page would resolve it.
    fn resolve(&self, src: &str) -> Result<Url> {
        let src = src.trim();
        let invalid = |reason: String| Error::InvalidUrl {
            url: src.to_string(),
            reason,
        };
        match Url::parse(src) {
            Ok(url) => Ok(url),
            Err(url::ParseError::RelativeUrlWithoutBase) => match &self.base {
                Some(base) => base.join(src).map_err(|e| invalid(e.to_string())),
                None => Err(invalid("relative URL without a page origin".into())),
            },
            Err(e) => Err(invalid(e.to_string())),
        }
    }

    async fn fetch(&self, src: &str, attempt: Attempt) -> Result<()> {
        let mut req = self.client.get(self.resolve(src)?);
        if let Some(origin) = &self.page_origin {
            if attempt.referrer_policy == ReferrerPolicy::Origin {
                req = req.header(REFERER, format!("{}/", origin.trim_end_matches('/')));
            }
            if attempt.cross_origin {
                req = req.header(ORIGIN, origin.as_str());
            }
        }

        let res = req.send().await?;
        let status = res.status();
        if !status.is_success() {
            return Err(Error::NetworkError(format!("HTTP {}", status.as_u16())));
        }

        if let Some(ct) = res.headers().get(CONTENT_TYPE) {
            let ct = ct.to_str().unwrap_or_default();
            if !ct.trim_start().to_ascii_lowercase().starts_with("image/") {
                return Err(Error::LoadError(format!("not an image: {}", ct)));
            }
        }

        if attempt.cross_origin {
            let allowed = res
                .headers()
                .get(ACCESS_CONTROL_ALLOW_ORIGIN)
                .and_then(|v| v.to_str().ok())
                .map(|v| v == "*" || Some(v) == self.page_origin.as_deref())
                .unwrap_or(false);
            if !allowed {
                return Err(Error::LoadError("blocked by CORS policy".into()));
            }
        }

        Ok(())
    }
}

impl ImageProbe for HttpImageProbe {
    fn probe<'a>(&'a self, src: &'a str, attempt: Attempt) -> BoxFuture<'a, Result<()>> {
        Box::pin(self.fetch(src, attempt))
    }
}

/// Probe that reports every image as loaded without touching the network.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopImageProbe;

impl NoopImageProbe {
    pub fn new() -> Self {
        NoopImageProbe
    }
}

impl ImageProbe for NoopImageProbe {
    fn probe<'a>(&'a self, _src: &'a str, _attempt: Attempt) -> BoxFuture<'a, Result<()>> {
        Box::pin(futures::future::ready(Ok(())))
    }
}
