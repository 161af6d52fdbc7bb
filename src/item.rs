//! Feed item data model and the display fields derived from it.

use crate::format::{group_digits, parse_timestamp, Locale};
use crate::{Error, Result};
use chrono::{DateTime, FixedOffset, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::Url;

/// One entry of the feed document.
///
/// Only `url` is required. Optional text fields treat an empty string the
/// same as a missing one.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeedItem {
    /// Card hyperlink, also the source of the fallback brand
    pub url: String,
    /// Thumbnail source URL
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    /// Source name shown in the pill; defaults to the host of `url`
    #[serde(default)]
    pub brand: Option<String>,
    /// View count, usually a number
    #[serde(default)]
    pub click_cnt: Option<Value>,
    /// Fetch timestamp, an ISO-ish string or epoch milliseconds
    #[serde(default)]
    pub fetched_at: Option<Value>,
}

fn non_empty(field: &Option<String>) -> Option<&str> {
    field.as_deref().filter(|s| !s.is_empty())
}

impl FeedItem {
    /// Title or the locale placeholder.
    pub fn display_title(&self, locale: Locale) -> &str {
        non_empty(&self.title).unwrap_or_else(|| locale.no_title())
    }

    /// Alt text for the thumbnail.
    pub fn image_alt(&self, locale: Locale) -> &str {
        non_empty(&self.title).unwrap_or_else(|| locale.thumbnail_alt())
    }

    pub fn display_description(&self) -> &str {
        non_empty(&self.description).unwrap_or("")
    }

    /// Image source to load, if the item has a non-blank one.
    ///
    /// The URL is returned as given; only the emptiness check trims.
    pub fn image_src(&self) -> Option<&str> {
        self.image.as_deref().filter(|s| !s.trim().is_empty())
    }

    /// Brand text for the pill and meta line.
    ///
    /// Falls back to the host of `url`, which fails for malformed URLs.
    pub fn brand(&self) -> Result<String> {
        match non_empty(&self.brand) {
            Some(brand) => Ok(brand.to_string()),
            None => url_host(&self.url),
        }
    }

    /// Grouped view count with the locale suffix, e.g. `1,234 조회`.
    pub fn click_label(&self, locale: Locale) -> Option<String> {
        let count = match self.click_cnt.as_ref()? {
            Value::Number(n) => {
                let v = n.as_f64()?;
                if v == 0.0 || v.is_nan() {
                    return None;
                }
                group_digits(v)
            }
            Value::String(s) if !s.is_empty() => s.clone(),
            Value::Bool(true) => "true".to_string(),
            _ => return None,
        };
        Some(format!("{} {}", count, locale.views_suffix()))
    }

    /// Parsed `fetched_at`, or `None` when it is missing, falsy (`0`, `""`)
    /// or invalid.
    pub fn fetched_at(&self, local: FixedOffset) -> Option<DateTime<FixedOffset>> {
        match self.fetched_at.as_ref()? {
            Value::String(s) => parse_timestamp(s, local),
            Value::Number(n) => {
                let millis = n.as_f64().filter(|m| *m != 0.0 && m.is_finite())? as i64;
                let utc = Utc.timestamp_millis_opt(millis).single()?;
                Some(utc.with_timezone(&local))
            }
            _ => None,
        }
    }
}

/// Host of `raw`, including a non-default port.
pub fn url_host(raw: &str) -> Result<String> {
    let parsed = Url::parse(raw).map_err(|e| Error::InvalidUrl {
        url: raw.to_string(),
        reason: e.to_string(),
    })?;
    let host = parsed
        .host_str()
        .filter(|h| !h.is_empty())
        .ok_or_else(|| Error::InvalidUrl {
            url: raw.to_string(),
            reason: "URL has no host".into(),
        })?;
    Ok(match parsed.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    })
}

/// Decode the feed document into per-element results.
///
/// Returns `None` when the document is not an array or is empty; those
/// cases render the empty state. Elements decode independently so one
/// malformed entry does not discard the others.
pub fn decode_items(doc: &Value) -> Option<Vec<Result<FeedItem>>> {
    let entries = doc.as_array().filter(|a| !a.is_empty())?;
    Some(
        entries
            .iter()
            .enumerate()
            .map(|(index, entry)| {
                FeedItem::deserialize(entry).map_err(|e| Error::ItemError {
                    index,
                    reason: e.to_string(),
                })
            })
            .collect(),
    )
}
