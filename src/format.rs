//! Locale-aware formatting for card text: view counts and short timestamps.

use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, NaiveDateTime, TimeZone, Timelike, Utc};
use std::str::FromStr;

/// Display locale for placeholder strings, count suffixes and dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum Locale {
    /// ko-KR, the feed's native audience
    #[default]
    #[value(name = "ko", alias = "ko-kr")]
    Korean,
    /// en-US
    #[value(name = "en", alias = "en-us")]
    English,
}

impl Locale {
    /// Title shown when an item has none.
    pub fn no_title(&self) -> &'static str {
        match self {
            Locale::Korean => "제목 없음",
            Locale::English => "No title",
        }
    }

    /// Suffix appended to a grouped view count.
    pub fn views_suffix(&self) -> &'static str {
        match self {
            Locale::Korean => "조회",
            Locale::English => "views",
        }
    }

    /// Alt text used for a thumbnail when the item has no title.
    pub fn thumbnail_alt(&self) -> &'static str {
        match self {
            Locale::Korean => "썸네일",
            Locale::English => "Thumbnail",
        }
    }

    /// Format a timestamp as month, day, 2-digit hour and minute.
    pub fn short_datetime(&self, dt: &DateTime<FixedOffset>) -> String {
        let hour = dt.hour();
        let h12 = match hour % 12 {
            0 => 12,
            h => h,
        };
        match self {
            Locale::Korean => {
                let half = if hour < 12 { "오전" } else { "오후" };
                format!("{}월 {}일 {} {:02}:{:02}", dt.month(), dt.day(), half, h12, dt.minute())
            }
            Locale::English => {
                const MONTHS: [&str; 12] = [
                    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
                ];
                let half = if hour < 12 { "AM" } else { "PM" };
                format!(
                    "{} {}, {:02}:{:02} {}",
                    MONTHS[dt.month0() as usize],
                    dt.day(),
                    h12,
                    dt.minute(),
                    half
                )
            }
        }
    }
}

impl FromStr for Locale {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ko" | "ko-kr" => Ok(Locale::Korean),
            "en" | "en-us" => Ok(Locale::English),
            other => Err(crate::Error::ConfigError(format!("unsupported locale: {}", other))),
        }
    }
}

/// Group the integer digits of `value` in threes, keeping at most three
/// fraction digits (trailing zeros dropped).
pub fn group_digits(value: f64) -> String {
    if !value.is_finite() {
        return value.to_string();
    }

    let negative = value < 0.0;
    let scaled = (value.abs() * 1000.0).round() as u128;
    let int_part = scaled / 1000;
    let frac_part = scaled % 1000;

    let digits = int_part.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    if frac_part > 0 {
        let frac = format!("{:03}", frac_part);
        grouped.push('.');
        grouped.push_str(frac.trim_end_matches('0'));
    }

    if negative && scaled > 0 {
        grouped.insert(0, '-');
    }
    grouped
}

const NAIVE_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Parse an ISO-ish timestamp.
///
/// Strings with an explicit offset keep it, naive date-times are read as
/// local time in `local`, and bare dates are UTC midnight. The result is
/// expressed in `local`. Returns `None` for anything unparseable.
pub fn parse_timestamp(raw: &str, local: FixedOffset) -> Option<DateTime<FixedOffset>> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&local));
    }
    if let Ok(dt) = DateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f%z") {
        return Some(dt.with_timezone(&local));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Some(dt.with_timezone(&local));
    }

    for fmt in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return local.from_local_datetime(&naive).single();
        }
    }

    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        let midnight = date.and_hms_opt(0, 0, 0)?;
        return Some(Utc.from_utc_datetime(&midnight).with_timezone(&local));
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kst() -> FixedOffset {
        FixedOffset::east_opt(9 * 3600).unwrap()
    }

    #[test]
    fn groups_thousands() {
        assert_eq!(group_digits(0.0), "0");
        assert_eq!(group_digits(999.0), "999");
        assert_eq!(group_digits(1234.0), "1,234");
        assert_eq!(group_digits(1234567.0), "1,234,567");
        assert_eq!(group_digits(-9876.0), "-9,876");
    }

    #[test]
    fn keeps_up_to_three_fraction_digits() {
        assert_eq!(group_digits(1234.5), "1,234.5");
        assert_eq!(group_digits(0.12345), "0.123");
        assert_eq!(group_digits(1.9999), "2");
    }

    #[test]
    fn parses_offset_and_naive_timestamps() {
        let dt = parse_timestamp("2024-03-05T06:07:00Z", kst()).unwrap();
        assert_eq!((dt.month(), dt.day(), dt.hour(), dt.minute()), (3, 5, 15, 7));

        let naive = parse_timestamp("2024-03-05T06:07:00", kst()).unwrap();
        assert_eq!(naive.hour(), 6);

        let spaced = parse_timestamp("2024-03-05 23:59:59.123", kst()).unwrap();
        assert_eq!((spaced.hour(), spaced.minute()), (23, 59));

        let date_only = parse_timestamp("2024-03-05", kst()).unwrap();
        assert_eq!(date_only.hour(), 9);
    }

    #[test]
    fn rejects_garbage_timestamps() {
        assert!(parse_timestamp("not a date", kst()).is_none());
        assert!(parse_timestamp("", kst()).is_none());
        assert!(parse_timestamp("2024-13-45T99:00:00", kst()).is_none());
    }

    #[test]
    fn short_datetime_per_locale() {
        let dt = parse_timestamp("2024-10-17T15:05:00+09:00", kst()).unwrap();
        assert_eq!(Locale::Korean.short_datetime(&dt), "10월 17일 오후 03:05");
        assert_eq!(Locale::English.short_datetime(&dt), "Oct 17, 03:05 PM");

        let midnight = parse_timestamp("2024-01-02T00:30:00+09:00", kst()).unwrap();
        assert_eq!(Locale::Korean.short_datetime(&midnight), "1월 2일 오전 12:30");
    }

    #[test]
    fn locale_from_str() {
        assert_eq!("ko".parse::<Locale>().unwrap(), Locale::Korean);
        assert_eq!("en-US".parse::<Locale>().unwrap(), Locale::English);
        assert!("fr".parse::<Locale>().is_err());
    }
}
