//! Table lookup result matching the SSB `?query=title:` response.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// One record of a table lookup.
///
/// The API sends lower-case keys; the capitalised spellings are accepted too.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableQueryResult {
    /// Table identifier as the API reports it (zero-padded, e.g. "05939").
    #[serde(default, alias = "Id")]
    pub id: Option<String>,

    /// Subject path of the table in the PxWeb tree.
    #[serde(default, alias = "Path")]
    pub path: Option<String>,

    /// Table title.
    #[serde(default, alias = "Title")]
    pub title: Option<String>,

    /// Search relevance score.
    #[serde(default, alias = "Score")]
    pub score: Option<f64>,

    /// When the table was last published.
    #[serde(alias = "Published")]
    pub published: Published,
}

impl TableQueryResult {
    /// Get the table title, falling back to "Untitled" if not available.
    #[must_use]
    pub fn title_or_default(&self) -> &str {
        self.title.as_deref().unwrap_or("Untitled")
    }
}

/// A publication timestamp.
///
/// Keeps the text the API sent so it can be echoed unchanged, alongside the
/// parsed value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Published {
    raw: String,
    at: NaiveDateTime,
}

impl Published {
    /// Timestamp as sent by the API.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Parsed wall-clock time of publication.
    #[must_use]
    pub const fn date_time(&self) -> NaiveDateTime {
        self.at
    }
}

/// Naive layouts accepted after RFC 3339, most precise first.
const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Error for a timestamp in none of the accepted layouts.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid published timestamp: {0:?}")]
pub struct InvalidTimestamp(String);

impl FromStr for Published {
    type Err = InvalidTimestamp;

    /// Parses RFC 3339, ISO-8601 local date-times with `T` or a space,
    /// minute precision, and bare dates (midnight). Surrounding whitespace
    /// is ignored for parsing but kept in the echoed text.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let at = DateTime::parse_from_rfc3339(trimmed)
            .map(|dt| dt.naive_local())
            .ok()
            .or_else(|| {
                NAIVE_FORMATS
                    .iter()
                    .find_map(|fmt| NaiveDateTime::parse_from_str(trimmed, fmt).ok())
            })
            .or_else(|| {
                NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
                    .ok()
                    .and_then(|d| d.and_hms_opt(0, 0, 0))
            })
            .ok_or_else(|| InvalidTimestamp(s.to_string()))?;

        Ok(Self { raw: s.to_string(), at })
    }
}

impl fmt::Display for Published {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl Serialize for Published {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.raw)
    }
}

impl<'de> Deserialize<'de> for Published {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    #[test]
    fn test_decode_api_record() {
        let json = r#"{
            "id": "05939",
            "path": "/befolkning/folketall",
            "title": "05939: Befolkning",
            "score": 12.5,
            "published": "2020-10-21T08:00:00"
        }"#;

        let record: TableQueryResult = serde_json::from_str(json).unwrap();
        assert_eq!(record.id.as_deref(), Some("05939"));
        assert_eq!(record.score, Some(12.5));
        assert_eq!(record.published.as_str(), "2020-10-21T08:00:00");
        assert_eq!(
            record.published.date_time(),
            NaiveDate::from_ymd_opt(2020, 10, 21).unwrap().and_hms_opt(8, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_decode_capitalised_keys() {
        let json = r#"{"Title": "12115: Kommuneregnskap", "Published": "2020-01-01T00:00:00"}"#;
        let record: TableQueryResult = serde_json::from_str(json).unwrap();
        assert_eq!(record.title_or_default(), "12115: Kommuneregnskap");
        assert_eq!(record.published.to_string(), "2020-01-01T00:00:00");
        assert!(record.id.is_none());
    }

    #[test]
    fn test_missing_published_is_an_error() {
        let json = r#"{"id": "12115", "title": "no date"}"#;
        assert!(serde_json::from_str::<TableQueryResult>(json).is_err());
    }

    #[test]
    fn test_rfc3339_keeps_wall_clock() {
        let published: Published = "2021-03-04T08:00:00+01:00".parse().unwrap();
        assert_eq!(published.date_time().hour(), 8);
        assert_eq!(published.as_str(), "2021-03-04T08:00:00+01:00");
    }

    #[test]
    fn test_fractional_seconds() {
        let published: Published = "2021-03-04T08:00:00.250".parse().unwrap();
        assert_eq!(published.date_time().nanosecond(), 250_000_000);
    }

    #[test]
    fn test_rejects_garbage() {
        let err = "yesterday".parse::<Published>().unwrap_err();
        assert!(err.to_string().contains("yesterday"));
        assert!("2020-13-01T00:00:00".parse::<Published>().is_err());
    }

    #[test]
    fn test_minute_precision_and_space_separator() {
        let minutes: Published = "2020-01-01T08:30".parse().unwrap();
        assert_eq!(
            minutes.date_time(),
            NaiveDate::from_ymd_opt(2020, 1, 1).unwrap().and_hms_opt(8, 30, 0).unwrap()
        );

        let spaced: Published = "2020-01-01 08:00:00".parse().unwrap();
        assert_eq!(spaced.date_time().hour(), 8);

        let spaced_minutes: Published = "2020-01-01 08:15".parse().unwrap();
        assert_eq!(spaced_minutes.date_time().minute(), 15);
    }

    #[test]
    fn test_date_only_is_midnight() {
        let published: Published = "2020-01-01".parse().unwrap();
        assert_eq!(
            published.date_time(),
            NaiveDate::from_ymd_opt(2020, 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap()
        );
        assert_eq!(published.to_string(), "2020-01-01");
    }

    #[test]
    fn test_surrounding_whitespace_is_echoed() {
        let published: Published = " 2020-01-01T00:00:00 ".parse().unwrap();
        assert_eq!(published.to_string(), " 2020-01-01T00:00:00 ");
        assert_eq!(published.date_time().hour(), 0);
    }

    #[test]
    fn test_serialize_echoes_raw() {
        let published: Published = "2020-02-02T00:00:00".parse().unwrap();
        assert_eq!(serde_json::to_string(&published).unwrap(), r#""2020-02-02T00:00:00""#);
    }
}
