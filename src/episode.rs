//! Raw episode records from the episodes API and the display-ready view built from them.

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::locale::Locale;

/// Episode record exactly as the episodes API returns it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawEpisode {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub thumbnail: String,
    #[serde(default)]
    pub members: String,
    #[serde(default)]
    pub published_at: Option<DateValue>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub file: RawFile,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawFile {
    #[serde(default)]
    pub duration: Option<DurationValue>,
    #[serde(default)]
    pub url: String,
}

/// The API sends durations either as a JSON number or as a numeric string.
/// Anything else is kept so the normalizer can reject it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DurationValue {
    Seconds(f64),
    Text(String),
    Other(Value),
}

/// `published_at` as sent. Non-string values are kept so the normalizer can reject them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DateValue {
    Text(String),
    Other(Value),
}

impl From<&str> for DateValue {
    fn from(text: &str) -> Self {
        DateValue::Text(text.to_string())
    }
}

impl From<u64> for DurationValue {
    fn from(seconds: u64) -> Self {
        DurationValue::Seconds(seconds as f64)
    }
}

impl From<&str> for DurationValue {
    fn from(text: &str) -> Self {
        DurationValue::Text(text.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("episode has no file.duration")]
    MissingDuration,
    #[error("file.duration '{value}' is not a number")]
    InvalidDuration { value: String },
    #[error("file.duration '{value}' is too large")]
    DurationTooLarge { value: String },
    #[error("file.duration '{value}' is negative")]
    NegativeDuration { value: String },
    #[error("episode has no published_at")]
    MissingPublishedAt,
    #[error("published_at '{value}' is not an ISO-8601 date-time")]
    InvalidPublishedAt { value: String },
}

/// Display-ready episode. Built only through [`normalize`] and never changed afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EpisodeView {
    id: String,
    title: String,
    thumbnail: String,
    members: String,
    published_at: String,
    duration: u64,
    duration_as_string: String,
    description: String,
    url: String,
}

impl EpisodeView {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn thumbnail(&self) -> &str {
        &self.thumbnail
    }

    pub fn members(&self) -> &str {
        &self.members
    }

    /// Individual names from the comma-separated `members` field.
    pub fn member_names(&self) -> Vec<&str> {
        self.members
            .split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .collect()
    }

    pub fn published_at(&self) -> &str {
        &self.published_at
    }

    pub fn duration(&self) -> u64 {
        self.duration
    }

    pub fn duration_as_string(&self) -> &str {
        &self.duration_as_string
    }

    /// Raw description markup as received. Renderers decide whether it is trusted.
    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

pub fn normalize(raw: &RawEpisode) -> Result<EpisodeView, ValidationError> {
    normalize_with_locale(raw, Locale::default())
}

pub fn normalize_with_locale(
    raw: &RawEpisode,
    locale: Locale,
) -> Result<EpisodeView, ValidationError> {
    let duration = coerce_duration(raw.file.duration.as_ref())?;
    let published_at = match &raw.published_at {
        None => return Err(ValidationError::MissingPublishedAt),
        Some(DateValue::Text(text)) => format_published_at(text, locale)?,
        Some(DateValue::Other(other)) => {
            return Err(ValidationError::InvalidPublishedAt {
                value: other.to_string(),
            });
        }
    };

    Ok(EpisodeView {
        id: raw.id.clone(),
        title: raw.title.clone(),
        thumbnail: raw.thumbnail.clone(),
        members: raw.members.clone(),
        published_at,
        duration,
        duration_as_string: format_duration(duration),
        description: raw.description.clone(),
        url: raw.file.url.clone(),
    })
}

/// Whole seconds from a raw duration. Strings are read as decimal; fractions are floored.
pub fn coerce_duration(value: Option<&DurationValue>) -> Result<u64, ValidationError> {
    let (number, shown) = match value {
        None => return Err(ValidationError::MissingDuration),
        Some(DurationValue::Seconds(seconds)) => (*seconds, seconds.to_string()),
        Some(DurationValue::Text(text)) => {
            let trimmed = text.trim();
            let parsed = if trimmed.is_empty() {
                None
            } else {
                trimmed.parse::<f64>().ok()
            };
            match parsed {
                Some(number) => (number, text.clone()),
                None => {
                    return Err(ValidationError::InvalidDuration {
                        value: text.clone(),
                    });
                }
            }
        }
        Some(DurationValue::Other(other)) => {
            return Err(ValidationError::InvalidDuration {
                value: other.to_string(),
            });
        }
    };

    if !number.is_finite() {
        return Err(ValidationError::InvalidDuration { value: shown });
    }
    if number >= u64::MAX as f64 {
        return Err(ValidationError::DurationTooLarge { value: shown });
    }
    if number < 0.0 {
        return Err(ValidationError::NegativeDuration { value: shown });
    }
    Ok(number.floor() as u64)
}

/// `HH:mm:ss` with every field zero-padded to two digits. Hours past 99 widen the field.
pub fn format_duration(total_seconds: u64) -> String {
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;
    format!("{hours:02}:{minutes:02}:{seconds:02}")
}

/// Short date such as `3 Jan 21`: day without padding, abbreviated month, two-digit year.
pub fn format_published_at(raw: &str, locale: Locale) -> Result<String, ValidationError> {
    let timestamp = parse_iso_datetime(raw).ok_or_else(|| ValidationError::InvalidPublishedAt {
        value: raw.to_string(),
    })?;
    let month = locale
        .month_abbrev(timestamp.month())
        .ok_or_else(|| ValidationError::InvalidPublishedAt {
            value: raw.to_string(),
        })?;
    Ok(format!(
        "{} {} {:02}",
        timestamp.day(),
        month,
        timestamp.year().rem_euclid(100)
    ))
}

const OFFSET_FORMATS: [&str; 6] = [
    "%Y-%m-%dT%H:%M:%S%.f%:z",
    "%Y-%m-%dT%H:%M:%S%.f%z",
    "%Y-%m-%dT%H:%M:%S%:z",
    "%Y-%m-%dT%H:%M:%S%z",
    "%Y-%m-%dT%H:%M%:z",
    "%Y-%m-%dT%H:%M%z",
];

/// Values without an offset are read as UTC; values with one are converted to UTC.
pub fn parse_iso_datetime(raw: &str) -> Option<DateTime<Utc>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.with_timezone(&Utc));
    }

    let naive_input = trimmed.replacen(' ', "T", 1);
    let offset_input = match naive_input.strip_suffix(['Z', 'z']) {
        Some(base) => format!("{base}+00:00"),
        None => naive_input.clone(),
    };
    for format in OFFSET_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(&offset_input, format) {
            return Some(dt.with_timezone(&Utc));
        }
    }

    if let Ok(naive) = naive_input.parse::<NaiveDateTime>() {
        return Some(naive.and_utc());
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(&naive_input, "%Y-%m-%dT%H:%M") {
        return Some(naive.and_utc());
    }

    let date = trimmed.parse::<NaiveDate>().ok()?;
    Some(date.and_hms_opt(0, 0, 0)?.and_utc())
}
