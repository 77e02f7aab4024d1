use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use thiserror::Error;

const EN_MONTHS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

const PT_BR_MONTHS: [&str; 12] = [
    "jan", "fev", "mar", "abr", "mai", "jun", "jul", "ago", "set", "out", "nov", "dez",
];

/// Fixed month-name table used when rendering publication dates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub enum Locale {
    #[default]
    #[serde(rename = "en")]
    En,
    #[serde(rename = "pt-BR")]
    PtBr,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unsupported locale '{0}' (expected 'en' or 'pt-BR')")]
pub struct UnknownLocale(pub String);

impl Locale {
    /// Abbreviated month name for a 1-based month number.
    pub fn month_abbrev(self, month: u32) -> Option<&'static str> {
        let idx = usize::try_from(month.checked_sub(1)?).ok()?;
        match self {
            Locale::En => EN_MONTHS.get(idx).copied(),
            Locale::PtBr => PT_BR_MONTHS.get(idx).copied(),
        }
    }

    pub fn tag(self) -> &'static str {
        match self {
            Locale::En => "en",
            Locale::PtBr => "pt-BR",
        }
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for Locale {
    type Err = UnknownLocale;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "en" | "en-us" | "en-gb" => Ok(Locale::En),
            "pt" | "pt-br" => Ok(Locale::PtBr),
            _ => Err(UnknownLocale(raw.to_string())),
        }
    }
}
