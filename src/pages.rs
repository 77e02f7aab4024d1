//! Static generation of one JSON page per episode, refreshed after a revalidate window.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::api::{ApiError, EpisodesApi, encode_path_segment};
use crate::episode::{RawEpisode, normalize_with_locale};
use crate::locale::Locale;
use crate::render::{DescriptionPolicy, render_json};

pub const DEFAULT_REVALIDATE_SECS: u64 = 60 * 60 * 24;
pub const DEFAULT_PATH_LIMIT: usize = 2;

/// Where episodes come from during generation.
pub trait EpisodeSource {
    fn latest_episodes(&self, limit: usize) -> Result<Vec<RawEpisode>, ApiError>;
    fn episode(&self, id: &str) -> Result<RawEpisode, ApiError>;
}

impl EpisodeSource for EpisodesApi {
    fn latest_episodes(&self, limit: usize) -> Result<Vec<RawEpisode>, ApiError> {
        EpisodesApi::latest_episodes(self, limit)
    }

    fn episode(&self, id: &str) -> Result<RawEpisode, ApiError> {
        EpisodesApi::episode(self, id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StaticPage {
    pub episode: Value,
    pub generated_at: DateTime<Utc>,
    pub revalidate_secs: u64,
}

#[derive(Debug, Error)]
pub enum PageError {
    #[error("failed to {action} {}: {source}", .path.display())]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to encode page for '{id}': {source}")]
    Encode {
        id: String,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone)]
pub struct GenerateOptions {
    pub out_dir: PathBuf,
    pub path_limit: usize,
    pub revalidate_secs: u64,
    pub force: bool,
    pub locale: Locale,
    pub description: DescriptionPolicy,
}

impl GenerateOptions {
    pub fn new(out_dir: impl Into<PathBuf>) -> Self {
        Self {
            out_dir: out_dir.into(),
            path_limit: DEFAULT_PATH_LIMIT,
            revalidate_secs: DEFAULT_REVALIDATE_SECS,
            force: false,
            locale: Locale::default(),
            description: DescriptionPolicy::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageOutcome {
    Written(PathBuf),
    Fresh,
    NotFound,
    Failed(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenerateReport {
    pub entries: Vec<(String, PageOutcome)>,
}

impl GenerateReport {
    pub fn written(&self) -> usize {
        self.count(|outcome| matches!(outcome, PageOutcome::Written(_)))
    }

    pub fn fresh(&self) -> usize {
        self.count(|outcome| matches!(outcome, PageOutcome::Fresh))
    }

    pub fn failed(&self) -> usize {
        self.count(|outcome| matches!(outcome, PageOutcome::Failed(_) | PageOutcome::NotFound))
    }

    fn count(&self, pred: impl Fn(&PageOutcome) -> bool) -> usize {
        self.entries.iter().filter(|(_, outcome)| pred(outcome)).count()
    }
}

/// File name for a page. Distinct ids always map to distinct names: the id is
/// percent-encoded with `+` standing in for `%`, and a leading `.` is encoded too.
pub fn page_file_name(id: &str) -> String {
    let mut name = encode_path_segment(id).replace('%', "+");
    if let Some(rest) = name.strip_prefix('.') {
        name = format!("+2E{rest}");
    }
    if name.is_empty() {
        name.push('+');
    }
    name.push_str(".json");
    name
}

pub fn page_path(out_dir: &Path, id: &str) -> PathBuf {
    out_dir.join(page_file_name(id))
}

pub fn needs_regeneration(existing: Option<&StaticPage>, now: DateTime<Utc>) -> bool {
    let Some(page) = existing else {
        return true;
    };
    let age = now.signed_duration_since(page.generated_at).num_seconds();
    age >= i64::try_from(page.revalidate_secs).unwrap_or(i64::MAX)
}

fn page_episode_id(page: &StaticPage) -> Option<&str> {
    page.episode.get("id").and_then(Value::as_str)
}

/// Reads a previously generated page. Unreadable or corrupt pages count as missing.
pub fn read_page(path: &Path) -> Option<StaticPage> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return None,
        Err(err) => {
            log::warn!("ignoring unreadable page {}: {err}", path.display());
            return None;
        }
    };
    match serde_json::from_str(&raw) {
        Ok(page) => Some(page),
        Err(err) => {
            log::warn!("ignoring corrupt page {}: {err}", path.display());
            None
        }
    }
}

pub fn write_page(path: &Path, id: &str, page: &StaticPage) -> Result<(), PageError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|source| PageError::Io {
            action: "create directory",
            path: parent.to_path_buf(),
            source,
        })?;
    }
    let encoded = serde_json::to_string_pretty(page).map_err(|source| PageError::Encode {
        id: id.to_string(),
        source,
    })?;

    let tmp_path = path.with_extension("json.tmp");
    fs::write(&tmp_path, encoded).map_err(|source| PageError::Io {
        action: "write",
        path: tmp_path.clone(),
        source,
    })?;
    fs::rename(&tmp_path, path).map_err(|source| PageError::Io {
        action: "replace",
        path: path.to_path_buf(),
        source,
    })
}

/// Generates pages for `ids`, or for the newest `path_limit` episodes when `ids` is empty.
/// A failure for one entry is recorded in the report and does not stop the others.
pub fn generate(
    source: &impl EpisodeSource,
    ids: &[String],
    options: &GenerateOptions,
    now: DateTime<Utc>,
) -> Result<GenerateReport, ApiError> {
    let ids = if ids.is_empty() {
        let latest = source.latest_episodes(options.path_limit)?;
        log::info!("enumerated {} episode path(s)", latest.len());
        latest.into_iter().map(|episode| episode.id).collect()
    } else {
        ids.to_vec()
    };

    let mut report = GenerateReport::default();
    for id in ids {
        let outcome = generate_one(source, &id, options, now);
        match &outcome {
            PageOutcome::Written(path) => log::info!("wrote {id} to {}", path.display()),
            PageOutcome::Fresh => log::debug!("{id} is still fresh; skipped"),
            PageOutcome::NotFound => log::warn!("{id} was not found"),
            PageOutcome::Failed(reason) => log::warn!("{id} failed: {reason}"),
        }
        report.entries.push((id, outcome));
    }
    Ok(report)
}

fn generate_one(
    source: &impl EpisodeSource,
    id: &str,
    options: &GenerateOptions,
    now: DateTime<Utc>,
) -> PageOutcome {
    let path = page_path(&options.out_dir, id);
    let existing = read_page(&path).filter(|page| page_episode_id(page) == Some(id));
    if !options.force && !needs_regeneration(existing.as_ref(), now) {
        return PageOutcome::Fresh;
    }

    let raw = match source.episode(id) {
        Ok(raw) => raw,
        Err(err) if err.is_not_found() => return PageOutcome::NotFound,
        Err(err) => return PageOutcome::Failed(err.to_string()),
    };
    let view = match normalize_with_locale(&raw, options.locale) {
        Ok(view) => view,
        Err(err) => return PageOutcome::Failed(err.to_string()),
    };
    let episode = match render_json(&view, options.description) {
        Ok(value) => value,
        Err(err) => return PageOutcome::Failed(err.to_string()),
    };

    let page = StaticPage {
        episode,
        generated_at: now,
        revalidate_secs: options.revalidate_secs,
    };
    match write_page(&path, id, &page) {
        Ok(()) => PageOutcome::Written(path),
        Err(err) => PageOutcome::Failed(err.to_string()),
    }
}
