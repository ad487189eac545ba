// src/ingest/config.rs
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::ingest::time::FrameOffsets;

pub const ENV_CONFIG_PATH: &str = "FF_CALENDAR_CONFIG";
pub const ENV_FEED_URL: &str = "FF_CALENDAR_URL";

pub const DEFAULT_FEED_URL: &str = "https://nfs.faireconomy.media/ff_calendar_thisweek.xml";
pub const DEFAULT_CURRENCIES: [&str; 8] = ["USD", "EUR", "GBP", "JPY", "AUD", "NZD", "CAD", "CHF"];

const MAX_OFFSET_HOURS: i64 = 48;

fn default_feed_url() -> String {
    DEFAULT_FEED_URL.to_string()
}
fn default_source() -> String {
    "ForexFactory".to_string()
}
fn default_currencies() -> Vec<String> {
    DEFAULT_CURRENCIES.iter().map(|c| c.to_string()).collect()
}
fn default_impact_levels() -> BTreeMap<String, u8> {
    [("High", 3), ("Medium", 2), ("Low", 1), ("Holiday", 0)]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
}
fn default_utc_offset_hours() -> i64 {
    5
}
fn default_secondary_offset_hours() -> i64 {
    10
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36".to_string()
}

/// Everything the pipeline needs that is not part of the feed itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarConfig {
    #[serde(default = "default_feed_url")]
    pub feed_url: String,
    /// Value of `source` in the output document.
    #[serde(default = "default_source")]
    pub source: String,
    #[serde(default = "default_currencies")]
    pub currencies: Vec<String>,
    #[serde(default = "default_impact_levels")]
    pub impact_levels: BTreeMap<String, u8>,
    /// Feed-local (US Eastern, no DST) → UTC.
    #[serde(default = "default_utc_offset_hours")]
    pub utc_offset_hours: i64,
    /// UTC → secondary frame (AEST, no DST).
    #[serde(default = "default_secondary_offset_hours")]
    pub secondary_offset_hours: i64,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for CalendarConfig {
    fn default() -> Self {
        Self {
            feed_url: default_feed_url(),
            source: default_source(),
            currencies: default_currencies(),
            impact_levels: default_impact_levels(),
            utc_offset_hours: default_utc_offset_hours(),
            secondary_offset_hours: default_secondary_offset_hours(),
            timeout_secs: default_timeout_secs(),
            user_agent: default_user_agent(),
        }
    }
}

impl CalendarConfig {
    pub fn offsets(&self) -> FrameOffsets {
        FrameOffsets {
            utc_hours: self.utc_offset_hours,
            secondary_hours: self.secondary_offset_hours,
        }
    }

    /// Unknown or empty impact maps to 0.
    pub fn impact_level(&self, impact: &str) -> u8 {
        self.impact_levels.get(impact).copied().unwrap_or(0)
    }

    /// Exact, case-sensitive membership.
    pub fn is_tracked_currency(&self, code: &str) -> bool {
        self.currencies.iter().any(|c| c == code)
    }

    fn sanitize(mut self) -> Self {
        self.currencies = clean_list(self.currencies);
        if self.currencies.is_empty() {
            self.currencies = default_currencies();
        }
        if self.timeout_secs == 0 {
            self.timeout_secs = default_timeout_secs();
        }
        if !(-MAX_OFFSET_HOURS..=MAX_OFFSET_HOURS).contains(&self.utc_offset_hours) {
            self.utc_offset_hours = default_utc_offset_hours();
        }
        if !(-MAX_OFFSET_HOURS..=MAX_OFFSET_HOURS).contains(&self.secondary_offset_hours) {
            self.secondary_offset_hours = default_secondary_offset_hours();
        }
        self
    }
}

/// Load config from an explicit path. Supports TOML or JSON formats.
pub fn load_config_from(path: &Path) -> Result<CalendarConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading calendar config from {}", path.display()))?;
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    parse_config(&content, ext.as_str())
}

/// Load config using env var + fallbacks:
/// 1) $FF_CALENDAR_CONFIG
/// 2) config/calendar.toml
/// 3) config/calendar.json
/// 4) built-in defaults
///
/// `$FF_CALENDAR_URL` overrides the feed URL afterwards.
pub fn load_config_default() -> Result<CalendarConfig> {
    let mut cfg = if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
        let pb = PathBuf::from(p);
        if !pb.exists() {
            return Err(anyhow!("FF_CALENDAR_CONFIG points to non-existent path"));
        }
        load_config_from(&pb)?
    } else {
        let toml_p = PathBuf::from("config/calendar.toml");
        let json_p = PathBuf::from("config/calendar.json");
        if toml_p.exists() {
            load_config_from(&toml_p)?
        } else if json_p.exists() {
            load_config_from(&json_p)?
        } else {
            CalendarConfig::default()
        }
    };

    if let Ok(url) = std::env::var(ENV_FEED_URL) {
        let url = url.trim();
        if !url.is_empty() {
            cfg.feed_url = url.to_string();
        }
    }
    Ok(cfg)
}

fn parse_config(s: &str, hint_ext: &str) -> Result<CalendarConfig> {
    // Try TOML first if hinted or content doesn't look like JSON.
    let try_toml = hint_ext == "toml" || !s.trim_start().starts_with('{');
    if try_toml {
        if let Ok(v) = toml::from_str::<CalendarConfig>(s) {
            return Ok(v.sanitize());
        }
    }
    if let Ok(v) = serde_json::from_str::<CalendarConfig>(s) {
        return Ok(v.sanitize());
    }
    if !try_toml {
        if let Ok(v) = toml::from_str::<CalendarConfig>(s) {
            return Ok(v.sanitize());
        }
    }
    Err(anyhow!("unsupported calendar config format"))
}

fn clean_list(items: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(items.len());
    for it in items {
        let t = it.trim().to_ascii_uppercase();
        if !t.is_empty() && !out.contains(&t) {
            out.push(t);
        }
    }
    out
}
