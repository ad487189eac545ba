// src/ingest/types.rs
use chrono::{DateTime, NaiveDateTime, Utc};

use crate::error::CalendarError;

/// One `<event>` from the feed, fields trimmed, missing fields empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawRecord {
    pub title: String,
    pub country: String,
    pub date: String, // MM-DD-YYYY
    pub time: String, // free text, e.g. "3:00pm", "All Day"
    pub impact: String,
    pub forecast: String,
    pub previous: String,
    pub url: String,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct CalendarEvent {
    pub title: String,
    pub currency: String,
    pub date: String,
    /// Time exactly as received from the feed.
    pub time_et: String,
    pub time_24h: String,
    pub datetime_utc: Option<DateTime<Utc>>,
    /// Wall-clock time in the secondary reference frame, serialized without offset.
    pub datetime_aest: Option<NaiveDateTime>,
    pub impact: String,
    pub impact_level: u8,
    pub forecast: Option<String>,
    pub previous: Option<String>,
    pub url: String,
}

#[async_trait::async_trait]
pub trait FeedSource {
    /// Raw feed text, already decoded.
    async fn fetch_text(&self) -> Result<String, CalendarError>;
    fn name(&self) -> &'static str;
}
