// src/ingest/mod.rs
pub mod config;
pub mod parse;
pub mod providers;
pub mod time;
pub mod types;

use chrono::{DateTime, Utc};
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge};
use once_cell::sync::OnceCell;
use std::cmp::Ordering;

use crate::error::CalendarError;
use crate::ingest::config::CalendarConfig;
use crate::ingest::time::normalize_time;
use crate::ingest::types::{CalendarEvent, FeedSource, RawRecord};
use crate::output::CalendarDocument;

/// One-time metrics registration.
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("calendar_records_total", "Records parsed from the feed.");
        describe_counter!(
            "calendar_record_errors_total",
            "Records skipped because extraction failed."
        );
        describe_counter!(
            "calendar_filtered_total",
            "Records dropped by the currency allow-list."
        );
        describe_counter!(
            "calendar_time_parse_errors_total",
            "Events whose clock time could not be converted."
        );
        describe_counter!("calendar_events_kept_total", "Events emitted.");
        describe_counter!("calendar_fetch_errors_total", "Feed fetch failures.");
        describe_histogram!("calendar_parse_ms", "Feed parse time in milliseconds.");
        describe_gauge!("calendar_last_run_ts", "Unix ts when the pipeline last ran.");
    });
}

/// Record → event. Time failures degrade the event, they never drop it.
pub fn normalize_record(rec: RawRecord, cfg: &CalendarConfig) -> CalendarEvent {
    let t = normalize_time(&rec.time, &rec.date, cfg.offsets());
    if let Some(err) = &t.parse_error {
        counter!("calendar_time_parse_errors_total").increment(1);
        tracing::warn!(
            target: "ingest",
            title = %rec.title,
            time = %rec.time,
            date = %rec.date,
            error = %err,
            "could not normalize event time"
        );
    }

    let impact_level = cfg.impact_level(&rec.impact);
    CalendarEvent {
        impact_level,
        title: rec.title,
        currency: rec.country,
        date: rec.date,
        time_et: rec.time,
        time_24h: t.time_24h,
        datetime_utc: t.utc,
        datetime_aest: t.secondary,
        impact: rec.impact,
        forecast: non_empty(rec.forecast),
        previous: non_empty(rec.previous),
        url: rec.url,
    }
}

fn non_empty(s: String) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s)
    }
}

/// Events without a UTC instant sort after every event with one.
fn cmp_instant(a: &Option<DateTime<Utc>>, b: &Option<DateTime<Utc>>) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => x.cmp(y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Stable: ties on (instant, currency) keep feed order.
pub fn sort_events(events: &mut [CalendarEvent]) {
    events.sort_by(|a, b| {
        cmp_instant(&a.datetime_utc, &b.datetime_utc).then_with(|| a.currency.cmp(&b.currency))
    });
}

/// Normalize, filter by currency and sort. Returns (events, filtered_count).
pub fn normalize_filter_sort(
    records: Vec<RawRecord>,
    cfg: &CalendarConfig,
) -> (Vec<CalendarEvent>, usize) {
    let mut filtered_out = 0usize;
    let mut events = Vec::with_capacity(records.len());
    for rec in records {
        if !cfg.is_tracked_currency(&rec.country) {
            filtered_out += 1;
            continue;
        }
        events.push(normalize_record(rec, cfg));
    }
    sort_events(&mut events);
    (events, filtered_out)
}

/// Pure part of the run: decoded feed text → document.
pub fn build_document(
    xml: &str,
    cfg: &CalendarConfig,
    now: DateTime<Utc>,
) -> Result<CalendarDocument, CalendarError> {
    ensure_metrics_described();

    let feed = parse::parse_feed(xml)?;
    let parsed = feed.records.len();
    let (events, filtered) = normalize_filter_sort(feed.records, cfg);

    counter!("calendar_filtered_total").increment(filtered as u64);
    counter!("calendar_events_kept_total").increment(events.len() as u64);
    gauge!("calendar_last_run_ts").set(now.timestamp() as f64);

    tracing::info!(
        target: "ingest",
        parsed = parsed,
        skipped = feed.skipped,
        filtered = filtered,
        kept = events.len(),
        "calendar normalized"
    );

    Ok(CalendarDocument::new(events, cfg, now))
}

/// Fetch once from `source` and build the document.
pub async fn run_once(
    source: &dyn FeedSource,
    cfg: &CalendarConfig,
) -> Result<CalendarDocument, CalendarError> {
    let xml = source.fetch_text().await?;
    build_document(&xml, cfg, Utc::now())
}
