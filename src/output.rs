//! output.rs — wrapping document, run summary and the two sinks (file / stdout).

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::ingest::config::CalendarConfig;
use crate::ingest::types::CalendarEvent;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CalendarDocument {
    pub last_updated: DateTime<Utc>,
    pub source: String,
    pub feed_url: String,
    pub event_count: usize,
    pub events: Vec<CalendarEvent>,
}

impl CalendarDocument {
    pub fn new(events: Vec<CalendarEvent>, cfg: &CalendarConfig, now: DateTime<Utc>) -> Self {
        Self {
            last_updated: now,
            source: cfg.source.clone(),
            feed_url: cfg.feed_url.clone(),
            event_count: events.len(),
            events,
        }
    }

    pub fn summary(&self) -> ImpactSummary {
        ImpactSummary::from_events(&self.events)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImpactSummary {
    pub total: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
    pub holiday: usize,
    pub other: usize,
}

impl ImpactSummary {
    pub fn from_events(events: &[CalendarEvent]) -> Self {
        let mut s = Self {
            total: events.len(),
            ..Self::default()
        };
        for ev in events {
            match ev.impact.as_str() {
                "High" => s.high += 1,
                "Medium" => s.medium += 1,
                "Low" => s.low += 1,
                "Holiday" => s.holiday += 1,
                _ => s.other += 1,
            }
        }
        s
    }
}

impl fmt::Display for ImpactSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Found {} forex events (high: {}, medium: {}, low: {}, holiday: {}, other: {})",
            self.total, self.high, self.medium, self.low, self.holiday, self.other
        )
    }
}

/// Exactly one sink per run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputSink {
    /// Whole document, pretty JSON, parent dirs created.
    File(PathBuf),
    /// Bare event array on stdout.
    Stdout,
}

impl OutputSink {
    pub fn write(&self, doc: &CalendarDocument) -> Result<()> {
        match self {
            OutputSink::File(path) => save_document(doc, path),
            OutputSink::Stdout => {
                let stdout = std::io::stdout();
                let mut lock = stdout.lock();
                write_events(&doc.events, &mut lock)?;
                lock.flush().context("flushing stdout")
            }
        }
    }
}

/// Serialize in memory first, then truncate-and-write. Not atomic.
pub fn save_document(doc: &CalendarDocument, path: &Path) -> Result<()> {
    let body = serde_json::to_string_pretty(doc).context("serializing calendar document")?;

    if let Some(dir) = path.parent() {
        if !dir.as_os_str().is_empty() && !dir.exists() {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("creating output directory {}", dir.display()))?;
        }
    }
    std::fs::write(path, body).with_context(|| format!("writing {}", path.display()))?;

    println!("Saved {} events to {}", doc.event_count, path.display());
    Ok(())
}

pub fn write_events<W: Write>(events: &[CalendarEvent], out: &mut W) -> Result<()> {
    serde_json::to_writer_pretty(&mut *out, events).context("serializing events")?;
    writeln!(out).context("writing events")?;
    Ok(())
}
