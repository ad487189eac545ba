//! # Time normalization
//! Feed times are US Eastern wall-clock text ("3:00pm", "All Day", "Tentative").
//! They are projected into two fixed-offset frames: UTC and a secondary frame
//! (AEST by default). Offsets are plain hour constants from config; no DST.

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, Utc};

/// `time_24h` value for events without a specific time.
pub const ALL_DAY: &str = "All Day";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameOffsets {
    /// Hours added to feed-local time to reach UTC.
    pub utc_hours: i64,
    /// Hours added to UTC to reach the secondary frame.
    pub secondary_hours: i64,
}

impl Default for FrameOffsets {
    fn default() -> Self {
        Self {
            utc_hours: 5,
            secondary_hours: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedTime {
    pub time_24h: String,
    pub utc: Option<DateTime<Utc>>,
    pub secondary: Option<NaiveDateTime>,
    /// Set when the text looked like a clock time but could not be converted.
    pub parse_error: Option<String>,
}

impl NormalizedTime {
    fn passthrough(text: &str) -> Self {
        Self {
            time_24h: text.to_string(),
            utc: None,
            secondary: None,
            parse_error: None,
        }
    }
}

/// Normalize one feed time. Never fails; unparseable input degrades to pass-through.
pub fn normalize_time(time_text: &str, date_text: &str, offsets: FrameOffsets) -> NormalizedTime {
    let text = time_text.trim();

    if text.is_empty()
        || text.eq_ignore_ascii_case("all day")
        || text.eq_ignore_ascii_case("tentative")
    {
        return NormalizedTime::passthrough(ALL_DAY);
    }

    let compact = text.to_lowercase().replace(' ', "");
    if !(compact.contains("am") || compact.contains("pm")) {
        return NormalizedTime::passthrough(text);
    }

    match convert_clock(&compact, date_text, offsets) {
        Ok((time_24h, utc, secondary)) => NormalizedTime {
            time_24h,
            utc: Some(utc),
            secondary: Some(secondary),
            parse_error: None,
        },
        Err(e) => NormalizedTime {
            parse_error: Some(format!("{e:#}")),
            ..NormalizedTime::passthrough(text)
        },
    }
}

fn convert_clock(
    compact: &str,
    date_text: &str,
    offsets: FrameOffsets,
) -> Result<(String, DateTime<Utc>, NaiveDateTime)> {
    let is_pm = compact.contains("pm");
    let bare = compact.replace("am", "").replace("pm", "");

    let mut parts = bare.split(':');
    let hour: u32 = parts
        .next()
        .unwrap_or_default()
        .parse()
        .with_context(|| format!("invalid hour in {compact:?}"))?;
    let minute: u32 = match parts.next() {
        Some(m) => m
            .parse()
            .with_context(|| format!("invalid minute in {compact:?}"))?,
        None => 0,
    };

    let hour = match (is_pm, hour) {
        (true, h) if h != 12 => h.saturating_add(12),
        (false, 12) => 0,
        (_, h) => h,
    };
    let time_24h = format!("{hour:02}:{minute:02}");

    let date = parse_feed_date(date_text)?;
    let time = NaiveTime::from_hms_opt(hour, minute, 0)
        .ok_or_else(|| anyhow!("time out of range: {time_24h}"))?;
    let local = date.and_time(time);

    let utc = Duration::try_hours(offsets.utc_hours)
        .and_then(|d| local.checked_add_signed(d))
        .ok_or_else(|| anyhow!("utc instant out of range"))?;
    let secondary = Duration::try_hours(offsets.secondary_hours)
        .and_then(|d| utc.checked_add_signed(d))
        .ok_or_else(|| anyhow!("secondary instant out of range"))?;

    Ok((time_24h, utc.and_utc(), secondary))
}

/// `MM-DD-YYYY` as provided by the feed.
fn parse_feed_date(date_text: &str) -> Result<NaiveDate> {
    let mut it = date_text.trim().split('-');
    let mut next_num = |what: &str| -> Result<i32> {
        it.next()
            .ok_or_else(|| anyhow!("date {date_text:?} missing {what}"))?
            .parse::<i32>()
            .with_context(|| format!("invalid {what} in date {date_text:?}"))
    };
    let month = next_num("month")?;
    let day = next_num("day")?;
    let year = next_num("year")?;

    let (month, day) = (
        u32::try_from(month).map_err(|_| anyhow!("invalid month {month}"))?,
        u32::try_from(day).map_err(|_| anyhow!("invalid day {day}"))?,
    );
    NaiveDate::from_ymd_opt(year, month, day)
        .ok_or_else(|| anyhow!("date out of range: {date_text:?}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn norm(t: &str, d: &str) -> NormalizedTime {
        normalize_time(t, d, FrameOffsets::default())
    }

    #[test]
    fn pm_converts_and_projects_both_frames() {
        let n = norm("3:00pm", "12-25-2024");
        assert_eq!(n.time_24h, "15:00");
        let utc = n.utc.unwrap();
        assert_eq!(utc.format("%Y-%m-%dT%H:%M:%S").to_string(), "2024-12-25T20:00:00");
        assert_eq!(
            n.secondary.unwrap().format("%Y-%m-%dT%H:%M:%S").to_string(),
            "2024-12-26T06:00:00"
        );
        assert!(n.parse_error.is_none());
    }

    #[test]
    fn midnight_and_noon_edges() {
        assert_eq!(norm("12:30am", "01-02-2025").time_24h, "00:30");
        assert_eq!(norm("12:00pm", "01-02-2025").time_24h, "12:00");
        assert_eq!(norm("10:30am", "01-02-2025").time_24h, "10:30");
    }

    #[test]
    fn minute_defaults_to_zero() {
        let n = norm("9am", "03-04-2025");
        assert_eq!(n.time_24h, "09:00");
        assert!(n.utc.is_some());
    }

    #[test]
    fn spaces_and_case_are_ignored() {
        let n = norm(" 8:30 PM ", "03-04-2025");
        assert_eq!(n.time_24h, "20:30");
    }

    #[test]
    fn sentinels_yield_all_day() {
        for t in ["", "   ", "All Day", "all day", "TENTATIVE", "Tentative"] {
            let n = norm(t, "12-25-2024");
            assert_eq!(n.time_24h, ALL_DAY, "input {t:?}");
            assert!(n.utc.is_none() && n.secondary.is_none());
        }
    }

    #[test]
    fn free_text_passes_through() {
        let n = norm("Day 2", "12-25-2024");
        assert_eq!(n.time_24h, "Day 2");
        assert!(n.utc.is_none());
        assert!(n.parse_error.is_none());
    }

    #[test]
    fn bad_clock_degrades_with_marker() {
        let n = norm("x:15pm", "12-25-2024");
        assert_eq!(n.time_24h, "x:15pm");
        assert!(n.utc.is_none() && n.secondary.is_none());
        assert!(n.parse_error.is_some());

        // hour 13 + pm -> 25
        let n = norm("13:00pm", "12-25-2024");
        assert_eq!(n.time_24h, "13:00pm");
        assert!(n.parse_error.is_some());
    }

    #[test]
    fn bad_date_degrades_with_marker() {
        let n = norm("3:00pm", "2024/12/25");
        assert_eq!(n.time_24h, "3:00pm");
        assert!(n.utc.is_none());
        assert!(n.parse_error.is_some());
    }

    #[test]
    fn custom_offsets_are_applied() {
        let n = normalize_time(
            "1:00am",
            "06-01-2025",
            FrameOffsets {
                utc_hours: 4,
                secondary_hours: 11,
            },
        );
        assert_eq!(n.utc.unwrap().to_rfc3339(), "2025-06-01T05:00:00+00:00");
        assert_eq!(n.secondary.unwrap().format("%H:%M").to_string(), "16:00");
    }

    #[test]
    fn extreme_offsets_degrade_with_marker() {
        for offsets in [
            FrameOffsets {
                utc_hours: i64::MAX,
                secondary_hours: 10,
            },
            FrameOffsets {
                utc_hours: 5,
                secondary_hours: i64::MIN,
            },
            // representable delta, but the instant leaves chrono's date range
            FrameOffsets {
                utc_hours: 5,
                secondary_hours: 24 * 365 * 300_000,
            },
        ] {
            let n = normalize_time("3:00pm", "12-25-2024", offsets);
            assert_eq!(n.time_24h, "3:00pm");
            assert!(n.utc.is_none() && n.secondary.is_none());
            assert!(n.parse_error.is_some(), "{offsets:?}");
        }
    }
}
