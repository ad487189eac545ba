// src/ingest/parse.rs
//! Weekly calendar XML → [`RawRecord`]s.
//!
//! Expected shape:
//! ```xml
//! <weeklyevents>
//!   <event>
//!     <title>CPI m/m</title>
//!     <country>USD</country>
//!     <date><![CDATA[12-25-2024]]></date>
//!     ...
//!   </event>
//! </weeklyevents>
//! ```
//! Only direct `<event>` children of the root are read. A record whose fields
//! cannot be extracted is skipped; a document that is not well-formed is fatal.

use metrics::{counter, histogram};
use quick_xml::events::Event;
use quick_xml::Reader;
use std::collections::HashMap;

use crate::error::CalendarError;
use crate::ingest::types::RawRecord;

const FIELDS: [&str; 8] = [
    "title", "country", "date", "time", "impact", "forecast", "previous", "url",
];

#[derive(Debug, Default)]
pub struct ParsedFeed {
    pub records: Vec<RawRecord>,
    /// Records dropped because extraction failed.
    pub skipped: usize,
}

#[derive(Default)]
struct RecordBuilder {
    values: HashMap<&'static str, String>,
    open: Option<&'static str>,
    buf: String,
    error: Option<String>,
}

impl RecordBuilder {
    fn open_field(&mut self, name: &[u8]) {
        self.open = FIELDS.iter().copied().find(|f| f.as_bytes() == name);
        self.buf.clear();
    }

    fn close_field(&mut self) {
        if let Some(f) = self.open.take() {
            // first occurrence wins
            self.values
                .entry(f)
                .or_insert_with(|| self.buf.trim().to_string());
        }
        self.buf.clear();
    }

    fn push_text(&mut self, s: &str) {
        if self.open.is_some() {
            self.buf.push_str(s);
        }
    }

    fn fail(&mut self, msg: String) {
        self.error.get_or_insert(msg);
    }

    fn finish(mut self) -> Result<RawRecord, String> {
        if let Some(e) = self.error {
            return Err(e);
        }
        let mut take = |k: &str| self.values.remove(k).unwrap_or_default();
        Ok(RawRecord {
            title: take("title"),
            country: take("country"),
            date: take("date"),
            time: take("time"),
            impact: take("impact"),
            forecast: take("forecast"),
            previous: take("previous"),
            url: take("url"),
        })
    }
}

/// Parse decoded feed text. Fails only when the markup itself is unusable.
pub fn parse_feed(xml: &str) -> Result<ParsedFeed, CalendarError> {
    let t0 = std::time::Instant::now();
    let cleaned = scrub_html_entities_for_xml(xml);
    let mut reader = Reader::from_str(&cleaned);
    reader.config_mut().trim_text(true);

    let mut out = ParsedFeed::default();
    let mut depth = 0usize;
    let mut saw_root = false;
    let mut current: Option<RecordBuilder> = None;
    let mut index = 0usize;

    loop {
        let ev = reader.read_event().map_err(|e| {
            CalendarError::Parse(format!("{e} (at byte {})", reader.error_position()))
        })?;
        match ev {
            Event::Start(e) => {
                depth += 1;
                match depth {
                    1 => {
                        if saw_root {
                            return Err(CalendarError::Parse(
                                "junk after document element".into(),
                            ));
                        }
                        saw_root = true;
                    }
                    2 if e.name().as_ref() == b"event" => {
                        current = Some(RecordBuilder::default());
                    }
                    3 => {
                        if let Some(b) = current.as_mut() {
                            b.open_field(e.name().as_ref());
                        }
                    }
                    _ => {
                        if let Some(b) = current.as_mut() {
                            if let Some(field) = b.open {
                                let child = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                                b.fail(format!("unexpected element <{child}> inside <{field}>"));
                            }
                        }
                    }
                }
            }
            Event::Empty(e) => match depth {
                0 => {
                    if saw_root {
                        return Err(CalendarError::Parse(
                            "junk after document element".into(),
                        ));
                    }
                    saw_root = true;
                }
                1 if e.name().as_ref() == b"event" => {
                    index += 1;
                    out.records.push(RawRecord::default());
                }
                d if d >= 3 => {
                    if let Some(b) = current.as_mut() {
                        if let Some(field) = b.open {
                            let child = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                            b.fail(format!("unexpected element <{child}/> inside <{field}>"));
                        }
                    }
                }
                // <forecast /> and friends: leave the field empty
                _ => {}
            },
            Event::End(_) => {
                match depth {
                    3 => {
                        if let Some(b) = current.as_mut() {
                            b.close_field();
                        }
                    }
                    2 => {
                        if let Some(b) = current.take() {
                            index += 1;
                            match b.finish() {
                                Ok(rec) => out.records.push(rec),
                                Err(msg) => {
                                    out.skipped += 1;
                                    counter!("calendar_record_errors_total").increment(1);
                                    tracing::warn!(
                                        target: "ingest",
                                        record = index,
                                        error = %msg,
                                        "Error parsing event, skipped"
                                    );
                                }
                            }
                        }
                    }
                    _ => {}
                }
                depth = depth.saturating_sub(1);
            }
            Event::Text(t) => {
                if depth == 0 {
                    return Err(CalendarError::Parse("text outside document element".into()));
                }
                if depth == 3 {
                    if let Some(b) = current.as_mut().filter(|b| b.open.is_some()) {
                        match t.unescape() {
                            Ok(s) => b.push_text(&s),
                            Err(e) => b.fail(format!("undecodable text: {e}")),
                        }
                    }
                }
            }
            Event::CData(c) => {
                if depth == 3 {
                    if let Some(b) = current.as_mut() {
                        b.push_text(&String::from_utf8_lossy(&c.into_inner()));
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !saw_root {
        return Err(CalendarError::Parse("no element found".into()));
    }
    if depth != 0 {
        return Err(CalendarError::Parse("unclosed element at end of document".into()));
    }

    let ms = t0.elapsed().as_secs_f64() * 1_000.0;
    histogram!("calendar_parse_ms").record(ms);
    counter!("calendar_records_total").increment(out.records.len() as u64);
    Ok(out)
}

fn scrub_html_entities_for_xml(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&ndash;", "-")
        .replace("&mdash;", "-")
        .replace("&ldquo;", "\"")
        .replace("&rdquo;", "\"")
        .replace("&lsquo;", "'")
        .replace("&rsquo;", "'")
}

#[cfg(test)]
mod tests {
    use super::*;

    const ONE: &str = r#"<?xml version="1.0" encoding="windows-1252"?>
<weeklyevents>
  <event>
    <title>CPI m/m</title>
    <country>USD</country>
    <date><![CDATA[12-25-2024]]></date>
    <time><![CDATA[8:30am]]></time>
    <impact><![CDATA[High]]></impact>
    <forecast><![CDATA[0.3%]]></forecast>
    <previous />
    <url><![CDATA[https://www.forexfactory.com/calendar/1]]></url>
  </event>
</weeklyevents>"#;

    #[test]
    fn extracts_cdata_and_defaults_missing() {
        let feed = parse_feed(ONE).unwrap();
        assert_eq!(feed.skipped, 0);
        assert_eq!(feed.records.len(), 1);
        let r = &feed.records[0];
        assert_eq!(r.title, "CPI m/m");
        assert_eq!(r.country, "USD");
        assert_eq!(r.date, "12-25-2024");
        assert_eq!(r.time, "8:30am");
        assert_eq!(r.forecast, "0.3%");
        assert_eq!(r.previous, "");
    }

    #[test]
    fn missing_fields_are_empty() {
        let xml = "<weeklyevents><event><title> Bank Holiday </title></event></weeklyevents>";
        let feed = parse_feed(xml).unwrap();
        assert_eq!(feed.records[0].title, "Bank Holiday");
        assert_eq!(feed.records[0].country, "");
        assert_eq!(feed.records[0].url, "");
    }

    #[test]
    fn nested_element_skips_only_that_record() {
        let xml = "<weeklyevents>\
            <event><title>bad<b>x</b></title><country>USD</country></event>\
            <event><title>good</title><country>EUR</country></event>\
            </weeklyevents>";
        let feed = parse_feed(xml).unwrap();
        assert_eq!(feed.skipped, 1);
        assert_eq!(feed.records.len(), 1);
        assert_eq!(feed.records[0].title, "good");
    }

    #[test]
    fn unknown_entity_skips_record() {
        let xml = "<weeklyevents>\
            <event><title>caf&eacute;</title></event>\
            <event><title>ok &amp; fine &nbsp;</title></event>\
            </weeklyevents>";
        let feed = parse_feed(xml).unwrap();
        assert_eq!(feed.skipped, 1);
        assert_eq!(feed.records[0].title, "ok & fine");
    }

    #[test]
    fn bad_entity_in_unknown_field_is_ignored() {
        let xml = "<weeklyevents>\
            <event><title>ok</title><notes>caf&eacute;</notes></event>\
            </weeklyevents>";
        let feed = parse_feed(xml).unwrap();
        assert_eq!(feed.skipped, 0);
        assert_eq!(feed.records[0].title, "ok");
    }

    #[test]
    fn malformed_markup_is_fatal() {
        for xml in [
            "",
            "not xml at all",
            "<weeklyevents><event></weeklyevents>",
            "<weeklyevents><event>",
            "<a></a><b></b>",
        ] {
            let err = parse_feed(xml).unwrap_err();
            assert!(matches!(err, CalendarError::Parse(_)), "input {xml:?}");
        }
    }

    #[test]
    fn non_event_children_are_ignored() {
        let xml = "<weeklyevents><meta>x</meta><event><title>t</title></event></weeklyevents>";
        let feed = parse_feed(xml).unwrap();
        assert_eq!(feed.records.len(), 1);
    }
}
