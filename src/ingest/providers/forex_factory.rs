// src/ingest/providers/forex_factory.rs
use async_trait::async_trait;
use encoding_rs::WINDOWS_1252;
use metrics::counter;
use std::time::Duration;

use crate::error::CalendarError;
use crate::ingest::config::CalendarConfig;
use crate::ingest::types::FeedSource;

/// ForexFactory weekly XML feed.
pub struct ForexFactoryFeed {
    mode: Mode,
}

enum Mode {
    Fixture(String),
    Http { url: String, client: reqwest::Client },
}

impl ForexFactoryFeed {
    pub fn from_fixture(s: &str) -> Self {
        Self {
            mode: Mode::Fixture(s.to_string()),
        }
    }

    /// HTTP feed at `url` with the default timeout and browser user agent.
    pub fn from_url(url: &str) -> Result<Self, CalendarError> {
        Self::from_config(&CalendarConfig {
            feed_url: url.to_string(),
            ..CalendarConfig::default()
        })
    }

    /// Client with the configured timeout and browser user agent.
    pub fn from_config(cfg: &CalendarConfig) -> Result<Self, CalendarError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .user_agent(cfg.user_agent.clone())
            .build()
            .map_err(|e| CalendarError::Fetch(format!("building http client: {e}")))?;
        Ok(Self::with_client(&cfg.feed_url, client))
    }

    /// Caller-built client, e.g. one without system proxy settings.
    pub fn with_client(url: &str, client: reqwest::Client) -> Self {
        Self {
            mode: Mode::Http {
                url: url.to_string(),
                client,
            },
        }
    }
}

#[async_trait]
impl FeedSource for ForexFactoryFeed {
    async fn fetch_text(&self) -> Result<String, CalendarError> {
        match &self.mode {
            Mode::Fixture(s) => Ok(s.clone()),
            Mode::Http { url, client } => {
                let res = client
                    .get(url.as_str())
                    .send()
                    .await
                    .and_then(|rsp| rsp.error_for_status());
                let rsp = match res {
                    Ok(rsp) => rsp,
                    Err(e) => {
                        tracing::warn!(error = ?e, provider = "ForexFactory", "feed http error");
                        counter!("calendar_fetch_errors_total").increment(1);
                        return Err(e.into());
                    }
                };
                let bytes = rsp.bytes().await.map_err(|e| {
                    tracing::warn!(error = ?e, provider = "ForexFactory", "feed body error");
                    counter!("calendar_fetch_errors_total").increment(1);
                    CalendarError::from(e)
                })?;
                Ok(decode_windows_1252(&bytes))
            }
        }
    }

    fn name(&self) -> &'static str {
        "ForexFactory"
    }
}

/// The feed is served as windows-1252; invalid sequences become U+FFFD.
pub fn decode_windows_1252(bytes: &[u8]) -> String {
    let (text, had_errors) = WINDOWS_1252.decode_without_bom_handling(bytes);
    if had_errors {
        tracing::warn!(target: "ingest", "feed contained undecodable bytes; replaced");
    }
    text.into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_single_byte_punctuation() {
        // 0x92 = right single quote, 0xE9 = e-acute
        let s = decode_windows_1252(b"Caf\xE9 \x92s");
        assert_eq!(s, "Caf\u{e9} \u{2019}s");
    }

    #[tokio::test]
    async fn fixture_mode_returns_text_verbatim() {
        let feed = ForexFactoryFeed::from_fixture("<weeklyevents/>");
        assert_eq!(feed.fetch_text().await.unwrap(), "<weeklyevents/>");
        assert_eq!(feed.name(), "ForexFactory");
    }
}
