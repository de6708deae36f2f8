//! Restock timer source.
//!
//! Unauthenticated and best-effort: any failure is logged and reported as
//! `None`, and the caller falls back to [`TimerSet::default`].

use std::time::Duration;

use common::config::SourcesConfig;
use common::{Error, TimerSet};
use serde::Deserialize;
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub struct TimerClient {
    client: reqwest::Client,
    url: String,
}

/// Response from the timer API. Timer values are in seconds.
#[derive(Debug, Deserialize)]
pub struct TimerResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub data: Option<TimerData>,
}

#[derive(Debug, Deserialize)]
pub struct TimerData {
    #[serde(rename = "seedsTimer", default)]
    pub seeds_timer: Option<f64>,
    #[serde(rename = "gearTimer", default)]
    pub gear_timer: Option<f64>,
    #[serde(rename = "eggsTimer", default)]
    pub eggs_timer: Option<f64>,
    #[serde(rename = "eventTimer", default)]
    pub event_timer: Option<f64>,
}

impl TimerResponse {
    /// Convert to a `TimerSet`. Missing or non-positive fields take their
    /// default; the API has no cosmetics timer so that one is always default.
    pub fn into_timer_set(self) -> Option<TimerSet> {
        if !self.success {
            return None;
        }
        let data = self.data?;
        Some(TimerSet {
            seeds: secs_to_ms(data.seeds_timer, TimerSet::DEFAULT_SEEDS_MS),
            gears: secs_to_ms(data.gear_timer, TimerSet::DEFAULT_GEARS_MS),
            eggs: secs_to_ms(data.eggs_timer, TimerSet::DEFAULT_EGGS_MS),
            cosmetics: TimerSet::DEFAULT_COSMETICS_MS,
            event: secs_to_ms(data.event_timer, TimerSet::DEFAULT_EVENT_MS),
        })
    }
}

fn secs_to_ms(secs: Option<f64>, default_ms: u64) -> u64 {
    match secs {
        Some(s) if s.is_finite() && s > 0.0 => (s * 1000.0).round() as u64,
        _ => default_ms,
    }
}

impl TimerClient {
    pub fn new(sources: &SourcesConfig) -> Result<Self, Error> {
        let client = reqwest::Client::builder()
            .user_agent(sources.user_agent.clone())
            .timeout(Duration::from_secs(sources.aux_timeout_secs))
            .build()
            .map_err(|e| Error::Http(format!("failed to build timer HTTP client: {e}")))?;

        Ok(Self {
            client,
            url: sources.timer_api_url.clone(),
        })
    }

    /// Fetch timers, or `None` on any failure.
    pub async fn fetch(&self) -> Option<TimerSet> {
        match self.try_fetch().await {
            Ok(Some(timers)) => {
                info!("Restock timers fetched");
                Some(timers)
            }
            Ok(None) => {
                warn!("Timer API returned no usable data, using defaults");
                None
            }
            Err(e) => {
                warn!("Timer fetch failed, using defaults: {}", e);
                None
            }
        }
    }

    async fn try_fetch(&self) -> Result<Option<TimerSet>, Error> {
        debug!("Fetching timers: {}", self.url);

        let resp = self
            .client
            .get(&self.url)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| Error::Http(e.to_string()))?;

        let status = resp.status().as_u16();
        if !resp.status().is_success() {
            return Err(Error::Http(format!("timer API returned {status}")));
        }

        let body: TimerResponse = resp
            .json()
            .await
            .map_err(|e| Error::Data(format!("timer API JSON parse error: {e}")))?;

        Ok(body.into_timer_set())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support;
    use serde_json::json;

    #[test]
    fn test_seconds_convert_to_millis() {
        let resp: TimerResponse = serde_json::from_str(
            r#"{"success": true, "data": {"seedsTimer": 120, "gearTimer": 240, "eggsTimer": 900, "eventTimer": 60}}"#,
        )
        .expect("deserialize");

        let timers = resp.into_timer_set().expect("usable timers");
        assert_eq!(timers.seeds, 120_000);
        assert_eq!(timers.gears, 240_000);
        assert_eq!(timers.eggs, 900_000);
        assert_eq!(timers.event, 60_000);
        assert_eq!(timers.cosmetics, TimerSet::DEFAULT_COSMETICS_MS);
    }

    #[test]
    fn test_missing_or_zero_fields_take_defaults() {
        let resp: TimerResponse =
            serde_json::from_str(r#"{"success": true, "data": {"seedsTimer": 0, "eggsTimer": 45}}"#)
                .expect("deserialize");

        let timers = resp.into_timer_set().expect("usable timers");
        assert_eq!(timers.seeds, TimerSet::DEFAULT_SEEDS_MS);
        assert_eq!(timers.gears, TimerSet::DEFAULT_GEARS_MS);
        assert_eq!(timers.eggs, 45_000);
        assert_eq!(timers.event, TimerSet::DEFAULT_EVENT_MS);
    }

    #[test]
    fn test_unsuccessful_payload_yields_none() {
        let resp: TimerResponse =
            serde_json::from_str(r#"{"success": false, "data": {"seedsTimer": 10}}"#)
                .expect("deserialize");
        assert!(resp.into_timer_set().is_none());

        let resp: TimerResponse = serde_json::from_str(r#"{"success": true}"#).expect("deserialize");
        assert!(resp.into_timer_set().is_none());
    }

    #[tokio::test]
    async fn test_unreachable_api_degrades_to_none() {
        let sources = SourcesConfig {
            timer_api_url: "http://127.0.0.1:9/timers".into(),
            aux_timeout_secs: 1,
            ..SourcesConfig::default()
        };
        let client = TimerClient::new(&sources).expect("client");
        assert!(client.fetch().await.is_none());
    }

    #[tokio::test]
    async fn test_slow_api_times_out_to_none() {
        let base = test_support::serve(test_support::stalled(
            "/timers",
            Duration::from_secs(5),
            json!({"success": true, "data": {"seedsTimer": 120}}),
        ))
        .await;
        let sources = SourcesConfig {
            timer_api_url: format!("{base}/timers"),
            aux_timeout_secs: 1,
            ..SourcesConfig::default()
        };
        let client = TimerClient::new(&sources).expect("client");

        let started = std::time::Instant::now();
        assert!(client.fetch().await.is_none());
        assert!(started.elapsed() < Duration::from_secs(4));
    }

    #[tokio::test]
    async fn test_fetch_reads_served_timers() {
        let base = test_support::serve(test_support::stalled(
            "/timers",
            Duration::ZERO,
            json!({"success": true, "data": {"seedsTimer": 120, "eggsTimer": 900}}),
        ))
        .await;
        let sources = SourcesConfig {
            timer_api_url: format!("{base}/timers"),
            ..SourcesConfig::default()
        };
        let client = TimerClient::new(&sources).expect("client");

        let timers = client.fetch().await.expect("timers");
        assert_eq!(timers.seeds, 120_000);
        assert_eq!(timers.eggs, 900_000);
        assert_eq!(timers.gears, TimerSet::DEFAULT_GEARS_MS);
    }
}
