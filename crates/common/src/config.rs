//! Scraper configuration types.

use serde::{Deserialize, Serialize};

/// Top-level scraper configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScraperConfig {
    /// HTTP listener settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Refresh cadence and staleness.
    #[serde(default)]
    pub timing: TimingConfig,

    /// Browser session settings.
    #[serde(default)]
    pub session: SessionConfig,

    /// Upstream endpoints.
    #[serde(default)]
    pub sources: SourcesConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

/// Timing configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimingConfig {
    /// Interval between refresh cycles.
    #[serde(default = "default_scrape_interval")]
    pub scrape_interval_secs: u64,

    /// Snapshots older than this are flagged stale (still served).
    #[serde(default = "default_stale_threshold")]
    pub stale_threshold_secs: u64,
}

/// Browser session settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Page loaded to establish the session cookies.
    #[serde(default = "default_page_url")]
    pub page_url: String,

    /// Credential age after which a cycle renews it proactively.
    #[serde(default = "default_session_max_age")]
    pub max_age_secs: u64,

    /// Upper bound of the random delay added to `max_age_secs` per refresh.
    #[serde(default = "default_session_jitter")]
    pub jitter_secs: u64,

    #[serde(default = "default_navigation_timeout")]
    pub navigation_timeout_secs: u64,

    /// Pause after navigation so late auth scripts can set cookies.
    #[serde(default = "default_settle_delay")]
    pub settle_delay_ms: u64,

    #[serde(default = "default_true")]
    pub headless: bool,

    /// Chrome/Chromium binary. Auto-detected when unset.
    #[serde(default)]
    pub chrome_executable: Option<String>,
}

/// Upstream API endpoints and request policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourcesConfig {
    #[serde(default = "default_stock_api_url")]
    pub stock_api_url: String,

    #[serde(default = "default_timer_api_url")]
    pub timer_api_url: String,

    #[serde(default = "default_image_api_url")]
    pub image_api_url: String,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Hard timeout for the authenticated stock request.
    #[serde(default = "default_stock_timeout")]
    pub stock_timeout_secs: u64,

    /// Timeout for timer/image requests; expiry degrades to defaults.
    #[serde(default = "default_aux_timeout")]
    pub aux_timeout_secs: u64,
}

// ── Defaults ──────────────────────────────────────────────────────────

fn default_true() -> bool {
    true
}

fn default_host() -> String {
    "0.0.0.0".into()
}
fn default_port() -> u16 {
    3000
}

fn default_scrape_interval() -> u64 {
    12
}
fn default_stale_threshold() -> u64 {
    60
}

fn default_page_url() -> String {
    "https://www.gamersberg.com/grow-a-garden/stock".into()
}
fn default_session_max_age() -> u64 {
    240
}
fn default_session_jitter() -> u64 {
    60
}
fn default_navigation_timeout() -> u64 {
    30
}
fn default_settle_delay() -> u64 {
    2000
}

fn default_stock_api_url() -> String {
    "https://www.gamersberg.com/api/v1/grow-a-garden/stock".into()
}
fn default_timer_api_url() -> String {
    "https://vulcanvalues.com/api/grow-a-garden/stock".into()
}
fn default_image_api_url() -> String {
    "https://growagarden.gg/api/stock".into()
}
fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/121.0.0.0 Safari/537.36"
        .into()
}
fn default_stock_timeout() -> u64 {
    15
}
fn default_aux_timeout() -> u64 {
    8
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            scrape_interval_secs: default_scrape_interval(),
            stale_threshold_secs: default_stale_threshold(),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            page_url: default_page_url(),
            max_age_secs: default_session_max_age(),
            jitter_secs: default_session_jitter(),
            navigation_timeout_secs: default_navigation_timeout(),
            settle_delay_ms: default_settle_delay(),
            headless: default_true(),
            chrome_executable: None,
        }
    }
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            stock_api_url: default_stock_api_url(),
            timer_api_url: default_timer_api_url(),
            image_api_url: default_image_api_url(),
            user_agent: default_user_agent(),
            stock_timeout_secs: default_stock_timeout(),
            aux_timeout_secs: default_aux_timeout(),
        }
    }
}
