//! Configuration loader: merges env vars, .env file, and config.toml.

use common::{Error, ScraperConfig};
use std::path::Path;

fn parse_positive_u64(raw: &str, env_name: &str) -> Result<u64, Error> {
    let parsed = raw
        .trim()
        .parse::<u64>()
        .map_err(|_| Error::Config(format!("{env_name} must be an integer > 0")))?;
    if parsed == 0 {
        return Err(Error::Config(format!("{env_name} must be an integer > 0")));
    }
    Ok(parsed)
}

fn parse_non_negative_u64(raw: &str, env_name: &str) -> Result<u64, Error> {
    raw.trim()
        .parse::<u64>()
        .map_err(|_| Error::Config(format!("{env_name} must be an integer >= 0")))
}

fn parse_bool(raw: &str) -> bool {
    let lowered = raw.trim().to_ascii_lowercase();
    lowered != "0" && lowered != "false" && lowered != "no" && lowered != "off"
}

fn is_http_url(url: &str) -> bool {
    url.starts_with("https://") || url.starts_with("http://")
}

pub fn validate_config(config: &ScraperConfig) -> Result<(), Error> {
    let mut issues: Vec<String> = Vec::new();

    if config.server.port == 0 {
        issues.push("server.port must be > 0".into());
    }

    if config.timing.scrape_interval_secs == 0 {
        issues.push("timing.scrape_interval_secs must be > 0".into());
    }
    if config.timing.stale_threshold_secs == 0 {
        issues.push("timing.stale_threshold_secs must be > 0".into());
    }

    if !is_http_url(&config.session.page_url) {
        issues.push("session.page_url must be an http(s) URL".into());
    }
    if config.session.max_age_secs == 0 {
        issues.push("session.max_age_secs must be > 0".into());
    }
    if config.session.navigation_timeout_secs == 0 {
        issues.push("session.navigation_timeout_secs must be > 0".into());
    }

    for (name, url) in [
        ("sources.stock_api_url", &config.sources.stock_api_url),
        ("sources.timer_api_url", &config.sources.timer_api_url),
        ("sources.image_api_url", &config.sources.image_api_url),
    ] {
        if !is_http_url(url) {
            issues.push(format!("{name} must be an http(s) URL"));
        }
    }
    if config.sources.user_agent.trim().is_empty() {
        issues.push("sources.user_agent must not be empty".into());
    }
    if config.sources.stock_timeout_secs == 0 {
        issues.push("sources.stock_timeout_secs must be > 0".into());
    }
    if config.sources.aux_timeout_secs == 0 {
        issues.push("sources.aux_timeout_secs must be > 0".into());
    }

    if issues.is_empty() {
        Ok(())
    } else {
        Err(Error::Config(format!(
            "Invalid config:\n - {}",
            issues.join("\n - ")
        )))
    }
}

/// Load scraper configuration from environment and optional config file.
pub fn load_config(config_path: &Path) -> Result<ScraperConfig, Error> {
    // 1. Load .env file from project root or parent directories.
    if let Err(e) = dotenvy::dotenv() {
        tracing::debug!("No .env file loaded: {}", e);
    }

    // 2. Start with defaults.
    let mut config = ScraperConfig::default();

    // 3. Try loading the config file if it exists.
    if config_path.exists() {
        let contents = std::fs::read_to_string(config_path).map_err(|e| {
            Error::Config(format!("Failed to read {}: {}", config_path.display(), e))
        })?;
        config = toml::from_str(&contents).map_err(|e| {
            Error::Config(format!("Failed to parse {}: {}", config_path.display(), e))
        })?;
    }

    // 4. Override with environment variables (highest priority).
    if let Ok(host) = std::env::var("HOST") {
        config.server.host = host;
    }
    if let Ok(port) = std::env::var("PORT") {
        config.server.port = port
            .trim()
            .parse::<u16>()
            .map_err(|_| Error::Config("PORT must be a valid TCP port".into()))?;
    }
    if let Ok(raw) = std::env::var("SCRAPE_INTERVAL_SECS") {
        config.timing.scrape_interval_secs = parse_positive_u64(&raw, "SCRAPE_INTERVAL_SECS")?;
    }
    if let Ok(raw) = std::env::var("STALE_THRESHOLD_SECS") {
        config.timing.stale_threshold_secs = parse_positive_u64(&raw, "STALE_THRESHOLD_SECS")?;
    }
    if let Ok(raw) = std::env::var("SESSION_MAX_AGE_SECS") {
        config.session.max_age_secs = parse_positive_u64(&raw, "SESSION_MAX_AGE_SECS")?;
    }
    if let Ok(raw) = std::env::var("SESSION_JITTER_SECS") {
        config.session.jitter_secs = parse_non_negative_u64(&raw, "SESSION_JITTER_SECS")?;
    }
    if let Ok(path) = std::env::var("CHROME_PATH") {
        if !path.trim().is_empty() {
            config.session.chrome_executable = Some(path);
        }
    }
    if let Ok(raw) = std::env::var("HEADLESS") {
        config.session.headless = parse_bool(&raw);
    }

    validate_config(&config)?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = ScraperConfig::default();
        assert!(validate_config(&config).is_ok());
        assert_eq!(config.timing.scrape_interval_secs, 12);
        assert_eq!(config.timing.stale_threshold_secs, 60);
        assert_eq!(config.sources.aux_timeout_secs, 8);
    }

    #[test]
    fn test_validation_collects_every_issue() {
        let mut config = ScraperConfig::default();
        config.timing.scrape_interval_secs = 0;
        config.sources.timer_api_url = "ftp://nope".into();

        let err = validate_config(&config).expect_err("invalid config");
        let msg = err.to_string();
        assert!(msg.contains("timing.scrape_interval_secs"));
        assert!(msg.contains("sources.timer_api_url"));
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: ScraperConfig = toml::from_str(
            r#"
            [timing]
            scrape_interval_secs = 30

            [session]
            jitter_secs = 0
            "#,
        )
        .expect("partial config parses");

        assert_eq!(config.timing.scrape_interval_secs, 30);
        assert_eq!(config.timing.stale_threshold_secs, 60);
        assert_eq!(config.session.jitter_secs, 0);
        assert_eq!(config.session.max_age_secs, 240);
        assert_eq!(config.server.port, 3000);
    }

    #[test]
    fn test_parse_helpers() {
        assert_eq!(parse_positive_u64(" 15 ", "X").expect("ok"), 15);
        assert!(parse_positive_u64("0", "X").is_err());
        assert!(parse_positive_u64("abc", "X").is_err());
        assert_eq!(parse_non_negative_u64("0", "X").expect("ok"), 0);
        assert!(parse_bool("yes"));
        assert!(!parse_bool("Off"));
    }
}
