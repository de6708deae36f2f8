//! Headless browser access.
//!
//! `ChromiumDriver` launches one Chromium process on first use and keeps it
//! for the life of the process. Every harvest opens a single tab and closes
//! it again, whatever the outcome.

use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::network::SetUserAgentOverrideParams;
use chromiumoxide::Page;
use common::config::SessionConfig;
use common::Error;
use futures_util::StreamExt;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

/// A cookie read back from the browser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionCookie {
    pub name: String,
    pub value: String,
}

/// Loads a page in a real browser and returns the cookies it ends up with.
#[async_trait]
pub trait BrowserDriver: Send + Sync {
    /// Navigate to `url`, wait `settle` after the load completes, and return
    /// every cookie visible to the page.
    async fn load_cookies(&self, url: &str, settle: Duration) -> Result<Vec<SessionCookie>, Error>;
}

/// Launch settings for the shared Chromium process.
#[derive(Debug, Clone)]
pub struct LaunchOptions {
    pub headless: bool,
    pub executable: Option<String>,
    pub user_agent: String,
    pub navigation_timeout: Duration,
}

impl LaunchOptions {
    pub fn from_config(cfg: &SessionConfig, user_agent: &str) -> Self {
        Self {
            headless: cfg.headless,
            executable: cfg.chrome_executable.clone(),
            user_agent: user_agent.to_string(),
            navigation_timeout: Duration::from_secs(cfg.navigation_timeout_secs),
        }
    }

    fn user_agent_override(&self) -> SetUserAgentOverrideParams {
        SetUserAgentOverrideParams::new(self.user_agent.clone())
    }
}

/// `BrowserDriver` backed by a lazily launched Chromium.
pub struct ChromiumDriver {
    options: LaunchOptions,
    browser: OnceCell<Browser>,
}

impl std::fmt::Debug for ChromiumDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChromiumDriver")
            .field("options", &self.options)
            .field("launched", &self.browser.initialized())
            .finish()
    }
}

impl ChromiumDriver {
    pub fn new(options: LaunchOptions) -> Self {
        Self {
            options,
            browser: OnceCell::new(),
        }
    }

    async fn browser(&self) -> Result<&Browser, Error> {
        self.browser
            .get_or_try_init(|| launch(&self.options))
            .await
    }

    async fn harvest(
        &self,
        page: &Page,
        url: &str,
        settle: Duration,
    ) -> Result<Vec<SessionCookie>, Error> {
        page.set_user_agent(self.options.user_agent_override())
            .await
            .map_err(|e| Error::Session(format!("Failed to set user agent: {e}")))?;

        match tokio::time::timeout(self.options.navigation_timeout, page.goto(url)).await {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => {
                return Err(Error::Session(format!("Navigation to {url} failed: {e}")));
            }
            Err(_) => {
                return Err(Error::Session(format!(
                    "Navigation to {url} timed out after {}s",
                    self.options.navigation_timeout.as_secs()
                )));
            }
        }

        tokio::time::sleep(settle).await;

        let cookies = page
            .get_cookies()
            .await
            .map_err(|e| Error::Session(format!("Failed to read cookies: {e}")))?;

        Ok(cookies
            .into_iter()
            .map(|c| SessionCookie {
                name: c.name,
                value: c.value,
            })
            .collect())
    }
}

async fn launch(options: &LaunchOptions) -> Result<Browser, Error> {
    let mut builder = BrowserConfig::builder()
        .no_sandbox()
        .arg("--disable-setuid-sandbox")
        .arg("--disable-dev-shm-usage")
        .arg("--disable-gpu");
    if !options.headless {
        builder = builder.with_head();
    }
    if let Some(path) = &options.executable {
        builder = builder.chrome_executable(path);
    }
    let config = builder
        .build()
        .map_err(|e| Error::Session(format!("Invalid browser config: {e}")))?;

    let (browser, mut handler) = Browser::launch(config)
        .await
        .map_err(|e| Error::Session(format!("Failed to launch browser: {e}")))?;

    // The CDP handler must be polled for the browser to make progress.
    tokio::spawn(async move {
        while let Some(event) = handler.next().await {
            if let Err(e) = event {
                debug!("Browser handler stopped: {}", e);
                break;
            }
        }
    });

    info!("Launched headless browser");
    Ok(browser)
}

#[async_trait]
impl BrowserDriver for ChromiumDriver {
    async fn load_cookies(&self, url: &str, settle: Duration) -> Result<Vec<SessionCookie>, Error> {
        let browser = self.browser().await?;
        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| Error::Session(format!("Failed to open page: {e}")))?;

        let result = self.harvest(&page, url, settle).await;

        if let Err(e) = page.close().await {
            warn!("Failed to close session page: {}", e);
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_launch_options_follow_session_config() {
        let cfg = SessionConfig {
            headless: false,
            chrome_executable: Some("/usr/bin/chromium".into()),
            navigation_timeout_secs: 12,
            ..SessionConfig::default()
        };

        let options = LaunchOptions::from_config(&cfg, "garden-agent/1.0");
        assert!(!options.headless);
        assert_eq!(options.executable.as_deref(), Some("/usr/bin/chromium"));
        assert_eq!(options.navigation_timeout, Duration::from_secs(12));
    }

    #[test]
    fn test_user_agent_override_is_network_domain_params() {
        let options = LaunchOptions::from_config(&SessionConfig::default(), "garden-agent/1.0");
        let params: SetUserAgentOverrideParams = options.user_agent_override();
        assert_eq!(params.user_agent, "garden-agent/1.0");
        assert!(params.accept_language.is_none());
    }

    #[test]
    fn test_driver_launches_lazily() {
        let driver = ChromiumDriver::new(LaunchOptions::from_config(
            &SessionConfig::default(),
            "garden-agent/1.0",
        ));
        assert!(format!("{driver:?}").contains("launched: false"));
    }
}
