//! Session credential ownership and renewal.
//!
//! Renewal happens when no credential exists, when the current one has
//! outlived its jittered lifetime, or when the caller reports an auth
//! rejection and calls [`SessionManager::refresh`] directly. Concurrent
//! refreshes are allowed; each replaces the credential wholesale so the last
//! one to finish wins.

use std::sync::Arc;
use std::time::Duration;

use common::config::SessionConfig;
use common::Error;
use rand::Rng;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::{info, warn};

use crate::browser::{BrowserDriver, SessionCookie};

/// Serialized cookie header value.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn from_cookies(cookies: &[SessionCookie]) -> Self {
        let joined = cookies
            .iter()
            .map(|c| format!("{}={}", c.name, c.value))
            .collect::<Vec<_>>()
            .join("; ");
        Self(joined)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Credential").field(&"<redacted>").finish()
    }
}

/// Proactive renewal policy: renew once the credential is older than
/// `max_age` plus a per-credential random share of `jitter`.
#[derive(Debug, Clone, Copy)]
pub struct RefreshPolicy {
    pub max_age: Duration,
    pub jitter: Duration,
}

impl RefreshPolicy {
    pub fn from_config(cfg: &SessionConfig) -> Self {
        Self {
            max_age: Duration::from_secs(cfg.max_age_secs),
            jitter: Duration::from_secs(cfg.jitter_secs),
        }
    }

    /// Lifetime for a freshly minted credential.
    pub fn lifetime(&self) -> Duration {
        let jitter_ms = self.jitter.as_millis() as u64;
        if jitter_ms == 0 {
            return self.max_age;
        }
        let extra = rand::thread_rng().gen_range(0..=jitter_ms);
        self.max_age + Duration::from_millis(extra)
    }
}

#[derive(Debug, Clone)]
struct SessionState {
    credential: Credential,
    expires_at: Instant,
}

/// Owns the current credential and the browser used to mint it.
pub struct SessionManager {
    driver: Arc<dyn BrowserDriver>,
    page_url: String,
    settle: Duration,
    policy: RefreshPolicy,
    state: RwLock<Option<SessionState>>,
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("page_url", &self.page_url)
            .field("settle", &self.settle)
            .field("policy", &self.policy)
            .finish()
    }
}

impl SessionManager {
    pub fn new(
        driver: Arc<dyn BrowserDriver>,
        page_url: impl Into<String>,
        settle: Duration,
        policy: RefreshPolicy,
    ) -> Self {
        Self {
            driver,
            page_url: page_url.into(),
            settle,
            policy,
            state: RwLock::new(None),
        }
    }

    pub fn from_config(driver: Arc<dyn BrowserDriver>, cfg: &SessionConfig) -> Self {
        Self::new(
            driver,
            cfg.page_url.clone(),
            Duration::from_millis(cfg.settle_delay_ms),
            RefreshPolicy::from_config(cfg),
        )
    }

    /// Current credential, minting one if none exists yet.
    pub async fn credential(&self) -> Result<Credential, Error> {
        if let Some(state) = self.state.read().await.as_ref() {
            return Ok(state.credential.clone());
        }
        self.refresh().await
    }

    /// Current credential, renewed first if missing or past its lifetime.
    pub async fn ensure_fresh(&self) -> Result<Credential, Error> {
        let current = self.state.read().await.clone();
        match current {
            Some(state) if Instant::now() < state.expires_at => Ok(state.credential),
            Some(_) => {
                info!("Session credential aged out, renewing");
                self.refresh().await
            }
            None => self.refresh().await,
        }
    }

    /// Load the target page in the browser and replace the credential with
    /// the cookies it produced.
    pub async fn refresh(&self) -> Result<Credential, Error> {
        info!("Refreshing session cookies...");
        let cookies = self.driver.load_cookies(&self.page_url, self.settle).await?;
        if cookies.is_empty() {
            warn!("Session page set no cookies; continuing with an empty credential");
        }

        let credential = Credential::from_cookies(&cookies);
        *self.state.write().await = Some(SessionState {
            credential: credential.clone(),
            expires_at: Instant::now() + self.policy.lifetime(),
        });

        info!("Session cookies refreshed ({} cookies)", cookies.len());
        Ok(credential)
    }

    /// True once a credential has been minted.
    pub async fn has_credential(&self) -> bool {
        self.state.read().await.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FakeDriver {
        calls: AtomicUsize,
        fail: bool,
    }

    impl FakeDriver {
        fn new(fail: bool) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                fail,
            })
        }
    }

    #[async_trait]
    impl BrowserDriver for FakeDriver {
        async fn load_cookies(
            &self,
            _url: &str,
            _settle: Duration,
        ) -> Result<Vec<SessionCookie>, Error> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if self.fail {
                return Err(Error::Session("navigation timed out".into()));
            }
            Ok(vec![
                SessionCookie {
                    name: "sid".into(),
                    value: format!("s{n}"),
                },
                SessionCookie {
                    name: "cf".into(),
                    value: "ok".into(),
                },
            ])
        }
    }

    fn policy(max_age_secs: u64) -> RefreshPolicy {
        RefreshPolicy {
            max_age: Duration::from_secs(max_age_secs),
            jitter: Duration::ZERO,
        }
    }

    fn manager(driver: Arc<FakeDriver>, max_age_secs: u64) -> SessionManager {
        SessionManager::new(driver, "https://example.test/stock", Duration::ZERO, policy(max_age_secs))
    }

    #[test]
    fn test_credential_serializes_cookie_pairs() {
        let cred = Credential::from_cookies(&[
            SessionCookie {
                name: "a".into(),
                value: "1".into(),
            },
            SessionCookie {
                name: "b".into(),
                value: "2".into(),
            },
        ]);
        assert_eq!(cred.as_str(), "a=1; b=2");
        assert!(!format!("{cred:?}").contains("a=1"));
    }

    #[test]
    fn test_lifetime_stays_within_jitter_bounds() {
        let p = RefreshPolicy {
            max_age: Duration::from_secs(240),
            jitter: Duration::from_secs(60),
        };
        for _ in 0..50 {
            let life = p.lifetime();
            assert!(life >= Duration::from_secs(240));
            assert!(life <= Duration::from_secs(300));
        }
        assert_eq!(policy(240).lifetime(), Duration::from_secs(240));
    }

    #[tokio::test]
    async fn test_credential_is_minted_lazily_once() {
        let driver = FakeDriver::new(false);
        let mgr = manager(driver.clone(), 240);
        assert!(!mgr.has_credential().await);

        let first = mgr.credential().await.expect("first credential");
        let second = mgr.credential().await.expect("cached credential");

        assert_eq!(first.as_str(), "sid=s1; cf=ok");
        assert_eq!(first, second);
        assert_eq!(driver.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_ensure_fresh_renews_after_max_age() {
        let driver = FakeDriver::new(false);
        let mgr = manager(driver.clone(), 240);

        mgr.ensure_fresh().await.expect("initial");
        tokio::time::advance(Duration::from_secs(100)).await;
        let still = mgr.ensure_fresh().await.expect("still fresh");
        assert_eq!(still.as_str(), "sid=s1; cf=ok");
        assert_eq!(driver.calls.load(Ordering::SeqCst), 1);

        tokio::time::advance(Duration::from_secs(141)).await;
        let renewed = mgr.ensure_fresh().await.expect("renewed");
        assert_eq!(renewed.as_str(), "sid=s2; cf=ok");
        assert_eq!(driver.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_explicit_refresh_replaces_credential() {
        let driver = FakeDriver::new(false);
        let mgr = manager(driver.clone(), 240);

        mgr.credential().await.expect("initial");
        let renewed = mgr.refresh().await.expect("refresh");
        assert_eq!(renewed.as_str(), "sid=s2; cf=ok");
        assert_eq!(mgr.credential().await.expect("current"), renewed);
    }

    #[tokio::test]
    async fn test_refresh_failure_is_session_error_and_keeps_nothing() {
        let driver = FakeDriver::new(true);
        let mgr = manager(driver.clone(), 240);

        let err = mgr.credential().await.expect_err("browser failure");
        assert!(matches!(err, Error::Session(_)));
        assert!(!mgr.has_credential().await);
    }
}
