//! Authenticated client for the stock API.
//!
//! Requests carry the session cookie and the stock page as `Referer`. A
//! 401/403 triggers exactly one session refresh and one retry.

use std::future::Future;
use std::time::Duration;

use common::config::SourcesConfig;
use common::{Error, RawStockResponse};
use session_client::{Credential, SessionManager};
use tracing::{debug, info};

/// Async client for the cookie-protected stock endpoint.
#[derive(Debug, Clone)]
pub struct StockApiClient {
    client: reqwest::Client,
    url: String,
    referer: String,
}

impl StockApiClient {
    pub fn new(sources: &SourcesConfig, referer: &str) -> Result<Self, Error> {
        let client = reqwest::Client::builder()
            .user_agent(sources.user_agent.clone())
            .pool_max_idle_per_host(4)
            .timeout(Duration::from_secs(sources.stock_timeout_secs))
            .build()
            .map_err(|e| Error::Http(format!("failed to build stock HTTP client: {e}")))?;

        Ok(Self {
            client,
            url: sources.stock_api_url.clone(),
            referer: referer.to_string(),
        })
    }

    /// Fetch the stock payload, renewing the session once if it is rejected.
    pub async fn fetch(&self, session: &SessionManager) -> Result<RawStockResponse, Error> {
        let credential = session.credential().await?;
        let raw = with_reauth(
            credential,
            |c| async move { self.fetch_with(&c).await },
            || session.refresh(),
        )
        .await?;

        raw.first_record()?;
        Ok(raw)
    }

    /// A single request with the given credential.
    pub async fn fetch_with(&self, credential: &Credential) -> Result<RawStockResponse, Error> {
        debug!("Fetching stock API: {}", self.url);

        let resp = self
            .client
            .get(&self.url)
            .header("Accept", "application/json")
            .header("Cookie", credential.as_str())
            .header("Referer", &self.referer)
            .send()
            .await
            .map_err(|e| Error::Http(format!("stock API request failed: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Fetch {
                status: status.as_u16(),
                message: body.chars().take(500).collect(),
            });
        }

        resp.json()
            .await
            .map_err(|e| Error::Data(format!("stock API returned malformed JSON: {e}")))
    }
}

/// Run `attempt` with `credential`; on an auth rejection, obtain a new
/// credential from `refresh` and run `attempt` exactly once more.
pub async fn with_reauth<T, A, AFut, R, RFut>(
    credential: Credential,
    mut attempt: A,
    refresh: R,
) -> Result<T, Error>
where
    A: FnMut(Credential) -> AFut,
    AFut: Future<Output = Result<T, Error>>,
    R: FnOnce() -> RFut,
    RFut: Future<Output = Result<Credential, Error>>,
{
    match attempt(credential).await {
        Err(e) if e.is_auth_rejection() => {
            info!("Session rejected ({}), refreshing and retrying once", e);
            let fresh = refresh().await?;
            attempt(fresh).await
        }
        other => other,
    }
}
