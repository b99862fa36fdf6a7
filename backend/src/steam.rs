use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use thiserror::Error;

pub const DEFAULT_WISHLIST_BASE: &str =
    "https://api.steampowered.com/IWishlistService/GetWishList/v1/";
pub const DEFAULT_STORE_BASE: &str = "https://store.steampowered.com/api/appdetails";

const RETRY_BACKOFF: Duration = Duration::from_millis(250);

/// One record from the wishlist listing service, in upstream order.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct WishlistEntry {
    pub appid: u32,
    pub priority: u32,
    #[serde(default)]
    pub date_added: i64,
}

#[derive(Debug, Deserialize)]
struct WishlistResponse {
    response: WishlistBody,
}

#[derive(Debug, Deserialize)]
struct WishlistBody {
    #[serde(default)]
    items: Vec<WishlistEntry>,
}

/// The slice of the store detail payload this service keeps. The upstream
/// record carries dozens of descriptive fields; only the name matters here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppDetail {
    pub appid: u32,
    pub name: String,
}

#[derive(Debug, Deserialize)]
struct AppDetailEnvelope {
    success: bool,
    data: Option<AppDetailData>,
}

#[derive(Debug, Deserialize)]
struct AppDetailData {
    name: String,
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("upstream service unavailable: {0}")]
    UpstreamUnavailable(String),
    #[error("upstream payload malformed: {0}")]
    UpstreamMalformed(String),
    #[error("no detail data for app {0}")]
    PartialDataMissing(u32),
}

impl FetchError {
    pub fn kind(&self) -> &'static str {
        match self {
            FetchError::UpstreamUnavailable(_) => "upstream_unavailable",
            FetchError::UpstreamMalformed(_) => "upstream_malformed",
            FetchError::PartialDataMissing(_) => "partial_data_missing",
        }
    }
}

/// The two upstream Steam calls this service depends on. Trait-shaped so
/// tests drive the routes with a stub instead of the network.
#[async_trait]
pub trait SteamApi: Send + Sync {
    async fn wishlist(&self, steam_id: &str) -> Result<Vec<WishlistEntry>, FetchError>;
    async fn app_details(&self, appid: u32) -> Result<AppDetail, FetchError>;
}

pub struct SteamWebClient {
    http: reqwest::Client,
    wishlist_base: String,
    store_base: String,
}

impl SteamWebClient {
    pub fn new(
        wishlist_base: impl Into<String>,
        store_base: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            wishlist_base: wishlist_base.into(),
            store_base: store_base.into(),
        })
    }

    /// One retry on transport errors and 5xx responses; other statuses fail
    /// straight through.
    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, FetchError> {
        let mut last = None;
        for attempt in 0..2 {
            if attempt > 0 {
                tokio::time::sleep(RETRY_BACKOFF).await;
            }
            let response = match self.http.get(url).send().await {
                Ok(res) => res,
                Err(err) => {
                    tracing::warn!(url, attempt, error = %err, "upstream request failed");
                    last = Some(FetchError::UpstreamUnavailable(err.to_string()));
                    continue;
                }
            };
            let status = response.status();
            if status.is_server_error() {
                tracing::warn!(url, attempt, %status, "upstream returned server error");
                last = Some(FetchError::UpstreamUnavailable(format!("status {status}")));
                continue;
            }
            if !status.is_success() {
                return Err(FetchError::UpstreamUnavailable(format!("status {status}")));
            }
            return response
                .json::<T>()
                .await
                .map_err(|err| FetchError::UpstreamMalformed(err.to_string()));
        }
        Err(last.unwrap_or_else(|| FetchError::UpstreamUnavailable("no attempts made".into())))
    }
}

#[async_trait]
impl SteamApi for SteamWebClient {
    async fn wishlist(&self, steam_id: &str) -> Result<Vec<WishlistEntry>, FetchError> {
        let url = format!("{}?steamid={steam_id}", self.wishlist_base);
        let body: WishlistResponse = self.get_json(&url).await?;
        Ok(body.response.items)
    }

    async fn app_details(&self, appid: u32) -> Result<AppDetail, FetchError> {
        let url = format!("{}?appids={appid}", self.store_base);
        let mut body: HashMap<String, AppDetailEnvelope> = self.get_json(&url).await?;

        let envelope = body
            .remove(&appid.to_string())
            .ok_or(FetchError::PartialDataMissing(appid))?;
        if !envelope.success {
            return Err(FetchError::PartialDataMissing(appid));
        }
        let data = envelope
            .data
            .ok_or(FetchError::PartialDataMissing(appid))?;

        Ok(AppDetail {
            appid,
            name: data.name,
        })
    }
}
