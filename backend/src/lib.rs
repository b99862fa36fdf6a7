use std::collections::HashMap;
use std::env;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use wheel_core::{Wheel, WheelError, WheelItem, WheelStatus};

mod cache;
mod pages;
mod steam;

pub use cache::AppDetailsCache;
pub use steam::{AppDetail, FetchError, SteamApi, SteamWebClient, WishlistEntry};

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: String,
    pub wishlist_base: String,
    pub store_base: String,
    pub cache_capacity: usize,
    pub spin_duration: Duration,
    pub upstream_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:3000".to_string(),
            wishlist_base: steam::DEFAULT_WISHLIST_BASE.to_string(),
            store_base: steam::DEFAULT_STORE_BASE.to_string(),
            cache_capacity: 1024,
            spin_duration: Duration::from_millis(3000),
            upstream_timeout: Duration::from_secs(10),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            bind_addr: env::var("BIND_ADDR").unwrap_or(defaults.bind_addr),
            wishlist_base: env::var("WISHLIST_API_BASE").unwrap_or(defaults.wishlist_base),
            store_base: env::var("STORE_API_BASE").unwrap_or(defaults.store_base),
            cache_capacity: env_parse("APP_CACHE_CAPACITY", defaults.cache_capacity),
            spin_duration: Duration::from_millis(env_parse(
                "SPIN_DURATION_MS",
                defaults.spin_duration.as_millis() as u64,
            )),
            upstream_timeout: Duration::from_secs(env_parse(
                "UPSTREAM_TIMEOUT_SECS",
                defaults.upstream_timeout.as_secs(),
            )),
        }
    }
}

fn env_parse<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[derive(Clone)]
pub struct AppState {
    steam: Arc<dyn SteamApi>,
    cache: Arc<AppDetailsCache>,
    wheels: Arc<RwLock<HashMap<String, WheelRecord>>>,
    spin_duration: Duration,
}

impl AppState {
    pub fn new(steam: Arc<dyn SteamApi>, config: &Config) -> Self {
        Self {
            steam,
            cache: Arc::new(AppDetailsCache::new(config.cache_capacity)),
            wheels: Arc::new(RwLock::new(HashMap::new())),
            spin_duration: config.spin_duration,
        }
    }
}

/// One wheel session per account: the spin state machine plus the handle of
/// the pending timed resolution so a reset can abort it.
#[derive(Default)]
struct WheelRecord {
    wheel: Wheel,
    task: Option<JoinHandle<()>>,
}

pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/", get(pages::landing))
        .route("/wheel/:steam_id", get(pages::wheel))
        .route("/api/wishlist", get(missing_account))
        .route("/api/wishlist/", get(missing_account))
        .route("/api/wishlist/:steam_id", get(get_wishlist))
        .route("/api/wheel/:steam_id", get(wheel_state))
        .route("/api/wheel/:steam_id/spin", post(spin_wheel))
        .route("/api/wheel/:steam_id/reset", post(reset_wheel))
        .with_state(state)
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    kind: &'static str,
}

fn input_error(message: &str) -> (StatusCode, Json<ErrorBody>) {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorBody {
            error: message.to_string(),
            kind: "input",
        }),
    )
}

async fn missing_account() -> impl IntoResponse {
    input_error("no steam ID was provided as path suffix")
}

async fn get_wishlist(State(state): State<AppState>, Path(steam_id): Path<String>) -> Response {
    let steam_id = steam_id.trim();
    if steam_id.is_empty() {
        return input_error("no steam ID was provided as path suffix").into_response();
    }

    match aggregate_wishlist(&state, steam_id).await {
        Ok(items) => Json(items).into_response(),
        Err(err) => {
            tracing::warn!(steam_id, kind = err.kind(), error = %err, "aggregation failed");
            (
                StatusCode::BAD_GATEWAY,
                Json(ErrorBody {
                    error: format!("Failed to fetch wishlist: {err}"),
                    kind: err.kind(),
                }),
            )
                .into_response()
        }
    }
}

/// Fetches the raw wishlist, then resolves every entry's detail through the
/// cache, all entries concurrently and awaited jointly. The first failed
/// resolution fails the whole aggregation; there are no partial results.
/// Output order matches upstream wishlist order.
pub async fn aggregate_wishlist(
    state: &AppState,
    steam_id: &str,
) -> Result<Vec<WheelItem>, FetchError> {
    let entries = state.steam.wishlist(steam_id).await?;

    let details = futures::future::try_join_all(entries.iter().map(|entry| {
        let steam = Arc::clone(&state.steam);
        let cache = Arc::clone(&state.cache);
        let appid = entry.appid;
        async move {
            cache
                .get_or_fetch(appid, || async move { steam.app_details(appid).await })
                .await
        }
    }))
    .await?;

    tracing::info!(steam_id, items = entries.len(), "aggregated wishlist");

    Ok(entries
        .iter()
        .zip(details)
        .map(|(entry, detail)| WheelItem {
            name: detail.name.clone(),
            priority: entry.priority,
        })
        .collect())
}

#[derive(Debug, Deserialize)]
struct SpinRequest {
    items: Vec<WheelItem>,
}

#[derive(Debug, Deserialize)]
struct SpinParams {
    seed: Option<u64>,
}

#[derive(Debug, Serialize)]
struct SpinResponse {
    rotation: f64,
    duration_ms: u64,
}

#[derive(Debug, Serialize)]
struct WheelView {
    rotation: f64,
    spinning: bool,
    selected: Option<WheelItem>,
}

async fn spin_wheel(
    State(state): State<AppState>,
    Path(steam_id): Path<String>,
    Query(params): Query<SpinParams>,
    Json(payload): Json<SpinRequest>,
) -> Response {
    let mut rng = params
        .seed
        .map(ChaCha8Rng::seed_from_u64)
        .unwrap_or_else(ChaCha8Rng::from_entropy);

    let mut wheels = state.wheels.write().await;
    let record = wheels.entry(steam_id.clone()).or_default();

    let rotation = match record.wheel.begin_spin(&payload.items, &mut rng) {
        Ok(rotation) => rotation,
        Err(WheelError::AlreadySpinning) => {
            return (
                StatusCode::CONFLICT,
                Json(ErrorBody {
                    error: "wheel already spinning".to_string(),
                    kind: "already_spinning",
                }),
            )
                .into_response();
        }
        Err(err) => return input_error(&err.to_string()).into_response(),
    };

    // Timed resolution: the spin lands once the animation duration elapses.
    // The handle stays on the record so a reset aborts it instead of letting
    // it fire against cleared state.
    let wheels_ref = Arc::clone(&state.wheels);
    let duration = state.spin_duration;
    let account = steam_id.clone();
    record.task = Some(tokio::spawn(async move {
        tokio::time::sleep(duration).await;
        let mut wheels = wheels_ref.write().await;
        if let Some(record) = wheels.get_mut(&account) {
            if let Some(item) = record.wheel.finish_spin() {
                tracing::info!(steam_id = %account, selected = %item.name, "wheel landed");
            }
        }
    }));

    (
        StatusCode::OK,
        Json(SpinResponse {
            rotation,
            duration_ms: duration.as_millis() as u64,
        }),
    )
        .into_response()
}

async fn wheel_state(
    State(state): State<AppState>,
    Path(steam_id): Path<String>,
) -> Json<WheelView> {
    let wheels = state.wheels.read().await;
    let view = match wheels.get(&steam_id) {
        Some(record) => WheelView {
            rotation: record.wheel.rotation,
            spinning: matches!(record.wheel.status, WheelStatus::Spinning),
            selected: record.wheel.selected.clone(),
        },
        None => WheelView {
            rotation: 0.0,
            spinning: false,
            selected: None,
        },
    };
    Json(view)
}

async fn reset_wheel(State(state): State<AppState>, Path(steam_id): Path<String>) -> StatusCode {
    let mut wheels = state.wheels.write().await;
    if let Some(record) = wheels.get_mut(&steam_id) {
        if let Some(task) = record.task.take() {
            task.abort();
        }
        record.wheel.reset();
    }
    StatusCode::OK
}
