use std::sync::Arc;

use backend::{app, AppState, Config, SteamWebClient};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env();
    let steam = SteamWebClient::new(
        config.wishlist_base.clone(),
        config.store_base.clone(),
        config.upstream_timeout,
    )
    .expect("build steam client");
    let state = AppState::new(Arc::new(steam), &config);

    tracing::info!(addr = %config.bind_addr, "starting server");
    axum::serve(
        tokio::net::TcpListener::bind(&config.bind_addr)
            .await
            .expect("bind"),
        app(state),
    )
    .await
    .expect("server error");
}
