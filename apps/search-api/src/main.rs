use axum_helpers::server::{create_production_app, health_router};
use core_config::tracing::{init_tracing, install_color_eyre};
use search_api::{AppState, Config, api, openapi};
use std::time::Duration;
use tracing::info;

#[tokio::main]
async fn main() -> eyre::Result<()> {
    install_color_eyre();

    let config = Config::from_env()?;
    init_tracing(&config.environment);
    observability::init_metrics();

    let state = AppState::new(config).await;
    info!(
        backend = state.cache.backend_name(),
        rate_limiting = state.security.rate_limiting_enabled,
        admin_keys = state.security.registry.admin_count(),
        user_keys = state.security.registry.user_count(),
        "Search API state initialized"
    );

    let api_routes = api::routes(&state);
    let router = axum_helpers::create_router::<openapi::ApiDoc>(api_routes).await?;

    // /health is liveness only; /ready and /health/redis probe the backend
    let app = router
        .merge(health_router(state.config.app))
        .merge(api::ready_router(state.clone()));

    info!("Starting search API (30s shutdown timeout)");

    let server = state.config.server.clone();
    create_production_app(app, &server, Duration::from_secs(30), async move {
        info!("Shutting down: releasing cache backend");
        state.cache.close().await;
    })
    .await
    .map_err(|e| eyre::eyre!("Server error: {}", e))?;

    info!("Search API shutdown complete");
    Ok(())
}
