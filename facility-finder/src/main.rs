use std::process::ExitCode;

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use facility_finder::cache::{CachedGeocoder, CachedRegistry};
use facility_finder::config::AppConfig;
use facility_finder::kakao::KakaoClient;
use facility_finder::registry::RegistryClient;
use facility_finder::session::SearchPipeline;
use facility_finder::web::{AppState, create_router};

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "invalid configuration");
            return ExitCode::FAILURE;
        }
    };

    let registry = match RegistryClient::new(config.registry.clone()) {
        Ok(client) => CachedRegistry::new(client, &config.cache),
        Err(e) => {
            error!(error = %e, "failed to create registry client");
            return ExitCode::FAILURE;
        }
    };

    let kakao = match KakaoClient::new(config.kakao.clone()) {
        Ok(client) => client,
        Err(e) => {
            error!(error = %e, "failed to create Kakao client");
            return ExitCode::FAILURE;
        }
    };
    let geocoder = CachedGeocoder::new(kakao.clone(), &config.cache);

    let pipeline = SearchPipeline::new(config.pipeline.clone(), registry, geocoder, kakao);

    // Fill the registry cache before taking traffic
    let keys: Vec<&str> = config
        .pipeline
        .categories
        .iter()
        .map(|c| c.key.as_str())
        .collect();
    let warmed = pipeline.warm(&keys).await;
    info!(
        categories = warmed.len(),
        cached = pipeline.registry().cache_entry_count(),
        "registry cache warmed"
    );

    let app = create_router(AppState::new(pipeline));

    let listener = match tokio::net::TcpListener::bind(config.listen_addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!(addr = %config.listen_addr, error = %e, "failed to bind");
            return ExitCode::FAILURE;
        }
    };

    info!(addr = %config.listen_addr, "facility finder listening");
    info!("  GET /health");
    info!("  GET /api/categories");
    info!("  GET /api/facilities?category=&lat=&lon=|address=&radius_km=");

    if let Err(e) = axum::serve(listener, app).await {
        error!(error = %e, "server error");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
