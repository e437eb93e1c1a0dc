//! Application configuration from environment variables.

use std::env::VarError;
use std::fmt::Display;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use crate::cache::CacheConfig;
use crate::kakao::KakaoConfig;
use crate::registry::RegistryConfig;
use crate::session::{CategoryConfig, PipelineConfig};

/// Error loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing environment variable {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("cannot read categories file {path}: {reason}")]
    CategoriesFile { path: PathBuf, reason: String },
}

/// Everything `main` needs to build the server.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub listen_addr: SocketAddr,
    pub registry: RegistryConfig,
    pub kakao: KakaoConfig,
    pub cache: CacheConfig,
    pub pipeline: PipelineConfig,
}

impl AppConfig {
    /// Load from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        build_app_config(|key| std::env::var(key))
    }
}

/// Build configuration with the given variable lookup.
pub fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, VarError>,
{
    let require = |var: &str| -> Result<String, ConfigError> {
        lookup(var)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingEnvVar(var.to_string()))
    };

    let registry_key = require("REGISTRY_API_KEY")?;
    let kakao_key = require("KAKAO_API_KEY")?;

    let listen_addr = parse_or(
        &lookup,
        "LISTEN_ADDR",
        Some(SocketAddr::from(([127, 0, 0, 1], 3000))),
    )?;
    let region = lookup("REGION_FILTER").unwrap_or_else(|_| "수원시".to_string());
    let ttl_secs: u64 = parse_or(&lookup, "REGISTRY_CACHE_TTL_SECS", Some(600))?;
    let near_miss_factor: f64 = parse_or(&lookup, "NEAR_MISS_FACTOR", Some(1.0))?;
    let enrich_limit: usize = parse_or(&lookup, "ENRICH_LIMIT", Some(10))?;
    let enrich_concurrency: usize = parse_or(&lookup, "ENRICH_CONCURRENCY", Some(4))?;

    if !near_miss_factor.is_finite() || near_miss_factor < 1.0 {
        return Err(ConfigError::InvalidEnvVar {
            var: "NEAR_MISS_FACTOR".to_string(),
            reason: format!("must be at least 1, got {near_miss_factor}"),
        });
    }
    if enrich_concurrency == 0 {
        return Err(ConfigError::InvalidEnvVar {
            var: "ENRICH_CONCURRENCY".to_string(),
            reason: "must be positive".to_string(),
        });
    }

    let mut pipeline = PipelineConfig {
        near_miss_factor,
        ..PipelineConfig::default()
    };
    pipeline.enrichment = pipeline
        .enrichment
        .with_limit(enrich_limit)
        .with_concurrency(enrich_concurrency);

    if let Ok(path) = lookup("CATEGORIES_FILE") {
        pipeline.categories = load_categories(Path::new(&path))?;
    }
    let pipeline = pipeline.with_default_region(&region);

    let cache = CacheConfig {
        registry_ttl: Duration::from_secs(ttl_secs),
        ..CacheConfig::default()
    };

    Ok(AppConfig {
        listen_addr,
        registry: RegistryConfig::new(registry_key),
        kakao: KakaoConfig::new(kakao_key).with_max_concurrent(enrich_concurrency),
        cache,
        pipeline,
    })
}

/// Parse a variable, falling back to `default` when unset.
fn parse_or<F, T>(lookup: &F, var: &str, default: Option<T>) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Result<String, VarError>,
    T: FromStr,
    T::Err: Display,
{
    match lookup(var) {
        Ok(raw) => raw.trim().parse::<T>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        }),
        Err(_) => default.ok_or_else(|| ConfigError::MissingEnvVar(var.to_string())),
    }
}

/// Read a JSON array of category configs.
pub fn load_categories(path: &Path) -> Result<Vec<CategoryConfig>, ConfigError> {
    let err = |reason: String| ConfigError::CategoriesFile {
        path: path.to_path_buf(),
        reason,
    };

    let text = std::fs::read_to_string(path).map_err(|e| err(e.to_string()))?;
    let categories: Vec<CategoryConfig> =
        serde_json::from_str(&text).map_err(|e| err(e.to_string()))?;

    if categories.is_empty() {
        return Err(err("no categories".to_string()));
    }
    Ok(categories)
}
