//! HTTP route handlers.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use tower_http::trace::TraceLayer;
use tracing::{error, warn};

use crate::lookup::{Geocoder, TravelTimeProvider};
use crate::registry::RecordSource;
use crate::session::{SearchError, SearchSession};

use super::dto::*;
use super::state::AppState;

/// Create the application router.
pub fn create_router<S, G, R>(state: AppState<S, G, R>) -> Router
where
    S: RecordSource + Send + Sync + 'static,
    G: Geocoder + Send + Sync + 'static,
    R: TravelTimeProvider + Send + Sync + 'static,
{
    Router::new()
        .route("/health", get(health))
        .route("/api/categories", get(list_categories::<S, G, R>))
        .route("/api/facilities", get(search_facilities::<S, G, R>))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint.
async fn health() -> &'static str {
    "ok"
}

/// List configured categories.
async fn list_categories<S, G, R>(State(state): State<AppState<S, G, R>>) -> Json<CategoriesResponse>
where
    S: RecordSource + Send + Sync + 'static,
    G: Geocoder + Send + Sync + 'static,
    R: TravelTimeProvider + Send + Sync + 'static,
{
    let categories = state
        .pipeline
        .config()
        .categories
        .iter()
        .map(CategoryResult::from)
        .collect();

    Json(CategoriesResponse { categories })
}

/// Search facilities near an origin.
async fn search_facilities<S, G, R>(
    State(state): State<AppState<S, G, R>>,
    Query(req): Query<FacilitiesRequest>,
) -> Result<Json<FacilitiesResponse>, AppError>
where
    S: RecordSource + Send + Sync + 'static,
    G: Geocoder + Send + Sync + 'static,
    R: TravelTimeProvider + Send + Sync + 'static,
{
    let origin = req
        .origin_request()
        .map_err(|message| AppError::BadRequest { message })?;

    let mut session = SearchSession::new(Arc::clone(&state.pipeline));
    if let Some(category) = &req.category {
        session.set_category(category)?;
    }
    session.set_radius(req.radius_km);
    session.resolve_origin(origin).await?;

    let result = session.run().await?;
    Ok(Json(FacilitiesResponse::from_result(&result)))
}

/// Application error type.
#[derive(Debug)]
pub enum AppError {
    BadRequest { message: String },
    NotFound { message: String },
    Internal { message: String },
}

impl From<SearchError> for AppError {
    fn from(e: SearchError) -> Self {
        match e {
            SearchError::OriginNotFound(_) => AppError::NotFound {
                message: e.to_string(),
            },
            SearchError::UnknownCategory(_) | SearchError::InvalidRadius(_) => {
                AppError::BadRequest {
                    message: e.to_string(),
                }
            }
            SearchError::Superseded => AppError::Internal {
                message: e.to_string(),
            },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match self {
            AppError::BadRequest { message } => (StatusCode::BAD_REQUEST, message),
            AppError::NotFound { message } => (StatusCode::NOT_FOUND, message),
            AppError::Internal { message } => (StatusCode::INTERNAL_SERVER_ERROR, message),
        };

        if status.is_server_error() {
            error!(%status, %message, "request failed");
        } else {
            warn!(%status, %message, "request rejected");
        }

        let body = Json(ErrorResponse { error: message });
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Coordinate, RawRecord};
    use crate::lookup::{GeocodeHit, LookupError};
    use crate::registry::{EndpointConfig, RegistrySnapshot, StopReason};
    use crate::session::{PipelineConfig, SearchPipeline};
    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use tower::ServiceExt;

    struct OneRow;

    impl RecordSource for OneRow {
        async fn fetch_all(&self, _endpoint: &EndpointConfig) -> Arc<RegistrySnapshot> {
            Arc::new(RegistrySnapshot {
                records: vec![
                    RawRecord::new()
                        .with("INSTL_PLACE", "lobby")
                        .with("REFINE_WGS84_LAT", 37.2640)
                        .with("REFINE_WGS84_LOGT", 127.0290),
                ],
                pages: 1,
                stop: StopReason::Exhausted,
            })
        }
    }

    struct NoGeocoder;

    impl Geocoder for NoGeocoder {
        async fn geocode(&self, _address: &str) -> Result<Option<GeocodeHit>, LookupError> {
            Ok(None)
        }
    }

    struct DownRouter;

    impl TravelTimeProvider for DownRouter {
        async fn travel_minutes(&self, _from: Coordinate, _to: Coordinate) -> Result<f64, LookupError> {
            Err(LookupError::timeout())
        }
    }

    fn state() -> AppState<OneRow, NoGeocoder, DownRouter> {
        AppState::new(SearchPipeline::new(
            PipelineConfig::default(),
            OneRow,
            NoGeocoder,
            DownRouter,
        ))
    }

    #[tokio::test]
    async fn search_by_coordinates() {
        let req = FacilitiesRequest {
            lat: Some(37.2636),
            lon: Some(127.0286),
            ..Default::default()
        };

        let Json(response) = search_facilities(State(state()), Query(req)).await.unwrap();

        assert_eq!(response.category, "aed");
        assert_eq!(response.facilities.len(), 1);
        assert_eq!(response.facilities[0].name, "lobby");
        assert!(response.facilities[0].travel_time.is_some_and(|t| t.is_unavailable()));
    }

    #[tokio::test]
    async fn unknown_address_is_not_found() {
        let req = FacilitiesRequest {
            address: Some("atlantis".into()),
            ..Default::default()
        };

        let err = search_facilities(State(state()), Query(req)).await.unwrap_err();

        assert!(matches!(err, AppError::NotFound { ref message } if message.contains("origin not found")));
        assert_eq!(err.into_response().status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn unknown_category_is_bad_request() {
        let req = FacilitiesRequest {
            category: Some("restroom".into()),
            lat: Some(37.2636),
            lon: Some(127.0286),
            ..Default::default()
        };

        let err = search_facilities(State(state()), Query(req)).await.unwrap_err();
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn missing_origin_is_bad_request() {
        let err = search_facilities(State(state()), Query(FacilitiesRequest::default()))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::BadRequest { .. }));
    }

    /// Send a GET through the full router.
    async fn send_get(uri: &str) -> (StatusCode, serde_json::Value) {
        let response = create_router(state())
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();

        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
        (status, body)
    }

    #[tokio::test]
    async fn router_serves_search() {
        let (status, body) = send_get("/api/facilities?category=aed&lat=37.2636&lon=127.0286").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["category"], "aed");
        assert_eq!(body["facilities"][0]["name"], "lobby");
        assert_eq!(body["facilities"][0]["travel_time"]["kind"], "unavailable");
    }

    #[tokio::test]
    async fn router_maps_unknown_origin_to_404() {
        let (status, body) = send_get("/api/facilities?address=atlantis").await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body["error"].as_str().unwrap().contains("origin not found"));
    }

    #[tokio::test]
    async fn router_maps_unknown_category_to_400() {
        let (status, body) = send_get("/api/facilities?category=restroom&lat=37.2636&lon=127.0286").await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());

        let (status, _) = send_get("/api/facilities?lat=37.2636&lon=127.0286&radius_km=0").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn router_serves_health_and_categories() {
        let response = create_router(state())
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let (status, body) = send_get("/api/categories").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["categories"][1]["key"], "child_night_clinic");
    }

    #[tokio::test]
    async fn categories_listed() {
        let Json(response) = list_categories(State(state())).await;
        let keys: Vec<_> = response.categories.iter().map(|c| c.key.as_str()).collect();
        assert_eq!(keys, vec!["aed", "child_night_clinic"]);
    }
}
