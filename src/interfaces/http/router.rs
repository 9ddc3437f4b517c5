//! API Router with Swagger UI

use std::sync::Arc;
use std::time::Instant;

use axum::{extract::FromRef, middleware, routing::get, Router};
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use super::common::{EmptyData, ErrorDetail, ErrorResponse, ListMetadata, ListResponse, MessageResponse};
use super::modules::cities::{self, CityDto, CityState, CreateCityRequest, UpdateCityRequest};
use super::modules::health::{self, ComponentHealth, HealthResponse, HealthState};
use super::modules::metrics::{http_metrics_middleware, prometheus_metrics, MetricsState};
use super::modules::request_id::request_id_middleware;
use crate::application::CityUseCase;
use crate::shared::types::pagination::PaginationMetadata;

pub const ROOT_MESSAGE: &str = "City Management API is running";

/// Unified router state; each handler extracts its own slice via `FromRef`.
#[derive(Clone)]
pub struct AppState {
    pub usecase: Arc<CityUseCase>,
    pub backend: &'static str,
    pub started_at: Arc<Instant>,
}

impl FromRef<AppState> for CityState {
    fn from_ref(s: &AppState) -> Self {
        CityState {
            usecase: Arc::clone(&s.usecase),
        }
    }
}

impl FromRef<AppState> for HealthState {
    fn from_ref(s: &AppState) -> Self {
        HealthState {
            usecase: Arc::clone(&s.usecase),
            backend: s.backend,
            started_at: Arc::clone(&s.started_at),
        }
    }
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        cities::list_cities,
        cities::get_city,
        cities::create_city,
        cities::update_city,
        cities::delete_city,
    ),
    components(
        schemas(
            MessageResponse<CityDto>,
            MessageResponse<EmptyData>,
            ListResponse,
            ListMetadata,
            PaginationMetadata,
            EmptyData,
            ErrorResponse,
            ErrorDetail,
            CityDto,
            CreateCityRequest,
            UpdateCityRequest,
            HealthResponse,
            ComponentHealth,
        )
    ),
    tags(
        (name = "Health", description = "Server health check endpoints"),
        (name = "Cities", description = "City management: CRUD, search, filter, sort, projection and pagination"),
    ),
    info(
        title = "City Management API",
        version = "1.0.0",
        description = "REST API for managing geographic city records",
        license(name = "MIT")
    )
)]
pub struct ApiDoc;

async fn root() -> &'static str {
    ROOT_MESSAGE
}

/// Create the API router with all routes
pub fn create_api_router(
    usecase: Arc<CityUseCase>,
    backend: &'static str,
    prometheus: Option<PrometheusHandle>,
) -> Router {
    let state = AppState {
        usecase,
        backend,
        started_at: Arc::new(Instant::now()),
    };

    let mut app = Router::new()
        .route("/", get(root))
        .route("/health", get(health::health_check))
        .route(
            "/api/cities",
            get(cities::list_cities).post(cities::create_city),
        )
        .route(
            "/api/cities/{id}",
            get(cities::get_city)
                .put(cities::update_city)
                .delete(cities::delete_city),
        )
        .with_state(state);

    if let Some(handle) = prometheus {
        app = app.merge(
            Router::new()
                .route("/metrics", get(prometheus_metrics))
                .with_state(MetricsState { handle }),
        );
    }

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    app.route_layer(middleware::from_fn(http_metrics_middleware))
        .merge(SwaggerUi::new("/api-docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(middleware::from_fn(request_id_middleware))
}
