use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    http::{header::CONTENT_TYPE, HeaderValue, Method},
    routing::get,
    Router,
};
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::config::{AppConfig, SecurityConfig};
use crate::database::NorthwindStore;
use crate::error::ApiError;
use crate::handlers::{customers, orders, system};

/// Shared handler state. The store is injected so tests can swap in a double.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn NorthwindStore>,
}

impl AppState {
    pub fn new(store: Arc<dyn NorthwindStore>) -> Self {
        Self { store }
    }
}

/// Build the full router with middleware configured from `config`
pub fn app(state: AppState, config: &AppConfig) -> Router {
    let mut router = routes()
        .fallback(fallback)
        .with_state(state)
        .layer(DefaultBodyLimit::max(config.api.max_request_size_bytes));

    if config.security.enable_cors {
        router = router.layer(cors_layer(&config.security));
    }

    if config.api.enable_request_logging {
        router = router.layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        );
    }

    router
}

fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(system::root))
        .route("/health", get(system::health))
        .merge(customer_routes())
        .merge(order_routes())
}

fn customer_routes() -> Router<AppState> {
    Router::new()
        .route("/customers", get(customers::list).post(customers::create))
        .route(
            "/customers/:id",
            get(customers::get)
                .put(customers::update)
                .delete(customers::delete),
        )
}

fn order_routes() -> Router<AppState> {
    use axum::routing::post;

    Router::new()
        .route("/customer/:id/orders", get(orders::list_for_customer))
        .route("/orders", post(orders::create))
        .route(
            "/orders/:id",
            get(orders::get).put(orders::update).delete(orders::delete),
        )
}

fn cors_layer(security: &SecurityConfig) -> CorsLayer {
    if security.cors_origins.is_empty() {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = security
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([CONTENT_TYPE])
}

async fn fallback() -> ApiError {
    ApiError::not_found("Route not found")
}
