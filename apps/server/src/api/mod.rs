use std::sync::Arc;

use axum::{
    error_handling::HandleErrorLayer, http::HeaderValue, routing::get, BoxError, Json, Router,
};
use tower::{timeout::error::Elapsed, ServiceBuilder};
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use utoipa::OpenApi;

use crate::{
    config::Config,
    error::{ApiError, ApiResult},
    main_lib::AppState,
};

mod health;
mod proxy;

#[derive(OpenApi)]
#[openapi(
    paths(health::healthz, health::readyz, proxy::proxy),
    tags((name = "tickerproxy"))
)]
pub struct ApiDoc;

async fn not_found() -> ApiResult<()> {
    Err(ApiError::NotFound)
}

/// Render middleware failures, notably the whole-request timeout, as envelopes.
async fn handle_layer_error(err: BoxError) -> ApiError {
    if err.is::<Elapsed>() {
        ApiError::Timeout
    } else {
        ApiError::Internal(err.to_string())
    }
}

pub fn app_router(state: Arc<AppState>, config: &Config) -> Router {
    let cors = if config.cors_allow.iter().any(|o| o == "*") {
        CorsLayer::new().allow_origin(Any)
    } else {
        let origins = config
            .cors_allow
            .iter()
            .filter_map(|o| match o.parse::<HeaderValue>() {
                Ok(origin) => Some(origin),
                Err(_) => {
                    tracing::warn!("Ignoring invalid CORS origin {:?}", o);
                    None
                }
            })
            .collect::<Vec<_>>();
        CorsLayer::new().allow_origin(origins)
    };

    let openapi = ApiDoc::openapi();

    Router::new()
        .merge(proxy::router())
        .nest("/api/v1", health::router())
        .route("/openapi.json", get(|| async { Json(openapi) }))
        .fallback(not_found)
        .with_state(state)
        .layer(cors)
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(
            ServiceBuilder::new()
                .layer(HandleErrorLayer::new(handle_layer_error))
                .timeout(config.request_timeout),
        )
        .layer(TraceLayer::new_for_http())
}
