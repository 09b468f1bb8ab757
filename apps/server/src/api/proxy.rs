use std::sync::Arc;

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use tickerproxy_core::ProxyResponse;
use utoipa::IntoParams;

use crate::{error::ApiError, main_lib::AppState};

/// Raw query values; validation happens in the proxy service.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ProxyQuery {
    /// `OVERVIEW` or `TIME_SERIES_DAILY`
    pub operation: Option<String>,
    /// Ticker symbol, `[A-Z0-9.-]{1,10}`
    pub symbol: Option<String>,
}

#[utoipa::path(
    get,
    path = "/proxy",
    params(ProxyQuery),
    responses(
        (status = 200, description = "Live, cached or fallback data"),
        (status = 400, description = "Invalid operation or symbol"),
        (status = 429, description = "Upstream throttled and no fallback available"),
        (status = 500, description = "Upstream credential missing"),
        (status = 502, description = "Upstream error and no fallback available"),
        (status = 504, description = "Upstream timed out and no fallback available")
    )
)]
pub async fn proxy(
    State(state): State<Arc<AppState>>,
    query: Result<Query<ProxyQuery>, QueryRejection>,
) -> Response {
    let Query(query) = match query {
        Ok(query) => query,
        Err(rejection) => return ApiError::BadRequest(rejection.body_text()).into_response(),
    };

    let response = state
        .proxy_service
        .handle(query.operation.as_deref(), query.symbol.as_deref())
        .await;
    if response.status >= 500 {
        tracing::warn!("Proxy request failed with {}", response.status);
    }
    render(response)
}

/// Render a [`ProxyResponse`] with its status and header hints.
fn render(response: ProxyResponse) -> Response {
    let status =
        StatusCode::from_u16(response.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let mut http = (status, Json(response.envelope)).into_response();
    let headers = http.headers_mut();
    if let Some(secs) = response.retry_after {
        headers.insert(header::RETRY_AFTER, HeaderValue::from(secs));
    }
    if let Ok(value) = HeaderValue::from_str(&response.cache.header_value()) {
        headers.insert(header::CACHE_CONTROL, value);
    }
    http
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/proxy", get(proxy))
}
