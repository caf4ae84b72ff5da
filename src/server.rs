//! HTTP surface: routes, error mapping, and the serve loop.

use crate::error::{Error, ErrorKind};
use crate::models::{CountryRecord, RefreshReport, Status};
use crate::query::ListQuery;
use crate::service::{CountryService, REFRESH_MESSAGE};
use axum::extract::{Path, Query, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use serde_json::json;
use tokio::net::TcpListener;

const UPSTREAM_ERROR: &str = "External data source unavailable";
const INTERNAL_ERROR: &str = "Internal server error";
const NO_COUNTRIES: &str = "No Countries found";

/// API error type.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("upstream unavailable: {0}")]
    Upstream(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Upstream(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        match e.kind() {
            ErrorKind::UpstreamUnavailable => Self::Upstream(e.to_string()),
            ErrorKind::NotFound => Self::NotFound(e.to_string()),
            ErrorKind::Internal => Self::Internal(e.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = match self {
            Self::Upstream(details) => json!({ "error": UPSTREAM_ERROR, "details": details }),
            Self::NotFound(message) => json!({ "error": message }),
            Self::Internal(details) => {
                log::error!("request failed: {}", details);
                json!({ "error": INTERNAL_ERROR })
            }
        };
        (status, Json(body)).into_response()
    }
}

/// Result type for API handlers.
pub type ApiResult<T> = std::result::Result<T, ApiError>;

/// Run a synchronous service call off the async workers.
async fn blocking<T, F>(f: F) -> ApiResult<T>
where
    F: FnOnce() -> crate::Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ApiError::Internal(format!("task failed: {e}")))?
        .map_err(ApiError::from)
}

#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    pub message: &'static str,
    #[serde(flatten)]
    pub report: RefreshReport,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

/// POST /countries/refresh
pub async fn refresh_countries(
    State(service): State<CountryService>,
) -> ApiResult<Json<RefreshResponse>> {
    let report = blocking(move || service.refresh()).await?;
    Ok(Json(RefreshResponse {
        message: REFRESH_MESSAGE,
        report,
    }))
}

/// GET /countries?region=&currency=&sort=
pub async fn list_countries(
    State(service): State<CountryService>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<Vec<CountryRecord>>> {
    let countries = blocking(move || service.list(&query)).await?;
    if countries.is_empty() {
        return Err(ApiError::NotFound(NO_COUNTRIES.into()));
    }
    Ok(Json(countries))
}

/// GET /countries/{name}
pub async fn get_country(
    State(service): State<CountryService>,
    Path(name): Path<String>,
) -> ApiResult<Json<CountryRecord>> {
    let country = blocking(move || service.get_by_name(&name)).await?;
    Ok(Json(country))
}

/// DELETE /countries/{name}
pub async fn delete_country(
    State(service): State<CountryService>,
    Path(name): Path<String>,
) -> ApiResult<Json<MessageResponse>> {
    blocking(move || service.delete_by_name(&name)).await?;
    Ok(Json(MessageResponse {
        message: "Country deleted successfully",
    }))
}

/// GET /status
pub async fn get_status(State(service): State<CountryService>) -> ApiResult<Json<Status>> {
    let status = blocking(move || service.status()).await?;
    Ok(Json(status))
}

/// GET /countries/image
pub async fn get_summary_image(State(service): State<CountryService>) -> ApiResult<Response> {
    let png = blocking(move || service.summary_image()).await?;
    Ok(([(header::CONTENT_TYPE, "image/png")], png).into_response())
}

pub fn create_router(service: CountryService) -> Router {
    Router::new()
        .route("/countries/refresh", post(refresh_countries))
        .route("/countries/image", get(get_summary_image))
        .route("/countries", get(list_countries))
        .route("/countries/{name}", get(get_country).delete(delete_country))
        .route("/status", get(get_status))
        .with_state(service)
}

/// Serve until Ctrl-C.
pub async fn serve(listener: TcpListener, service: CountryService) -> std::io::Result<()> {
    if let Ok(addr) = listener.local_addr() {
        log::info!("listening on {}", addr);
    }
    axum::serve(listener, create_router(service))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            log::info!("shutting down");
        })
        .await
}
