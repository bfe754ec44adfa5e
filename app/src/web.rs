use std::fmt;

use actix_web::{error::BlockingError, http::StatusCode, web, HttpResponse, ResponseError};
use log::*;
use serde::Serialize;
use serde_json::json;

use infra::persistence::ConcurrencyError;

use crate::errors::Rejection;

/// Carries a service failure out to the client as `{"error": ...}`.
#[derive(Debug)]
pub struct ApiError(anyhow::Error);

impl ApiError {
    fn rejection(&self) -> Option<&Rejection> {
        self.0.chain().find_map(|e| e.downcast_ref::<Rejection>())
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        write!(fmt, "{:#}", self.0)
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        if let Some(rejection) = self.rejection() {
            if rejection.is_conflict() {
                StatusCode::CONFLICT
            } else if rejection.is_not_found() {
                StatusCode::NOT_FOUND
            } else {
                StatusCode::BAD_REQUEST
            }
        } else if self.0.root_cause().is::<ConcurrencyError>() {
            StatusCode::CONFLICT
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        if status.is_server_error() {
            error!("Request failed: {:?}", self.0);
        } else {
            info!("Request refused ({}): {}", status, self);
        }
        HttpResponse::build(status).json(json!({ "error": self.to_string() }))
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        ApiError(err)
    }
}

impl From<Rejection> for ApiError {
    fn from(err: Rejection) -> Self {
        ApiError(err.into())
    }
}

impl From<BlockingError> for ApiError {
    fn from(err: BlockingError) -> Self {
        ApiError(anyhow::anyhow!("{}", err))
    }
}

/// Runs a storage call on the blocking thread pool.
pub(crate) async fn in_pool<R, F>(f: F) -> Result<R, ApiError>
where
    F: FnOnce() -> anyhow::Result<R> + Send + 'static,
    R: Send + 'static,
{
    Ok(web::block(f).await??)
}

/// Queries that succeed with nothing become a 404.
pub(crate) fn found<T: Serialize>(what: &str, item: Option<T>) -> HttpResponse {
    match item {
        Some(item) => HttpResponse::Ok().json(item),
        None => {
            debug!("No such {}", what);
            HttpResponse::NotFound().json(json!({ "error": format!("{} not found", what) }))
        }
    }
}
