use axum::{
    http::StatusCode,
    response::{Html, IntoResponse},
};
use tracing::warn;

use crate::store::StoreError;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, Clone)]
pub struct AppError {
    status: StatusCode,
    detail: Option<String>,
}

impl AppError {
    /// Create a new [`AppError`].
    pub fn new(status_code: StatusCode, message: Option<impl ToString>) -> AppError {
        Self {
            status: status_code,
            detail: message.map(|m| m.to_string()),
        }
    }

    pub fn not_found(message: impl ToString) -> AppError {
        Self::new(StatusCode::NOT_FOUND, Some(message))
    }

    #[cfg(test)]
    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let reason = self.status.canonical_reason().unwrap_or("Error");
        let detail = self
            .detail
            .as_deref()
            .map(|detail| format!("<p>{}</p>", handlebars::html_escape(detail)))
            .unwrap_or_default();
        let body = format!(
            "<!DOCTYPE html>\n<html><head><title>{code} {reason}</title></head>\
             <body><h1>{code} {reason}</h1>{detail}<p><a href=\"/\">Back to the catalog</a></p></body></html>",
            code = self.status.as_u16(),
        );
        (self.status, Html(body)).into_response()
    }
}

impl From<anyhow::Error> for AppError {
    fn from(value: anyhow::Error) -> Self {
        warn!("request failed: {value:#}");
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            detail: Some(value.to_string()),
        }
    }
}

impl From<StoreError> for AppError {
    fn from(value: StoreError) -> Self {
        let status = match &value {
            StoreError::UnknownCategory(_) | StoreError::ItemNotFound(_) => StatusCode::NOT_FOUND,
            StoreError::DuplicateItem { .. } => StatusCode::CONFLICT,
            StoreError::Storage(err) => {
                warn!(?err, "storage failure");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        Self::new(status, Some(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_errors_map_to_status() {
        let err = AppError::from(StoreError::ItemNotFound(7.into()));
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
        let err = AppError::from(StoreError::DuplicateItem {
            category: "Soccer".into(),
            name: "Ball".into(),
        });
        assert_eq!(err.status(), StatusCode::CONFLICT);
        let err = AppError::from(anyhow::anyhow!("boom"));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
