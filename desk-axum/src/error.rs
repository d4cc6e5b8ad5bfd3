use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use desk_core::DeskError;

#[derive(Debug)]
pub struct DeskAxumError(pub anyhow::Error);

impl From<anyhow::Error> for DeskAxumError {
    fn from(e: anyhow::Error) -> Self {
        Self(e)
    }
}

impl From<DeskError> for DeskAxumError {
    fn from(e: DeskError) -> Self {
        Self(e.into_anyhow())
    }
}

impl IntoResponse for DeskAxumError {
    fn into_response(self) -> Response {
        // DeskError anywhere in the chain keeps its kind; anything else is a GeneralError
        let safe = DeskError::normalize(self.0).sanitize_for_client();
        if safe.code() >= 500 {
            tracing::error!(code = safe.code(), message = %safe.message, "request failed");
        }
        let status =
            StatusCode::from_u16(safe.code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(safe.to_json())).into_response()
    }
}
