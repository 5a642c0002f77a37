//! HTTP routes and error responses.

use std::sync::Arc;

use axum::{
    Form, Json, Router,
    extract::{FromRequest, Request, State},
    http::{StatusCode, header::CONTENT_TYPE},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::Serialize;
use tower_http::trace::TraceLayer;
use tracing::{error, warn};

use binsight_core::{Classification, ClassifyService, ImageSubmission, PortError};

/// Fixed body of the liveness check.
pub const HEALTH_BODY: &str = "SUCCESS!";

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    service: Arc<ClassifyService>,
}

impl AppState {
    /// Wrap the classification service.
    #[must_use]
    pub fn new(service: Arc<ClassifyService>) -> Self {
        Self { service }
    }
}

/// Build the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/test", get(health))
        .route("/api/imgurl", post(classify_image))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> &'static str {
    HEALTH_BODY
}

/// Image submission read from a JSON or a urlencoded form body.
struct SubmissionBody(ImageSubmission);

impl<S> FromRequest<S> for SubmissionBody
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_form = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| value.starts_with(FORM_CONTENT_TYPE));

        // anything that is not a form goes through Json, which rejects other content types
        if is_form {
            let Form(submission) = Form::<ImageSubmission>::from_request(req, state)
                .await
                .map_err(IntoResponse::into_response)?;
            Ok(Self(submission))
        } else {
            let Json(submission) = Json::<ImageSubmission>::from_request(req, state)
                .await
                .map_err(IntoResponse::into_response)?;
            Ok(Self(submission))
        }
    }
}

async fn classify_image(
    State(state): State<AppState>,
    SubmissionBody(submission): SubmissionBody,
) -> Result<Json<Classification>, ApiError> {
    let classification = state.service.classify_image(submission).await?;
    Ok(Json(classification))
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    code: &'static str,
}

/// [`PortError`] rendered as an HTTP response.
#[derive(Debug)]
pub struct ApiError(pub PortError);

impl ApiError {
    /// Status code reported for the wrapped error.
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match &self.0 {
            PortError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            PortError::Network(_)
            | PortError::Upstream(_)
            | PortError::RecognitionFailed { .. } => StatusCode::BAD_GATEWAY,
            PortError::PollExhausted { .. } => StatusCode::GATEWAY_TIMEOUT,
            PortError::Classifier(_) | PortError::UnknownCategory(_) | PortError::Storage(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<PortError> for ApiError {
    fn from(err: PortError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!(code = self.0.code(), error = %self.0, "image classification failed");
        } else {
            warn!(code = self.0.code(), error = %self.0, "image classification rejected");
        }

        let body = ErrorBody {
            error: self.0.to_string(),
            code: self.0.code(),
        };
        (status, Json(body)).into_response()
    }
}
