//! Request extractors and error responses

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequest, FromRequestParts, Request};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::de::DeserializeOwned;
use tracing::{error, warn};

use crate::authn::Principal;
use crate::errors::GatewayError;
use crate::server::state::ServerState;

pub use openapi_server::models::ErrorResponse;

/// Caller resolved from the `Authorization: Bearer` header
#[derive(Debug, Clone)]
pub struct Caller(pub Principal);

impl FromRequestParts<Arc<ServerState>> for Caller {
    type Rejection = GatewayError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<ServerState>,
    ) -> Result<Self, Self::Rejection> {
        let bearer = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "));
        state.gateway.authenticate(bearer).await.map(Caller)
    }
}

/// JSON request body whose parse failures answer with the error envelope
#[derive(Debug, Clone)]
pub struct JsonBody<T>(pub T);

impl<T, S> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = GatewayError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        Ok(JsonBody(value))
    }
}

impl From<JsonRejection> for GatewayError {
    fn from(rejection: JsonRejection) -> Self {
        GatewayError::ValidationError(rejection.body_text())
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let kind = self.kind();
        let status = kind.status_code();
        if status.is_server_error() {
            error!("Request failed ({}): {}", kind.as_str(), self);
        } else {
            warn!("Request rejected ({}): {}", kind.as_str(), self);
        }

        let body = ErrorResponse {
            error: self.to_string(),
            kind: kind.as_str().to_string(),
            category: kind.category().to_string(),
        };
        (status, Json(body)).into_response()
    }
}
