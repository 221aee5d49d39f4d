// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Server error types and HTTP response conversions.

use axum::{
	http::StatusCode,
	response::{IntoResponse, Response},
	Json,
};
use loom_common_bus::BusError;
use loom_server_auth::AuthorizationError;
use loom_server_context::{ContextError, UnitOfWorkError};
use serde::{Deserialize, Serialize};

/// Errors surfaced at the request-dispatch boundary.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
	/// The policy engine refused the request.
	#[error(transparent)]
	Authorization(#[from] AuthorizationError),

	/// Code ran outside a request scope.
	#[error(transparent)]
	Context(#[from] ContextError),

	/// The persistence collaborator failed to open or finish the unit of work.
	#[error(transparent)]
	UnitOfWork(#[from] UnitOfWorkError),

	/// A bus exchange failed or timed out.
	#[error(transparent)]
	Bus(#[from] BusError),

	/// Invalid request payload.
	#[error("Invalid request: {0}")]
	BadRequest(String),

	/// Internal server error.
	#[error("Internal error: {0}")]
	Internal(String),
}

/// Error response body.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
	pub error: String,
	pub message: String,
}

impl ErrorResponse {
	fn new(error: &str, message: impl Into<String>) -> Self {
		Self {
			error: error.to_string(),
			message: message.into(),
		}
	}
}

impl ServerError {
	pub fn status(&self) -> StatusCode {
		match self {
			ServerError::Authorization(e) => e.status(),
			ServerError::Bus(BusError::Timeout { .. }) => StatusCode::GATEWAY_TIMEOUT,
			ServerError::Bus(BusError::Handler { .. }) => StatusCode::BAD_GATEWAY,
			ServerError::Bus(BusError::Closed) => StatusCode::SERVICE_UNAVAILABLE,
			ServerError::BadRequest(_) => StatusCode::BAD_REQUEST,
			ServerError::Context(_) | ServerError::UnitOfWork(_) | ServerError::Internal(_) => {
				StatusCode::INTERNAL_SERVER_ERROR
			}
		}
	}
}

impl IntoResponse for ServerError {
	fn into_response(self) -> Response {
		let body = match &self {
			ServerError::Authorization(e) => {
				ErrorResponse::new(e.kind().as_str(), e.to_string())
			}
			ServerError::Context(e) => {
				tracing::error!(error = %e, "execution context missing");
				ErrorResponse::new("internal_error", "An internal error occurred")
			}
			ServerError::UnitOfWork(e) => {
				tracing::error!(error = %e, "unit of work failed");
				ErrorResponse::new("internal_error", "An internal error occurred")
			}
			ServerError::Bus(e @ BusError::Timeout { .. }) => {
				tracing::warn!(error = %e, "bus timeout");
				ErrorResponse::new("upstream_timeout", e.to_string())
			}
			ServerError::Bus(e @ BusError::Handler { .. }) => {
				tracing::warn!(error = %e, "bus handler error");
				ErrorResponse::new("upstream_error", e.to_string())
			}
			ServerError::Bus(e @ BusError::Closed) => {
				tracing::warn!(error = %e, "bus closed");
				ErrorResponse::new("service_unavailable", e.to_string())
			}
			ServerError::BadRequest(msg) => ErrorResponse::new("bad_request", msg.clone()),
			ServerError::Internal(msg) => {
				tracing::error!(error = %msg, "internal error");
				ErrorResponse::new("internal_error", "An internal error occurred")
			}
		};

		(self.status(), Json(body)).into_response()
	}
}
