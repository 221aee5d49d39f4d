// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Middleware binding a fresh execution context to every request.
//!
//! Everything below this layer (route layers, extractors and handlers) runs
//! inside the request's context and can call
//! [`loom_server_context::current_context`].

use axum::{
	extract::{ConnectInfo, Request, State},
	middleware::Next,
	response::Response,
};
use loom_server_auth::ConnectAddr;
use std::net::SocketAddr;

use crate::error::ServerError;
use crate::state::AppState;

/// Opens a unit of work, binds the execution context and runs the rest of
/// the stack inside it.
///
/// The unit of work commits when the response is neither a client nor a
/// server error, and rolls back otherwise.
pub async fn context_middleware(
	State(state): State<AppState>,
	mut req: Request,
	next: Next,
) -> Result<Response, ServerError> {
	if let Some(ConnectInfo(addr)) = req.extensions().get::<ConnectInfo<SocketAddr>>().cloned() {
		req.extensions_mut().insert(ConnectAddr(addr));
	}

	let method = req.method().clone();
	let path = req.uri().path().to_string();

	let response = state
		.dispatcher
		.in_context(next.run(req), |response: &Response| {
			let status = response.status();
			!(status.is_client_error() || status.is_server_error())
		})
		.await?;

	tracing::debug!(
		%method,
		%path,
		status = response.status().as_u16(),
		"request completed"
	);
	Ok(response)
}
