// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Handlers that exchange messages over the request's bus.

use axum::{extract::State, response::IntoResponse, Extension, Json};
use loom_common_bus::MessageBus;
use loom_server_auth::Authorization;
use loom_server_context::current_context;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::{error::ServerError, state::AppState};

pub const PING_EVENT: &str = "ping";
pub const ECHO_EVENT: &str = "echo";

/// Reply relayed from a bus subscriber.
#[derive(Debug, Serialize, Deserialize)]
pub struct BusReplyResponse {
	pub reply: Value,
	pub request_id: Uuid,
	pub subject: Option<String>,
	pub policies: Vec<String>,
}

/// Installs the server's built-in subscribers.
pub fn register_bus_handlers(bus: &MessageBus) {
	bus.subscribe(PING_EVENT, |_| Ok(Value::String("pong".to_string())));
	bus.subscribe(ECHO_EVENT, |args| {
		Ok(args.first().cloned().unwrap_or(Value::Null))
	});
}

/// GET /api/ping - Sends `ping` on the bus and relays the reply.
#[axum::debug_handler]
pub async fn ping(
	State(state): State<AppState>,
	Extension(authorization): Extension<Authorization>,
) -> Result<impl IntoResponse, ServerError> {
	relay(&state, &authorization, PING_EVENT, vec![]).await
}

/// POST /api/echo - Sends the JSON body on the bus and relays the reply.
#[axum::debug_handler]
pub async fn echo(
	State(state): State<AppState>,
	Extension(authorization): Extension<Authorization>,
	Json(payload): Json<Value>,
) -> Result<impl IntoResponse, ServerError> {
	relay(&state, &authorization, ECHO_EVENT, vec![payload]).await
}

async fn relay(
	state: &AppState,
	authorization: &Authorization,
	event: &'static str,
	args: Vec<Value>,
) -> Result<Json<BusReplyResponse>, ServerError> {
	let ctx = current_context()?;
	let reply = ctx
		.bus()
		.send_timeout(event, args, state.config.bus.send_timeout())
		.await?;

	tracing::debug!(
		request_id = %ctx.request_id(),
		event,
		subject_id = ?authorization.subject_id(),
		"bus reply relayed"
	);

	Ok(Json(BusReplyResponse {
		reply,
		request_id: ctx.request_id(),
		subject: authorization.subject_id().map(str::to_string),
		policies: authorization.policies.clone(),
	}))
}
