// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Loom request execution server.
//!
//! Every request under `/api` runs inside its own execution context (request
//! id, unit of work and message bus) and is authorized by the policy engine
//! before its handler runs.

pub mod context_middleware;
pub mod dispatch;
pub mod error;
pub mod policies;
pub mod policy_layer;
pub mod routes;
pub mod state;

pub use context_middleware::context_middleware;
pub use dispatch::Dispatcher;
pub use error::{ErrorResponse, ServerError};
pub use loom_server_config::ServerConfig;
pub use policies::default_policies;
pub use policy_layer::RequirePolicy;
pub use state::{create_app_state, create_app_state_with, AppState, DevModeResolver};

use axum::{
	middleware,
	routing::{get, post},
	Router,
};
use loom_server_auth::Action;

/// Builds the HTTP router.
///
/// `/health` is served outside any execution context. Routes under `/api`
/// get a context from [`context_middleware`] and a per-route [`RequirePolicy`].
pub fn create_router(state: AppState) -> Router {
	let engine = state.engine().clone();

	let api = Router::new()
		.route(
			"/api/ping",
			get(routes::bus::ping).route_layer(RequirePolicy::new(engine.clone(), Action::READ)),
		)
		.route(
			"/api/echo",
			post(routes::bus::echo).route_layer(RequirePolicy::new(engine, Action::WRITE)),
		)
		.layer(middleware::from_fn_with_state(
			state.clone(),
			context_middleware,
		));

	Router::new()
		.route("/health", get(routes::health::health_check))
		.merge(api)
		.with_state(state)
}
