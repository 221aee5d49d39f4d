// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Liveness endpoint.

use axum::{extract::State, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};

use crate::state::AppState;

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
	pub status: String,
	pub version: String,
	pub policies: usize,
}

/// GET /health - Liveness check.
///
/// Bypasses policy enforcement.
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
	Json(HealthResponse {
		status: "ok".to_string(),
		version: env!("CARGO_PKG_VERSION").to_string(),
		policies: state.engine().policies().len(),
	})
}
