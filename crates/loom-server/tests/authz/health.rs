// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use axum::http::StatusCode;
use loom_server::routes::health::HealthResponse;

use super::support::{json_body, TestApp};

#[tokio::test]
async fn health_is_public_and_outside_any_unit_of_work() {
	let app = TestApp::new();
	let response = app.get("/health", None).await;
	assert_eq!(response.status(), StatusCode::OK);

	let body: HealthResponse = json_body(response).await;
	assert_eq!(body.status, "ok");
	assert_eq!(body.policies, 3);
	assert!(app.uow_events().is_empty());
}

#[tokio::test]
async fn built_in_bus_handlers_are_registered() {
	let app = TestApp::new();
	let bus = app.state.dispatcher.bus();
	assert_eq!(bus.subscriber_count("ping"), 1);
	assert_eq!(bus.subscriber_count("echo"), 1);
	assert_eq!(bus.pending_waiters("ping"), 0);
}
