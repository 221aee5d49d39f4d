// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Execution context lifecycle across the HTTP stack.

use axum::http::StatusCode;
use loom_server::routes::bus::BusReplyResponse;
use loom_server::{create_app_state, create_router, ServerConfig};
use loom_server_config::AuthConfig;
use serde_json::json;
use tower::ServiceExt;

use super::support::{json_body, TestApp, UowEvent};

#[tokio::test]
async fn permitted_request_commits() {
	let app = TestApp::new();
	let response = app.get("/api/ping", None).await;
	assert_eq!(response.status(), StatusCode::OK);
	assert_eq!(app.uow_events(), vec![UowEvent::Begin, UowEvent::Commit]);
}

#[tokio::test]
async fn refused_request_rolls_back() {
	let app = TestApp::new();
	let response = app.post("/api/echo", None, json!(1)).await;
	assert_eq!(response.status(), StatusCode::FORBIDDEN);
	assert_eq!(app.uow_events(), vec![UowEvent::Begin, UowEvent::Rollback]);
}

#[tokio::test]
async fn each_request_gets_its_own_context() {
	let app = TestApp::new();
	let first: BusReplyResponse = json_body(app.get("/api/ping", None).await).await;
	let second: BusReplyResponse = json_body(app.get("/api/ping", None).await).await;

	assert_ne!(first.request_id, second.request_id);
	assert_eq!(
		app.uow_events(),
		vec![
			UowEvent::Begin,
			UowEvent::Commit,
			UowEvent::Begin,
			UowEvent::Commit
		]
	);
}

#[tokio::test]
async fn concurrent_requests_do_not_share_context() {
	let app = TestApp::new();
	let (a, b) = tokio::join!(
		app.post("/api/echo", Some(&app.fixtures.member), json!("a")),
		app.post("/api/echo", Some(&app.fixtures.admin), json!("b")),
	);
	let a: BusReplyResponse = json_body(a).await;
	let b: BusReplyResponse = json_body(b).await;

	assert_eq!(a.reply, json!("a"));
	assert_eq!(b.reply, json!("b"));
	assert_ne!(a.request_id, b.request_id);
}

#[tokio::test]
async fn dev_mode_runs_every_request_as_admin() {
	let config = ServerConfig {
		auth: AuthConfig {
			dev_mode: true,
			..Default::default()
		},
		..Default::default()
	};
	let router = create_router(create_app_state(&config).unwrap());

	let request = axum::http::Request::builder()
		.method("POST")
		.uri("/api/echo")
		.header("content-type", "application/json")
		.body(axum::body::Body::from("\"hi\""))
		.unwrap();
	let response = router.oneshot(request).await.unwrap();
	assert_eq!(response.status(), StatusCode::OK);

	let body: BusReplyResponse = json_body(response).await;
	assert_eq!(body.subject.as_deref(), Some("dev-user"));
	assert_eq!(body.policies, vec!["Admin".to_string()]);
}
