// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Authorization tests for the bus-backed routes.
//!
//! - `GET /api/ping` requires `read`: guests, members and admins pass
//! - `POST /api/echo` requires `write`: guests are refused, members and admins pass
//! - Refusals carry the engine's machine-readable kind in the JSON body

use axum::http::{Method, StatusCode};
use loom_server::routes::bus::BusReplyResponse;
use loom_server::ErrorResponse;
use serde_json::json;

use super::support::{json_body, run_authz_cases, AuthzCase, TestApp};

// ============================================================================
// GET /api/ping
// ============================================================================

#[tokio::test]
async fn everyone_can_ping() {
	let app = TestApp::new();
	let cases = [
		AuthzCase {
			name: "guest_can_ping",
			method: Method::GET,
			path: "/api/ping".to_string(),
			user: None,
			body: None,
			expected_status: StatusCode::OK,
		},
		AuthzCase {
			name: "member_can_ping",
			method: Method::GET,
			path: "/api/ping".to_string(),
			user: Some(app.fixtures.member.clone()),
			body: None,
			expected_status: StatusCode::OK,
		},
		AuthzCase {
			name: "admin_can_ping",
			method: Method::GET,
			path: "/api/ping".to_string(),
			user: Some(app.fixtures.admin.clone()),
			body: None,
			expected_status: StatusCode::OK,
		},
	];
	run_authz_cases(&app, &cases).await;
}

#[tokio::test]
async fn ping_relays_pong_with_guest_policy() {
	let app = TestApp::new();
	let response = app.get("/api/ping", None).await;
	assert_eq!(response.status(), StatusCode::OK);

	let body: BusReplyResponse = json_body(response).await;
	assert_eq!(body.reply, json!("pong"));
	assert_eq!(body.subject, None);
	assert_eq!(body.policies, vec!["Guest".to_string()]);
}

#[tokio::test]
async fn ping_reports_resolved_subject() {
	let app = TestApp::new();
	let response = app.get("/api/ping", Some(&app.fixtures.member)).await;

	let body: BusReplyResponse = json_body(response).await;
	assert_eq!(body.subject.as_deref(), Some("bob"));
	assert_eq!(body.policies, vec!["Member".to_string()]);
}

#[tokio::test]
async fn unknown_token_is_treated_as_guest() {
	let app = TestApp::new();
	let mut stranger = app.fixtures.member.clone();
	stranger.token = "tok_forged".to_string();

	let response = app.get("/api/ping", Some(&stranger)).await;
	let body: BusReplyResponse = json_body(response).await;
	assert_eq!(body.subject, None);
	assert_eq!(body.policies, vec!["Guest".to_string()]);
}

// ============================================================================
// POST /api/echo
// ============================================================================

#[tokio::test]
async fn echo_requires_write() {
	let app = TestApp::new();
	let payload = json!({"hello": "world"});
	let cases = [
		AuthzCase {
			name: "guest_cannot_echo",
			method: Method::POST,
			path: "/api/echo".to_string(),
			user: None,
			body: Some(payload.clone()),
			expected_status: StatusCode::FORBIDDEN,
		},
		AuthzCase {
			name: "member_can_echo",
			method: Method::POST,
			path: "/api/echo".to_string(),
			user: Some(app.fixtures.member.clone()),
			body: Some(payload.clone()),
			expected_status: StatusCode::OK,
		},
		AuthzCase {
			name: "admin_can_echo",
			method: Method::POST,
			path: "/api/echo".to_string(),
			user: Some(app.fixtures.admin.clone()),
			body: Some(payload),
			expected_status: StatusCode::OK,
		},
	];
	run_authz_cases(&app, &cases).await;
}

#[tokio::test]
async fn guest_echo_refusal_is_forbidden_kind() {
	let app = TestApp::new();
	let response = app.post("/api/echo", None, json!("hi")).await;
	assert_eq!(response.status(), StatusCode::FORBIDDEN);

	let body: ErrorResponse = json_body(response).await;
	assert_eq!(body.error, "forbidden");
	assert!(body.message.contains("write"), "{}", body.message);
}

#[tokio::test]
async fn echo_returns_payload() {
	let app = TestApp::new();
	let payload = json!({"items": [1, 2, 3]});
	let response = app
		.post("/api/echo", Some(&app.fixtures.admin), payload.clone())
		.await;

	let body: BusReplyResponse = json_body(response).await;
	assert_eq!(body.reply, payload);
	assert_eq!(body.subject.as_deref(), Some("alice"));
	assert_eq!(body.policies, vec!["Admin".to_string()]);
}
