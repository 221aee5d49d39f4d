// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use async_trait::async_trait;
use axum::{
	body::Body,
	http::{header, Method, Request, StatusCode},
	response::Response,
	Router,
};
use loom_server::{create_app_state_with, create_router, AppState, ServerConfig};
use loom_server_auth::{BearerTokenResolver, Subject, TokenRejected, TokenVerifier, UserIdentity};
use loom_server_context::{UnitOfWork, UnitOfWorkError, UnitOfWorkFactory};
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;
use tower::ServiceExt;

#[derive(Debug, Clone)]
pub struct TestUser {
	pub user_id: String,
	pub token: String,
	pub roles: Vec<String>,
}

impl TestUser {
	fn new(user_id: &str, roles: &[&str]) -> Self {
		Self {
			user_id: user_id.to_string(),
			token: format!("tok_{user_id}"),
			roles: roles.iter().map(|r| r.to_string()).collect(),
		}
	}

	pub fn auth_header(&self) -> (header::HeaderName, String) {
		(header::AUTHORIZATION, format!("Bearer {}", self.token))
	}
}

pub struct Fixtures {
	pub admin: TestUser,
	pub member: TestUser,
}

/// Maps the fixture users' tokens to identities.
#[derive(Debug, Clone, Default)]
pub struct FixtureVerifier {
	users: HashMap<String, TestUser>,
}

#[async_trait]
impl TokenVerifier for FixtureVerifier {
	async fn verify(&self, token: &str) -> Result<Subject, TokenRejected> {
		let user = self
			.users
			.get(token)
			.ok_or_else(|| TokenRejected("unknown token".to_string()))?;
		let identity = user
			.roles
			.iter()
			.fold(UserIdentity::new(&user.user_id), |id, role| {
				id.with_role(role.clone())
			});
		Ok(Subject::new(identity))
	}
}

/// Lifecycle event recorded by [`RecordingFactory`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UowEvent {
	Begin,
	Commit,
	Rollback,
}

#[derive(Debug)]
struct RecordingUnitOfWork {
	log: Arc<Mutex<Vec<UowEvent>>>,
}

#[async_trait]
impl UnitOfWork for RecordingUnitOfWork {
	async fn begin(&self) -> Result<(), UnitOfWorkError> {
		self.log.lock().push(UowEvent::Begin);
		Ok(())
	}

	async fn commit(&self) -> Result<(), UnitOfWorkError> {
		self.log.lock().push(UowEvent::Commit);
		Ok(())
	}

	async fn rollback(&self) -> Result<(), UnitOfWorkError> {
		self.log.lock().push(UowEvent::Rollback);
		Ok(())
	}

	fn as_any(&self) -> &dyn Any {
		self
	}
}

#[derive(Debug, Clone, Default)]
pub struct RecordingFactory {
	pub log: Arc<Mutex<Vec<UowEvent>>>,
}

#[async_trait]
impl UnitOfWorkFactory for RecordingFactory {
	async fn create(&self) -> Result<Arc<dyn UnitOfWork>, UnitOfWorkError> {
		Ok(Arc::new(RecordingUnitOfWork {
			log: Arc::clone(&self.log),
		}))
	}
}

pub struct TestApp {
	pub router: Router,
	pub fixtures: Fixtures,
	pub state: AppState,
	pub unit_of_work: RecordingFactory,
}

impl TestApp {
	pub fn new() -> Self {
		Self::with_config(ServerConfig::default())
	}

	pub fn with_config(config: ServerConfig) -> Self {
		let fixtures = Fixtures {
			admin: TestUser::new("alice", &["admin"]),
			member: TestUser::new("bob", &[]),
		};
		let verifier = FixtureVerifier {
			users: [&fixtures.admin, &fixtures.member]
				.into_iter()
				.map(|u| (u.token.clone(), u.clone()))
				.collect(),
		};
		let unit_of_work = RecordingFactory::default();

		let state = create_app_state_with(
			&config,
			BearerTokenResolver::new(verifier),
			Arc::new(unit_of_work.clone()),
		)
		.unwrap();

		Self {
			router: create_router(state.clone()),
			fixtures,
			state,
			unit_of_work,
		}
	}

	pub fn uow_events(&self) -> Vec<UowEvent> {
		self.unit_of_work.log.lock().clone()
	}

	pub async fn request(
		&self,
		method: Method,
		path: &str,
		user: Option<&TestUser>,
		body: Option<serde_json::Value>,
	) -> Response<Body> {
		let mut builder = Request::builder().method(method).uri(path);

		if let Some(test_user) = user {
			let (name, value) = test_user.auth_header();
			builder = builder.header(name, value);
		}

		let request_body = match body {
			Some(b) => {
				builder = builder.header(header::CONTENT_TYPE, "application/json");
				Body::from(serde_json::to_string(&b).unwrap())
			}
			None => Body::empty(),
		};

		self
			.router
			.clone()
			.oneshot(builder.body(request_body).unwrap())
			.await
			.unwrap()
	}

	pub async fn get(&self, path: &str, user: Option<&TestUser>) -> Response<Body> {
		self.request(Method::GET, path, user, None).await
	}

	pub async fn post(
		&self,
		path: &str,
		user: Option<&TestUser>,
		body: serde_json::Value,
	) -> Response<Body> {
		self.request(Method::POST, path, user, Some(body)).await
	}
}

pub async fn json_body<T: DeserializeOwned>(response: Response<Body>) -> T {
	let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
		.await
		.unwrap();
	serde_json::from_slice(&bytes).unwrap()
}

pub struct AuthzCase {
	pub name: &'static str,
	pub method: Method,
	pub path: String,
	pub user: Option<TestUser>,
	pub body: Option<serde_json::Value>,
	pub expected_status: StatusCode,
}

pub async fn run_authz_cases(app: &TestApp, cases: &[AuthzCase]) {
	for case in cases {
		let response = app
			.request(
				case.method.clone(),
				&case.path,
				case.user.as_ref(),
				case.body.clone(),
			)
			.await;

		if response.status() != case.expected_status {
			let (parts, body) = response.into_parts();
			let body_bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
			let body_str = String::from_utf8_lossy(&body_bytes);
			panic!(
				"Case '{}': {} {} - expected {}, got {}\nResponse body: {}",
				case.name, case.method, case.path, case.expected_status, parts.status, body_str
			);
		}
	}
}
