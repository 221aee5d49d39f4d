// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Route-level policy enforcement.
//!
//! [`RequirePolicy`] authorizes a route's action with the [`PolicyEngine`]
//! before the handler runs. On success the [`Authorization`] is stored in the
//! request extensions, so handlers can extract it with
//! `Extension<Authorization>`. On failure the request is answered with the
//! engine's `403` and the handler never runs.
//!
//! # Example
//!
//! ```ignore
//! use loom_server::policy_layer::RequirePolicy;
//! use loom_server_auth::{Action, ResourceAttrs};
//!
//! Router::new()
//!     .route("/api/threads", get(list_threads))
//!     .route_layer(RequirePolicy::new(engine.clone(), Action::READ))
//!     .route(
//!         "/api/threads/{id}",
//!         delete(delete_thread).route_layer(
//!             RequirePolicy::new(engine, Action::DELETE)
//!                 .with_resource(|parts| Some(ResourceAttrs::new("thread"))),
//!         ),
//!     );
//! ```

use axum::{
	body::Body,
	http::{request::Parts, Request},
	response::{IntoResponse, Response},
};
use futures::future::BoxFuture;
use loom_server_auth::{Action, Authorization, AuthorizationError, PolicyEngine, ResourceAttrs};
use pin_project_lite::pin_project;
use std::{
	fmt,
	future::Future,
	pin::Pin,
	sync::Arc,
	task::{ready, Context, Poll},
};
use tower::{Layer, Service};

use crate::error::ServerError;

type ResourceFn = Arc<dyn Fn(&Parts) -> Option<ResourceAttrs> + Send + Sync>;

type Decision = BoxFuture<'static, (Parts, Result<Authorization, AuthorizationError>)>;

/// Route layer requiring the policy engine to permit an action.
#[derive(Clone)]
pub struct RequirePolicy {
	engine: PolicyEngine,
	action: Action,
	resource: Option<ResourceFn>,
}

impl RequirePolicy {
	pub fn new(engine: PolicyEngine, action: impl Into<Action>) -> Self {
		Self {
			engine,
			action: action.into(),
			resource: None,
		}
	}

	/// Derives the target resource from the request before authorizing.
	pub fn with_resource<F>(mut self, resource: F) -> Self
	where
		F: Fn(&Parts) -> Option<ResourceAttrs> + Send + Sync + 'static,
	{
		self.resource = Some(Arc::new(resource));
		self
	}
}

impl fmt::Debug for RequirePolicy {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("RequirePolicy")
			.field("action", &self.action)
			.field("resource_scoped", &self.resource.is_some())
			.finish_non_exhaustive()
	}
}

impl<S> Layer<S> for RequirePolicy {
	type Service = RequirePolicyService<S>;

	fn layer(&self, inner: S) -> Self::Service {
		RequirePolicyService {
			inner,
			policy: self.clone(),
		}
	}
}

/// Service wrapper for [`RequirePolicy`] layer.
#[derive(Clone)]
pub struct RequirePolicyService<S> {
	inner: S,
	policy: RequirePolicy,
}

impl<S> Service<Request<Body>> for RequirePolicyService<S>
where
	S: Service<Request<Body>, Response = Response> + Clone + Send + 'static,
	S::Future: Send,
{
	type Response = Response;
	type Error = S::Error;
	type Future = RequirePolicyFuture<S, S::Future>;

	fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
		self.inner.poll_ready(cx)
	}

	fn call(&mut self, req: Request<Body>) -> Self::Future {
		// The readied service moves into the future; a fresh clone stays behind.
		let clone = self.inner.clone();
		let inner = std::mem::replace(&mut self.inner, clone);

		let (parts, body) = req.into_parts();
		let resource = self.policy.resource.as_ref().and_then(|derive| derive(&parts));
		let engine = self.policy.engine.clone();
		let action = self.policy.action.clone();

		let decision: Decision = Box::pin(async move {
			let outcome = engine.authorize(&parts, &action, resource.as_ref()).await;
			(parts, outcome)
		});

		RequirePolicyFuture::Authorizing {
			decision,
			inner: Some(inner),
			body: Some(body),
		}
	}
}

pin_project! {
	/// Future for [`RequirePolicyService`].
	#[project = RequirePolicyFutureProj]
	pub enum RequirePolicyFuture<S, F> {
		Authorizing {
			decision: Decision,
			inner: Option<S>,
			body: Option<Body>,
		},
		Inner { #[pin] fut: F },
	}
}

impl<S> Future for RequirePolicyFuture<S, S::Future>
where
	S: Service<Request<Body>, Response = Response>,
{
	type Output = Result<Response, S::Error>;

	fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
		loop {
			let next = match self.as_mut().project() {
				RequirePolicyFutureProj::Inner { fut } => return fut.poll(cx),
				RequirePolicyFutureProj::Authorizing {
					decision,
					inner,
					body,
				} => {
					let (mut parts, outcome) = ready!(decision.as_mut().poll(cx));
					let authorization = match outcome {
						Ok(authorization) => authorization,
						Err(e) => return Poll::Ready(Ok(ServerError::from(e).into_response())),
					};

					let (Some(mut inner), Some(body)) = (inner.take(), body.take()) else {
						return Poll::Ready(Ok(ServerError::Internal(
							"policy future polled after completion".to_string(),
						)
						.into_response()));
					};

					parts.extensions.insert(authorization);
					inner.call(Request::from_parts(parts, body))
				}
			};

			self.set(RequirePolicyFuture::Inner { fut: next });
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use axum::http::StatusCode;
	use loom_server_auth::{predicates, AllowAll, AllowList, Environment, FnPolicy, PolicySet, Subject};
	use std::convert::Infallible;
	use std::sync::atomic::{AtomicBool, Ordering};
	use tower::{service_fn, ServiceExt};

	fn is_public(_: Option<&Subject>, resource: Option<&ResourceAttrs>, _: &Environment) -> bool {
		resource.is_some_and(|r| r.attribute("public") == Some(&serde_json::Value::Bool(true)))
	}

	fn engine() -> PolicyEngine {
		let policies = PolicySet::new()
			.with(FnPolicy::new(
				"Guest",
				AllowList::new([Action::READ]),
				predicates::anonymous,
			))
			.unwrap();
		PolicyEngine::new(policies)
	}

	async fn policy_names(req: Request<Body>) -> Result<Response, Infallible> {
		let names = req
			.extensions()
			.get::<Authorization>()
			.map(|a| a.policies.join(","))
			.unwrap_or_default();
		Ok(names.into_response())
	}

	async fn body_text(response: Response) -> String {
		let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
			.await
			.unwrap();
		String::from_utf8(bytes.to_vec()).unwrap()
	}

	#[tokio::test]
	async fn permitted_request_carries_authorization() {
		let service = RequirePolicy::new(engine(), Action::READ).layer(service_fn(policy_names));

		let response = service.oneshot(Request::new(Body::empty())).await.unwrap();
		assert_eq!(response.status(), StatusCode::OK);
		assert_eq!(body_text(response).await, "Guest");
	}

	#[tokio::test]
	async fn refused_request_never_reaches_inner() {
		let called = Arc::new(AtomicBool::new(false));
		let inner = {
			let called = Arc::clone(&called);
			service_fn(move |_req: Request<Body>| {
				called.store(true, Ordering::SeqCst);
				async { Ok::<_, Infallible>(Response::new(Body::empty())) }
			})
		};

		let service = RequirePolicy::new(engine(), Action::DELETE).layer(inner);
		let response = service.oneshot(Request::new(Body::empty())).await.unwrap();

		assert_eq!(response.status(), StatusCode::FORBIDDEN);
		assert!(!called.load(Ordering::SeqCst));
	}

	#[tokio::test]
	async fn resource_is_derived_from_the_request() {
		let policies = PolicySet::new()
			.with(FnPolicy::new("Public", AllowAll, is_public))
			.unwrap();
		let layer = RequirePolicy::new(PolicyEngine::new(policies), Action::READ).with_resource(|parts| {
			let public = parts.headers.contains_key("x-public");
			Some(ResourceAttrs::new("document").with_attribute("public", public))
		});

		let public = Request::builder()
			.header("x-public", "1")
			.body(Body::empty())
			.unwrap();
		let response = layer
			.clone()
			.layer(service_fn(policy_names))
			.oneshot(public)
			.await
			.unwrap();
		assert_eq!(body_text(response).await, "Public");

		let private = Request::new(Body::empty());
		let response = layer
			.layer(service_fn(policy_names))
			.oneshot(private)
			.await
			.unwrap();
		assert_eq!(response.status(), StatusCode::FORBIDDEN);
	}
}
