// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Identity resolution.
//!
//! An [`IdentityResolver`] turns request credentials into a [`Subject`].
//! Missing or invalid credentials are not an error: the request simply has
//! no subject and is evaluated as anonymous.

use async_trait::async_trait;
use http::header::{AUTHORIZATION, COOKIE};
use http::request::Parts;
use http::HeaderMap;
use std::any::Any;
use std::fmt;
use std::sync::Arc;

pub const SESSION_COOKIE_NAME: &str = "loom_session";

/// A resolved identity, whatever scheme produced it.
pub trait Identity: fmt::Debug + Send + Sync + 'static {
	/// Stable identifier, safe to log.
	fn id(&self) -> &str;

	/// Scheme that produced the identity, e.g. `"user"` or `"service"`.
	fn scheme(&self) -> &'static str;

	fn as_any(&self) -> &dyn Any;
}

/// Opaque handle to the identity behind a request.
#[derive(Debug, Clone)]
pub struct Subject(Arc<dyn Identity>);

impl Subject {
	pub fn new(identity: impl Identity) -> Self {
		Self(Arc::new(identity))
	}

	pub fn id(&self) -> &str {
		self.0.id()
	}

	pub fn scheme(&self) -> &'static str {
		self.0.scheme()
	}

	pub fn downcast_ref<T: Identity>(&self) -> Option<&T> {
		self.0.as_any().downcast_ref::<T>()
	}
}

/// An authenticated user with global roles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserIdentity {
	pub user_id: String,
	pub roles: Vec<String>,
}

impl UserIdentity {
	pub fn new(user_id: impl Into<String>) -> Self {
		Self {
			user_id: user_id.into(),
			roles: Vec::new(),
		}
	}

	pub fn with_role(mut self, role: impl Into<String>) -> Self {
		self.roles.push(role.into());
		self
	}

	pub fn has_role(&self, role: &str) -> bool {
		self.roles.iter().any(|r| r == role)
	}
}

impl Identity for UserIdentity {
	fn id(&self) -> &str {
		&self.user_id
	}

	fn scheme(&self) -> &'static str {
		"user"
	}

	fn as_any(&self) -> &dyn Any {
		self
	}
}

/// Produces the subject of a request.
#[async_trait]
pub trait IdentityResolver: Send + Sync {
	async fn resolve(&self, parts: &Parts) -> Option<Subject>;
}

#[async_trait]
impl<R: IdentityResolver + ?Sized> IdentityResolver for Arc<R> {
	async fn resolve(&self, parts: &Parts) -> Option<Subject> {
		(**self).resolve(parts).await
	}
}

/// Resolver for deployments without authentication. Every request is anonymous.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnonymousResolver;

#[async_trait]
impl IdentityResolver for AnonymousResolver {
	async fn resolve(&self, _parts: &Parts) -> Option<Subject> {
		None
	}
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("credential rejected: {0}")]
pub struct TokenRejected(pub String);

/// Validates an opaque credential and maps it to a subject.
#[async_trait]
pub trait TokenVerifier: Send + Sync {
	async fn verify(&self, token: &str) -> Result<Subject, TokenRejected>;
}

/// Resolves subjects from `Authorization: Bearer` or a session cookie.
///
/// The bearer token wins when both are present.
#[derive(Debug, Clone)]
pub struct BearerTokenResolver<V> {
	verifier: V,
	session_cookie: Option<String>,
}

impl<V: TokenVerifier> BearerTokenResolver<V> {
	pub fn new(verifier: V) -> Self {
		Self {
			verifier,
			session_cookie: None,
		}
	}

	/// Also accept the credential from the named cookie.
	pub fn with_session_cookie(mut self, cookie_name: impl Into<String>) -> Self {
		self.session_cookie = Some(cookie_name.into());
		self
	}
}

#[async_trait]
impl<V: TokenVerifier> IdentityResolver for BearerTokenResolver<V> {
	async fn resolve(&self, parts: &Parts) -> Option<Subject> {
		let token = extract_bearer_token(&parts.headers).or_else(|| {
			self
				.session_cookie
				.as_deref()
				.and_then(|name| extract_session_cookie_with_name(&parts.headers, name))
		})?;

		match self.verifier.verify(&token).await {
			Ok(subject) => {
				tracing::debug!(subject_id = %subject.id(), scheme = subject.scheme(), "Subject resolved");
				Some(subject)
			}
			Err(e) => {
				tracing::debug!(error = %e, "Credential rejected, treating request as anonymous");
				None
			}
		}
	}
}

/// Extract bearer token from the Authorization header.
///
/// Expects `Authorization: Bearer <token>`. Never log the returned value.
pub fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
	let token = headers
		.get(AUTHORIZATION)?
		.to_str()
		.ok()?
		.strip_prefix("Bearer ")?
		.trim();
	(!token.is_empty()).then(|| token.to_string())
}

/// Extract a cookie value by name from the Cookie header.
pub fn extract_session_cookie_with_name(headers: &HeaderMap, cookie_name: &str) -> Option<String> {
	headers
		.get(COOKIE)?
		.to_str()
		.ok()?
		.split(';')
		.find_map(|cookie| {
			let (name, value) = cookie.trim().split_once('=')?;
			(name == cookie_name && !value.is_empty()).then(|| value.to_string())
		})
}
