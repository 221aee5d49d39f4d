// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Policy evaluation engine.
//!
//! [`PolicyEngine::authorize`] runs the full decision for one request:
//!
//! 1. **Environment**: client address and agent are extracted from the request
//! 2. **Identity**: the configured resolver produces the subject, if any
//! 3. **Applicability**: every policy's predicate is evaluated
//! 4. **Consent**: every applicable policy must permit the action
//!
//! Steps 3 and 4 are exposed as the pure [`PolicyEngine::decide`].

use crate::environment::{Environment, EnvironmentConfig};
use crate::error::AuthorizationError;
use crate::identity::{AnonymousResolver, IdentityResolver, Subject};
use crate::policy::PolicySet;
use crate::types::{Action, ResourceAttrs};
use http::request::Parts;
use std::fmt;
use std::sync::Arc;
use tracing::instrument;

/// Outcome of a successful authorization.
#[derive(Debug, Clone)]
pub struct Authorization {
	pub subject: Option<Subject>,
	pub environment: Environment,
	pub action: Action,
	/// Names of the policies that applied, in registration order.
	pub policies: Vec<String>,
}

impl Authorization {
	pub fn subject_id(&self) -> Option<&str> {
		self.subject.as_ref().map(Subject::id)
	}
}

/// Authorizes requests against a fixed [`PolicySet`].
///
/// Cheap to clone; clones share the policy set and resolver.
#[derive(Clone)]
pub struct PolicyEngine {
	policies: Arc<PolicySet>,
	resolver: Arc<dyn IdentityResolver>,
	environment: EnvironmentConfig,
}

impl PolicyEngine {
	/// Creates an engine that treats every request as anonymous.
	pub fn new(policies: PolicySet) -> Self {
		Self {
			policies: Arc::new(policies),
			resolver: Arc::new(AnonymousResolver),
			environment: EnvironmentConfig::default(),
		}
	}

	pub fn with_resolver(mut self, resolver: impl IdentityResolver + 'static) -> Self {
		self.resolver = Arc::new(resolver);
		self
	}

	pub fn with_environment_config(mut self, config: EnvironmentConfig) -> Self {
		self.environment = config;
		self
	}

	pub fn policies(&self) -> &PolicySet {
		&self.policies
	}

	pub fn environment_config(&self) -> &EnvironmentConfig {
		&self.environment
	}

	/// Decides whether the request may perform `action` on `resource`.
	#[instrument(level = "debug", skip_all, fields(action = %action))]
	pub async fn authorize(
		&self,
		parts: &Parts,
		action: &Action,
		resource: Option<&ResourceAttrs>,
	) -> Result<Authorization, AuthorizationError> {
		let environment = Environment::from_request(parts, &self.environment);
		let subject = self.resolver.resolve(parts).await;

		let policies = self.decide(subject.as_ref(), resource, &environment, action)?;

		Ok(Authorization {
			subject,
			environment,
			action: action.clone(),
			policies,
		})
	}

	/// Pure decision over already-extracted inputs.
	///
	/// Returns the names of the applicable policies when all of them permit
	/// the action.
	pub fn decide(
		&self,
		subject: Option<&Subject>,
		resource: Option<&ResourceAttrs>,
		environment: &Environment,
		action: &Action,
	) -> Result<Vec<String>, AuthorizationError> {
		let subject_id = subject.map(Subject::id).unwrap_or("anonymous");

		let applicable: Vec<_> = self
			.policies
			.iter()
			.filter(|policy| policy.evaluate(subject, resource, environment))
			.collect();

		if applicable.is_empty() {
			tracing::info!(
				action = %action,
				subject_id,
				resource_kind = resource.map(|r| r.kind.as_str()),
				"Authorization denied: no applicable policy"
			);
			return Err(AuthorizationError::no_applicable_policy(action.clone()));
		}

		let denied_by: Vec<&str> = applicable
			.iter()
			.filter(|policy| !policy.capabilities().can(action))
			.map(|policy| policy.name())
			.collect();

		if !denied_by.is_empty() {
			tracing::info!(
				action = %action,
				subject_id,
				denied_by = ?denied_by,
				"Authorization denied: action not permitted"
			);
			return Err(AuthorizationError::forbidden(action.clone()));
		}

		let names: Vec<String> = applicable.iter().map(|p| p.name().to_string()).collect();
		tracing::debug!(
			action = %action,
			subject_id,
			policies = ?names,
			"Authorization granted"
		);
		Ok(names)
	}
}

impl fmt::Debug for PolicyEngine {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("PolicyEngine")
			.field("policies", &self.policies)
			.field("environment", &self.environment)
			.finish_non_exhaustive()
	}
}
