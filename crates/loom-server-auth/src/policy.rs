// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Policies and the process-wide policy set.
//!
//! A policy pairs an applicability predicate with a capability set. The
//! predicate decides whether the policy has a say in a request; the
//! capability set decides what it permits once it does.

use crate::capability::CapabilitySet;
use crate::environment::Environment;
use crate::error::PolicyError;
use crate::identity::Subject;
use crate::types::ResourceAttrs;
use std::fmt;
use std::sync::Arc;

pub trait Policy: Send + Sync {
	/// Unique name within a [`PolicySet`].
	fn name(&self) -> &str;

	fn capabilities(&self) -> &dyn CapabilitySet;

	/// Returns true if this policy applies to the request.
	///
	/// Must be pure and must not perform I/O.
	fn evaluate(
		&self,
		subject: Option<&Subject>,
		resource: Option<&ResourceAttrs>,
		environment: &Environment,
	) -> bool;
}

/// Policy backed by a closure.
///
/// ```ignore
/// let guest = FnPolicy::new("Guest", AllowList::new(["read"]), predicates::anonymous);
/// ```
pub struct FnPolicy<C, P> {
	name: String,
	capabilities: C,
	predicate: P,
}

impl<C, P> FnPolicy<C, P>
where
	C: CapabilitySet,
	P: Fn(Option<&Subject>, Option<&ResourceAttrs>, &Environment) -> bool + Send + Sync,
{
	pub fn new(name: impl Into<String>, capabilities: C, predicate: P) -> Self {
		Self {
			name: name.into(),
			capabilities,
			predicate,
		}
	}
}

impl<C, P> Policy for FnPolicy<C, P>
where
	C: CapabilitySet,
	P: Fn(Option<&Subject>, Option<&ResourceAttrs>, &Environment) -> bool + Send + Sync,
{
	fn name(&self) -> &str {
		&self.name
	}

	fn capabilities(&self) -> &dyn CapabilitySet {
		&self.capabilities
	}

	fn evaluate(
		&self,
		subject: Option<&Subject>,
		resource: Option<&ResourceAttrs>,
		environment: &Environment,
	) -> bool {
		(self.predicate)(subject, resource, environment)
	}
}

impl<C: fmt::Debug, P> fmt::Debug for FnPolicy<C, P> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("FnPolicy")
			.field("name", &self.name)
			.field("capabilities", &self.capabilities)
			.finish_non_exhaustive()
	}
}

/// Ordered registry of policies, built once at start-up.
///
/// Order only fixes iteration; every applicable policy is consulted.
#[derive(Clone, Default)]
pub struct PolicySet {
	policies: Vec<Arc<dyn Policy>>,
}

impl PolicySet {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn register(&mut self, policy: impl Policy + 'static) -> Result<(), PolicyError> {
		if self.get(policy.name()).is_some() {
			return Err(PolicyError::DuplicateName(policy.name().to_string()));
		}
		tracing::debug!(policy = policy.name(), "Registered policy");
		self.policies.push(Arc::new(policy));
		Ok(())
	}

	/// Builder form of [`PolicySet::register`].
	pub fn with(mut self, policy: impl Policy + 'static) -> Result<Self, PolicyError> {
		self.register(policy)?;
		Ok(self)
	}

	pub fn get(&self, name: &str) -> Option<&Arc<dyn Policy>> {
		self.policies.iter().find(|p| p.name() == name)
	}

	pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn Policy>> {
		self.policies.iter()
	}

	pub fn names(&self) -> Vec<&str> {
		self.policies.iter().map(|p| p.name()).collect()
	}

	pub fn len(&self) -> usize {
		self.policies.len()
	}

	pub fn is_empty(&self) -> bool {
		self.policies.is_empty()
	}
}

impl fmt::Debug for PolicySet {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_list().entries(self.names()).finish()
	}
}

/// Common applicability predicates for [`FnPolicy`].
pub mod predicates {
	use super::*;

	pub fn always(_: Option<&Subject>, _: Option<&ResourceAttrs>, _: &Environment) -> bool {
		true
	}

	pub fn anonymous(subject: Option<&Subject>, _: Option<&ResourceAttrs>, _: &Environment) -> bool {
		subject.is_none()
	}

	pub fn authenticated(
		subject: Option<&Subject>,
		_: Option<&ResourceAttrs>,
		_: &Environment,
	) -> bool {
		subject.is_some()
	}

	/// Authenticated subject that owns the target resource.
	pub fn owner(
		subject: Option<&Subject>,
		resource: Option<&ResourceAttrs>,
		_: &Environment,
	) -> bool {
		match (subject, resource) {
			(Some(subject), Some(resource)) => resource.is_owned_by(subject.id()),
			_ => false,
		}
	}

	pub fn from_loopback(_: Option<&Subject>, _: Option<&ResourceAttrs>, env: &Environment) -> bool {
		env.is_loopback()
	}
}
