// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Capability sets: which actions a policy permits.

use crate::types::Action;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

/// Answers whether an action is permitted.
///
/// Implementations must be pure: the same action always yields the same answer.
pub trait CapabilitySet: fmt::Debug + Send + Sync {
	fn can(&self, action: &Action) -> bool;
}

impl<T: CapabilitySet + ?Sized> CapabilitySet for Box<T> {
	fn can(&self, action: &Action) -> bool {
		(**self).can(action)
	}
}

impl<T: CapabilitySet + ?Sized> CapabilitySet for Arc<T> {
	fn can(&self, action: &Action) -> bool {
		(**self).can(action)
	}
}

/// Permits every action.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AllowAll;

impl CapabilitySet for AllowAll {
	fn can(&self, _action: &Action) -> bool {
		true
	}
}

/// Permits nothing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DenyAll;

impl CapabilitySet for DenyAll {
	fn can(&self, _action: &Action) -> bool {
		false
	}
}

/// Permits exactly the listed actions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AllowList(HashSet<Action>);

impl AllowList {
	pub fn new<I, A>(actions: I) -> Self
	where
		I: IntoIterator<Item = A>,
		A: Into<Action>,
	{
		Self(actions.into_iter().map(Into::into).collect())
	}
}

impl CapabilitySet for AllowList {
	fn can(&self, action: &Action) -> bool {
		self.0.contains(action)
	}
}

/// Permits everything except the listed actions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DenyList(HashSet<Action>);

impl DenyList {
	pub fn new<I, A>(actions: I) -> Self
	where
		I: IntoIterator<Item = A>,
		A: Into<Action>,
	{
		Self(actions.into_iter().map(Into::into).collect())
	}
}

impl CapabilitySet for DenyList {
	fn can(&self, action: &Action) -> bool {
		!self.0.contains(action)
	}
}

/// Allow/deny rules with wildcard support.
///
/// A matching deny rule overrides any allow rule. [`Action::ANY`] matches
/// every action. Actions matched by no rule are denied.
///
/// ```ignore
/// let rules = Rules::new().allow(Action::ANY).deny(Action::DELETE);
/// assert!(rules.can(&Action::READ));
/// assert!(!rules.can(&Action::DELETE));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Rules {
	allowed: HashSet<Action>,
	denied: HashSet<Action>,
}

impl Rules {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn allow(mut self, action: impl Into<Action>) -> Self {
		self.allowed.insert(action.into());
		self
	}

	pub fn deny(mut self, action: impl Into<Action>) -> Self {
		self.denied.insert(action.into());
		self
	}

	fn matches(set: &HashSet<Action>, action: &Action) -> bool {
		set.contains(&Action::ANY) || set.contains(action)
	}
}

impl CapabilitySet for Rules {
	fn can(&self, action: &Action) -> bool {
		!Self::matches(&self.denied, action) && Self::matches(&self.allowed, action)
	}
}

/// Intersection of several sets: every member must permit the action.
///
/// An empty composite permits nothing.
#[derive(Debug, Default)]
pub struct Composite(Vec<Box<dyn CapabilitySet>>);

impl Composite {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with(mut self, set: impl CapabilitySet + 'static) -> Self {
		self.0.push(Box::new(set));
		self
	}

	pub fn len(&self) -> usize {
		self.0.len()
	}

	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}
}

impl CapabilitySet for Composite {
	fn can(&self, action: &Action) -> bool {
		!self.0.is_empty() && self.0.iter().all(|set| set.can(action))
	}
}
