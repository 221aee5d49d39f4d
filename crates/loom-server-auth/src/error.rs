// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Authorization and policy registration errors.

use crate::types::Action;
use http::StatusCode;
use serde::Serialize;
use std::fmt;

/// Stable, machine-readable reason for an authorization failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthorizationErrorKind {
	/// No registered policy applies to the request.
	NoApplicablePolicy,
	/// At least one applicable policy does not permit the action.
	Forbidden,
}

impl AuthorizationErrorKind {
	pub fn as_str(&self) -> &'static str {
		match self {
			Self::NoApplicablePolicy => "no_applicable_policy",
			Self::Forbidden => "forbidden",
		}
	}

	pub fn title(&self) -> &'static str {
		match self {
			Self::NoApplicablePolicy => "No applicable policy",
			Self::Forbidden => "Forbidden",
		}
	}
}

impl fmt::Display for AuthorizationErrorKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Request denied by the policy engine.
///
/// Both kinds map to `403 Forbidden`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationError {
	kind: AuthorizationErrorKind,
	action: Action,
}

impl AuthorizationError {
	pub fn no_applicable_policy(action: Action) -> Self {
		Self {
			kind: AuthorizationErrorKind::NoApplicablePolicy,
			action,
		}
	}

	pub fn forbidden(action: Action) -> Self {
		Self {
			kind: AuthorizationErrorKind::Forbidden,
			action,
		}
	}

	pub fn kind(&self) -> AuthorizationErrorKind {
		self.kind
	}

	pub fn action(&self) -> &Action {
		&self.action
	}

	pub fn title(&self) -> &'static str {
		self.kind.title()
	}

	pub fn status(&self) -> StatusCode {
		StatusCode::FORBIDDEN
	}

	/// Human-readable detail naming the action.
	pub fn message(&self) -> String {
		match self.kind {
			AuthorizationErrorKind::NoApplicablePolicy => {
				format!("no policy applies to action '{}'", self.action)
			}
			AuthorizationErrorKind::Forbidden => {
				format!("action '{}' is not permitted", self.action)
			}
		}
	}
}

impl fmt::Display for AuthorizationError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}: {}", self.title(), self.message())
	}
}

impl std::error::Error for AuthorizationError {}

/// Errors raised while building a policy set.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PolicyError {
	#[error("policy '{0}' is already registered")]
	DuplicateName(String),
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn kinds_have_stable_identifiers() {
		assert_eq!(
			AuthorizationErrorKind::NoApplicablePolicy.as_str(),
			"no_applicable_policy"
		);
		assert_eq!(AuthorizationErrorKind::Forbidden.as_str(), "forbidden");
		assert_eq!(
			serde_json::to_string(&AuthorizationErrorKind::NoApplicablePolicy).unwrap(),
			"\"no_applicable_policy\""
		);
	}

	#[test]
	fn both_kinds_are_forbidden_status() {
		let a = AuthorizationError::no_applicable_policy(Action::READ);
		let b = AuthorizationError::forbidden(Action::DELETE);
		assert_eq!(a.status(), StatusCode::FORBIDDEN);
		assert_eq!(b.status(), StatusCode::FORBIDDEN);
	}

	#[test]
	fn message_names_the_action() {
		let err = AuthorizationError::forbidden(Action::DELETE);
		assert_eq!(err.title(), "Forbidden");
		assert!(err.message().contains("delete"));
		assert_eq!(err.to_string(), "Forbidden: action 'delete' is not permitted");
	}
}
