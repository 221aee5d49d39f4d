// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Core authorization vocabulary: actions and the resources they target.
//!
//! Both types are plain data. They are built by the caller before
//! authorization and never touch storage during evaluation.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::borrow::Cow;
use std::fmt;

/// Name of an operation being performed, e.g. `read` or `delete`.
///
/// The policy engine treats actions as opaque identifiers; only capability
/// sets give them meaning. `"*"` is reserved as the wildcard understood by
/// [`crate::Rules`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Action(Cow<'static, str>);

impl Action {
	pub const ANY: Action = Action::from_static("*");
	pub const READ: Action = Action::from_static("read");
	pub const WRITE: Action = Action::from_static("write");
	pub const DELETE: Action = Action::from_static("delete");

	pub const fn from_static(name: &'static str) -> Self {
		Self(Cow::Borrowed(name))
	}

	pub fn new(name: impl Into<String>) -> Self {
		Self(Cow::Owned(name.into()))
	}

	pub fn as_str(&self) -> &str {
		&self.0
	}

	pub fn is_wildcard(&self) -> bool {
		self.as_str() == "*"
	}
}

impl fmt::Display for Action {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl From<&'static str> for Action {
	fn from(name: &'static str) -> Self {
		Self::from_static(name)
	}
}

impl From<String> for Action {
	fn from(name: String) -> Self {
		Self::new(name)
	}
}

/// Attributes describing the resource being accessed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceAttrs {
	pub kind: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub id: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub owner_id: Option<String>,
	#[serde(default, skip_serializing_if = "Map::is_empty")]
	pub attributes: Map<String, Value>,
}

impl ResourceAttrs {
	pub fn new(kind: impl Into<String>) -> Self {
		Self {
			kind: kind.into(),
			id: None,
			owner_id: None,
			attributes: Map::new(),
		}
	}

	pub fn with_id(mut self, id: impl Into<String>) -> Self {
		self.id = Some(id.into());
		self
	}

	pub fn with_owner(mut self, owner_id: impl Into<String>) -> Self {
		self.owner_id = Some(owner_id.into());
		self
	}

	pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
		self.attributes.insert(key.into(), value.into());
		self
	}

	pub fn attribute(&self, key: &str) -> Option<&Value> {
		self.attributes.get(key)
	}

	/// Returns true if the resource records `subject_id` as its owner.
	pub fn is_owned_by(&self, subject_id: &str) -> bool {
		self.owner_id.as_deref() == Some(subject_id)
	}
}
