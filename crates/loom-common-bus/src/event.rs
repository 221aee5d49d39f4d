// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Event identifiers.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_SYMBOL: AtomicU64 = AtomicU64::new(1);

/// Name of a bus event: either a string or an opaque process-unique symbol.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EventName {
	Named(String),
	Symbol(u64),
}

impl EventName {
	/// Mints a new symbol that never collides with any other event name.
	pub fn symbol() -> Self {
		EventName::Symbol(NEXT_SYMBOL.fetch_add(1, Ordering::Relaxed))
	}

	pub fn is_symbol(&self) -> bool {
		matches!(self, EventName::Symbol(_))
	}
}

impl fmt::Display for EventName {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			EventName::Named(name) => f.write_str(name),
			EventName::Symbol(id) => write!(f, "symbol#{id}"),
		}
	}
}

impl From<&str> for EventName {
	fn from(name: &str) -> Self {
		EventName::Named(name.to_string())
	}
}

impl From<String> for EventName {
	fn from(name: String) -> Self {
		EventName::Named(name)
	}
}

impl From<&EventName> for EventName {
	fn from(name: &EventName) -> Self {
		name.clone()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn symbols_are_unique() {
		let a = EventName::symbol();
		let b = EventName::symbol();
		assert_ne!(a, b);
		assert!(a.is_symbol());
	}

	#[test]
	fn named_events_compare_by_name() {
		assert_eq!(EventName::from("ping"), EventName::from("ping".to_string()));
		assert!(!EventName::from("ping").is_symbol());
	}

	#[test]
	fn display_formats() {
		assert_eq!(EventName::from("user.created").to_string(), "user.created");
		assert_eq!(EventName::Symbol(7).to_string(), "symbol#7");
	}
}
