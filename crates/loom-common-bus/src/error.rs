// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Bus error types.

use crate::EventName;
use std::time::Duration;

/// Failure raised by a subscribed handler while computing its result.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct HandlerError {
	message: String,
}

impl HandlerError {
	pub fn new(message: impl Into<String>) -> Self {
		Self {
			message: message.into(),
		}
	}

	pub(crate) fn panicked(payload: Box<dyn std::any::Any + Send>) -> Self {
		let detail = if let Some(s) = payload.downcast_ref::<&str>() {
			(*s).to_string()
		} else if let Some(s) = payload.downcast_ref::<String>() {
			s.clone()
		} else {
			"unknown panic payload".to_string()
		};
		Self::new(format!("handler panicked: {detail}"))
	}

	pub fn message(&self) -> &str {
		&self.message
	}
}

/// Errors observed by a caller awaiting a [`crate::Reply`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BusError {
	/// A handler for the event failed; delivered to every waiter of that resolution.
	#[error("handler for event '{event}' failed: {source}")]
	Handler {
		event: EventName,
		#[source]
		source: HandlerError,
	},

	/// The caller-supplied timeout elapsed before any handler resolved the event.
	#[error("timed out after {timeout:?} waiting for event '{event}'")]
	Timeout { event: EventName, timeout: Duration },

	/// The bus was dropped while the waiter was still registered.
	#[error("message bus closed")]
	Closed,
}

impl BusError {
	pub fn is_timeout(&self) -> bool {
		matches!(self, BusError::Timeout { .. })
	}
}
