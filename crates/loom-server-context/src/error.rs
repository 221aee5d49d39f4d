// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Context and unit-of-work errors.

/// Errors raised by the context store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ContextError {
	/// `current_context()` was called outside any `run` scope.
	#[error("no execution context bound to the current task")]
	NotFound,
}

/// Failures reported by the persistence collaborator.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UnitOfWorkError {
	#[error("failed to open unit of work: {0}")]
	Begin(String),

	#[error("failed to commit unit of work: {0}")]
	Commit(String),

	#[error("failed to roll back unit of work: {0}")]
	Rollback(String),
}
