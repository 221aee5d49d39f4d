// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Task-local binding of the per-request [`ExecutionContext`].

use crate::{ContextError, UnitOfWork};
use loom_common_bus::MessageBus;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::Instrument;
use uuid::Uuid;

tokio::task_local! {
	static CURRENT: ExecutionContext;
}

/// Per-request resource bundle: the request's unit of work and the bus.
///
/// Immutable once created. Clones share the same underlying bundle.
#[derive(Clone)]
pub struct ExecutionContext {
	inner: Arc<ContextInner>,
}

struct ContextInner {
	request_id: Uuid,
	unit_of_work: Arc<dyn UnitOfWork>,
	bus: MessageBus,
}

impl ExecutionContext {
	pub fn new(unit_of_work: Arc<dyn UnitOfWork>, bus: MessageBus) -> Self {
		Self {
			inner: Arc::new(ContextInner {
				request_id: Uuid::new_v4(),
				unit_of_work,
				bus,
			}),
		}
	}

	/// Identifier minted when the context was created, for log correlation.
	pub fn request_id(&self) -> Uuid {
		self.inner.request_id
	}

	pub fn unit_of_work(&self) -> &Arc<dyn UnitOfWork> {
		&self.inner.unit_of_work
	}

	/// Returns the unit of work as its concrete persistence type, if it is one.
	pub fn unit_of_work_as<T: UnitOfWork>(&self) -> Option<&T> {
		self.inner.unit_of_work.as_any().downcast_ref::<T>()
	}

	pub fn bus(&self) -> &MessageBus {
		&self.inner.bus
	}
}

impl fmt::Debug for ExecutionContext {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ExecutionContext")
			.field("request_id", &self.inner.request_id)
			.finish_non_exhaustive()
	}
}

/// Runs `body` with `context` bound for its whole extent, including every
/// suspension point.
///
/// An enclosing binding is shadowed for the duration and restored afterwards,
/// whether `body` completes, returns an error or unwinds.
pub async fn run<F>(context: ExecutionContext, body: F) -> F::Output
where
	F: Future,
{
	let span = tracing::debug_span!("request", request_id = %context.request_id());
	CURRENT.scope(context, body.instrument(span)).await
}

/// Synchronous counterpart of [`run`].
pub fn run_sync<R>(context: ExecutionContext, body: impl FnOnce() -> R) -> R {
	CURRENT.sync_scope(context, body)
}

/// Returns the context bound to the running task.
pub fn current_context() -> Result<ExecutionContext, ContextError> {
	CURRENT.try_with(ExecutionContext::clone).map_err(|_| {
		tracing::error!("execution context requested outside of a request scope");
		ContextError::NotFound
	})
}

pub fn try_current_context() -> Option<ExecutionContext> {
	CURRENT.try_with(ExecutionContext::clone).ok()
}

/// Calls `f` with a borrow of the bound context.
pub fn with_current<R>(f: impl FnOnce(&ExecutionContext) -> R) -> Result<R, ContextError> {
	CURRENT.try_with(f).map_err(|_| ContextError::NotFound)
}

/// Spawns a task that inherits the caller's context, if any.
pub fn spawn<F>(future: F) -> JoinHandle<F::Output>
where
	F: Future + Send + 'static,
	F::Output: Send + 'static,
{
	match try_current_context() {
		Some(context) => tokio::spawn(CURRENT.scope(context, future)),
		None => tokio::spawn(future),
	}
}
