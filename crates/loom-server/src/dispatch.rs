// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Transport-agnostic request dispatch.
//!
//! A [`Dispatcher`] owns the process-wide collaborators every request needs:
//! the message bus, the policy engine and the unit-of-work factory. For each
//! request it opens a unit of work, binds a fresh execution context around the
//! handler, and finishes the unit of work according to the outcome.

use crate::error::ServerError;
use axum::http::request::Parts;
use loom_common_bus::MessageBus;
use loom_server_auth::{Action, Authorization, PolicyEngine, ResourceAttrs};
use loom_server_context::{run, ExecutionContext, UnitOfWork, UnitOfWorkFactory};
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tracing::instrument;

#[derive(Clone)]
pub struct Dispatcher {
	bus: MessageBus,
	engine: PolicyEngine,
	unit_of_work_factory: Arc<dyn UnitOfWorkFactory>,
}

impl Dispatcher {
	pub fn new(
		bus: MessageBus,
		engine: PolicyEngine,
		unit_of_work_factory: Arc<dyn UnitOfWorkFactory>,
	) -> Self {
		Self {
			bus,
			engine,
			unit_of_work_factory,
		}
	}

	pub fn bus(&self) -> &MessageBus {
		&self.bus
	}

	pub fn engine(&self) -> &PolicyEngine {
		&self.engine
	}

	/// Runs `body` inside a fresh execution context.
	///
	/// The unit of work is committed when `succeeded` accepts the output and
	/// rolled back otherwise. A failed commit fails the call; a failed
	/// rollback is logged and the output is still returned.
	pub async fn in_context<F, R>(
		&self,
		body: F,
		succeeded: impl FnOnce(&R) -> bool,
	) -> Result<R, ServerError>
	where
		F: Future<Output = R>,
	{
		let unit_of_work = self.unit_of_work_factory.create().await?;
		unit_of_work.begin().await?;

		let context = ExecutionContext::new(Arc::clone(&unit_of_work), self.bus.clone());
		let request_id = context.request_id();

		let output = run(context, body).await;

		finish(unit_of_work.as_ref(), succeeded(&output), request_id).await?;
		Ok(output)
	}

	/// Authorizes `action` and, if permitted, runs `handler` with the
	/// resulting [`Authorization`], all inside one execution context.
	///
	/// ```ignore
	/// let (parts, _body) = request.into_parts();
	/// let reply = dispatcher
	///     .dispatch(&parts, &Action::READ, None, |_auth| async {
	///         let ctx = current_context()?;
	///         Ok(ctx.bus().send("ping", vec![]).await?)
	///     })
	///     .await?;
	/// ```
	#[instrument(level = "debug", skip_all, fields(action = %action))]
	pub async fn dispatch<F, Fut, T>(
		&self,
		parts: &Parts,
		action: &Action,
		resource: Option<&ResourceAttrs>,
		handler: F,
	) -> Result<T, ServerError>
	where
		F: FnOnce(Authorization) -> Fut,
		Fut: Future<Output = Result<T, ServerError>>,
	{
		let body = async {
			let authorization = self.engine.authorize(parts, action, resource).await?;
			handler(authorization).await
		};

		self.in_context(body, Result::is_ok).await?
	}
}

async fn finish(
	unit_of_work: &dyn UnitOfWork,
	succeeded: bool,
	request_id: uuid::Uuid,
) -> Result<(), ServerError> {
	if succeeded {
		unit_of_work.commit().await?;
		tracing::debug!(%request_id, "unit of work committed");
	} else {
		match unit_of_work.rollback().await {
			Ok(()) => tracing::debug!(%request_id, "unit of work rolled back"),
			Err(e) => tracing::warn!(%request_id, error = %e, "unit of work rollback failed"),
		}
	}
	Ok(())
}

impl fmt::Debug for Dispatcher {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Dispatcher")
			.field("bus", &self.bus)
			.field("engine", &self.engine)
			.finish_non_exhaustive()
	}
}
