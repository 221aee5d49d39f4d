// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Request-scoped execution context for Loom server.
//!
//! Every in-flight request owns exactly one [`ExecutionContext`]: the unit of
//! work opened for it and a handle to the process-wide [`MessageBus`]. The
//! dispatch layer binds it with [`run`]; any code executing inside that scope
//! (across every `.await`) retrieves it with [`current_context`] instead of
//! receiving it as a parameter.
//!
//! ```ignore
//! use loom_server_context::{current_context, run, ExecutionContext};
//!
//! let ctx = ExecutionContext::new(unit_of_work, bus);
//! run(ctx, async {
//!     let ctx = current_context()?;
//!     ctx.bus().send("ping", vec![]).await?;
//!     Ok(())
//! })
//! .await
//! ```
//!
//! # Task boundaries
//!
//! Binding is task-local. Work handed to `tokio::spawn` does not inherit it;
//! use [`spawn`] to carry the current context into a new task.

mod context;
mod error;
mod unit_of_work;

pub use context::{
	current_context, run, run_sync, spawn, try_current_context, with_current, ExecutionContext,
};
pub use error::{ContextError, UnitOfWorkError};
pub use unit_of_work::{NoopUnitOfWork, NoopUnitOfWorkFactory, UnitOfWork, UnitOfWorkFactory};

pub use loom_common_bus::MessageBus;
