// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Transactional unit-of-work contract supplied by the persistence layer.

use crate::UnitOfWorkError;
use async_trait::async_trait;
use std::any::Any;
use std::sync::Arc;

/// Transactional resource owned by a single request.
///
/// The context store treats it as opaque. Persistence code recovers its
/// concrete type through [`crate::ExecutionContext::unit_of_work_as`].
#[async_trait]
pub trait UnitOfWork: Send + Sync + 'static {
	async fn begin(&self) -> Result<(), UnitOfWorkError>;

	async fn commit(&self) -> Result<(), UnitOfWorkError>;

	async fn rollback(&self) -> Result<(), UnitOfWorkError>;

	fn as_any(&self) -> &dyn Any;
}

/// Opens a fresh unit of work per request.
#[async_trait]
pub trait UnitOfWorkFactory: Send + Sync {
	async fn create(&self) -> Result<Arc<dyn UnitOfWork>, UnitOfWorkError>;
}

/// Unit of work for deployments with no transactional store.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopUnitOfWork;

#[async_trait]
impl UnitOfWork for NoopUnitOfWork {
	async fn begin(&self) -> Result<(), UnitOfWorkError> {
		Ok(())
	}

	async fn commit(&self) -> Result<(), UnitOfWorkError> {
		Ok(())
	}

	async fn rollback(&self) -> Result<(), UnitOfWorkError> {
		Ok(())
	}

	fn as_any(&self) -> &dyn Any {
		self
	}
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoopUnitOfWorkFactory;

#[async_trait]
impl UnitOfWorkFactory for NoopUnitOfWorkFactory {
	async fn create(&self) -> Result<Arc<dyn UnitOfWork>, UnitOfWorkError> {
		Ok(Arc::new(NoopUnitOfWork))
	}
}
