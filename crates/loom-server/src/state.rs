// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Shared application state.

use async_trait::async_trait;
use axum::http::request::Parts;
use loom_common_bus::MessageBus;
use loom_server_auth::{
	AnonymousResolver, EnvironmentConfig, IdentityResolver, PolicyEngine, PolicyError, Subject,
	UserIdentity,
};
use loom_server_config::ServerConfig;
use loom_server_context::{NoopUnitOfWorkFactory, UnitOfWorkFactory};
use std::sync::Arc;

use crate::dispatch::Dispatcher;
use crate::policies::{default_policies, ADMIN_ROLE};
use crate::routes::register_bus_handlers;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
	pub dispatcher: Dispatcher,
	pub config: Arc<ServerConfig>,
}

impl AppState {
	pub fn engine(&self) -> &PolicyEngine {
		self.dispatcher.engine()
	}
}

/// Resolves every request to a fixed administrator.
///
/// Only installed when `auth.dev_mode` is set, which config validation
/// refuses in production.
#[derive(Debug, Clone, Default)]
pub struct DevModeResolver;

pub const DEV_USER_ID: &str = "dev-user";

#[async_trait]
impl IdentityResolver for DevModeResolver {
	async fn resolve(&self, _parts: &Parts) -> Option<Subject> {
		Some(Subject::new(
			UserIdentity::new(DEV_USER_ID).with_role(ADMIN_ROLE),
		))
	}
}

/// Builds state from configuration with the default collaborators.
pub fn create_app_state(config: &ServerConfig) -> Result<AppState, PolicyError> {
	if config.auth.dev_mode {
		tracing::warn!("Dev mode enabled: every request runs as {DEV_USER_ID}");
		create_app_state_with(config, DevModeResolver, Arc::new(NoopUnitOfWorkFactory))
	} else {
		create_app_state_with(config, AnonymousResolver, Arc::new(NoopUnitOfWorkFactory))
	}
}

/// Builds state with an explicit identity resolver and persistence collaborator.
pub fn create_app_state_with(
	config: &ServerConfig,
	resolver: impl IdentityResolver + 'static,
	unit_of_work_factory: Arc<dyn UnitOfWorkFactory>,
) -> Result<AppState, PolicyError> {
	let bus = MessageBus::new();
	register_bus_handlers(&bus);

	let engine = PolicyEngine::new(default_policies()?)
		.with_resolver(resolver)
		.with_environment_config(EnvironmentConfig {
			trust_forwarded_headers: config.auth.trust_forwarded_headers,
		});

	tracing::info!(
		policies = ?engine.policies().names(),
		subscribers = bus.subscriber_count("ping"),
		"Application state created"
	);

	Ok(AppState {
		dispatcher: Dispatcher::new(bus, engine, unit_of_work_factory),
		config: Arc::new(config.clone()),
	})
}
