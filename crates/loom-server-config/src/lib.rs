// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Centralized configuration management for Loom server.
//!
//! This crate provides:
//! - Layered configuration from multiple sources (defaults, TOML file, environment)
//! - Type-safe configuration with validation
//! - Consistent environment variable naming (`LOOM_SERVER_*`)
//!
//! # Usage
//!
//! ```ignore
//! use loom_server_config::load_config;
//!
//! let config = load_config()?;
//! println!("Server listening on {}", config.socket_addr());
//! ```

pub mod error;
pub mod layer;
pub mod sections;
pub mod sources;

pub use error::ConfigError;
pub use layer::ServerConfigLayer;
pub use sections::*;
pub use sources::{ConfigSource, DefaultsSource, EnvSource, Precedence, TomlSource};

use tracing::{debug, info};

/// Fully resolved server configuration.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ServerConfig {
	pub http: HttpConfig,
	pub logging: LoggingConfig,
	pub auth: AuthConfig,
	pub bus: BusConfig,
}

impl ServerConfig {
	/// Get the socket address string for binding.
	pub fn socket_addr(&self) -> String {
		format!("{}:{}", self.http.host, self.http.port)
	}
}

/// Load configuration from all sources with standard precedence.
///
/// Precedence (highest to lowest):
/// 1. Environment variables (`LOOM_SERVER_*`)
/// 2. Config file (`/etc/loom/server.toml`)
/// 3. Built-in defaults
pub fn load_config() -> Result<ServerConfig, ConfigError> {
	load_from_sources(vec![
		Box::new(DefaultsSource),
		Box::new(TomlSource::system()),
		Box::new(EnvSource),
	])
}

/// Load configuration with a custom config file path.
pub fn load_config_with_file(
	config_path: impl Into<std::path::PathBuf>,
) -> Result<ServerConfig, ConfigError> {
	load_from_sources(vec![
		Box::new(DefaultsSource),
		Box::new(TomlSource::new(config_path)),
		Box::new(EnvSource),
	])
}

/// Merge the given sources in precedence order and finalize the result.
pub fn load_from_sources(
	mut sources: Vec<Box<dyn ConfigSource>>,
) -> Result<ServerConfig, ConfigError> {
	sources.sort_by_key(|s| s.precedence());

	let mut merged = ServerConfigLayer::default();
	for source in sources {
		debug!(source = source.name(), "loading configuration source");
		merged.merge(source.load()?);
	}

	finalize(merged)
}

/// Finalize configuration layer into resolved config.
pub fn finalize(layer: ServerConfigLayer) -> Result<ServerConfig, ConfigError> {
	let http = layer.http.unwrap_or_default().finalize();
	let logging = layer.logging.unwrap_or_default().finalize();
	let auth = layer.auth.unwrap_or_default().finalize();
	let bus = layer.bus.unwrap_or_default().finalize();

	validate_config(&auth, &bus)?;

	info!(
		host = %http.host,
		port = http.port,
		environment = %auth.environment,
		dev_mode = auth.dev_mode,
		trust_forwarded_headers = auth.trust_forwarded_headers,
		bus_send_timeout_secs = bus.send_timeout_secs,
		"Server configuration loaded"
	);

	Ok(ServerConfig {
		http,
		logging,
		auth,
		bus,
	})
}

/// Validate cross-field configuration rules.
fn validate_config(auth: &AuthConfig, bus: &BusConfig) -> Result<(), ConfigError> {
	if auth.dev_mode && auth.is_production() {
		return Err(ConfigError::Validation(
			"LOOM_SERVER_AUTH_DEV_MODE=1 is set while LOOM_SERVER_ENV=production. \
			 This is a security risk. Remove LOOM_SERVER_AUTH_DEV_MODE or set LOOM_SERVER_ENV \
			 to a non-production value."
				.to_string(),
		));
	}

	if bus.send_timeout_secs == 0 {
		return Err(ConfigError::InvalidValue {
			key: "bus.send_timeout_secs".to_string(),
			message: "must be greater than zero".to_string(),
		});
	}

	Ok(())
}
