// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration sources: environment variables and TOML files.

use std::path::PathBuf;

use tracing::{debug, trace};

use crate::error::ConfigError;
use crate::layer::ServerConfigLayer;
use crate::sections::{AuthConfigLayer, BusConfigLayer, HttpConfigLayer, LoggingConfigLayer};

/// Source precedence levels (higher = overrides lower).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Precedence {
	Defaults = 10,
	ConfigFile = 20,
	Environment = 50,
}

/// Trait for configuration sources.
pub trait ConfigSource: Send + Sync {
	fn name(&self) -> &'static str;
	fn precedence(&self) -> Precedence;
	fn load(&self) -> Result<ServerConfigLayer, ConfigError>;
}

/// Built-in defaults source.
pub struct DefaultsSource;

impl ConfigSource for DefaultsSource {
	fn name(&self) -> &'static str {
		"defaults"
	}

	fn precedence(&self) -> Precedence {
		Precedence::Defaults
	}

	fn load(&self) -> Result<ServerConfigLayer, ConfigError> {
		debug!("loading defaults");
		Ok(ServerConfigLayer::default())
	}
}

/// TOML file configuration source. A missing file is an empty layer.
pub struct TomlSource {
	path: PathBuf,
}

impl TomlSource {
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self { path: path.into() }
	}

	pub fn system() -> Self {
		Self::new("/etc/loom/server.toml")
	}
}

impl ConfigSource for TomlSource {
	fn name(&self) -> &'static str {
		"toml-config"
	}

	fn precedence(&self) -> Precedence {
		Precedence::ConfigFile
	}

	fn load(&self) -> Result<ServerConfigLayer, ConfigError> {
		if !self.path.exists() {
			debug!(path = %self.path.display(), "config file not found, skipping");
			return Ok(ServerConfigLayer::default());
		}

		debug!(path = %self.path.display(), "loading config file");
		let content = std::fs::read_to_string(&self.path).map_err(|e| ConfigError::FileRead {
			path: self.path.clone(),
			source: e,
		})?;

		let layer: ServerConfigLayer =
			toml::from_str(&content).map_err(|e| ConfigError::TomlParse {
				path: self.path.clone(),
				source: e,
			})?;

		trace!("parsed config layer from TOML");
		Ok(layer)
	}
}

/// Environment variable source.
///
/// Convention: LOOM_SERVER_<SECTION>_<FIELD>
pub struct EnvSource;

impl ConfigSource for EnvSource {
	fn name(&self) -> &'static str {
		"environment"
	}

	fn precedence(&self) -> Precedence {
		Precedence::Environment
	}

	fn load(&self) -> Result<ServerConfigLayer, ConfigError> {
		debug!("loading environment variables");
		Ok(ServerConfigLayer {
			http: Some(load_http_from_env()?),
			logging: Some(load_logging_from_env()),
			auth: Some(load_auth_from_env()?),
			bus: Some(load_bus_from_env()?),
		})
	}
}

fn env_var(name: &str) -> Option<String> {
	std::env::var(name).ok().filter(|s| !s.is_empty())
}

fn env_bool(name: &str) -> Result<Option<bool>, ConfigError> {
	match env_var(name) {
		Some(v) => match v.to_ascii_lowercase().as_str() {
			"1" | "true" | "yes" => Ok(Some(true)),
			"0" | "false" | "no" => Ok(Some(false)),
			_ => Err(ConfigError::InvalidValue {
				key: name.to_string(),
				message: format!("invalid boolean value '{v}'"),
			}),
		},
		None => Ok(None),
	}
}

fn env_parse<T: std::str::FromStr>(name: &str, kind: &str) -> Result<Option<T>, ConfigError> {
	match env_var(name) {
		Some(v) => v.parse().map(Some).map_err(|_| ConfigError::InvalidValue {
			key: name.to_string(),
			message: format!("invalid {kind} value '{v}'"),
		}),
		None => Ok(None),
	}
}

fn load_http_from_env() -> Result<HttpConfigLayer, ConfigError> {
	Ok(HttpConfigLayer {
		host: env_var("LOOM_SERVER_HOST"),
		port: env_parse("LOOM_SERVER_PORT", "u16")?,
	})
}

fn load_logging_from_env() -> LoggingConfigLayer {
	LoggingConfigLayer {
		level: env_var("LOOM_SERVER_LOG_LEVEL"),
	}
}

fn load_auth_from_env() -> Result<AuthConfigLayer, ConfigError> {
	Ok(AuthConfigLayer {
		environment: env_var("LOOM_SERVER_ENV"),
		dev_mode: env_bool("LOOM_SERVER_AUTH_DEV_MODE")?,
		trust_forwarded_headers: env_bool("LOOM_SERVER_AUTH_TRUST_FORWARDED_HEADERS")?,
	})
}

fn load_bus_from_env() -> Result<BusConfigLayer, ConfigError> {
	Ok(BusConfigLayer {
		send_timeout_secs: env_parse("LOOM_SERVER_BUS_SEND_TIMEOUT_SECS", "u64")?,
	})
}
