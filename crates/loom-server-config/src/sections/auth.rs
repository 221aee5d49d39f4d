// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Authentication and authorization configuration section.

use serde::Deserialize;

fn default_environment() -> String {
	"development".to_string()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthConfig {
	/// Deployment environment name, e.g. `development` or `production`.
	pub environment: String,
	/// Treat every request as coming from a fixed development user.
	pub dev_mode: bool,
	/// Honour `Forwarded`/`X-Forwarded-For` style proxy headers.
	pub trust_forwarded_headers: bool,
}

impl AuthConfig {
	pub fn is_production(&self) -> bool {
		self.environment == "production"
	}
}

impl Default for AuthConfig {
	fn default() -> Self {
		AuthConfigLayer::default().finalize()
	}
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthConfigLayer {
	#[serde(default)]
	pub environment: Option<String>,
	#[serde(default)]
	pub dev_mode: Option<bool>,
	#[serde(default)]
	pub trust_forwarded_headers: Option<bool>,
}

impl AuthConfigLayer {
	pub fn merge(&mut self, other: AuthConfigLayer) {
		if other.environment.is_some() {
			self.environment = other.environment;
		}
		if other.dev_mode.is_some() {
			self.dev_mode = other.dev_mode;
		}
		if other.trust_forwarded_headers.is_some() {
			self.trust_forwarded_headers = other.trust_forwarded_headers;
		}
	}

	pub fn finalize(self) -> AuthConfig {
		AuthConfig {
			environment: self.environment.unwrap_or_else(default_environment),
			dev_mode: self.dev_mode.unwrap_or(false),
			trust_forwarded_headers: self.trust_forwarded_headers.unwrap_or(true),
		}
	}
}
