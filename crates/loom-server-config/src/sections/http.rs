// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! HTTP server configuration.

use serde::Deserialize;

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8080;

/// HTTP server configuration (runtime, fully resolved).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpConfig {
	pub host: String,
	pub port: u16,
}

impl Default for HttpConfig {
	fn default() -> Self {
		HttpConfigLayer::default().finalize()
	}
}

/// HTTP configuration layer (partial, for merging).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HttpConfigLayer {
	#[serde(default)]
	pub host: Option<String>,
	#[serde(default)]
	pub port: Option<u16>,
}

impl HttpConfigLayer {
	pub fn merge(&mut self, other: HttpConfigLayer) {
		if other.host.is_some() {
			self.host = other.host;
		}
		if other.port.is_some() {
			self.port = other.port;
		}
	}

	pub fn finalize(self) -> HttpConfig {
		HttpConfig {
			host: self.host.unwrap_or_else(|| DEFAULT_HOST.to_string()),
			port: self.port.unwrap_or(DEFAULT_PORT),
		}
	}
}
