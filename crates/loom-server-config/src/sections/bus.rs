// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Message bus configuration section.

use serde::Deserialize;
use std::time::Duration;

const DEFAULT_SEND_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BusConfig {
	/// Upper bound applied by request handlers awaiting a bus reply.
	pub send_timeout_secs: u64,
}

impl BusConfig {
	pub fn send_timeout(&self) -> Duration {
		Duration::from_secs(self.send_timeout_secs)
	}
}

impl Default for BusConfig {
	fn default() -> Self {
		Self {
			send_timeout_secs: DEFAULT_SEND_TIMEOUT_SECS,
		}
	}
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BusConfigLayer {
	#[serde(default)]
	pub send_timeout_secs: Option<u64>,
}

impl BusConfigLayer {
	pub fn merge(&mut self, other: BusConfigLayer) {
		if other.send_timeout_secs.is_some() {
			self.send_timeout_secs = other.send_timeout_secs;
		}
	}

	pub fn finalize(self) -> BusConfig {
		BusConfig {
			send_timeout_secs: self.send_timeout_secs.unwrap_or(DEFAULT_SEND_TIMEOUT_SECS),
		}
	}
}
