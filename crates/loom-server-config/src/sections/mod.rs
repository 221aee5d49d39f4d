// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration sections.

mod auth;
mod bus;
mod http;
mod logging;

pub use auth::{AuthConfig, AuthConfigLayer};
pub use bus::{BusConfig, BusConfigLayer};
pub use http::{HttpConfig, HttpConfigLayer};
pub use logging::{LoggingConfig, LoggingConfigLayer};
