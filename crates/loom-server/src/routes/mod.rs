// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! HTTP route handlers.

pub mod bus;
pub mod health;

pub use bus::register_bus_handlers;
