// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Correlated request/response messaging over a broadcast bus.
//!
//! A [`MessageBus`] pairs event emission with deferred result delivery:
//!
//! - Handlers are registered per [`EventName`] with [`MessageBus::subscribe`]
//!   (or [`MessageBus::subscribe_once`] / [`MessageBus::subscribe_async`]).
//! - [`MessageBus::send`] registers a waiter for the event, emits it to every
//!   subscriber, and returns a [`Reply`] future.
//! - Each handler result resolves the *entire* waiter list for the event and
//!   clears it. A waiter resolves at most once, so with several handlers the
//!   first result wins.
//!
//! # Example
//!
//! ```ignore
//! use loom_common_bus::MessageBus;
//! use serde_json::json;
//!
//! let bus = MessageBus::new();
//! bus.subscribe("ping", |_args| Ok(json!("pong")));
//!
//! let reply = bus.send("ping", vec![]).await?;
//! assert_eq!(reply, json!("pong"));
//! ```
//!
//! # Failure semantics
//!
//! There is no built-in timeout: if nothing is subscribed, [`Reply`] never
//! completes. Use [`MessageBus::send_timeout`] to bound the wait. Handler
//! failures (returned errors and panics) are delivered to every current waiter
//! as [`BusError::Handler`].

mod bus;
mod error;
mod event;

pub use bus::{AsyncHandler, MessageBus, Reply, SubscriptionId, SyncHandler};
pub use error::{BusError, HandlerError};
pub use event::EventName;
