// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Authorization core for Loom server.
//!
//! A request is authorized in three steps:
//!
//! - [`Environment`]: client address and agent extracted from the request
//! - [`Subject`]: identity produced by an [`IdentityResolver`], absent for
//!   anonymous requests
//! - [`PolicyEngine`]: consults every applicable [`Policy`] and requires all of
//!   them to permit the [`Action`]
//!
//! # Example
//!
//! ```ignore
//! use loom_server_auth::{predicates, Action, AllowList, FnPolicy, PolicyEngine, PolicySet};
//!
//! let policies = PolicySet::new()
//!     .with(FnPolicy::new("Guest", AllowList::new(["read"]), predicates::always))?;
//! let engine = PolicyEngine::new(policies);
//!
//! engine.authorize(&parts, &Action::READ, None).await?;
//! ```
//!
//! # Failure kinds
//!
//! - `no_applicable_policy`: no policy's predicate matched the request
//! - `forbidden`: an applicable policy does not permit the action
//!
//! Both are reported as `403 Forbidden`.

pub mod capability;
pub mod client_agent;
pub mod engine;
pub mod environment;
pub mod error;
pub mod identity;
pub mod policy;
pub mod types;

pub use capability::{AllowAll, AllowList, CapabilitySet, Composite, DenyAll, DenyList, Rules};
pub use client_agent::{ClientAgent, DeviceKind, Software};
pub use engine::{Authorization, PolicyEngine};
pub use environment::{ConnectAddr, Environment, EnvironmentConfig};
pub use error::{AuthorizationError, AuthorizationErrorKind, PolicyError};
pub use identity::{
	extract_bearer_token, extract_session_cookie_with_name, AnonymousResolver,
	BearerTokenResolver, Identity, IdentityResolver, Subject, TokenRejected, TokenVerifier,
	UserIdentity, SESSION_COOKIE_NAME,
};
pub use policy::{predicates, FnPolicy, Policy, PolicySet};
pub use types::{Action, ResourceAttrs};
