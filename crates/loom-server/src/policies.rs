// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Built-in policy set for the server.
//!
//! | Policy   | Applies to                     | Permits             |
//! |----------|--------------------------------|---------------------|
//! | `Guest`  | anonymous requests             | `read`              |
//! | `Member` | authenticated, non-admin users | everything but `delete` |
//! | `Admin`  | users with the `admin` role    | everything          |

use loom_server_auth::{
	predicates, Action, AllowAll, AllowList, Environment, FnPolicy, PolicyError, PolicySet,
	ResourceAttrs, Rules, Subject, UserIdentity,
};

pub const ADMIN_ROLE: &str = "admin";

pub fn default_policies() -> Result<PolicySet, PolicyError> {
	PolicySet::new()
		.with(FnPolicy::new(
			"Guest",
			AllowList::new([Action::READ]),
			predicates::anonymous,
		))?
		.with(FnPolicy::new(
			"Member",
			Rules::new().allow(Action::ANY).deny(Action::DELETE),
			is_member,
		))?
		.with(FnPolicy::new("Admin", AllowAll, is_admin))
}

fn has_admin_role(subject: &Subject) -> bool {
	subject
		.downcast_ref::<UserIdentity>()
		.is_some_and(|user| user.has_role(ADMIN_ROLE))
}

fn is_admin(subject: Option<&Subject>, _: Option<&ResourceAttrs>, _: &Environment) -> bool {
	subject.is_some_and(has_admin_role)
}

fn is_member(subject: Option<&Subject>, _: Option<&ResourceAttrs>, _: &Environment) -> bool {
	subject.is_some_and(|s| !has_admin_role(s))
}
