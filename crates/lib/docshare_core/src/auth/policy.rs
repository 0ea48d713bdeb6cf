//! Role-based access policy.
//!
//! A closed table mapping each operation to the single role allowed to
//! perform it. Checks are strict equality on the role tag: no hierarchy,
//! no multi-role membership, no per-resource ownership.

use std::fmt;

use thiserror::Error;

use crate::models::auth::Role;

/// Operations gated by the policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Upload,
    Download,
    Signup,
    Login,
    Refresh,
}

impl Operation {
    /// Role required to perform the operation, if any.
    pub fn required_role(self) -> Option<Role> {
        match self {
            Operation::Upload => Some(Role::Operation),
            Operation::Download => Some(Role::Client),
            Operation::Signup | Operation::Login | Operation::Refresh => None,
        }
    }

    fn denial_reason(self) -> &'static str {
        match self {
            Operation::Upload => "only operation users can upload",
            Operation::Download => "only client users can download",
            Operation::Signup | Operation::Login | Operation::Refresh => "",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::Upload => "upload",
            Operation::Download => "download",
            Operation::Signup => "signup",
            Operation::Login => "login",
            Operation::Refresh => "refresh",
        };
        f.write_str(name)
    }
}

/// Policy decision failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AccessDenied {
    /// The operation needs a role but the caller presented no identity.
    #[error("authentication required for {0}")]
    Unauthenticated(Operation),

    /// The caller's role does not match the operation's required role.
    #[error("{reason}")]
    Denied {
        operation: Operation,
        reason: &'static str,
    },
}

/// Decide whether a caller holding `role` may perform `operation`.
pub fn authorize(operation: Operation, role: Option<Role>) -> Result<(), AccessDenied> {
    let Some(required) = operation.required_role() else {
        return Ok(());
    };
    match role {
        None => Err(AccessDenied::Unauthenticated(operation)),
        Some(role) if role == required => Ok(()),
        Some(_) => Err(AccessDenied::Denied {
            operation,
            reason: operation.denial_reason(),
        }),
    }
}
