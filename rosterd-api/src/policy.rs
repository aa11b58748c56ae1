/// Per-action authorization decisions
///
/// The permission rules for both resources live here as a pure match over a
/// closed action enum, so the whole permission matrix is auditable in one
/// place and testable without a server or a database.
///
/// # Rules
///
/// Organization resource:
/// - `list` / `retrieve`: anyone, including anonymous callers
/// - everything else: staff or superuser only
///
/// User resource:
/// - `create`: anyone (self-registration)
/// - `retrieve` / `update` / `partial_update`: the user themselves, or staff
/// - `list` / `destroy`: staff only
///
/// A Deny never raises; it carries whether the caller was missing entirely
/// (→ 401) or authenticated but not permitted (→ 403).

use serde::Serialize;
use uuid::Uuid;

use crate::error::ApiError;

/// The authenticated principal attached to a request
///
/// Resolved from a validated access token by the router's auth layer; absent
/// for anonymous requests.
#[derive(Debug, Clone, Serialize)]
pub struct Caller {
    /// User ID of the caller
    pub id: Uuid,

    /// Staff flag: grants cross-user access and resource management
    pub is_staff: bool,

    /// Superuser flag: admin-equivalent for organization mutation
    pub is_superuser: bool,
}

impl Caller {
    /// Staff or superuser — allowed to mutate organizations
    pub fn is_admin(&self) -> bool {
        self.is_staff || self.is_superuser
    }
}

/// The closed set of actions a request can perform on a resource
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    List,
    Retrieve,
    Create,
    Update,
    PartialUpdate,
    Destroy,
}

/// Outcome of a policy check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny(DenyReason),
}

/// Why a policy check denied the action
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    /// No caller identity where one is required
    Unauthenticated,

    /// Caller is authenticated but lacks permission
    Forbidden,
}

impl Decision {
    /// Converts a decision into a handler result
    ///
    /// Allow passes through; Deny becomes the matching client-visible error.
    pub fn require(self) -> Result<(), ApiError> {
        match self {
            Decision::Allow => Ok(()),
            Decision::Deny(DenyReason::Unauthenticated) => Err(ApiError::Unauthorized(
                "Authentication credentials were not provided".to_string(),
            )),
            Decision::Deny(DenyReason::Forbidden) => Err(ApiError::Forbidden(
                "You do not have permission to perform this action".to_string(),
            )),
        }
    }
}

fn deny(caller: Option<&Caller>) -> Decision {
    match caller {
        Some(_) => Decision::Deny(DenyReason::Forbidden),
        None => Decision::Deny(DenyReason::Unauthenticated),
    }
}

/// Decides whether `caller` may perform `action` on the user resource
///
/// `target` is the id of the user being acted on; it is irrelevant for
/// `create` and `list`.
pub fn user_action(caller: Option<&Caller>, action: Action, target: Option<Uuid>) -> Decision {
    match action {
        // Self-registration is open to anyone
        Action::Create => Decision::Allow,

        Action::Retrieve | Action::Update | Action::PartialUpdate => match caller {
            Some(c) if c.is_staff => Decision::Allow,
            Some(c) if target == Some(c.id) => Decision::Allow,
            other => deny(other),
        },

        Action::List | Action::Destroy => match caller {
            Some(c) if c.is_staff => Decision::Allow,
            other => deny(other),
        },
    }
}

/// Decides whether `caller` may perform `action` on the organization resource
pub fn organization_action(caller: Option<&Caller>, action: Action) -> Decision {
    match action {
        // Read access is universal
        Action::List | Action::Retrieve => Decision::Allow,

        Action::Create | Action::Update | Action::PartialUpdate | Action::Destroy => match caller {
            Some(c) if c.is_admin() => Decision::Allow,
            other => deny(other),
        },
    }
}
