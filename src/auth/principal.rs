use serde::{Deserialize, Serialize};

use super::access::BranchScope;
use super::Claims;
use crate::database::models::{Branch, User};

pub const ROLE_MAIN_MANAGER: &str = "main_manager";
pub const ROLE_BRANCH_MANAGER: &str = "branch_manager";

/// An authenticated actor, normalized into a closed shape.
///
/// A branch manager always carries a branch id; the main manager never does.
/// Branch logins (a branch record used as a credential) are synthesized into
/// `BranchManager` at token-issue time, so nothing downstream special-cases
/// them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Principal {
    MainManager { user_id: i32, username: String },
    BranchManager { user_id: i32, username: String, branch_id: i32 },
}

impl Principal {
    /// Normalize token claims; rejects malformed combinations such as a
    /// branch_manager role without a branch id.
    pub fn from_claims(claims: &Claims) -> Result<Self, String> {
        match claims.role.as_str() {
            ROLE_MAIN_MANAGER => Ok(Principal::MainManager {
                user_id: claims.sub,
                username: claims.username.clone(),
            }),
            ROLE_BRANCH_MANAGER => match claims.branch_id {
                Some(branch_id) => Ok(Principal::BranchManager {
                    user_id: claims.sub,
                    username: claims.username.clone(),
                    branch_id,
                }),
                None => Err("branch_manager token is missing branch_id".to_string()),
            },
            other => Err(format!("Unknown role: {}", other)),
        }
    }

    /// Principal for a users-table login
    pub fn from_user(user: &User) -> Result<Self, String> {
        match user.role.as_str() {
            ROLE_MAIN_MANAGER => {
                Ok(Principal::MainManager { user_id: user.id, username: user.username.clone() })
            }
            ROLE_BRANCH_MANAGER => match user.branch_id {
                Some(branch_id) => Ok(Principal::BranchManager {
                    user_id: user.id,
                    username: user.username.clone(),
                    branch_id,
                }),
                None => Err(format!("branch_manager user {} has no branch_id", user.id)),
            },
            other => Err(format!("Unknown role: {}", other)),
        }
    }

    /// Principal synthesized from a branch record used as a login. The role is
    /// forced to branch_manager and the scope is the branch's own id.
    pub fn from_branch(branch: &Branch) -> Self {
        Principal::BranchManager {
            user_id: branch.id,
            username: branch.username.clone(),
            branch_id: branch.id,
        }
    }

    pub fn id(&self) -> i32 {
        match self {
            Principal::MainManager { user_id, .. } => *user_id,
            Principal::BranchManager { user_id, .. } => *user_id,
        }
    }

    pub fn username(&self) -> &str {
        match self {
            Principal::MainManager { username, .. } => username,
            Principal::BranchManager { username, .. } => username,
        }
    }

    pub fn role_str(&self) -> &'static str {
        match self {
            Principal::MainManager { .. } => ROLE_MAIN_MANAGER,
            Principal::BranchManager { .. } => ROLE_BRANCH_MANAGER,
        }
    }

    pub fn branch_id(&self) -> Option<i32> {
        match self {
            Principal::MainManager { .. } => None,
            Principal::BranchManager { branch_id, .. } => Some(*branch_id),
        }
    }

    pub fn is_main_manager(&self) -> bool {
        matches!(self, Principal::MainManager { .. })
    }

    /// The branch scope every listing query must filter by. Derived from the
    /// same shape `can_access` evaluates, so list filtering and point-access
    /// checks cannot drift apart.
    pub fn scope(&self) -> BranchScope {
        match self {
            Principal::MainManager { .. } => BranchScope::All,
            Principal::BranchManager { branch_id, .. } => BranchScope::Branch(*branch_id),
        }
    }

    pub fn to_claims(&self) -> Claims {
        Claims::new(
            self.id(),
            self.username().to_string(),
            self.role_str().to_string(),
            self.branch_id(),
        )
    }
}
