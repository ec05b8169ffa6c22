//! Pure access-control evaluator.
//!
//! One decision function covers every resource/operation pair; handlers never
//! compare role strings directly. Listing queries filter by the same
//! [`BranchScope`] the evaluator consults, keeping collection reads and
//! point-access checks in agreement.

use super::Principal;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny,
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow)
    }
}

/// Which rows of branch-owned data a caller may see
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BranchScope {
    All,
    Branch(i32),
}

impl BranchScope {
    pub fn permits(&self, branch_id: i32) -> bool {
        match self {
            BranchScope::All => true,
            BranchScope::Branch(own) => *own == branch_id,
        }
    }
}

/// Resource/operation pairs with distinct authorization rules
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceOp {
    BranchRead,
    /// Branch create/update/delete
    BranchAdmin,
    /// User create/read/update/delete
    UserAdmin,
    EmployeeRead,
    /// Employee create/update
    EmployeeWrite,
    /// Employee deactivation
    EmployeeDelete,
    DocumentRead,
    /// Document upload/metadata edit/file replace/soft delete
    DocumentWrite,
    DocumentVerify,
}

impl ResourceOp {
    /// Operations reserved for the main manager regardless of branch match
    fn main_manager_only(&self) -> bool {
        matches!(
            self,
            ResourceOp::BranchAdmin
                | ResourceOp::UserAdmin
                | ResourceOp::EmployeeDelete
                | ResourceOp::DocumentVerify
        )
    }
}

/// Decide whether `principal` may perform `op` against data owned by
/// `target_branch` (None for resources without a branch owner, e.g. users).
///
/// Pure function: no I/O, no side effects.
pub fn can_access(principal: &Principal, target_branch: Option<i32>, op: ResourceOp) -> Decision {
    if principal.is_main_manager() {
        return Decision::Allow;
    }

    if op.main_manager_only() {
        return Decision::Deny;
    }

    match target_branch {
        Some(branch_id) if principal.scope().permits(branch_id) => Decision::Allow,
        _ => Decision::Deny,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn main_manager() -> Principal {
        Principal::MainManager { user_id: 1, username: "admin".into() }
    }

    fn branch_manager(branch_id: i32) -> Principal {
        Principal::BranchManager { user_id: 10, username: "mgr".into(), branch_id }
    }

    #[test]
    fn main_manager_is_allowed_everywhere() {
        let p = main_manager();
        for op in [
            ResourceOp::BranchRead,
            ResourceOp::BranchAdmin,
            ResourceOp::UserAdmin,
            ResourceOp::EmployeeRead,
            ResourceOp::EmployeeWrite,
            ResourceOp::EmployeeDelete,
            ResourceOp::DocumentRead,
            ResourceOp::DocumentWrite,
            ResourceOp::DocumentVerify,
        ] {
            for target in [None, Some(1), Some(99)] {
                assert_eq!(can_access(&p, target, op), Decision::Allow);
            }
        }
    }

    #[test]
    fn branch_manager_allowed_iff_branch_matches() {
        let p = branch_manager(7);
        for target in [3, 7, 9] {
            let expected = if target == 7 { Decision::Allow } else { Decision::Deny };
            assert_eq!(can_access(&p, Some(target), ResourceOp::DocumentRead), expected);
            assert_eq!(can_access(&p, Some(target), ResourceOp::DocumentWrite), expected);
            assert_eq!(can_access(&p, Some(target), ResourceOp::EmployeeWrite), expected);
            assert_eq!(can_access(&p, Some(target), ResourceOp::BranchRead), expected);
        }
    }

    #[test]
    fn role_ceilings_deny_branch_manager_even_on_own_branch() {
        let p = branch_manager(7);
        assert_eq!(can_access(&p, Some(7), ResourceOp::BranchAdmin), Decision::Deny);
        assert_eq!(can_access(&p, Some(7), ResourceOp::EmployeeDelete), Decision::Deny);
        assert_eq!(can_access(&p, Some(7), ResourceOp::DocumentVerify), Decision::Deny);
        assert_eq!(can_access(&p, None, ResourceOp::UserAdmin), Decision::Deny);
    }

    #[test]
    fn branch_manager_denied_without_target_branch() {
        let p = branch_manager(7);
        assert_eq!(can_access(&p, None, ResourceOp::DocumentWrite), Decision::Deny);
    }

    #[test]
    fn scope_agrees_with_point_checks() {
        let p = branch_manager(7);
        assert!(p.scope().permits(7));
        assert!(!p.scope().permits(3));
        assert!(main_manager().scope().permits(3));
    }
}
