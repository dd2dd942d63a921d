//! Board membership roles and the permission table.
//!
//! Mutation handlers check permissions before calling into the
//! collaboration core; the core itself never re-checks. The vocabulary
//! lives here so handlers and storage share one definition.

use serde::{Deserialize, Serialize};

/// Role of a user on a board.
///
/// Hierarchy: `Owner > Editor > Viewer`. Higher roles include all
/// permissions of lower roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    Viewer,
    Editor,
    Owner,
}

impl Role {
    /// Returns true if this role meets or exceeds the required role.
    pub fn at_least(&self, required: Role) -> bool {
        *self >= required
    }
}

/// Actions a board member may perform, mapped to a minimum role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    ViewBoard,
    EditBoard,
    DeleteBoard,
    ManageMembers,
    CreateColumn,
    EditColumn,
    DeleteColumn,
    ReorderColumns,
    ViewTask,
    CreateTask,
    EditTask,
    DeleteTask,
    MoveTask,
    AssignTask,
    ViewComment,
    CreateComment,
    DeleteAnyComment,
}

impl Permission {
    /// Minimum role required for this permission.
    ///
    /// Viewers can read everything and leave comments; structural
    /// changes require Editor; board lifecycle and membership require
    /// Owner.
    pub fn required_role(&self) -> Role {
        use Permission::*;
        match self {
            ViewBoard | ViewTask | ViewComment | CreateComment => Role::Viewer,
            EditBoard | CreateColumn | EditColumn | DeleteColumn | ReorderColumns
            | CreateTask | EditTask | DeleteTask | MoveTask | AssignTask
            | DeleteAnyComment => Role::Editor,
            DeleteBoard | ManageMembers => Role::Owner,
        }
    }

    /// Returns true if the given role grants this permission.
    pub fn granted_to(&self, role: Role) -> bool {
        role.at_least(self.required_role())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_hierarchy_orders_correctly() {
        assert!(Role::Owner > Role::Editor);
        assert!(Role::Editor > Role::Viewer);
    }

    #[test]
    fn owner_has_every_permission() {
        assert!(Permission::DeleteBoard.granted_to(Role::Owner));
        assert!(Permission::MoveTask.granted_to(Role::Owner));
        assert!(Permission::CreateComment.granted_to(Role::Owner));
    }

    #[test]
    fn editor_can_move_tasks_but_not_manage_members() {
        assert!(Permission::MoveTask.granted_to(Role::Editor));
        assert!(Permission::ReorderColumns.granted_to(Role::Editor));
        assert!(!Permission::ManageMembers.granted_to(Role::Editor));
        assert!(!Permission::DeleteBoard.granted_to(Role::Editor));
    }

    #[test]
    fn viewer_can_comment_but_not_mutate_structure() {
        assert!(Permission::ViewBoard.granted_to(Role::Viewer));
        assert!(Permission::CreateComment.granted_to(Role::Viewer));
        assert!(!Permission::MoveTask.granted_to(Role::Viewer));
        assert!(!Permission::CreateColumn.granted_to(Role::Viewer));
    }

    #[test]
    fn role_serializes_uppercase() {
        assert_eq!(serde_json::to_string(&Role::Owner).unwrap(), "\"OWNER\"");
        assert_eq!(serde_json::to_string(&Role::Viewer).unwrap(), "\"VIEWER\"");
    }
}
