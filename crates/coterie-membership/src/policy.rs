//! Role model: the minimum requester role for each action.
//!
//! Requirements are data. [`REQUIREMENTS`] lists every known
//! `(action, target role)` pair; anything missing resolves to the highest role.

use std::fmt;

use coterie_storage::Role;

/// Kinds of action a requester can take against a group.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Action {
    ReadGroup,
    UpdateGroup,
    AddUser,
    RemoveUser,
    /// A member removing themselves.
    LeaveGroup,
    ChangeRole,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::ReadGroup => "read_group",
            Action::UpdateGroup => "update_group",
            Action::AddUser => "add_user",
            Action::RemoveUser => "remove_user",
            Action::LeaveGroup => "leave_group",
            Action::ChangeRole => "change_role",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `(action, target role, minimum requester role)`
pub const REQUIREMENTS: &[(Action, Role, Role)] = &[
    (Action::ReadGroup, Role::Member, Role::Member),
    (Action::ReadGroup, Role::Admin, Role::Member),
    (Action::ReadGroup, Role::Owner, Role::Member),
    (Action::UpdateGroup, Role::Member, Role::Admin),
    (Action::UpdateGroup, Role::Admin, Role::Admin),
    (Action::UpdateGroup, Role::Owner, Role::Admin),
    (Action::AddUser, Role::Member, Role::Admin),
    (Action::AddUser, Role::Admin, Role::Owner),
    (Action::AddUser, Role::Owner, Role::Owner),
    (Action::RemoveUser, Role::Member, Role::Admin),
    (Action::RemoveUser, Role::Admin, Role::Owner),
    (Action::RemoveUser, Role::Owner, Role::Owner),
    (Action::LeaveGroup, Role::Member, Role::Member),
    (Action::LeaveGroup, Role::Admin, Role::Member),
    (Action::LeaveGroup, Role::Owner, Role::Member),
    (Action::ChangeRole, Role::Member, Role::Admin),
    (Action::ChangeRole, Role::Admin, Role::Owner),
    (Action::ChangeRole, Role::Owner, Role::Owner),
];

/// Minimum role the requester must hold to perform `action` on a member with `target_role`.
pub fn required_role(action: Action, target_role: Role) -> Role {
    lookup(REQUIREMENTS, action, target_role)
}

/// Requirement for moving a member from `current` to `new`: both ends must be covered.
pub fn required_role_for_change(current: Role, new: Role) -> Role {
    required_role(Action::ChangeRole, current).max(required_role(Action::ChangeRole, new))
}

fn lookup(table: &[(Action, Role, Role)], action: Action, target_role: Role) -> Role {
    table
        .iter()
        .find(|(a, t, _)| *a == action && *t == target_role)
        .map(|(_, _, required)| *required)
        .unwrap_or_else(Role::highest)
}
