//! Group and membership records.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};

use super::{GroupId, GroupType, Role, UserId};

/// Group snapshot, including its members.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Group {
    pub id: GroupId,
    pub name: String,
    pub description: String,
    pub icon: String,
    pub group_type: GroupType,
    pub tags: BTreeSet<String>,
    /// Ordered by join time, then user id.
    pub members: Vec<GroupMember>,
    pub exchange_address: Option<String>,
    pub created_by: UserId,
    pub modified_by: UserId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Group {
    /// Find a member record in this snapshot.
    pub fn member(&self, user_id: &UserId) -> Option<&GroupMember> {
        self.members.iter().find(|m| &m.user_id == user_id)
    }

    /// Number of members holding the given role.
    pub fn count_role(&self, role: Role) -> usize {
        self.members.iter().filter(|m| m.role == role).count()
    }
}

/// Group membership record. At most one exists per (group, user) pair.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GroupMember {
    pub group_id: GroupId,
    pub user_id: UserId,
    pub role: Role,
    pub added_by: Option<UserId>, // None for the group creator
    pub joined_at: DateTime<Utc>,
}

/// Parameters for creating a group. The creator becomes its first owner.
#[derive(Clone, Debug)]
pub struct CreateGroupParams {
    pub name: String,
    pub description: String,
    pub icon: String,
    pub group_type: GroupType,
    pub tags: BTreeSet<String>,
    pub exchange_address: Option<String>,
    pub created_by: UserId,
}

/// Partial update of group fields (`None` leaves a field untouched).
#[derive(Clone, Debug, Default)]
pub struct UpdateGroupParams {
    pub name: Option<String>,
    pub description: Option<String>,
    pub icon: Option<String>,
    pub group_type: Option<GroupType>,
    pub tags: Option<BTreeSet<String>>,
    pub exchange_address: Option<Option<String>>,
}

impl UpdateGroupParams {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.icon.is_none()
            && self.group_type.is_none()
            && self.tags.is_none()
            && self.exchange_address.is_none()
    }
}

/// Parameters for adding a member to a group
#[derive(Clone, Debug)]
pub struct AddGroupMemberParams {
    pub group_id: GroupId,
    pub user_id: UserId,
    pub role: Role,
    pub added_by: Option<UserId>,
}
