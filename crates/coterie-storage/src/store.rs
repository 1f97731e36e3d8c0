//! The Store trait that backends implement.

use crate::types::*;
use crate::StoreError;

/// The storage trait `coterie-membership` depends on.
///
/// Every membership write is a single conditional operation: backends must check
/// the precondition and apply the write atomically (unique constraint, guarded
/// statement, or one critical section), never as a read followed by a write.
#[cfg_attr(feature = "test-support", mockall::automock)]
#[async_trait::async_trait]
pub trait Store: Send + Sync {
    // ───────────────────────────────────── Groups ─────────────────────────────────────────

    /// Create a group and record its creator as `Owner` in one atomic step.
    async fn create_group(&self, params: &CreateGroupParams) -> Result<Group, StoreError>;

    /// Get a group snapshot (fields, tags and members) by ID.
    async fn get_group(&self, group_id: &GroupId) -> Result<Group, StoreError>;

    /// Apply a partial field update and stamp `modified_by`/`updated_at`.
    async fn update_group(
        &self,
        group_id: &GroupId,
        params: &UpdateGroupParams,
        modified_by: &UserId,
    ) -> Result<Group, StoreError>;

    // ──────────────────────────────────── Members ─────────────────────────────────────────

    /// Get the membership record for a (group, user) pair.
    async fn get_group_member(
        &self,
        group_id: &GroupId,
        user_id: &UserId,
    ) -> Result<GroupMember, StoreError>;

    /// List all members of a group (`NotFound` if the group does not exist).
    async fn list_group_members(&self, group_id: &GroupId)
        -> Result<Vec<GroupMember>, StoreError>;

    /// Insert a membership only if none exists for the pair.
    ///
    /// Returns `AlreadyExists` if the pair is present and `NotFound` if the group is absent.
    async fn add_group_member(
        &self,
        params: &AddGroupMemberParams,
    ) -> Result<GroupMember, StoreError>;

    /// Delete a membership whose role is still `expected_role`, returning the removed record.
    ///
    /// Returns `NotFound` if absent, `RoleMismatch` if the member's role is no longer
    /// `expected_role`, and `Conflict` if the member is the group's last owner.
    async fn remove_group_member(
        &self,
        group_id: &GroupId,
        user_id: &UserId,
        expected_role: Role,
    ) -> Result<GroupMember, StoreError>;

    /// Move a member from `expected_role` to `role`, returning the updated record.
    ///
    /// Returns `NotFound` if absent, `RoleMismatch` if the member's role is no longer
    /// `expected_role`, and `Conflict` if it would demote the last owner.
    async fn update_group_member_role(
        &self,
        group_id: &GroupId,
        user_id: &UserId,
        expected_role: Role,
        role: Role,
    ) -> Result<GroupMember, StoreError>;
}
