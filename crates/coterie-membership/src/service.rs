//! Membership operations: authorize, check preconditions, apply one conditional write.

use std::sync::Arc;

use coterie_storage::{
    AddGroupMemberParams, CreateGroupParams, Group, GroupId, GroupMember, GroupType, Role, Store,
    StoreError, UpdateGroupParams, UserId,
};
use tracing::{debug, info, warn};

use crate::authz::{Authorizer, Decision};
use crate::config::{MembershipConfig, ReadPolicy};
use crate::metrics::{record_decision, record_op};
use crate::policy::{self, Action};
use crate::MembershipError;

/// Entry point for every group and membership action.
///
/// Requests against the same or different groups may run concurrently; the only
/// shared state is the store, and every write goes through one of its conditional
/// operations.
pub struct MembershipService<S> {
    store: Arc<S>,
    authorizer: Authorizer<S>,
    config: MembershipConfig,
}

impl<S> Clone for MembershipService<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            authorizer: self.authorizer.clone(),
            config: self.config.clone(),
        }
    }
}

/// Member writes are retried once when the target's role moved after authorization.
const WRITE_ATTEMPTS: u32 = 2;

fn unexpected(context: String, e: StoreError) -> MembershipError {
    warn!(error = %e, "{context}");
    MembershipError::Unexpected(format!("{context}: {e}"))
}

fn member_not_found(group_id: &GroupId, user_id: &UserId) -> MembershipError {
    MembershipError::MemberNotFound {
        group_id: group_id.clone(),
        user_id: user_id.clone(),
    }
}

fn map_member_write_err(
    group_id: &GroupId,
    user_id: &UserId,
    e: StoreError,
    doing: &str,
) -> MembershipError {
    match e {
        // Lost a race with a concurrent removal
        StoreError::NotFound => member_not_found(group_id, user_id),
        StoreError::Conflict => {
            debug!(?group_id, ?user_id, "Refused to leave group without an owner");
            MembershipError::LastOwner {
                group_id: group_id.clone(),
                user_id: user_id.clone(),
            }
        }
        StoreError::RoleMismatch => {
            debug!(?group_id, ?user_id, "Member role kept changing during write");
            MembershipError::RoleChanged {
                group_id: group_id.clone(),
                user_id: user_id.clone(),
            }
        }
        e => unexpected(
            format!("Unexpected error when {doing} user {user_id} in group {group_id}"),
            e,
        ),
    }
}

impl<S: Store> MembershipService<S> {
    pub fn new(store: Arc<S>, config: MembershipConfig) -> Self {
        Self {
            authorizer: Authorizer::new(store.clone()),
            store,
            config,
        }
    }

    pub fn authorizer(&self) -> &Authorizer<S> {
        &self.authorizer
    }

    pub fn config(&self) -> &MembershipConfig {
        &self.config
    }

    // ───────────────────────────────────── Groups ─────────────────────────────────────────

    /// Create a group with `params.created_by` as its only owner.
    pub async fn create_group(&self, params: &CreateGroupParams) -> Result<Group, MembershipError> {
        let result = self.store.create_group(params).await.map_err(|e| {
            unexpected(format!("Unexpected error when creating group {}", params.name), e)
        });

        if let Ok(group) = &result {
            info!(group_id = ?group.id, created_by = ?params.created_by, name = %group.name, "Created group");
        }
        record_op("create_group", &result);
        result
    }

    /// Read a group snapshot.
    ///
    /// Under [`ReadPolicy::Open`] no authorization is applied. Under
    /// [`ReadPolicy::PrivateMembersOnly`], private groups require the requester to be a member.
    pub async fn get_group(
        &self,
        group_id: &GroupId,
        requester: Option<&UserId>,
    ) -> Result<Group, MembershipError> {
        let result = async {
            let group = self.find_group(group_id).await?;
            self.check_read(&group, requester)?;
            Ok(group)
        }
        .await;

        record_op("get_group", &result);
        result
    }

    /// List a group's members, gated like [`Self::get_group`].
    pub async fn list_members(
        &self,
        group_id: &GroupId,
        requester: Option<&UserId>,
    ) -> Result<Vec<GroupMember>, MembershipError> {
        let result = async {
            let group = self.find_group(group_id).await?;
            self.check_read(&group, requester)?;
            Ok(group.members)
        }
        .await;

        record_op("list_members", &result);
        result
    }

    /// Update group fields. Requires at least `Admin`.
    pub async fn update_group(
        &self,
        group_id: &GroupId,
        params: &UpdateGroupParams,
        requester: &UserId,
    ) -> Result<Group, MembershipError> {
        let result = async {
            let group = self.find_group(group_id).await?;
            self.authorizer
                .authorize(group_id, requester, Action::UpdateGroup, Role::lowest())
                .await?
                .into_result()?;

            if params.is_empty() {
                return Ok(group);
            }

            let updated = self
                .store
                .update_group(group_id, params, requester)
                .await
                .map_err(|e| match e {
                    StoreError::NotFound => MembershipError::GroupNotFound(group_id.clone()),
                    e => unexpected(format!("Unexpected error when updating group {group_id}"), e),
                })?;

            info!(?group_id, modified_by = ?requester, "Updated group");
            Ok(updated)
        }
        .await;

        record_op("update_group", &result);
        result
    }

    // ──────────────────────────────────── Members ─────────────────────────────────────────

    /// Add a user to a group.
    ///
    /// Fails when the group does not exist, when the requester's role is below the
    /// requirement for adding a member with `role`, or when the user is already in the
    /// group. `role` defaults to the lowest role.
    pub async fn add_user(
        &self,
        group_id: &GroupId,
        user_id: &UserId,
        role: Option<Role>,
        requester: &UserId,
    ) -> Result<GroupMember, MembershipError> {
        let role = role.unwrap_or_else(Role::lowest);

        let result = async {
            self.find_group(group_id).await?;
            self.authorizer
                .authorize(group_id, requester, Action::AddUser, role)
                .await?
                .into_result()?;

            let member = self
                .store
                .add_group_member(&AddGroupMemberParams {
                    group_id: group_id.clone(),
                    user_id: user_id.clone(),
                    role,
                    added_by: Some(requester.clone()),
                })
                .await
                .map_err(|e| match e {
                    StoreError::AlreadyExists => {
                        debug!(?group_id, ?user_id, "User already in group");
                        MembershipError::UserAlreadyExistsInGroup {
                            group_id: group_id.clone(),
                            user_id: user_id.clone(),
                        }
                    }
                    StoreError::NotFound => MembershipError::GroupNotFound(group_id.clone()),
                    e => unexpected(
                        format!("Unexpected error when adding user {user_id} to group {group_id}"),
                        e,
                    ),
                })?;

            info!(?group_id, ?user_id, %role, added_by = ?requester, "Added user to group");
            Ok(member)
        }
        .await;

        record_op("add_user", &result);
        result
    }

    /// Remove a user from a group, or leave it when `user_id == requester`.
    ///
    /// The requirement depends on the target's current role, and the delete only
    /// applies while the target still holds that role. The group's last owner can
    /// never be removed.
    pub async fn remove_user(
        &self,
        group_id: &GroupId,
        user_id: &UserId,
        requester: &UserId,
    ) -> Result<GroupMember, MembershipError> {
        let action = if user_id == requester {
            Action::LeaveGroup
        } else {
            Action::RemoveUser
        };

        let result = async {
            self.find_group(group_id).await?;

            let mut attempt = 1;
            loop {
                let target = self.find_member(group_id, user_id).await?;

                // A missing target is only reported to requesters allowed to remove members.
                let target_role = target.as_ref().map_or_else(Role::lowest, |m| m.role);
                self.authorizer
                    .authorize(group_id, requester, action, target_role)
                    .await?
                    .into_result()?;
                if target.is_none() {
                    return Err(member_not_found(group_id, user_id));
                }

                match self
                    .store
                    .remove_group_member(group_id, user_id, target_role)
                    .await
                {
                    Ok(removed) => {
                        info!(?group_id, ?user_id, role = %removed.role, removed_by = ?requester, "Removed user from group");
                        return Ok(removed);
                    }
                    Err(StoreError::RoleMismatch) if attempt < WRITE_ATTEMPTS => {
                        debug!(?group_id, ?user_id, "Member role changed before removal, re-authorizing");
                        attempt += 1;
                    }
                    Err(e) => return Err(map_member_write_err(group_id, user_id, e, "removing")),
                }
            }
        }
        .await;

        record_op(action.as_str(), &result);
        result
    }

    /// Change a member's role. The requester must cover both the current and the new role,
    /// and the update only applies while the member still holds the current role.
    pub async fn change_role(
        &self,
        group_id: &GroupId,
        user_id: &UserId,
        role: Role,
        requester: &UserId,
    ) -> Result<GroupMember, MembershipError> {
        let result = async {
            self.find_group(group_id).await?;

            let mut attempt = 1;
            loop {
                let target = self.find_member(group_id, user_id).await?;

                let current = target.as_ref().map_or_else(Role::lowest, |m| m.role);
                self.authorizer
                    .authorize_role_change(group_id, requester, current, role)
                    .await?
                    .into_result()?;
                let Some(target) = target else {
                    return Err(member_not_found(group_id, user_id));
                };

                if target.role == role {
                    return Ok(target);
                }

                match self
                    .store
                    .update_group_member_role(group_id, user_id, current, role)
                    .await
                {
                    Ok(updated) => {
                        info!(?group_id, ?user_id, from = %current, to = %role, changed_by = ?requester, "Changed member role");
                        return Ok(updated);
                    }
                    Err(StoreError::RoleMismatch) if attempt < WRITE_ATTEMPTS => {
                        debug!(?group_id, ?user_id, "Member role changed concurrently, re-authorizing");
                        attempt += 1;
                    }
                    Err(e) => {
                        return Err(map_member_write_err(
                            group_id,
                            user_id,
                            e,
                            "changing role of",
                        ))
                    }
                }
            }
        }
        .await;

        record_op("change_role", &result);
        result
    }

    // ──────────────────────────────────── Helpers ─────────────────────────────────────────

    async fn find_group(&self, group_id: &GroupId) -> Result<Group, MembershipError> {
        self.store.get_group(group_id).await.map_err(|e| match e {
            StoreError::NotFound => MembershipError::GroupNotFound(group_id.clone()),
            e => unexpected(format!("Unexpected error when reading group {group_id}"), e),
        })
    }

    async fn find_member(
        &self,
        group_id: &GroupId,
        user_id: &UserId,
    ) -> Result<Option<GroupMember>, MembershipError> {
        match self.store.get_group_member(group_id, user_id).await {
            Ok(member) => Ok(Some(member)),
            Err(StoreError::NotFound) => Ok(None),
            Err(e) => Err(unexpected(
                format!("Unexpected error when reading member {user_id} of group {group_id}"),
                e,
            )),
        }
    }

    fn check_read(&self, group: &Group, requester: Option<&UserId>) -> Result<(), MembershipError> {
        if self.config.read_policy == ReadPolicy::Open || group.group_type == GroupType::Public {
            return Ok(());
        }

        let requester_role = requester.and_then(|r| group.member(r)).map(|m| m.role);
        let required = policy::required_role(Action::ReadGroup, Role::lowest());
        let decision = Decision::evaluate(requester_role, required);
        record_decision(Action::ReadGroup, &decision);
        if let Decision::Deny(reason) = decision {
            debug!(group_id = ?group.id, ?requester, %reason, "Read of private group denied");
        }
        decision.into_result().map(|_| ())
    }
}
