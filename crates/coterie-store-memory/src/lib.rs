//! In-memory store implementation using a concurrent hash map.
//!
//! This implementation is suitable for:
//! - Single process deployments
//! - Development and testing
//!
//! State is lost when the process exits; use the SQLite store for persistence.

use async_trait::async_trait;
use chrono::Utc;
use coterie_storage::{
    AddGroupMemberParams, CreateGroupParams, Group, GroupId, GroupMember, Role, Store,
    StoreError, UpdateGroupParams, UserId,
};
use dashmap::DashMap;
use std::sync::Arc;

/// In-memory group store.
///
/// Each group (with its members) is one map entry. Writes go through
/// `DashMap::get_mut`, which holds the shard's write lock for the whole
/// check-and-mutate, so conditional writes on one group are serialized while
/// unrelated groups proceed in parallel.
#[derive(Clone, Default)]
pub struct MemoryStore {
    groups: Arc<DashMap<GroupId, Group>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn create_group(&self, params: &CreateGroupParams) -> Result<Group, StoreError> {
        let now = Utc::now();
        let id = GroupId::new();
        let group = Group {
            id: id.clone(),
            name: params.name.clone(),
            description: params.description.clone(),
            icon: params.icon.clone(),
            group_type: params.group_type,
            tags: params.tags.clone(),
            members: vec![GroupMember {
                group_id: id.clone(),
                user_id: params.created_by.clone(),
                role: Role::highest(),
                added_by: None,
                joined_at: now,
            }],
            exchange_address: params.exchange_address.clone(),
            created_by: params.created_by.clone(),
            modified_by: params.created_by.clone(),
            created_at: now,
            updated_at: now,
        };

        match self.groups.entry(id) {
            dashmap::mapref::entry::Entry::Occupied(_) => Err(StoreError::AlreadyExists),
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(group.clone());
                Ok(group)
            }
        }
    }

    async fn get_group(&self, group_id: &GroupId) -> Result<Group, StoreError> {
        self.groups
            .get(group_id)
            .map(|g| g.value().clone())
            .ok_or(StoreError::NotFound)
    }

    async fn update_group(
        &self,
        group_id: &GroupId,
        params: &UpdateGroupParams,
        modified_by: &UserId,
    ) -> Result<Group, StoreError> {
        let mut group = self.groups.get_mut(group_id).ok_or(StoreError::NotFound)?;

        if let Some(name) = &params.name {
            group.name = name.clone();
        }
        if let Some(description) = &params.description {
            group.description = description.clone();
        }
        if let Some(icon) = &params.icon {
            group.icon = icon.clone();
        }
        if let Some(group_type) = params.group_type {
            group.group_type = group_type;
        }
        if let Some(tags) = &params.tags {
            group.tags = tags.clone();
        }
        if let Some(exchange_address) = &params.exchange_address {
            group.exchange_address = exchange_address.clone();
        }
        group.modified_by = modified_by.clone();
        group.updated_at = Utc::now();

        Ok(group.clone())
    }

    async fn get_group_member(
        &self,
        group_id: &GroupId,
        user_id: &UserId,
    ) -> Result<GroupMember, StoreError> {
        let group = self.groups.get(group_id).ok_or(StoreError::NotFound)?;
        group.member(user_id).cloned().ok_or(StoreError::NotFound)
    }

    async fn list_group_members(
        &self,
        group_id: &GroupId,
    ) -> Result<Vec<GroupMember>, StoreError> {
        let group = self.groups.get(group_id).ok_or(StoreError::NotFound)?;
        Ok(group.members.clone())
    }

    async fn add_group_member(
        &self,
        params: &AddGroupMemberParams,
    ) -> Result<GroupMember, StoreError> {
        let mut group = self
            .groups
            .get_mut(&params.group_id)
            .ok_or(StoreError::NotFound)?;

        if group.member(&params.user_id).is_some() {
            return Err(StoreError::AlreadyExists);
        }

        let member = GroupMember {
            group_id: params.group_id.clone(),
            user_id: params.user_id.clone(),
            role: params.role,
            added_by: params.added_by.clone(),
            joined_at: Utc::now(),
        };
        group.members.push(member.clone());
        Ok(member)
    }

    async fn remove_group_member(
        &self,
        group_id: &GroupId,
        user_id: &UserId,
        expected_role: Role,
    ) -> Result<GroupMember, StoreError> {
        let mut group = self.groups.get_mut(group_id).ok_or(StoreError::NotFound)?;

        let idx = group
            .members
            .iter()
            .position(|m| &m.user_id == user_id)
            .ok_or(StoreError::NotFound)?;

        if group.members[idx].role != expected_role {
            return Err(StoreError::RoleMismatch);
        }

        let top = Role::highest();
        if group.members[idx].role == top && group.count_role(top) == 1 {
            return Err(StoreError::Conflict);
        }

        Ok(group.members.remove(idx))
    }

    async fn update_group_member_role(
        &self,
        group_id: &GroupId,
        user_id: &UserId,
        expected_role: Role,
        role: Role,
    ) -> Result<GroupMember, StoreError> {
        let mut group = self.groups.get_mut(group_id).ok_or(StoreError::NotFound)?;

        let top = Role::highest();
        let owners = group.count_role(top);
        let member = group
            .members
            .iter_mut()
            .find(|m| &m.user_id == user_id)
            .ok_or(StoreError::NotFound)?;

        if member.role != expected_role {
            return Err(StoreError::RoleMismatch);
        }
        if member.role == top && role != top && owners == 1 {
            return Err(StoreError::Conflict);
        }

        member.role = role;
        Ok(member.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use coterie_storage::GroupType;
    use std::collections::BTreeSet;
    use uuid::Uuid;

    fn user() -> UserId {
        UserId(Uuid::new_v4())
    }

    async fn create_group(store: &MemoryStore, owner: &UserId) -> Group {
        store
            .create_group(&CreateGroupParams {
                name: "platform".to_string(),
                description: "Platform team".to_string(),
                icon: "rocket".to_string(),
                group_type: GroupType::Private,
                tags: BTreeSet::from(["infra".to_string()]),
                exchange_address: None,
                created_by: owner.clone(),
            })
            .await
            .unwrap()
    }

    fn add_params(group: &Group, user_id: &UserId, role: Role) -> AddGroupMemberParams {
        AddGroupMemberParams {
            group_id: group.id.clone(),
            user_id: user_id.clone(),
            role,
            added_by: Some(group.created_by.clone()),
        }
    }

    #[tokio::test]
    async fn create_group_records_creator_as_owner() {
        let store = MemoryStore::new();
        let owner = user();
        let group = create_group(&store, &owner).await;

        assert_eq!(group.members.len(), 1);
        assert_eq!(group.members[0].user_id, owner);
        assert_eq!(group.members[0].role, Role::Owner);
        assert_eq!(group.members[0].added_by, None);
        assert_eq!(store.get_group(&group.id).await.unwrap(), group);
    }

    #[tokio::test]
    async fn add_member_then_duplicate_is_rejected() {
        let store = MemoryStore::new();
        let group = create_group(&store, &user()).await;
        let alice = user();

        let added = store
            .add_group_member(&add_params(&group, &alice, Role::Admin))
            .await
            .unwrap();
        assert_eq!(added.role, Role::Admin);

        let found = store.get_group_member(&group.id, &alice).await.unwrap();
        assert_eq!(found.role, Role::Admin);

        // Second add fails regardless of the requested role
        let err = store
            .add_group_member(&add_params(&group, &alice, Role::Member))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::AlreadyExists));
        let found = store.get_group_member(&group.id, &alice).await.unwrap();
        assert_eq!(found.role, Role::Admin);
    }

    #[tokio::test]
    async fn add_member_to_missing_group() {
        let store = MemoryStore::new();
        let err = store
            .add_group_member(&AddGroupMemberParams {
                group_id: GroupId(Uuid::new_v4()),
                user_id: user(),
                role: Role::Member,
                added_by: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_adds_for_same_pair_yield_one_success() {
        let store = MemoryStore::new();
        let group = create_group(&store, &user()).await;
        let target = user();

        let attempts = (0..32).map(|i| {
            let store = store.clone();
            let params = add_params(
                &group,
                &target,
                if i % 2 == 0 { Role::Member } else { Role::Admin },
            );
            tokio::spawn(async move { store.add_group_member(&params).await })
        });
        let results = futures::future::join_all(attempts).await;

        let mut ok = 0;
        let mut conflicts = 0;
        for result in results {
            match result.unwrap() {
                Ok(_) => ok += 1,
                Err(StoreError::AlreadyExists) => conflicts += 1,
                Err(e) => panic!("unexpected error: {e}"),
            }
        }
        assert_eq!(ok, 1);
        assert_eq!(conflicts, 31);

        let members = store.list_group_members(&group.id).await.unwrap();
        assert_eq!(members.iter().filter(|m| m.user_id == target).count(), 1);
    }

    #[tokio::test]
    async fn last_owner_cannot_be_removed_or_demoted() {
        let store = MemoryStore::new();
        let owner = user();
        let group = create_group(&store, &owner).await;

        let err = store
            .remove_group_member(&group.id, &owner, Role::Owner)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict));
        let err = store
            .update_group_member_role(&group.id, &owner, Role::Owner, Role::Admin)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict));

        // With a second owner, the first can step down
        let second = user();
        store
            .add_group_member(&add_params(&group, &second, Role::Owner))
            .await
            .unwrap();
        let demoted = store
            .update_group_member_role(&group.id, &owner, Role::Owner, Role::Admin)
            .await
            .unwrap();
        assert_eq!(demoted.role, Role::Admin);
        assert_eq!(store.get_group(&group.id).await.unwrap().count_role(Role::Owner), 1);
    }

    #[tokio::test]
    async fn remove_and_update_missing_member() {
        let store = MemoryStore::new();
        let group = create_group(&store, &user()).await;
        let stranger = user();

        assert!(matches!(
            store.remove_group_member(&group.id, &stranger, Role::Member).await,
            Err(StoreError::NotFound)
        ));
        assert!(matches!(
            store
                .update_group_member_role(&group.id, &stranger, Role::Member, Role::Admin)
                .await,
            Err(StoreError::NotFound)
        ));
    }

    #[tokio::test]
    async fn stale_expected_role_is_rejected() {
        let store = MemoryStore::new();
        let group = create_group(&store, &user()).await;
        let alice = user();
        store
            .add_group_member(&add_params(&group, &alice, Role::Admin))
            .await
            .unwrap();

        assert!(matches!(
            store.remove_group_member(&group.id, &alice, Role::Member).await,
            Err(StoreError::RoleMismatch)
        ));
        assert!(matches!(
            store
                .update_group_member_role(&group.id, &alice, Role::Member, Role::Owner)
                .await,
            Err(StoreError::RoleMismatch)
        ));
        assert_eq!(
            store.get_group_member(&group.id, &alice).await.unwrap().role,
            Role::Admin
        );

        let removed = store
            .remove_group_member(&group.id, &alice, Role::Admin)
            .await
            .unwrap();
        assert_eq!(removed.user_id, alice);
    }

    #[tokio::test]
    async fn update_group_stamps_modifier() {
        let store = MemoryStore::new();
        let owner = user();
        let group = create_group(&store, &owner).await;
        let editor = user();

        let updated = store
            .update_group(
                &group.id,
                &UpdateGroupParams {
                    description: Some("Platform and tooling".to_string()),
                    group_type: Some(GroupType::Public),
                    ..Default::default()
                },
                &editor,
            )
            .await
            .unwrap();

        assert_eq!(updated.name, "platform");
        assert_eq!(updated.description, "Platform and tooling");
        assert_eq!(updated.group_type, GroupType::Public);
        assert_eq!(updated.created_by, owner);
        assert_eq!(updated.modified_by, editor);
        assert!(updated.updated_at >= group.updated_at);
    }
}
