//! Common fixtures for membership tests.

use std::collections::BTreeSet;
use std::sync::Arc;

use coterie_storage::*;
use coterie_store_memory::MemoryStore;
use uuid::Uuid;

use crate::{MembershipConfig, MembershipService, ReadPolicy};

pub fn new_user() -> UserId {
    UserId(Uuid::new_v4())
}

pub fn create_test_service() -> MembershipService<MemoryStore> {
    MembershipService::new(Arc::new(MemoryStore::new()), MembershipConfig::default())
}

pub fn create_private_read_service() -> MembershipService<MemoryStore> {
    MembershipService::new(
        Arc::new(MemoryStore::new()),
        MembershipConfig {
            read_policy: ReadPolicy::PrivateMembersOnly,
        },
    )
}

pub fn group_params(name: &str, group_type: GroupType, created_by: &UserId) -> CreateGroupParams {
    CreateGroupParams {
        name: name.to_string(),
        description: format!("{name} group"),
        icon: String::new(),
        group_type,
        tags: BTreeSet::new(),
        exchange_address: None,
        created_by: created_by.clone(),
    }
}

/// Create a private group owned by `owner`.
pub async fn create_test_group<S: Store>(service: &MembershipService<S>, owner: &UserId) -> GroupId {
    service
        .create_group(&group_params("team", GroupType::Private, owner))
        .await
        .unwrap()
        .id
}

/// A group with an owner, an admin and a plain member.
pub struct Fixture<S> {
    pub service: MembershipService<S>,
    pub group_id: GroupId,
    pub owner: UserId,
    pub admin: UserId,
    pub member: UserId,
}

pub async fn populate<S: Store>(service: MembershipService<S>) -> Fixture<S> {
    let owner = new_user();
    let admin = new_user();
    let member = new_user();
    let group_id = create_test_group(&service, &owner).await;

    service
        .add_user(&group_id, &admin, Some(Role::Admin), &owner)
        .await
        .unwrap();
    service
        .add_user(&group_id, &member, None, &owner)
        .await
        .unwrap();

    Fixture {
        service,
        group_id,
        owner,
        admin,
        member,
    }
}

pub async fn create_fixture() -> Fixture<MemoryStore> {
    populate(create_test_service()).await
}

/// Role of `user_id` in the current snapshot, if any.
pub async fn role_of<S: Store>(
    service: &MembershipService<S>,
    group_id: &GroupId,
    user_id: &UserId,
) -> Option<Role> {
    service
        .get_group(group_id, None)
        .await
        .unwrap()
        .member(user_id)
        .map(|m| m.role)
}
