//! Write suppression and error mapping, checked against a mocked store.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::Utc;
use coterie_storage::*;
use uuid::Uuid;

use super::common::new_user;
use crate::{DenyReason, MembershipConfig, MembershipError, MembershipService};

fn snapshot(group_id: &GroupId, owner: &UserId) -> Group {
    let now = Utc::now();
    Group {
        id: group_id.clone(),
        name: "team".into(),
        description: String::new(),
        icon: String::new(),
        group_type: GroupType::Private,
        tags: BTreeSet::new(),
        members: vec![membership(group_id, owner, Role::Owner)],
        exchange_address: None,
        created_by: owner.clone(),
        modified_by: owner.clone(),
        created_at: now,
        updated_at: now,
    }
}

fn membership(group_id: &GroupId, user_id: &UserId, role: Role) -> GroupMember {
    GroupMember {
        group_id: group_id.clone(),
        user_id: user_id.clone(),
        role,
        added_by: None,
        joined_at: Utc::now(),
    }
}

fn service(store: MockStore) -> MembershipService<MockStore> {
    MembershipService::new(Arc::new(store), MembershipConfig::default())
}

#[tokio::test]
async fn denied_add_never_writes() {
    let group_id = GroupId(Uuid::new_v4());
    let owner = new_user();
    let member = new_user();

    let mut store = MockStore::new();
    let group = snapshot(&group_id, &owner);
    store
        .expect_get_group()
        .returning(move |_| Ok(group.clone()));
    let m = membership(&group_id, &member, Role::Member);
    store
        .expect_get_group_member()
        .returning(move |_, _| Ok(m.clone()));
    store.expect_add_group_member().never();

    let err = service(store)
        .add_user(&group_id, &new_user(), Some(Role::Admin), &member)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        MembershipError::Forbidden(DenyReason::InsufficientRole { .. })
    ));
}

#[tokio::test]
async fn missing_group_short_circuits() {
    let group_id = GroupId(Uuid::new_v4());

    let mut store = MockStore::new();
    store
        .expect_get_group()
        .times(1)
        .returning(|_| Err(StoreError::NotFound));
    store.expect_get_group_member().never();
    store.expect_add_group_member().never();
    store.expect_remove_group_member().never();
    store.expect_update_group_member_role().never();

    let service = service(store);
    let user = new_user();
    let err = service
        .add_user(&group_id, &user, None, &user)
        .await
        .unwrap_err();
    assert!(matches!(err, MembershipError::GroupNotFound(_)));
}

#[tokio::test]
async fn lost_race_maps_to_already_exists() {
    let group_id = GroupId(Uuid::new_v4());
    let owner = new_user();

    let mut store = MockStore::new();
    let group = snapshot(&group_id, &owner);
    store
        .expect_get_group()
        .returning(move |_| Ok(group.clone()));
    let m = membership(&group_id, &owner, Role::Owner);
    store
        .expect_get_group_member()
        .returning(move |_, _| Ok(m.clone()));
    store
        .expect_add_group_member()
        .times(1)
        .returning(|_| Err(StoreError::AlreadyExists));

    let err = service(store)
        .add_user(&group_id, &new_user(), None, &owner)
        .await
        .unwrap_err();
    assert!(matches!(err, MembershipError::UserAlreadyExistsInGroup { .. }));
}

#[tokio::test]
async fn backend_failure_is_unexpected() {
    let group_id = GroupId(Uuid::new_v4());
    let owner = new_user();

    let mut store = MockStore::new();
    let group = snapshot(&group_id, &owner);
    store
        .expect_get_group()
        .returning(move |_| Ok(group.clone()));
    let m = membership(&group_id, &owner, Role::Owner);
    store
        .expect_get_group_member()
        .returning(move |_, _| Ok(m.clone()));
    store
        .expect_add_group_member()
        .returning(|_| Err(StoreError::Backend("pool timed out".into())));

    let err = service(store)
        .add_user(&group_id, &new_user(), None, &owner)
        .await
        .unwrap_err();
    assert!(matches!(err, MembershipError::Unexpected(ref msg) if msg.contains("pool timed out")));
}

#[tokio::test]
async fn backend_failure_during_authorization_never_writes() {
    let group_id = GroupId(Uuid::new_v4());
    let owner = new_user();

    let mut store = MockStore::new();
    let group = snapshot(&group_id, &owner);
    store
        .expect_get_group()
        .returning(move |_| Ok(group.clone()));
    store
        .expect_get_group_member()
        .returning(|_, _| Err(StoreError::Backend("connection reset".into())));
    store.expect_add_group_member().never();

    let err = service(store)
        .add_user(&group_id, &new_user(), None, &owner)
        .await
        .unwrap_err();
    assert!(matches!(err, MembershipError::Unexpected(_)));
}

#[tokio::test]
async fn denied_remove_never_writes() {
    let group_id = GroupId(Uuid::new_v4());
    let owner = new_user();
    let admin = new_user();

    let mut store = MockStore::new();
    let group = snapshot(&group_id, &owner);
    store
        .expect_get_group()
        .returning(move |_| Ok(group.clone()));
    let owner_member = membership(&group_id, &owner, Role::Owner);
    let admin_member = membership(&group_id, &admin, Role::Admin);
    store
        .expect_get_group_member()
        .returning(move |_, user_id| {
            if *user_id == owner_member.user_id {
                Ok(owner_member.clone())
            } else if *user_id == admin_member.user_id {
                Ok(admin_member.clone())
            } else {
                Err(StoreError::NotFound)
            }
        });
    store.expect_remove_group_member().never();

    let err = service(store)
        .remove_user(&group_id, &owner, &admin)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        MembershipError::Forbidden(DenyReason::InsufficientRole {
            required: Role::Owner,
            actual: Role::Admin,
        })
    ));
}

#[tokio::test]
async fn store_conflict_on_remove_maps_to_last_owner() {
    let group_id = GroupId(Uuid::new_v4());
    let owner = new_user();

    let mut store = MockStore::new();
    let group = snapshot(&group_id, &owner);
    store
        .expect_get_group()
        .returning(move |_| Ok(group.clone()));
    let m = membership(&group_id, &owner, Role::Owner);
    store
        .expect_get_group_member()
        .returning(move |_, _| Ok(m.clone()));
    store
        .expect_remove_group_member()
        .times(1)
        .returning(|_, _, _| Err(StoreError::Conflict));

    let err = service(store)
        .remove_user(&group_id, &owner, &owner)
        .await
        .unwrap_err();
    assert!(matches!(err, MembershipError::LastOwner { .. }));
}

#[tokio::test]
async fn repeated_role_mismatch_maps_to_role_changed() {
    let group_id = GroupId(Uuid::new_v4());
    let owner = new_user();
    let target = new_user();

    let mut store = MockStore::new();
    let group = snapshot(&group_id, &owner);
    store
        .expect_get_group()
        .returning(move |_| Ok(group.clone()));
    let o = membership(&group_id, &owner, Role::Owner);
    let t = membership(&group_id, &target, Role::Member);
    store
        .expect_get_group_member()
        .returning(move |_, user_id| {
            Ok(if *user_id == o.user_id { o.clone() } else { t.clone() })
        });
    store
        .expect_remove_group_member()
        .times(2)
        .returning(|_, _, _| Err(StoreError::RoleMismatch));

    let err = service(store)
        .remove_user(&group_id, &target, &owner)
        .await
        .unwrap_err();
    assert!(matches!(err, MembershipError::RoleChanged { ref user_id, .. } if *user_id == target));
    assert_eq!(err.kind(), crate::ErrorKind::Conflict);
}

#[tokio::test]
async fn denied_update_never_writes() {
    let group_id = GroupId(Uuid::new_v4());
    let owner = new_user();
    let member = new_user();

    let mut store = MockStore::new();
    let group = snapshot(&group_id, &owner);
    store
        .expect_get_group()
        .returning(move |_| Ok(group.clone()));
    let m = membership(&group_id, &member, Role::Member);
    store
        .expect_get_group_member()
        .returning(move |_, _| Ok(m.clone()));
    store.expect_update_group().never();

    let params = UpdateGroupParams {
        name: Some("renamed".into()),
        ..Default::default()
    };
    let err = service(store)
        .update_group(&group_id, &params, &member)
        .await
        .unwrap_err();
    assert!(matches!(err, MembershipError::Forbidden(_)));
}
