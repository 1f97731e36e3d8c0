use coterie_membership::MembershipService;
use coterie_storage::{CreateGroupParams, Group, GroupId, GroupType, UpdateGroupParams};
use coterie_store_sqlite::SqliteStore;
use std::collections::BTreeSet;

use super::print_member;
use crate::error::UsageError;
use crate::settings::Settings;

fn print_group(group: &Group) {
    println!("Group: {}", group.name);
    println!("  ID: {}", group.id);
    println!("  Type: {}", group.group_type.as_str());
    if !group.description.is_empty() {
        println!("  Description: {}", group.description);
    }
    if !group.icon.is_empty() {
        println!("  Icon: {}", group.icon);
    }
    if !group.tags.is_empty() {
        let tags: Vec<&str> = group.tags.iter().map(String::as_str).collect();
        println!("  Tags: {}", tags.join(", "));
    }
    if let Some(address) = &group.exchange_address {
        println!("  Exchange address: {}", address);
    }
    println!("  Created by: {} at {}", group.created_by, group.created_at);
    println!("  Modified by: {} at {}", group.modified_by, group.updated_at);
    println!("  Members: {}", group.members.len());
}

#[allow(clippy::too_many_arguments)]
pub async fn cmd_group_create(
    service: &MembershipService<SqliteStore>,
    settings: &Settings,
    name: String,
    description: Option<String>,
    icon: Option<String>,
    group_type: GroupType,
    tags: Vec<String>,
    exchange_address: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let requester = settings.requester()?;

    let group = service
        .create_group(&CreateGroupParams {
            name,
            description: description.unwrap_or_default(),
            icon: icon.unwrap_or_default(),
            group_type,
            tags: tags.into_iter().collect(),
            exchange_address,
            created_by: requester.clone(),
        })
        .await?;

    println!("Created group: {}", group.name);
    println!("  ID: {}", group.id);
    Ok(())
}

pub async fn cmd_group_get(
    service: &MembershipService<SqliteStore>,
    settings: &Settings,
    group_id: &GroupId,
) -> Result<(), Box<dyn std::error::Error>> {
    let group = service
        .get_group(group_id, settings.requester.as_ref())
        .await?;
    print_group(&group);
    Ok(())
}

pub async fn cmd_group_members(
    service: &MembershipService<SqliteStore>,
    settings: &Settings,
    group_id: &GroupId,
) -> Result<(), Box<dyn std::error::Error>> {
    let members = service
        .list_members(group_id, settings.requester.as_ref())
        .await?;

    println!("Members of group {}:", group_id);
    for member in &members {
        print_member(member);
    }
    Ok(())
}

/// Tag and exchange-address arguments for an update.
pub struct UpdateExtras {
    pub tags: Vec<String>,
    pub clear_tags: bool,
    pub exchange_address: Option<String>,
    pub clear_exchange_address: bool,
}

#[allow(clippy::too_many_arguments)]
pub async fn cmd_group_update(
    service: &MembershipService<SqliteStore>,
    settings: &Settings,
    group_id: &GroupId,
    name: Option<String>,
    description: Option<String>,
    icon: Option<String>,
    group_type: Option<GroupType>,
    extras: UpdateExtras,
) -> Result<(), Box<dyn std::error::Error>> {
    let requester = settings.requester()?;

    let tags = if extras.clear_tags {
        Some(BTreeSet::new())
    } else if extras.tags.is_empty() {
        None
    } else {
        Some(extras.tags.into_iter().collect())
    };
    let exchange_address = if extras.clear_exchange_address {
        Some(None)
    } else {
        extras.exchange_address.map(Some)
    };

    let params = UpdateGroupParams {
        name,
        description,
        icon,
        group_type,
        tags,
        exchange_address,
    };
    if params.is_empty() {
        return Err(UsageError("Nothing to update".to_string()).into());
    }

    let group = service.update_group(group_id, &params, requester).await?;
    println!("Updated group: {}", group.name);
    Ok(())
}
