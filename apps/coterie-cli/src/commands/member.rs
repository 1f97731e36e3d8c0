use coterie_membership::MembershipService;
use coterie_storage::{GroupId, Role, UserId};
use coterie_store_sqlite::SqliteStore;

use crate::settings::Settings;

pub async fn cmd_member_add(
    service: &MembershipService<SqliteStore>,
    settings: &Settings,
    group_id: &GroupId,
    user_id: &UserId,
    role: Option<Role>,
) -> Result<(), Box<dyn std::error::Error>> {
    let requester = settings.requester()?;
    let member = service.add_user(group_id, user_id, role, requester).await?;
    println!(
        "Added {} to group {} as {}",
        member.user_id, group_id, member.role
    );
    Ok(())
}

pub async fn cmd_member_remove(
    service: &MembershipService<SqliteStore>,
    settings: &Settings,
    group_id: &GroupId,
    user_id: &UserId,
) -> Result<(), Box<dyn std::error::Error>> {
    let requester = settings.requester()?;
    let member = service.remove_user(group_id, user_id, requester).await?;
    println!("Removed {} from group {}", member.user_id, group_id);
    Ok(())
}

pub async fn cmd_member_leave(
    service: &MembershipService<SqliteStore>,
    settings: &Settings,
    group_id: &GroupId,
) -> Result<(), Box<dyn std::error::Error>> {
    let requester = settings.requester()?;
    service.remove_user(group_id, requester, requester).await?;
    println!("Left group {}", group_id);
    Ok(())
}

pub async fn cmd_member_set_role(
    service: &MembershipService<SqliteStore>,
    settings: &Settings,
    group_id: &GroupId,
    user_id: &UserId,
    role: Role,
) -> Result<(), Box<dyn std::error::Error>> {
    let requester = settings.requester()?;
    let member = service
        .change_role(group_id, user_id, role, requester)
        .await?;
    println!("{} is now {} in group {}", member.user_id, member.role, group_id);
    Ok(())
}
