pub mod group;
pub mod member;
pub mod profile;

pub use group::{cmd_group_create, cmd_group_get, cmd_group_members, cmd_group_update};
pub use member::{cmd_member_add, cmd_member_leave, cmd_member_remove, cmd_member_set_role};
pub use profile::{cmd_profile_add, cmd_profile_current, cmd_profile_list, cmd_profile_use};

use coterie_membership::MembershipService;
use coterie_storage::GroupMember;
use coterie_store_sqlite::SqliteStore;
use std::sync::Arc;

use crate::settings::Settings;

pub async fn open_service(
    settings: &Settings,
) -> Result<MembershipService<SqliteStore>, Box<dyn std::error::Error>> {
    let store = SqliteStore::open(&settings.database_url).await?;
    Ok(MembershipService::new(
        Arc::new(store),
        settings.membership.clone(),
    ))
}

pub(crate) fn print_member(member: &GroupMember) {
    match &member.added_by {
        Some(by) => println!(
            "  {} ({}) joined {} added by {}",
            member.user_id, member.role, member.joined_at, by
        ),
        None => println!(
            "  {} ({}) joined {}",
            member.user_id, member.role, member.joined_at
        ),
    }
}
