use clap::{Parser, Subcommand};
use coterie_storage::{GroupId, GroupType, Role, UserId};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "coterie")]
#[command(about = "Group membership with role-based access")]
pub struct Cli {
    /// Database URL (defaults to the profile's, then sqlite://coterie.db?mode=rwc)
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: Option<String>,

    /// User ID to act as (overrides the profile's)
    #[arg(long = "as", env = "COTERIE_REQUESTER", value_name = "USER_ID")]
    pub requester: Option<UserId>,

    /// Profile to use (defaults to the current profile)
    #[arg(long, env = "COTERIE_PROFILE")]
    pub profile: Option<String>,

    /// Path to config file (defaults to ~/.coterie/config.json)
    #[arg(long, env = "COTERIE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Restrict reads of private groups to their members
    #[arg(long)]
    pub private_reads: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Group commands
    Group {
        #[command(subcommand)]
        group_cmd: GroupCommand,
    },
    /// Membership commands
    Member {
        #[command(subcommand)]
        member_cmd: MemberCommand,
    },
    /// Profile commands (manage local identities)
    Profile {
        #[command(subcommand)]
        profile_cmd: ProfileCommand,
    },
}

#[derive(Subcommand)]
pub enum GroupCommand {
    /// Create a new group (you become its owner)
    Create {
        /// Group name
        name: String,
        /// Group description
        #[arg(long, short = 'd')]
        description: Option<String>,
        /// Icon reference
        #[arg(long)]
        icon: Option<String>,
        /// Group visibility
        #[arg(long = "type", default_value = "private")]
        group_type: GroupType,
        /// Tag label (repeatable)
        #[arg(long = "tag")]
        tags: Vec<String>,
        /// Associated exchange address
        #[arg(long)]
        exchange_address: Option<String>,
    },
    /// Show a group
    Get {
        /// Group ID
        group: GroupId,
    },
    /// List members of a group
    Members {
        /// Group ID
        group: GroupId,
    },
    /// Update group fields (admin or owner)
    Update {
        /// Group ID
        group: GroupId,
        /// New name
        #[arg(long)]
        name: Option<String>,
        /// New description
        #[arg(long, short = 'd')]
        description: Option<String>,
        /// New icon reference
        #[arg(long)]
        icon: Option<String>,
        /// New visibility
        #[arg(long = "type")]
        group_type: Option<GroupType>,
        /// Replace tags with these labels (repeatable)
        #[arg(long = "tag")]
        tags: Vec<String>,
        /// Remove all tags
        #[arg(long, conflicts_with = "tags")]
        clear_tags: bool,
        /// New exchange address
        #[arg(long)]
        exchange_address: Option<String>,
        /// Remove the exchange address
        #[arg(long, conflicts_with = "exchange_address")]
        clear_exchange_address: bool,
    },
}

#[derive(Subcommand)]
pub enum MemberCommand {
    /// Add a user to a group
    Add {
        /// Group ID
        group: GroupId,
        /// User ID to add
        user: UserId,
        /// Role to grant (defaults to member)
        #[arg(long)]
        role: Option<Role>,
    },
    /// Remove a user from a group
    Remove {
        /// Group ID
        group: GroupId,
        /// User ID to remove
        user: UserId,
    },
    /// Leave a group
    Leave {
        /// Group ID
        group: GroupId,
    },
    /// Change a member's role
    SetRole {
        /// Group ID
        group: GroupId,
        /// Member's user ID
        user: UserId,
        /// New role (member, admin, owner)
        role: Role,
    },
}

#[derive(Subcommand)]
pub enum ProfileCommand {
    /// List profiles
    List,
    /// Show current profile
    Current,
    /// Add or replace a profile
    Add {
        /// Profile name
        name: String,
        /// User ID this profile acts as
        #[arg(long)]
        user_id: UserId,
        /// Database URL for this profile
        #[arg(long)]
        database_url: Option<String>,
        /// Read policy for this profile (open, private-members-only)
        #[arg(long)]
        read_policy: Option<coterie_membership::ReadPolicy>,
    },
    /// Switch to a different profile (set as default)
    Use {
        /// Profile name
        name: String,
    },
}
