//! Resolve the database, requester and read policy for one invocation.

use coterie_config::{CliConfig, ConfigError, ProfileConfig};
use coterie_membership::{MembershipConfig, ReadPolicy};
use coterie_storage::UserId;

use crate::error::UsageError;

pub const DEFAULT_DATABASE_URL: &str = "sqlite://coterie.db?mode=rwc";

/// Values given on the command line or through the environment.
#[derive(Debug, Default)]
pub struct Overrides<'a> {
    pub database_url: Option<&'a str>,
    pub requester: Option<&'a UserId>,
    pub profile: Option<&'a str>,
    pub private_reads: bool,
}

#[derive(Debug)]
pub struct Settings {
    pub database_url: String,
    pub requester: Option<UserId>,
    pub membership: MembershipConfig,
}

impl Settings {
    /// The acting user. Commands that mutate or gate on membership need one.
    pub fn requester(&self) -> Result<&UserId, UsageError> {
        self.requester.as_ref().ok_or_else(|| {
            UsageError(
                "No requester: pass --as <USER_ID>, set COTERIE_REQUESTER, or add a profile"
                    .to_string(),
            )
        })
    }
}

/// Overrides win over the selected profile, which wins over defaults.
///
/// An explicitly named profile must exist. Without one, the current profile is
/// used if the config has any.
pub fn resolve(
    overrides: &Overrides<'_>,
    config: &CliConfig,
) -> Result<Settings, Box<dyn std::error::Error>> {
    let profile: Option<&ProfileConfig> = match overrides.profile {
        Some(name) => Some(config.get_profile(name)?),
        None => match config.get_current_profile() {
            Ok(p) => Some(p),
            Err(ConfigError::NoProfiles) => None,
            Err(e) => return Err(e.into()),
        },
    };

    let database_url = overrides
        .database_url
        .map(str::to_string)
        .or_else(|| profile.and_then(|p| p.database_url.clone()))
        .unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string());

    let requester = match (overrides.requester, profile) {
        (Some(user_id), _) => Some(user_id.clone()),
        (None, Some(p)) => Some(p.user_id.parse::<UserId>().map_err(|e| {
            UsageError(format!(
                "Profile '{}' has an invalid user_id '{}': {e}",
                p.name, p.user_id
            ))
        })?),
        (None, None) => None,
    };

    let read_policy = if overrides.private_reads {
        ReadPolicy::PrivateMembersOnly
    } else {
        match profile.and_then(|p| p.read_policy.as_deref()) {
            Some(s) => s
                .parse::<ReadPolicy>()
                .map_err(|e| UsageError(format!("Profile read_policy: {e}")))?,
            None => ReadPolicy::default(),
        }
    };

    Ok(Settings {
        database_url,
        requester,
        membership: MembershipConfig { read_policy },
    })
}
