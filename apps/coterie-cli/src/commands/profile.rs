use coterie_config::{CliConfig, ProfileConfig};
use coterie_membership::ReadPolicy;
use coterie_storage::UserId;
use std::path::Path;

pub fn cmd_profile_list(config_path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let config = CliConfig::load_or_default(config_path)?;

    if config.profiles.is_empty() {
        println!("No profiles found");
        return Ok(());
    }

    let current = config.get_current_profile().ok().map(|p| p.name.as_str());
    println!("Profiles:");
    for profile in &config.profiles {
        let marker = if Some(profile.name.as_str()) == current {
            "*"
        } else {
            " "
        };
        println!("{} {} ({})", marker, profile.name, profile.user_id);
    }
    Ok(())
}

pub fn cmd_profile_current(config_path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let config = CliConfig::load_from(config_path)?;
    let profile = config.get_current_profile()?;

    println!("Current profile: {}", profile.name);
    println!("  User ID: {}", profile.user_id);
    if let Some(url) = &profile.database_url {
        println!("  Database: {}", url);
    }
    if let Some(policy) = &profile.read_policy {
        println!("  Read policy: {}", policy);
    }
    Ok(())
}

pub fn cmd_profile_add(
    config_path: &Path,
    name: String,
    user_id: &UserId,
    database_url: Option<String>,
    read_policy: Option<ReadPolicy>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = CliConfig::load_or_default(config_path)?;
    config.upsert_profile(ProfileConfig {
        name: name.clone(),
        user_id: user_id.to_string(),
        database_url,
        read_policy: read_policy.map(|p| p.as_str().to_string()),
    });
    config.save_to(config_path)?;

    println!("Saved profile: {}", name);
    Ok(())
}

pub fn cmd_profile_use(config_path: &Path, name: &str) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = CliConfig::load_from(config_path)?;
    config.use_profile(name)?;
    config.save_to(config_path)?;

    println!("Switched to profile: {}", name);
    Ok(())
}
