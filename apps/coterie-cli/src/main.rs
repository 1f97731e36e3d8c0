mod cli;
mod commands;
mod error;
mod settings;

use clap::Parser;
use coterie_config::CliConfig;
use std::path::PathBuf;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Command, GroupCommand, MemberCommand, ProfileCommand};
use commands::*;
use settings::{Overrides, Settings};

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn config_path(cli: &Cli) -> Result<PathBuf, Box<dyn std::error::Error>> {
    match &cli.config {
        Some(path) => Ok(path.clone()),
        None => Ok(CliConfig::default_path()?),
    }
}

fn load_settings(cli: &Cli) -> Result<Settings, Box<dyn std::error::Error>> {
    let config = CliConfig::load_or_default(config_path(cli)?)?;
    let overrides = Overrides {
        database_url: cli.database_url.as_deref(),
        requester: cli.requester.as_ref(),
        profile: cli.profile.as_deref(),
        private_reads: cli.private_reads,
    };
    let settings = settings::resolve(&overrides, &config)?;
    debug!(
        database_url = %settings.database_url,
        requester = ?settings.requester,
        read_policy = ?settings.membership.read_policy,
        "Resolved settings"
    );
    Ok(settings)
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Command::Profile { ref profile_cmd } => {
            let path = config_path(&cli)?;
            match profile_cmd {
                ProfileCommand::List => cmd_profile_list(&path)?,
                ProfileCommand::Current => cmd_profile_current(&path)?,
                ProfileCommand::Add {
                    name,
                    user_id,
                    database_url,
                    read_policy,
                } => cmd_profile_add(
                    &path,
                    name.clone(),
                    user_id,
                    database_url.clone(),
                    *read_policy,
                )?,
                ProfileCommand::Use { name } => cmd_profile_use(&path, name)?,
            }
        }
        Command::Group { ref group_cmd } => {
            let settings = load_settings(&cli)?;
            let service = open_service(&settings).await?;
            match group_cmd {
                GroupCommand::Create {
                    name,
                    description,
                    icon,
                    group_type,
                    tags,
                    exchange_address,
                } => {
                    cmd_group_create(
                        &service,
                        &settings,
                        name.clone(),
                        description.clone(),
                        icon.clone(),
                        *group_type,
                        tags.clone(),
                        exchange_address.clone(),
                    )
                    .await?;
                }
                GroupCommand::Get { group } => {
                    cmd_group_get(&service, &settings, group).await?;
                }
                GroupCommand::Members { group } => {
                    cmd_group_members(&service, &settings, group).await?;
                }
                GroupCommand::Update {
                    group,
                    name,
                    description,
                    icon,
                    group_type,
                    tags,
                    clear_tags,
                    exchange_address,
                    clear_exchange_address,
                } => {
                    cmd_group_update(
                        &service,
                        &settings,
                        group,
                        name.clone(),
                        description.clone(),
                        icon.clone(),
                        *group_type,
                        group::UpdateExtras {
                            tags: tags.clone(),
                            clear_tags: *clear_tags,
                            exchange_address: exchange_address.clone(),
                            clear_exchange_address: *clear_exchange_address,
                        },
                    )
                    .await?;
                }
            }
        }
        Command::Member { ref member_cmd } => {
            let settings = load_settings(&cli)?;
            let service = open_service(&settings).await?;
            match member_cmd {
                MemberCommand::Add { group, user, role } => {
                    cmd_member_add(&service, &settings, group, user, *role).await?;
                }
                MemberCommand::Remove { group, user } => {
                    cmd_member_remove(&service, &settings, group, user).await?;
                }
                MemberCommand::Leave { group } => {
                    cmd_member_leave(&service, &settings, group).await?;
                }
                MemberCommand::SetRole { group, user, role } => {
                    cmd_member_set_role(&service, &settings, group, user, *role).await?;
                }
            }
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    init_tracing();
    coterie_membership::describe_metrics();

    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        eprintln!("Error: {}", e);
        std::process::exit(error::exit_code(&*e));
    }
}
