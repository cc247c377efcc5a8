//! Profile command implementation.

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use colored::Colorize;

use tessera_core::StoreUrl;

use crate::cli::StoreArgs;
use crate::output;
use crate::profile::{self, Profile, storage};

#[derive(Args, Debug)]
pub struct ProfileCommand {
    #[command(subcommand)]
    pub command: ProfileSubcommand,
}

#[derive(Subcommand, Debug)]
pub enum ProfileSubcommand {
    /// Save --store (and --project, --token) as the default
    Set,

    /// Display the store commands will use
    Show,
}

pub fn handle(cmd: ProfileCommand, target: &StoreArgs) -> Result<()> {
    match cmd.command {
        ProfileSubcommand::Set => set(target),
        ProfileSubcommand::Show => show(target),
    }
}

fn set(target: &StoreArgs) -> Result<()> {
    let store = target
        .store
        .clone()
        .context("Pass the store to save with --store")?;
    let url = StoreUrl::new(&store).context("Invalid store URL")?;

    let profile = Profile {
        store: url.to_string(),
        project: target.project.clone(),
        token: target.token.clone(),
    };
    let path = storage::save_profile(&profile)?;

    output::success(&format!("Saved profile for {}", url));
    output::hint("Profile", &path.display().to_string());
    Ok(())
}

fn show(target: &StoreArgs) -> Result<()> {
    let profile = profile::resolve(target)?;

    output::field("Store", &profile.store);
    output::field("Project", profile.project.as_deref().unwrap_or("-"));
    let token = match profile.token {
        Some(_) => "(set)".to_string(),
        None => "(none)".dimmed().to_string(),
    };
    output::field("Token", &token);
    Ok(())
}
