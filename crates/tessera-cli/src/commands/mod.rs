//! Subcommand implementations.

pub mod batch_update;
pub mod delete;
pub mod get;
pub mod index;
pub mod insert;
pub mod profile;
pub mod read;
pub mod review;
pub mod update;

use anyhow::{Context, Result, bail};
use serde_json::Value;

use tessera_core::{CollectionName, Fields, RecordId, ReviewStatus};

use crate::cli::{Commands, StoreArgs};

pub async fn handle(command: Commands, target: &StoreArgs) -> Result<()> {
    match command {
        Commands::Profile(cmd) => profile::handle(cmd, target),
        Commands::Read(args) => read::run(args, target).await,
        Commands::Get(args) => get::run(args, target).await,
        Commands::Insert(args) => insert::run(args, target).await,
        Commands::Update(args) => update::run(args, target).await,
        Commands::BatchUpdate(args) => batch_update::run(args, target).await,
        Commands::Delete(args) => delete::run(args, target).await,
        Commands::Approve(args) => review::run(args, ReviewStatus::Approved, target).await,
        Commands::Reject(args) => review::run(args, ReviewStatus::Rejected, target).await,
        Commands::Index(cmd) => index::handle(cmd, target),
    }
}

pub(crate) fn collection(raw: &str) -> Result<CollectionName> {
    CollectionName::new(raw).context("Invalid collection name")
}

pub(crate) fn record_id(raw: &str) -> Result<RecordId> {
    RecordId::new(raw).context("Invalid record id")
}

/// Parse `FIELD=VALUE`. The value is read as JSON when it parses, else
/// taken as a plain string, so `n=3` is a number and `title=Hello` a string.
pub(crate) fn parse_assignment(raw: &str) -> Result<(String, Value)> {
    let Some((field, value)) = raw.split_once('=') else {
        bail!("Expected FIELD=VALUE, got '{}'", raw);
    };
    if field.is_empty() {
        bail!("Missing field name in '{}'", raw);
    }
    let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
    Ok((field.to_string(), value))
}

/// Parse every `FIELD=VALUE` into one field map. Later assignments win.
pub(crate) fn parse_fields(raw: &[String]) -> Result<Fields> {
    raw.iter().map(|s| parse_assignment(s)).collect()
}
