//! Get command implementation.

use anyhow::{Context, Result};
use clap::Args;

use tessera_core::DocumentStore;

use crate::cli::StoreArgs;
use crate::output;
use crate::profile;

#[derive(Args, Debug)]
pub struct GetArgs {
    /// Collection name
    #[arg(long)]
    pub collection: String,

    /// Record id
    #[arg(long)]
    pub id: String,

    /// Print compact JSON
    #[arg(long)]
    pub compact: bool,
}

pub async fn run(args: GetArgs, target: &StoreArgs) -> Result<()> {
    let collection = super::collection(&args.collection)?;
    let id = super::record_id(&args.id)?;
    let store = profile::open(target)?;

    let record = store
        .get(&collection, &id)
        .await
        .context("Failed to get record")?;

    output::json(&record, !args.compact)
}
