//! Batch update command implementation.

use anyhow::{Context, Result};
use clap::Args;

use tessera_core::{MutationGateway, MutationRequest};

use crate::cli::StoreArgs;
use crate::output;
use crate::profile;

#[derive(Args, Debug)]
pub struct BatchUpdateArgs {
    /// Collection name
    #[arg(long)]
    pub collection: String,

    /// Record id, repeatable
    #[arg(long = "id", value_name = "ID", required = true)]
    pub ids: Vec<String>,

    /// Field to set on every record, repeatable
    #[arg(long = "set", value_name = "FIELD=VALUE", required = true)]
    pub fields: Vec<String>,
}

pub async fn run(args: BatchUpdateArgs, target: &StoreArgs) -> Result<()> {
    let collection = super::collection(&args.collection)?;
    let ids = args
        .ids
        .iter()
        .map(|raw| super::record_id(raw))
        .collect::<Result<Vec<_>>>()?;
    let fields = super::parse_fields(&args.fields)?;
    let gateway = MutationGateway::new(profile::open(target)?);

    let ack = gateway
        .apply(MutationRequest::BatchUpdate {
            collection: collection.clone(),
            ids,
            fields,
        })
        .await
        .context("Batch update failed; no records were changed")?;

    output::success(&format!("Updated {} records in {}", ack.written, collection));
    Ok(())
}
