//! Update command implementation.

use anyhow::{Context, Result};
use clap::Args;

use tessera_core::{MutationGateway, MutationRequest};

use crate::cli::StoreArgs;
use crate::output;
use crate::profile;

#[derive(Args, Debug)]
pub struct UpdateArgs {
    /// Collection name
    #[arg(long)]
    pub collection: String,

    /// Record id
    #[arg(long)]
    pub id: String,

    /// Field to set, repeatable (e.g. --set is_read=true)
    #[arg(long = "set", value_name = "FIELD=VALUE", required = true)]
    pub fields: Vec<String>,
}

pub async fn run(args: UpdateArgs, target: &StoreArgs) -> Result<()> {
    let collection = super::collection(&args.collection)?;
    let id = super::record_id(&args.id)?;
    let fields = super::parse_fields(&args.fields)?;
    let gateway = MutationGateway::new(profile::open(target)?);

    gateway
        .apply(MutationRequest::Update {
            collection: collection.clone(),
            id: id.clone(),
            fields,
        })
        .await
        .context("Failed to update record")?;

    output::success(&format!("Updated {}/{}", collection, id));
    Ok(())
}
