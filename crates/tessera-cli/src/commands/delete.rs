//! Delete command implementation.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use tessera_core::{MutationGateway, MutationRequest};

use crate::cli::StoreArgs;
use crate::output;
use crate::profile;

#[derive(Args, Debug)]
pub struct DeleteArgs {
    /// Collection name
    #[arg(long)]
    pub collection: String,

    /// Record id
    #[arg(long)]
    pub id: String,
}

pub async fn run(args: DeleteArgs, target: &StoreArgs) -> Result<()> {
    let collection = super::collection(&args.collection)?;
    let id = super::record_id(&args.id)?;
    let gateway = MutationGateway::new(profile::open(target)?);

    let ack = gateway
        .apply(MutationRequest::Delete {
            collection: collection.clone(),
            id: id.clone(),
        })
        .await
        .context("Failed to delete record")?;

    if ack.already_absent {
        println!("{}", format!("{}/{} was already absent", collection, id).dimmed());
    } else {
        output::success(&format!("Deleted {}/{}", collection, id));
    }
    Ok(())
}
