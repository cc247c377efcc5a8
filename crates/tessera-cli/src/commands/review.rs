//! Approve and reject command implementation.

use anyhow::{Context, Result};
use clap::Args;

use tessera_core::{MutationGateway, MutationRequest, ReviewStatus};

use crate::cli::StoreArgs;
use crate::output;
use crate::profile;

#[derive(Args, Debug)]
pub struct ReviewArgs {
    /// Collection name
    #[arg(long)]
    pub collection: String,

    /// Record id
    #[arg(long)]
    pub id: String,
}

pub async fn run(args: ReviewArgs, status: ReviewStatus, target: &StoreArgs) -> Result<()> {
    let collection = super::collection(&args.collection)?;
    let id = super::record_id(&args.id)?;
    let gateway = MutationGateway::new(profile::open(target)?);

    gateway
        .apply(MutationRequest::Transition {
            collection: collection.clone(),
            id: id.clone(),
            status,
        })
        .await
        .with_context(|| format!("Failed to mark {}/{} {}", collection, id, status))?;

    output::success(&format!("Marked {}/{} {}", collection, id, status));
    Ok(())
}
