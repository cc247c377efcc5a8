//! Insert command implementation.

use std::io::{self, Read};

use anyhow::{Context, Result, bail};
use clap::Args;
use serde_json::Value;

use tessera_core::RecordId;

use crate::cli::StoreArgs;
use crate::output;
use crate::profile;

#[derive(Args, Debug)]
pub struct InsertArgs {
    /// Collection name
    #[arg(long)]
    pub collection: String,

    /// Record id (generated when omitted)
    #[arg(long)]
    pub id: Option<String>,

    /// JSON file with the record's fields (use - for stdin)
    #[arg(long)]
    pub json: Option<String>,

    /// Field to set, repeatable; applied over --json
    #[arg(long = "set", value_name = "FIELD=VALUE")]
    pub fields: Vec<String>,
}

fn read_base(source: Option<&str>) -> Result<serde_json::Map<String, Value>> {
    let content = match source {
        None => return Ok(serde_json::Map::new()),
        Some("-") => {
            let mut buf = String::new();
            io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read from stdin")?;
            buf
        }
        Some(path) => std::fs::read_to_string(path).context("Failed to read JSON file")?,
    };

    match serde_json::from_str(&content).context("Invalid JSON")? {
        Value::Object(map) => Ok(map),
        _ => bail!("Record JSON must be an object"),
    }
}

pub async fn run(args: InsertArgs, target: &StoreArgs) -> Result<()> {
    let collection = super::collection(&args.collection)?;
    let id: Option<RecordId> = args.id.as_deref().map(super::record_id).transpose()?;

    let mut fields = read_base(args.json.as_deref())?;
    fields.extend(super::parse_fields(&args.fields)?);

    let store = profile::open(target)?;
    let Some(file) = store.as_file() else {
        bail!("insert is only supported for file:// stores");
    };

    let record = file
        .insert(&collection, id, fields)
        .await
        .context("Failed to insert record")?;

    println!("{}", record.id);
    output::success(&format!("Inserted {}/{}", collection, record.id));
    Ok(())
}
