//! Index command implementation.

use anyhow::{Context, Result, bail};
use clap::{Args, Subcommand};
use colored::Colorize;

use tessera_core::{Direction, Sort};
use tessera_file::CompositeIndex;

use crate::cli::StoreArgs;
use crate::output;
use crate::profile;

#[derive(Args, Debug)]
pub struct IndexCommand {
    #[command(subcommand)]
    pub command: IndexSubcommand,
}

#[derive(Subcommand, Debug)]
pub enum IndexSubcommand {
    /// Declare a composite index
    Add(AddArgs),

    /// List declared composite indexes
    List,
}

#[derive(Args, Debug)]
pub struct AddArgs {
    /// Collection name
    #[arg(long)]
    pub collection: String,

    /// Equality field, repeatable
    #[arg(long = "field", value_name = "FIELD", required = true)]
    pub fields: Vec<String>,

    /// Sort field
    #[arg(long)]
    pub order_by: String,

    /// Sort descending
    #[arg(long)]
    pub desc: bool,
}

pub fn handle(cmd: IndexCommand, target: &StoreArgs) -> Result<()> {
    let store = profile::open(target)?;
    let Some(file) = store.as_file() else {
        bail!("Indexes of hosted stores are managed by the hosting service");
    };

    match cmd.command {
        IndexSubcommand::Add(args) => {
            let direction = if args.desc {
                Direction::Descending
            } else {
                Direction::Ascending
            };
            let index = CompositeIndex::new(
                super::collection(&args.collection)?,
                args.fields,
                Sort::new(args.order_by, direction),
            );
            let description = index.to_string();

            if file.declare_index(index).context("Failed to declare index")? {
                output::success(&format!("Declared index {}", description));
            } else {
                println!("{}", format!("Index {} already declared", description).dimmed());
            }
        }
        IndexSubcommand::List => {
            let indexes = file.indexes().context("Failed to read indexes")?;
            if indexes.is_empty() {
                eprintln!("{}", "No indexes declared.".dimmed());
            }
            for index in indexes {
                println!("{}", index);
            }
        }
    }
    Ok(())
}
