//! Read command implementation.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use futures_util::{StreamExt, pin_mut};

use tessera_core::{Cursor, Direction, QueryDescriptor, ResilientReader};

use crate::cli::StoreArgs;
use crate::output;
use crate::profile;

const DEGRADED: &str =
    "Composite index unavailable; results were sorted locally and may be slower to load.";

#[derive(Args, Debug)]
pub struct ReadArgs {
    /// Collection name
    #[arg(long)]
    pub collection: String,

    /// Equality filter, repeatable (e.g. --where user_id=u1)
    #[arg(long = "where", value_name = "FIELD=VALUE")]
    pub filters: Vec<String>,

    /// Field to sort by
    #[arg(long)]
    pub order_by: Option<String>,

    /// Sort descending
    #[arg(long, requires = "order_by")]
    pub desc: bool,

    /// Maximum number of records per page
    #[arg(long)]
    pub limit: Option<u32>,

    /// Resume after a cursor printed by a previous read
    #[arg(long, conflicts_with = "all")]
    pub cursor: Option<String>,

    /// Follow cursors and print every page
    #[arg(long)]
    pub all: bool,

    /// Pretty-print JSON output
    #[arg(long)]
    pub pretty: bool,
}

impl ReadArgs {
    fn descriptor(&self) -> Result<QueryDescriptor> {
        let mut descriptor = QueryDescriptor::new(super::collection(&self.collection)?);

        for raw in &self.filters {
            let (field, value) = super::parse_assignment(raw)?;
            descriptor = descriptor.filter(field, value);
        }
        if let Some(field) = &self.order_by {
            let direction = if self.desc {
                Direction::Descending
            } else {
                Direction::Ascending
            };
            descriptor = descriptor.order_by(field.clone(), direction);
        }
        if let Some(limit) = self.limit {
            descriptor = descriptor.limit(limit);
        }
        if let Some(token) = &self.cursor {
            let cursor: Cursor = token.parse().context("Invalid cursor")?;
            descriptor = descriptor.after(cursor);
        }
        Ok(descriptor)
    }
}

pub async fn run(args: ReadArgs, target: &StoreArgs) -> Result<()> {
    let descriptor = args.descriptor()?;
    let reader = ResilientReader::new(profile::open(target)?);

    if args.all {
        return read_all(&reader, descriptor, args.pretty).await;
    }

    let page = reader
        .read(&descriptor)
        .await
        .context("Failed to read collection")?;

    if page.degraded {
        output::advisory(DEGRADED);
    }
    if page.is_empty() {
        eprintln!("{}", "No records found.".dimmed());
    }
    for record in &page.records {
        output::json(record, args.pretty)?;
    }
    if let Some(cursor) = &page.next_cursor {
        output::hint("Next cursor", &cursor.encode());
    }

    Ok(())
}

async fn read_all(
    reader: &ResilientReader<profile::CliStore>,
    descriptor: QueryDescriptor,
    pretty: bool,
) -> Result<()> {
    let pages = reader.pages(descriptor);
    pin_mut!(pages);

    let mut degraded = false;
    let mut total = 0;
    while let Some(page) = pages.next().await {
        let page = page.context("Failed to read collection")?;
        if page.degraded && !degraded {
            output::advisory(DEGRADED);
            degraded = true;
        }
        total += page.len();
        for record in &page.records {
            output::json(record, pretty)?;
        }
    }

    if total == 0 {
        eprintln!("{}", "No records found.".dimmed());
    }
    Ok(())
}
