//! CLI argument definitions.

use clap::{Args, Parser, Subcommand};

use crate::commands::{
    batch_update::BatchUpdateArgs, delete::DeleteArgs, get::GetArgs, index::IndexCommand,
    insert::InsertArgs, profile::ProfileCommand, read::ReadArgs, review::ReviewArgs,
    update::UpdateArgs,
};

/// Read and change document store collections.
#[derive(Parser, Debug)]
#[command(name = "tessera")]
#[command(author, version = env!("TESSERA_VERSION"), about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Output logs as JSON
    #[arg(long, global = true)]
    pub json_logs: bool,

    #[command(flatten)]
    pub target: StoreArgs,

    #[command(subcommand)]
    pub command: Commands,
}

/// Which store to talk to. Overrides the saved profile.
#[derive(Args, Debug, Clone, Default)]
pub struct StoreArgs {
    /// Store URL (file:///path or https://host)
    #[arg(long, env = "TESSERA_STORE", global = true)]
    pub store: Option<String>,

    /// Project id (hosted stores)
    #[arg(long, env = "TESSERA_PROJECT", global = true)]
    pub project: Option<String>,

    /// Bearer token (hosted stores)
    #[arg(long, env = "TESSERA_TOKEN", global = true, hide_env_values = true)]
    pub token: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Save or show the default store
    Profile(ProfileCommand),

    /// Read records from a collection in order
    Read(ReadArgs),

    /// Fetch a single record
    Get(GetArgs),

    /// Create a record (file stores only)
    Insert(InsertArgs),

    /// Merge fields into a record
    Update(UpdateArgs),

    /// Merge the same fields into several records atomically
    BatchUpdate(BatchUpdateArgs),

    /// Delete a record
    Delete(DeleteArgs),

    /// Approve a pending record
    Approve(ReviewArgs),

    /// Reject a pending record
    Reject(ReviewArgs),

    /// Manage composite indexes (file stores only)
    Index(IndexCommand),
}
