use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use serde::{Deserialize, Serialize};

use crate::sync::EntityKind;

#[derive(Parser)]
#[command(name = "shopsync")]
#[command(about = "Sync a local commerce back-office store with a remote commerce platform")]
#[command(long_about = "shopsync - local store to commerce platform sync

Pushes locally edited customers, addresses, products, selling plans and
inventory levels to the platform's Admin GraphQL API, and pulls remote
records back without overwriting local edits that are still pending.

QUICK START:
  shopsync status                    Pending and failing records per entity
  shopsync push customers --dry-run  Show what a push would do
  shopsync push-all                  Push everything, parents first
  shopsync pull products             Page remote products into the store

OUTPUT FORMATS:
  --output pretty    Human-readable colored output (default)
  --output json      Machine-readable JSON for scripting

EXIT STATUS:
  0 on success, 1 on a setup or database error, 2 when a push or pull
  finished with failed or skipped records.

For more information on a specific command, run:
  shopsync <command> --help")]
#[command(version, propagate_version = true)]
pub struct Cli {
    /// Output format for command results
    ///
    /// Use 'pretty' for human-readable colored output (default),
    /// or 'json' for machine-readable output suitable for scripting.
    #[arg(short, long, value_enum, default_value = "pretty", global = true)]
    pub output: OutputFormat,

    /// Data directory holding config.yaml and shopsync.db
    #[arg(long, env = "SHOPSYNC_HOME", global = true)]
    pub home: Option<PathBuf>,

    /// Admin API access token
    #[arg(long, env = "SHOPSYNC_ACCESS_TOKEN", hide_env_values = true, global = true)]
    pub token: Option<String>,

    /// Log debug detail to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Log warnings and errors only
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Output format for command results.
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable colored output.
    #[default]
    Pretty,
    /// Machine-readable JSON output.
    Json,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show sync status per entity
    ///
    /// For each entity type: total records, records awaiting push, records
    /// whose last push failed or was skipped, and creates that were sent but
    /// never confirmed.
    ///
    /// # Examples
    ///
    ///   shopsync status
    ///   shopsync status -o json
    #[command(alias = "st")]
    Status,

    /// Push every pending record of one entity type
    ///
    /// Records are pushed one at a time in the order they were created. A
    /// failure on one record never stops the batch.
    ///
    /// # Examples
    ///
    ///   shopsync push customers
    ///   shopsync push addresses --dry-run
    ///   shopsync push inventory --limit 20
    Push(PushArgs),

    /// Push every pending record of every entity type
    ///
    /// Runs in parent order: customers, addresses, products, selling plans,
    /// inventory levels.
    #[command(name = "push-all")]
    PushAll(BatchArgs),

    /// Push a single record
    ///
    /// # Examples
    ///
    ///   shopsync push-one customers 42
    ///   shopsync push-one selling-plans 3 --dry-run
    #[command(name = "push-one")]
    PushOne {
        /// Entity type
        #[arg(value_enum)]
        entity: EntityKind,

        /// Local record id
        local_id: i64,

        /// Show the decision without calling the platform
        #[arg(long)]
        dry_run: bool,
    },

    /// Pull remote records of one entity type into the local store
    ///
    /// Records with unpushed local edits are left alone. A failed page
    /// request stops paging; records already written are kept.
    ///
    /// # Examples
    ///
    ///   shopsync pull customers
    ///   shopsync pull products --query "status:active"
    Pull {
        /// Entity type
        #[arg(value_enum)]
        entity: EntityKind,

        /// Platform search query narrowing the pull
        #[arg(long)]
        query: Option<String>,
    },

    /// List records whose last push failed or was skipped
    Errors {
        /// Entity type
        #[arg(value_enum)]
        entity: EntityKind,

        /// Maximum rows to show
        #[arg(long, default_value = "50")]
        limit: usize,
    },

    /// Mark a record pending again and clear its last error
    Requeue {
        /// Entity type
        #[arg(value_enum)]
        entity: EntityKind,

        /// Local record id
        local_id: i64,
    },

    /// Settle a create that was sent but never confirmed
    ///
    /// Check the platform first. If the record exists there, adopt its id
    /// with --remote-id. If it does not, --clear allows a fresh create.
    ///
    /// # Examples
    ///
    ///   shopsync resolve customers 42 --remote-id gid://shopify/Customer/900
    ///   shopsync resolve customers 42 --clear
    Resolve(ResolveArgs),

    /// Delete a record from the local store
    ///
    /// The remote record is not touched.
    Forget {
        /// Entity type
        #[arg(value_enum)]
        entity: EntityKind,

        /// Local record id
        local_id: i64,
    },

    /// Generate shell completions
    ///
    /// Example: shopsync completions bash > ~/.bash_completion.d/shopsync
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Options shared by batch pushes.
#[derive(Args, Clone, Copy, Debug, Default)]
pub struct BatchArgs {
    /// Show what would be pushed without calling the platform
    #[arg(long)]
    pub dry_run: bool,

    /// Push at most this many records per entity type
    #[arg(long)]
    pub limit: Option<usize>,
}

#[derive(Args)]
pub struct PushArgs {
    /// Entity type
    #[arg(value_enum)]
    pub entity: EntityKind,

    #[command(flatten)]
    pub batch: BatchArgs,
}

#[derive(Args)]
#[command(group(clap::ArgGroup::new("resolution").required(true).args(["remote_id", "clear"])))]
pub struct ResolveArgs {
    /// Entity type
    #[arg(value_enum)]
    pub entity: EntityKind,

    /// Local record id
    pub local_id: i64,

    /// The remote id the unconfirmed create landed under
    #[arg(long)]
    pub remote_id: Option<String>,

    /// The create never landed; allow a fresh one
    #[arg(long)]
    pub clear: bool,
}
