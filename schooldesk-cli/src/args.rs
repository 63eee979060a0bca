use std::path::PathBuf;

use clap::Args;
use clap::Parser;
use clap::Subcommand;

#[derive(Parser, Debug)]
#[command(name = "schooldesk")]
#[command(about = "Browse and bulk-edit school administration tables", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// JSON config file (rpc connection, cache TTLs, view schemas)
    #[arg(short, long, global = true, env = "SCHOOLDESK_CONFIG")]
    pub config: Option<PathBuf>,

    /// Work offline against a JSON fixture instead of the RPC backend
    #[arg(short, long, global = true)]
    pub fixture: Option<PathBuf>,

    /// Bearer token for the RPC backend (defaults to the API key)
    #[arg(long, global = true, env = "SCHOOLDESK_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Table to open
    #[arg(short, long, global = true, default_value = "students")]
    pub table: String,

    /// Write logs to a file instead of stderr
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Args, Debug, Default)]
pub struct ViewArgs {
    /// Branch id
    #[arg(long)]
    pub branch: Option<String>,

    /// Program id
    #[arg(long)]
    pub program: Option<String>,

    /// Status value
    #[arg(long)]
    pub status: Option<String>,

    /// Only records admitted in the last N days
    #[arg(long, value_name = "DAYS")]
    pub within: Option<u32>,

    /// Free-text search
    #[arg(short, long)]
    pub search: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print one page of the table
    #[command(alias = "ls")]
    List {
        #[command(flatten)]
        view: ViewArgs,

        /// Sort column
        #[arg(long)]
        sort: Option<String>,

        /// Sort descending
        #[arg(long)]
        desc: bool,

        /// Page number, starting at 1
        #[arg(short, long, default_value_t = 1)]
        page: usize,

        /// Rows per page
        #[arg(long)]
        page_size: Option<usize>,

        /// Columns to hide
        #[arg(long, value_delimiter = ',')]
        hide: Vec<String>,
    },

    /// Set the status of the selected records
    Mark {
        /// New status value
        value: String,

        #[command(flatten)]
        view: ViewArgs,

        /// Record ids to select
        #[arg(long, value_delimiter = ',', conflicts_with = "all")]
        ids: Vec<String>,

        /// Select every record passing the filters
        #[arg(long)]
        all: bool,
    },

    /// Delete records
    #[command(alias = "rm")]
    Delete {
        /// Record ids
        #[arg(required = true, value_delimiter = ',')]
        ids: Vec<String>,
    },

    /// List branches, or the programs offered under a branch
    Options {
        /// Show programs instead of branches
        #[arg(long)]
        programs: bool,

        /// Restrict programs to one branch
        #[arg(long)]
        branch: Option<String>,
    },
}
