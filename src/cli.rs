use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "zpa")]
#[command(author = "Alberto Cavalcante")]
#[command(version)]
#[command(about = "Declarative management of private access policy objects", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Provider config file (default: ~/.config/zpa/config.toml)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Local state file (default: ~/.local/state/zpa/state.json)
    #[arg(long, global = true, value_name = "FILE")]
    pub state: Option<String>,

    #[command(flatten)]
    pub connection: ConnectionArgs,

    #[command(subcommand)]
    pub command: Command,
}

/// Connection settings; each overrides the config file
#[derive(Args, Debug, Default, Clone)]
pub struct ConnectionArgs {
    /// API base URL
    #[arg(long, global = true, env = "ZPA_BASE_URL", value_name = "URL")]
    pub base_url: Option<String>,

    /// Customer (tenant) identifier
    #[arg(long, global = true, env = "ZPA_CUSTOMER_ID", value_name = "ID")]
    pub customer_id: Option<String>,

    /// API client identifier
    #[arg(long, global = true, env = "ZPA_CLIENT_ID", value_name = "ID")]
    pub client_id: Option<String>,

    /// API client secret
    #[arg(long, global = true, env = "ZPA_CLIENT_SECRET", hide_env_values = true, value_name = "SECRET")]
    pub client_secret: Option<String>,

    /// Microtenant to scope every request to
    #[arg(long, global = true, env = "ZPA_MICROTENANT_ID", value_name = "ID")]
    pub microtenant_id: Option<String>,
}

#[derive(Subcommand)]
pub enum Command {
    /// List managed resource types
    Resources,

    /// Show the fields of a resource type
    Schema {
        /// Resource type, e.g. segment_group
        #[arg(value_name = "TYPE")]
        resource_type: String,
    },

    /// Check a desired-state file without contacting the API
    Validate(FileArgs),

    /// Show what apply would change, from local state only
    Plan(PlanArgs),

    /// Make the remote objects match the desired-state file
    Apply(ApplyArgs),

    /// Re-read every managed object and update local state
    Refresh(RefreshArgs),

    /// Delete managed objects
    Destroy(DestroyArgs),

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Args)]
pub struct FileArgs {
    /// Desired-state TOML file
    #[arg(value_name = "FILE")]
    pub file: PathBuf,
}

#[derive(Args)]
pub struct PlanArgs {
    /// Desired-state TOML file
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Only plan a type or a single instance (type or type.name)
    #[arg(short, long)]
    pub target: Option<String>,
}

#[derive(Args)]
pub struct ApplyArgs {
    /// Desired-state TOML file
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Only apply a type or a single instance (type or type.name)
    #[arg(short, long)]
    pub target: Option<String>,

    /// Show what would change without calling the API
    #[arg(long)]
    pub dry_run: bool,

    /// Skip the confirmation prompt
    #[arg(short, long)]
    pub yes: bool,

    /// Number of instances applied in parallel
    #[arg(short, long, default_value = "4")]
    pub jobs: u16,
}

#[derive(Args)]
pub struct RefreshArgs {
    /// Only refresh a type or a single instance (type or type.name)
    #[arg(short, long)]
    pub target: Option<String>,

    /// Number of instances read in parallel
    #[arg(short, long, default_value = "4")]
    pub jobs: u16,
}

#[derive(Args)]
pub struct DestroyArgs {
    /// Only destroy a type or a single instance (type or type.name)
    #[arg(short, long)]
    pub target: Option<String>,

    /// Skip the confirmation prompt
    #[arg(short, long)]
    pub yes: bool,

    /// Number of instances deleted in parallel
    #[arg(short, long, default_value = "4")]
    pub jobs: u16,
}
