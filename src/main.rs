mod cli;
mod commands;
mod config;
mod desired;
mod progress;
mod resource;
mod state;
mod ui;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use clap_complete::generate;
use cli::{Cli, Command, ConnectionArgs};
use config::ProviderConfig;
use std::io;
use std::path::PathBuf;
use zpa_client::RestClient;

/// Global context for the application
pub struct Context {
    pub verbose: u8,
    pub quiet: bool,
    pub config: Option<PathBuf>,
    pub state: Option<String>,
    pub connection: ConnectionArgs,
}

impl Context {
    pub fn state_path(&self) -> Result<PathBuf> {
        state::state_path(self.state.as_deref())
    }

    /// Build the API client from the config file, environment and flags
    pub fn client(&self) -> Result<RestClient> {
        let config = ProviderConfig::load(self.config.as_deref())?.with_overrides(&self.connection);
        let client_config = config.to_client_config()?;
        log::debug!(
            "Connecting to {} as customer {}",
            client_config.base_url,
            client_config.customer_id
        );
        Ok(RestClient::new(client_config))
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    let log_level = match cli.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    env_logger::Builder::new()
        .filter_level(if cli.quiet {
            log::LevelFilter::Error
        } else {
            log_level
        })
        .format_timestamp(None)
        .init();

    let ctx = Context {
        verbose: cli.verbose,
        quiet: cli.quiet,
        config: cli.config,
        state: cli.state,
        connection: cli.connection,
    };

    match cli.command {
        Command::Resources => commands::inspect::resources(&ctx),
        Command::Schema { resource_type } => commands::inspect::schema(&ctx, &resource_type),
        Command::Validate(args) => commands::declarative::validate(&ctx, &args.file),
        Command::Plan(args) => commands::declarative::plan(&ctx, &args.file, args.target.as_deref()),
        Command::Apply(args) => commands::declarative::apply(&ctx, &args),
        Command::Refresh(args) => {
            commands::declarative::refresh(&ctx, args.target.as_deref(), args.jobs as usize)
        }
        Command::Destroy(args) => commands::declarative::destroy(&ctx, &args),
        Command::Completions { shell } => {
            let mut cmd = Cli::command();
            generate(shell, &mut cmd, "zpa", &mut io::stdout());
            Ok(())
        }
    }
}
