//! lexrag entry point.

use clap::Parser;

use lexrag::cli::commands::{self, load_config};
use lexrag::cli::{Cli, Commands, ConfigCommands, IndexCommands};

#[tokio::main]
async fn main() {
    let Cli {
        command,
        config,
        json,
    } = Cli::parse();

    let result = async {
        let config = load_config(config.as_deref())?;
        match command.unwrap_or(Commands::Serve) {
            Commands::Serve => commands::serve::execute(config).await,
            Commands::Config(ConfigCommands::Show) => commands::config::handle_show(&config, json),
            Commands::Index(IndexCommands::Stats) => commands::index::handle_stats(&config, json),
        }
    }
    .await;

    if let Err(err) = result {
        lexrag::cli::handle_error(err, json);
    }
}
