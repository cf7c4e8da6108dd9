//! Unified relayd CLI.
//!
//! - `relayd serve` - Run the managed relay node
//! - `relayd user`  - Manage subscribers in the registry

use std::process::ExitCode;

use clap::{Parser, Subcommand};

/// Relayd unified CLI.
#[derive(Parser)]
#[command(
    name = "relayd",
    version,
    about = "Managed relay node with subscriber quotas and traffic accounting",
    propagate_version = true
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the managed relay node.
    #[command(name = "serve", alias = "run")]
    Serve(Box<relayd::serve::ServeArgs>),

    /// Manage subscribers in the registry.
    #[command(name = "user")]
    User(relayd::users::UserArgs),
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Serve(args) => relayd::serve::run(*args).await,
        Commands::User(args) => relayd::users::run(args).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
