//! bibshelf CLI: the `bibshelf` command.

mod cli;
mod commands;
mod support;

use clap::Parser;
use cli::{Cli, Commands};

fn main() {
    support::init_tracing();
    let cli = Cli::parse();
    let service = support::open_service_or_exit(cli.config.as_deref(), cli.root, cli.format);

    match cli.command {
        Commands::Library { command } => commands::library::run(&service, command),

        Commands::Entry { command } => commands::entry::run(&service, command),

        Commands::All { json } => commands::all::run(&service, json),

        Commands::Dispatch {
            action,
            payload,
            json,
        } => commands::dispatch::run(&service, action, payload, json),
    }
}
