use clap::Parser;
use owo_colors::OwoColorize;
use std::process;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod cli;
mod commands;
mod output;

use cli::{Cli, Commands};
use commands::*;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let default_filter = match cli.verbose {
        0 => "warn",
        1 => "notes_core=info,notes=info",
        _ => "debug",
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let format = cli.output;
    let result = match cli.command {
        Commands::List { limit, folder } => notes::list(format, limit, folder).await,
        Commands::Get { ids } => notes::get(format, ids).await,
        Commands::Search { query, limit } => notes::search(format, query, limit).await,
        Commands::Create {
            title,
            body,
            folder,
            account,
        } => notes::create(format, title, body, folder, account).await,
        Commands::Tools => tools::run(format).await,
        Commands::Doctor => notes::doctor(format).await,
        Commands::Package {
            manifest,
            binary,
            out_dir,
        } => package::run(format, &manifest, &binary, &out_dir),
    };

    if let Err(e) = result {
        eprintln!("{}: {}", "Error".red().bold(), e);
        process::exit(1);
    }
}
