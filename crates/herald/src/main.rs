// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Herald - notification dispatcher and scheduled task host.

mod commands;
mod serve;
mod shutdown;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use herald_config::HeraldConfig;

/// Herald - notification dispatcher and scheduled task host.
#[derive(Parser, Debug)]
#[command(name = "herald", version, about, long_about = None)]
struct Cli {
    /// Configuration file, used instead of the standard search path.
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the dispatcher and the configured tasks until SIGINT/SIGTERM.
    Serve,
    /// Push a message immediately through the configured pusher.
    Send {
        #[arg(long)]
        title: String,
        #[arg(long, default_value = "")]
        content: String,
        /// Receiver; repeat for several.
        #[arg(long = "receiver", required = true)]
        receivers: Vec<String>,
        #[arg(long, default_value = "cli")]
        sender: String,
    },
    /// Send every queued delayed message as one digest.
    Flush,
    /// Print the delivery history of a month.
    History {
        /// Month as YYYYMM.
        month: String,
        /// Show failed deliveries instead of successful ones.
        #[arg(long)]
        failed: bool,
        /// Print raw JSON records.
        #[arg(long)]
        json: bool,
    },
    /// List months that have history.
    Months,
    /// Delete history older than the given number of months.
    Prune {
        #[arg(long)]
        keep: Option<u32>,
    },
}

fn load_config(path: Option<&PathBuf>) -> HeraldConfig {
    let loaded = match path {
        Some(path) => herald_config::load_and_validate_path(path),
        None => herald_config::load_and_validate(),
    };
    match loaded {
        Ok(config) => config,
        Err(errors) => {
            herald_config::render_errors(&errors);
            std::process::exit(1);
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_ref());
    serve::init_tracing(&config.daemon.log_level);

    let result = match cli.command {
        Some(Commands::Serve) => serve::run_serve(config).await,
        Some(Commands::Send {
            title,
            content,
            receivers,
            sender,
        }) => commands::run_send(&config, &sender, &title, &content, receivers).await,
        Some(Commands::Flush) => commands::run_flush(&config).await,
        Some(Commands::History {
            month,
            failed,
            json,
        }) => commands::run_history(&config, &month, failed, json).await,
        Some(Commands::Months) => commands::run_months(&config).await,
        Some(Commands::Prune { keep }) => commands::run_prune(&config, keep).await,
        None => {
            println!("herald: use --help for available commands");
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
