mod app;
mod commands;
mod output;

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use clap::Parser;

use crate::app::{Cli, Command};

fn main() -> anyhow::Result<()> {
    // The first Ctrl+C cancels the running job so no partial jar is left behind; a second one
    // exits immediately
    let cancel = Arc::new(AtomicBool::new(false));
    let handler_flag = Arc::clone(&cancel);
    ctrlc::set_handler(move || {
        if handler_flag.swap(true, Ordering::Relaxed) {
            std::process::exit(130);
        }
        eprintln!("\nCancelling...");
    })
    .expect("failed to set Ctrl+C handler");

    let cli = Cli::parse();

    // Show classabi info+ on stderr unless --json; --verbose enables debug; RUST_LOG overrides
    if !cli.global.json {
        let level = if cli.global.verbose {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Info
        };
        env_logger::Builder::new()
            .filter_module("classabi", level)
            .parse_default_env()
            .target(env_logger::Target::Stderr)
            .format_timestamp(None)
            .format_module_path(false)
            .format_target(false)
            .init();
    }

    match &cli.command {
        Command::Strip {
            input,
            output,
            config,
        } => commands::strip::run(input, output, &config.to_config(), &cancel, &cli.global),
        Command::Batch { jobs, config } => {
            commands::batch::run(jobs, &config.to_config(), &cancel, &cli.global)
        }
        Command::Inspect { path, entry } => {
            commands::inspect::run(path, entry.as_deref(), &cli.global)
        }
    }
}
