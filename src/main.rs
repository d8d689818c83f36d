mod cli;
mod commands;
mod config;
mod paths;
mod progress;
mod resource;
mod state;
mod ui;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use clap_complete::generate;
use cli::{Cli, Command};
use std::io;

/// Global context for the application
pub struct Context {
    pub verbose: u8,
    pub quiet: bool,
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
    };
    let file = cli.file.as_deref();

    match cli.command {
        Command::Plan(args) => commands::declarative::plan(&ctx, file, args.target.as_deref()),
        Command::Apply(args) => commands::declarative::apply(
            &ctx,
            file,
            args.target.as_deref(),
            args.dry_run,
            args.jobs,
            args.yes,
        ),
        Command::Refresh(args) => {
            commands::declarative::refresh(&ctx, file, args.target.as_deref())
        }
        Command::Import(args) => {
            commands::declarative::import(&ctx, file, args.kind, &args.name, &args.id)
        }
        Command::Destroy(args) => {
            commands::declarative::destroy(&ctx, file, args.target.as_deref(), args.yes)
        }
        Command::Lookup(cmd) => commands::lookup::run(&ctx, file, cmd),
        Command::Schema { kind } => commands::schema::run(kind),
        Command::Completions { shell } => {
            let mut cmd = Cli::command();
            generate(shell, &mut cmd, "devhub", &mut io::stdout());
            Ok(())
        }
    }
}
