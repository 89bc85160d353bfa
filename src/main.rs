mod app;
mod args;
mod changes;
mod config;
mod error;
mod generator;
mod git;
mod openai;
mod output;
mod planner;
mod prompt;
mod tokens;

use anyhow::Result;
use args::Args;
use clap::Parser;
use crossterm::style::Stylize;
use output::ConsoleSink;
use tracing_subscriber::EnvFilter;

fn main() {
    let args = Args::parse();
    init_logging(args.verbose);

    if let Err(err) = run(&args) {
        eprintln!("{} {}", "git-wise error:".red().bold(), error_line(&err));
        std::process::exit(1);
    }
}

fn run(args: &Args) -> Result<()> {
    let mut out = ConsoleSink;
    app::run(&args.command, config::load(), &mut out)?;
    Ok(())
}

/// Our errors already embed their cause, so only the outer message is shown.
fn error_line(err: &anyhow::Error) -> String {
    err.to_string()
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose { "git_wise=debug" } else { "git_wise=warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
