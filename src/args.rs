use crate::prompt::DetailLevel;
use clap::{Parser, Subcommand};

#[derive(Parser, Debug, Clone)]
#[command(
    name = "git-wise",
    version,
    about = "An intelligent Git commit message generator",
    long_about = "Reads your staged changes, asks a language model for a conventional commit message, and splits oversized changes across several requests so they fit the model's context window."
)]
pub struct Args {
    #[arg(short, long, global = true, help = "Log planning and request details to stderr")]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Initialize or reconfigure git-wise
    Init,

    /// Generate a commit message for staged changes
    #[command(alias = "generate")]
    Start(StartArgs),

    /// Check configuration and environment
    Doctor,
}

#[derive(clap::Args, Debug, Clone, Default)]
pub struct StartArgs {
    #[arg(short, long, help = "Commit message language (default: language in config)")]
    pub language: Option<String>,

    #[arg(short, long, value_enum, help = "Commit message detail level")]
    pub detail: Option<DetailLevel>,

    #[arg(short, long, help = "Model to use (default: model in config)")]
    pub model: Option<String>,

    #[arg(short, long, help = "Offer to commit with the generated message")]
    pub interactive: bool,
}
