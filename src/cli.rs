use std::path::PathBuf;
use clap::{ArgAction, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "bazel-support", about = "Ask for help with a Bazel build over Slack")]
pub struct Cli {
    /// Path to a TOML config file (defaults apply when absent)
    #[arg(long, global = true, env = "BAZEL_SUPPORT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Post a support request to Slack with the last command.log attached
    Support,
}
