use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "adventure")]
#[command(version)]
#[command(about = "Play a branching story or chat against an adventure server")]
pub struct Args {
    /// TOML config file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Server origin, e.g. http://127.0.0.1:8080 (overrides config and env)
    #[arg(long, global = true)]
    pub base_url: Option<String>,

    /// Log filter directive, e.g. debug (overrides config and env)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Play the branching narration
    Narrate {
        /// Resume an existing session instead of generating a new id
        #[arg(long)]
        session: Option<String>,
    },
    /// Send chat messages line by line
    Chat,
}
