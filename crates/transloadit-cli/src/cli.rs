use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "transloadit")]
#[command(about = "Submit Transloadit assemblies and inspect their status")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Upload files and run an assembly over them
    Create {
        #[command(flatten)]
        args: CreateArgs,
    },

    /// Show the current status of an assembly
    Status {
        assembly_id: String,

        /// Keep polling until the assembly finishes
        #[arg(long)]
        wait: bool,
    },

    /// Cancel a running assembly
    Cancel { assembly_id: String },
}

#[derive(Args)]
pub struct CreateArgs {
    /// Steps as inline JSON, or @path to a JSON file
    #[arg(long)]
    pub steps: String,

    /// Wait for the assembly to finish before printing it
    #[arg(long)]
    pub wait: bool,

    /// Delay between status polls while waiting
    #[arg(long)]
    pub interval_ms: Option<u64>,

    /// Give up waiting after this many seconds
    #[arg(long)]
    pub timeout_secs: Option<u64>,

    /// Files to upload
    #[arg(required = true)]
    pub files: Vec<PathBuf>,
}
