//! CLI parse: clap types for devlog. No behavior; definitions only.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// devlog CLI - dated engineering posts from git activity
#[derive(Parser, Debug)]
#[command(name = "devlog")]
#[command(about = "Generate dated engineering blog posts from git activity")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Workspace root directory (the content repository)
    #[arg(long, default_value = ".")]
    pub workspace: PathBuf,

    /// Configuration file path (replaces global and workspace config files)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(long, default_value = "false")]
    pub verbose: bool,

    /// Disable diagnostic logging
    #[arg(long, short = 'q', default_value = "false")]
    pub quiet: bool,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long)]
    pub log_format: Option<String>,

    /// Log output (stdout, stderr, file)
    #[arg(long)]
    pub log_output: Option<String>,

    /// Log file path (when output is "file")
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Commands {
    /// Generate posts for every eligible day in the ideas feed
    Batch {
        /// Ideas feed (JSON with a top-level "daily" map)
        #[arg(long)]
        ideas_file: Option<PathBuf>,

        /// Earliest date to include (YYYY-MM-DD, inclusive)
        #[arg(long)]
        from_date: Option<String>,

        /// Latest date to include (YYYY-MM-DD, inclusive)
        #[arg(long)]
        to_date: Option<String>,

        /// Generate at most this many posts, newest first (0 = no limit)
        #[arg(long, default_value = "0")]
        limit: usize,

        /// Replace existing posts for targeted dates
        #[arg(long)]
        overwrite: bool,

        /// Report targets without calling the model or writing files
        #[arg(long)]
        dry_run: bool,

        /// Parallel workers (minimum 1)
        #[arg(long)]
        workers: Option<usize>,

        /// Writer model
        #[arg(long)]
        model: Option<String>,

        /// Post author
        #[arg(long)]
        author: Option<String>,

        /// Run the configured feed refresh command first
        #[arg(long)]
        refresh_feed: bool,
    },
    /// Write, commit, and push a recap of one day's commits
    Recap {
        /// Target date (YYYY-MM-DD); defaults to yesterday at the configured offset
        #[arg(long)]
        date: Option<String>,

        /// Writer model
        #[arg(long)]
        model: Option<String>,

        /// Post author
        #[arg(long)]
        author: Option<String>,

        /// Replace an existing post for the date
        #[arg(long)]
        overwrite: bool,

        /// Aggregate and prepare the prompt only
        #[arg(long)]
        dry_run: bool,
    },
}
