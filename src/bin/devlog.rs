//! devlog CLI Binary
//!
//! Command-line interface for the devlog post generator.

use clap::Parser;
use devlog::cli::{Cli, RunContext};
use devlog::config::{resolve, ConfigLoader};
use devlog::logging::{init_logging, LoggingConfig};
use std::io::Write;
use std::process;
use tracing::{error, info};

fn main() {
    let cli = Cli::parse();

    // Build logging config from CLI args, env vars, and config file
    let logging_config = build_logging_config(&cli);

    if let Err(e) = init_logging(Some(&logging_config)) {
        eprintln!("Failed to initialize logging: {}", e);
        process::exit(1);
    }

    info!("devlog starting");

    let context = match RunContext::new(cli.workspace.clone(), cli.config.clone()) {
        Ok(ctx) => ctx,
        Err(e) => {
            error!("Error loading configuration: {}", e);
            eprintln!("{}", devlog::cli::map_error(&e));
            process::exit(1);
        }
    };

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let result = context.execute(&cli.command, &mut out);
    let _ = out.flush();
    match result {
        Ok(code) => {
            info!(exit_code = code, "Command finished");
            process::exit(code);
        }
        Err(e) => {
            error!("Command failed: {}", e);
            eprintln!("{}", devlog::cli::map_error(&e));
            process::exit(1);
        }
    }
}

/// Build logging configuration from CLI args and config file.
/// Precedence: CLI flags override config file override defaults.
fn build_logging_config(cli: &Cli) -> LoggingConfig {
    let mut config = if let Some(ref config_path) = cli.config {
        ConfigLoader::load_from_file(config_path)
            .ok()
            .map(|c| c.logging)
            .unwrap_or_default()
    } else {
        ConfigLoader::load(&cli.workspace)
            .ok()
            .map(|c| c.logging)
            .unwrap_or_default()
    };

    if cli.quiet {
        config.enabled = false;
    }
    if cli.verbose {
        config.level = "debug".to_string();
    }
    if let Some(ref level) = cli.log_level {
        config.level = level.clone();
    }
    if let Some(ref format) = cli.log_format {
        config.format = format.clone();
    }
    if let Some(ref output) = cli.log_output {
        config.output = output.clone();
    }
    if let Some(ref file) = cli.log_file {
        config.file = Some(file.clone());
        if cli.log_output.is_none() {
            config.output = "file".to_string();
        }
    }
    if let Some(file) = config.file.take() {
        config.file = Some(resolve(&cli.workspace, &file));
    }

    config
}
