// gallery/src/main.rs
use std::fs;
use std::process;

use clap::Parser;
use colored::Colorize;
use gallery_common::error::{GalleryError, Result};
use gallery_common::Config;
use gallery_core::GalleryEndpoints;
use tracing::level_filters::LevelFilter;
use tracing::{debug, error};
use tracing_subscriber::fmt::writer::MakeWriterExt;
use tracing_subscriber::EnvFilter;

mod cli;
use cli::CliArgs;

fn level_filter(cli_args: &CliArgs) -> Result<LevelFilter> {
    if let Some(level) = &cli_args.log_level {
        return level.parse::<LevelFilter>().map_err(|e| {
            GalleryError::ValidationError(format!("Invalid log level '{level}': {e}"))
        });
    }
    Ok(match cli_args.verbose {
        0 => LevelFilter::INFO,
        1 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    })
}

fn init_logging(cli_args: &CliArgs, config: &Config) -> Result<()> {
    let level_filter = level_filter(cli_args)?;
    let max_log_level = level_filter.into_level().unwrap_or(tracing::Level::INFO);

    let env_filter = EnvFilter::builder()
        .with_default_directive(level_filter.into())
        .with_env_var("GALLERY_LOG")
        .from_env_lossy();

    let log_dir = config.logs_dir();
    if cli_args.verbose == 0 {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .with_ansi(true)
            .without_time()
            .try_init();
    } else if let Err(e) = fs::create_dir_all(&log_dir) {
        eprintln!(
            "{} Failed to create log directory {}: {}",
            "Error:".red().bold(),
            log_dir.display(),
            e
        );
        let _ = tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .with_ansi(true)
            .without_time()
            .try_init();
    } else {
        let file_appender = tracing_appender::rolling::daily(&log_dir, "gallery.log");
        let (non_blocking_appender, guard) = tracing_appender::non_blocking(file_appender);

        let stderr_writer = std::io::stderr.with_max_level(max_log_level);
        let file_writer = non_blocking_appender.with_max_level(max_log_level);

        let _ = tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_writer(stderr_writer.and(file_writer))
            .with_ansi(true)
            .without_time()
            .try_init();

        // Flushes the file writer for the lifetime of the process
        Box::leak(Box::new(guard));

        debug!(
            "Verbose logging enabled. Writing logs to: {}/gallery.log",
            log_dir.display()
        );
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    let config = Config::load()
        .map_err(|e| GalleryError::Config(format!("Could not load config: {e}")))?;
    if let Err(e) = init_logging(&cli_args, &config) {
        eprintln!("{}: {}", "Error".red().bold(), e);
        process::exit(2);
    }

    let (endpoints, _worker) = GalleryEndpoints::start(config)?;

    if let Err(e) = cli_args.command.run(&endpoints).await {
        error!("Command failed: {:#}", e);
        eprintln!("{}: {:#}", "Error".red().bold(), e);
        process::exit(1);
    }

    debug!("Command completed successfully.");
    Ok(())
}
