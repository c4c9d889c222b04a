mod app;
mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use std::ffi::OsString;
use std::fs::File;
use std::path::{Path, PathBuf};

use permon_core::config::default_config_path;
use permon_core::{PermonConfig, ProcessSampler, StatContext, StatRegistry, StatSpec};

use crate::cli::Cli;

/// Overrides the log file location
const LOG_PATH_ENV: &str = "PERMON_LOG_PATH";

const LOG_FILE: &str = "permon.log";

/// `PERMON_LOG_PATH` if set, otherwise `permon.log` next to the config file
fn log_path(env: Option<OsString>, config_path: &Path) -> Option<PathBuf> {
    match env.filter(|p| !p.is_empty()) {
        Some(path) => Some(PathBuf::from(path)),
        None => config_path.parent().map(|dir| dir.join(LOG_FILE)),
    }
}

fn open_log_file(path: &Path) -> std::io::Result<File> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    File::create(path)
}

/// Log to a file, since the charts own the terminal. Without one, only
/// errors reach stderr.
fn init_logging(path: Option<PathBuf>) {
    let mut builder = env_logger::Builder::from_default_env();

    let file = path.and_then(|path| match open_log_file(&path) {
        Ok(file) => Some(file),
        Err(e) => {
            eprintln!("cannot open log file {}: {e}", path.display());
            None
        }
    });
    match file {
        Some(file) => {
            builder
                .filter_level(log::LevelFilter::Info)
                .target(env_logger::Target::Pipe(Box::new(file)));
        }
        None => {
            builder.filter_level(log::LevelFilter::Error);
        }
    }
    builder.init();
}

fn print_stats(registry: &StatRegistry) {
    for factory in registry.factories() {
        let status = match registry.check(factory.tag()) {
            Ok(()) => "available".to_string(),
            Err(e) => format!("unavailable ({e})"),
        };
        println!("{:<20} {:<30} {}", factory.tag(), factory.name(), status);
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = cli
        .config
        .clone()
        .or_else(default_config_path)
        .context("cannot determine the config file location")?;
    init_logging(log_path(std::env::var_os(LOG_PATH_ENV), &config_path));

    if cli.reset_config {
        PermonConfig::reset(&config_path)
            .with_context(|| format!("failed to reset {}", config_path.display()))?;
        println!("reset {}", config_path.display());
        return Ok(());
    }

    let mut config = PermonConfig::load(&config_path)?;
    if cli.show_config {
        println!("{}", config_path.display());
        println!("{}", config.to_json()?);
        return Ok(());
    }

    if let Some(fps) = cli.fps {
        config.fps = fps;
    }
    if !cli.stats.is_empty() {
        config.stats = cli.stats.iter().map(|tag| StatSpec::from(tag.as_str())).collect();
    }

    let sampler = ProcessSampler::new(config.sampler_config());
    let context = StatContext::new(sampler).with_contributors(config.contributors);
    let registry = StatRegistry::with_defaults(context);

    if cli.list {
        print_stats(&registry);
        return Ok(());
    }

    registry.verify_tags(&config.tags())?;

    if cli.save {
        config
            .save(&config_path)
            .with_context(|| format!("failed to save {}", config_path.display()))?;
        log::info!("saved config to {}", config_path.display());
    }

    app::run(&registry, &config)
}
