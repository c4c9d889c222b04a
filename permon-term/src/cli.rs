use clap::Parser;
use std::path::PathBuf;

/// Live terminal line charts for host metrics
#[derive(Parser, Debug)]
#[command(name = "permon", version, about)]
pub struct Cli {
    /// Stats to display, e.g. core.cpu_usage core.ram_usage.
    /// Defaults to the stats stored in the config file.
    pub stats: Vec<String>,

    /// Display refresh rate in frames per second
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..=120))]
    pub fps: Option<u32>,

    /// Config file to read (and write with --save)
    #[arg(long, env = permon_core::config::CONFIG_ENV)]
    pub config: Option<PathBuf>,

    /// List every registered stat with its availability and exit
    #[arg(long)]
    pub list: bool,

    /// Store the given stats and fps in the config file before starting
    #[arg(long)]
    pub save: bool,

    /// Print the stored config and exit
    #[arg(long, conflicts_with_all = ["list", "save", "reset_config"])]
    pub show_config: bool,

    /// Overwrite the config file with the defaults and exit
    #[arg(long, conflicts_with_all = ["list", "save"])]
    pub reset_config: bool,
}
