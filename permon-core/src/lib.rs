//! Permon core library
//! Samples host metrics, attributes them to processes and renders rolling
//! line charts onto a character grid.

use thiserror::Error;

/// Permon error type shared by samplers, stats and the renderer
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PermonError {
    /// A prerequisite of a stat (sensor, driver, OS interface) is missing.
    #[error("stat {tag} is not available: {reason}")]
    SourceUnavailable { tag: String, reason: String },

    /// Process enumeration was refused by the OS.
    #[error("access denied: {0}")]
    AccessDenied(String),

    /// Layout or settings that cannot produce a correct chart.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A subprocess-backed source is missing or exited abnormally.
    #[error("external tool {tool} failed: {reason}")]
    ExternalTool { tool: String, reason: String },

    #[error("stat \"{0}\" does not exist")]
    UnknownStat(String),

    #[error("invalid settings for {tag}: {reason}")]
    InvalidSettings { tag: String, reason: String },
}

pub mod apportion;
pub mod config;
pub mod disk;
pub mod history;
pub mod monitor;
pub mod process;
pub mod rate;
pub mod render;
pub mod sample;
pub mod sampler;
pub mod stats;
mod worker;

pub use apportion::top_contributors;
pub use config::{PermonConfig, StatSpec};
pub use history::RollingBuffer;
pub use monitor::{Layout, Monitor};
pub use render::{Frame, GridRenderer, Resolution};
pub use sample::{Bounds, Contributor, MetricSample};
pub use sampler::{ProcessSampler, SamplerHandle, UsageKind};
pub use stats::{MetricSource, Settings, StatContext, StatFactory, StatRegistry};

/// Bytes per MiB, the unit used by the memory and disk stats
pub const MIB: f64 = 1024.0 * 1024.0;

/// Get the library version
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
