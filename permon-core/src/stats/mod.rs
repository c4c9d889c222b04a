//! Metric sources and the registry they are created from

mod cpu;
mod custom;
mod disk;
mod ram;
mod registry;
pub mod settings;

use std::sync::Arc;

use crate::disk::{DiskCounters, IostatService, ProcDiskStats};
use crate::sample::{Bounds, MetricSample};
use crate::sampler::ProcessSampler;
use crate::PermonError;

pub use cpu::{CpuUsage, CpuUsageFactory};
pub use custom::{CustomStat, CustomStatFactory};
pub use disk::{DiskSpeed, DiskSpeedFactory};
pub use ram::{RamUsage, RamUsageFactory};
pub use registry::StatRegistry;
pub use settings::Settings;

/// Anything that can be polled for a chart.
///
/// Sources are created through a [`StatFactory`] and only after its
/// availability check succeeded.
pub trait MetricSource: Send {
    /// Human readable title
    fn name(&self) -> &str;

    /// Stable unique identifier such as `core.cpu_usage`
    fn tag(&self) -> &str;

    /// Current value, possibly with a contributor breakdown. Never fails:
    /// sources report a stale or zero value when their backend hiccups.
    fn sample(&mut self) -> MetricSample;

    fn bounds(&self) -> Bounds;
}

/// Constructor for one kind of [`MetricSource`].
pub trait StatFactory: Send + Sync {
    fn tag(&self) -> &str;

    fn name(&self) -> &str;

    /// Settings accepted by [`StatFactory::create`] and their defaults
    fn default_settings(&self) -> Settings {
        Settings::new()
    }

    /// Whether the stat can run on this host with `settings`.
    fn check_availability(
        &self,
        _ctx: &StatContext,
        _settings: &Settings,
    ) -> Result<(), PermonError> {
        Ok(())
    }

    /// Build the source. `settings` are already merged over the defaults.
    fn create(
        &self,
        ctx: &StatContext,
        settings: &Settings,
    ) -> Result<Box<dyn MetricSource>, PermonError>;
}

type CountersFactory = dyn Fn() -> Box<dyn DiskCounters> + Send + Sync;

/// Shared services handed to every factory.
#[derive(Clone)]
pub struct StatContext {
    pub sampler: ProcessSampler,
    pub iostat: IostatService,
    /// Default number of contributors shown by breakdown stats
    pub contributors: usize,
    disk_counters: Arc<CountersFactory>,
}

impl StatContext {
    pub fn new(sampler: ProcessSampler) -> Self {
        Self {
            sampler,
            iostat: IostatService::new(),
            contributors: crate::apportion::DEFAULT_TOP_N,
            disk_counters: Arc::new(|| Box::new(ProcDiskStats::new())),
        }
    }

    pub fn with_iostat(mut self, iostat: IostatService) -> Self {
        self.iostat = iostat;
        self
    }

    pub fn with_contributors(mut self, n: usize) -> Self {
        self.contributors = n;
        self
    }

    /// Replace the cumulative disk counter source used by the disk stats.
    pub fn with_disk_counters<F>(mut self, factory: F) -> Self
    where
        F: Fn() -> Box<dyn DiskCounters> + Send + Sync + 'static,
    {
        self.disk_counters = Arc::new(factory);
        self
    }

    pub fn disk_counters(&self) -> Box<dyn DiskCounters> {
        (self.disk_counters)()
    }
}

impl Default for StatContext {
    fn default() -> Self {
        Self::new(ProcessSampler::default())
    }
}

impl std::fmt::Debug for StatContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatContext")
            .field("sampler", &self.sampler)
            .field("contributors", &self.contributors)
            .finish_non_exhaustive()
    }
}
