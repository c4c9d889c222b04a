use std::time::Instant;

use serde_json::json;
use sysinfo::{System, MINIMUM_CPU_UPDATE_INTERVAL};

use super::settings::{get_usize, Settings};
use super::{MetricSource, StatContext, StatFactory};
use crate::sample::{Bounds, MetricSample};
use crate::sampler::{SamplerHandle, UsageKind};
use crate::PermonError;

const TAG: &str = "core.cpu_usage";
const NAME: &str = "CPU Usage in %";

/// Total CPU usage summed over all cores, broken down by process name.
pub struct CpuUsage {
    system: System,
    cores: usize,
    handle: SamplerHandle,
    top_n: usize,
    last_refresh: Option<Instant>,
    value: f64,
}

impl CpuUsage {
    pub fn new(handle: SamplerHandle, top_n: usize) -> Self {
        Self {
            system: System::new(),
            cores: num_cpus::get(),
            handle,
            top_n,
            last_refresh: None,
            value: 0.0,
        }
    }

    fn refresh(&mut self) {
        // sysinfo needs some time between two refreshes for a usable delta.
        let due = self
            .last_refresh
            .map_or(true, |at| at.elapsed() >= MINIMUM_CPU_UPDATE_INTERVAL);
        if !due {
            return;
        }
        self.system.refresh_cpu_usage();
        self.last_refresh = Some(Instant::now());
        self.value = self
            .system
            .cpus()
            .iter()
            .map(|cpu| f64::from(cpu.cpu_usage()))
            .sum();
    }
}

impl MetricSource for CpuUsage {
    fn name(&self) -> &str {
        NAME
    }

    fn tag(&self) -> &str {
        TAG
    }

    fn sample(&mut self) -> MetricSample {
        self.refresh();
        MetricSample::Breakdown {
            value: self.value,
            contributors: self
                .handle
                .contributors(UsageKind::Cpu, self.top_n, Some(self.value)),
        }
    }

    fn bounds(&self) -> Bounds {
        Bounds::fixed(0.0, 100.0 * self.cores as f64)
    }
}

/// Factory for [`CpuUsage`]
#[derive(Debug, Clone, Copy)]
pub struct CpuUsageFactory {
    contributors: usize,
}

impl CpuUsageFactory {
    pub fn new(contributors: usize) -> Self {
        Self { contributors }
    }
}

impl StatFactory for CpuUsageFactory {
    fn tag(&self) -> &str {
        TAG
    }

    fn name(&self) -> &str {
        NAME
    }

    fn default_settings(&self) -> Settings {
        let mut settings = Settings::new();
        settings.insert("contributors".to_string(), json!(self.contributors));
        settings
    }

    fn check_availability(
        &self,
        _ctx: &StatContext,
        _settings: &Settings,
    ) -> Result<(), PermonError> {
        if !sysinfo::IS_SUPPORTED_SYSTEM {
            return Err(PermonError::SourceUnavailable {
                tag: TAG.to_string(),
                reason: "CPU statistics are not supported on this OS".to_string(),
            });
        }
        Ok(())
    }

    fn create(
        &self,
        ctx: &StatContext,
        settings: &Settings,
    ) -> Result<Box<dyn MetricSource>, PermonError> {
        let top_n = get_usize(settings, "contributors", self.contributors);
        Ok(Box::new(CpuUsage::new(ctx.sampler.attach(), top_n)))
    }
}
