use serde_json::json;
use sysinfo::System;

use super::settings::{get_usize, Settings};
use super::{MetricSource, StatContext, StatFactory};
use crate::sample::{Bounds, MetricSample};
use crate::sampler::{SamplerHandle, UsageKind};
use crate::{PermonError, MIB};

const TAG: &str = "core.ram_usage";
const NAME: &str = "RAM Usage in MiB";

/// Used memory in MiB, broken down by process name.
///
/// The per-process figures never add up to the used total exactly, so the
/// breakdown is rescaled to the total with the rest bucketed as "other".
pub struct RamUsage {
    system: System,
    total_mib: f64,
    handle: SamplerHandle,
    top_n: usize,
}

impl RamUsage {
    pub fn new(handle: SamplerHandle, top_n: usize) -> Self {
        let mut system = System::new();
        system.refresh_memory();
        let total_mib = system.total_memory() as f64 / MIB;
        Self {
            system,
            total_mib,
            handle,
            top_n,
        }
    }
}

impl MetricSource for RamUsage {
    fn name(&self) -> &str {
        NAME
    }

    fn tag(&self) -> &str {
        TAG
    }

    fn sample(&mut self) -> MetricSample {
        self.system.refresh_memory();
        let used = self.system.used_memory() as f64 / MIB;
        MetricSample::Breakdown {
            value: used,
            contributors: self
                .handle
                .contributors(UsageKind::Ram, self.top_n, Some(used)),
        }
    }

    fn bounds(&self) -> Bounds {
        Bounds::fixed(0.0, self.total_mib)
    }
}

/// Factory for [`RamUsage`]
#[derive(Debug, Clone, Copy)]
pub struct RamUsageFactory {
    contributors: usize,
}

impl RamUsageFactory {
    pub fn new(contributors: usize) -> Self {
        Self { contributors }
    }
}

impl StatFactory for RamUsageFactory {
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
        let mut system = System::new();
        system.refresh_memory();
        if !sysinfo::IS_SUPPORTED_SYSTEM || system.total_memory() == 0 {
            return Err(PermonError::SourceUnavailable {
                tag: TAG.to_string(),
                reason: "total memory cannot be read".to_string(),
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
        Ok(Box::new(RamUsage::new(ctx.sampler.attach(), top_n)))
    }
}
