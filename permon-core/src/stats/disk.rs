use serde_json::json;

use super::settings::{get_str, Settings};
use super::{MetricSource, StatContext, StatFactory};
use crate::disk::{DiskBackend, DiskCounters, IoDirection, IostatHandle};
use crate::rate::{RateNormalization, RateTracker};
use crate::sample::{Bounds, MetricSample};
use crate::PermonError;

enum Backend {
    Counters {
        counters: Box<dyn DiskCounters>,
        tracker: RateTracker,
    },
    Iostat(IostatHandle),
}

/// Host-wide disk read or write speed in MiB/s.
pub struct DiskSpeed {
    direction: IoDirection,
    backend: Backend,
    last: f64,
}

impl DiskSpeed {
    /// Rate from cumulative counters; the current counter value becomes the
    /// starting point of the tracker.
    pub fn from_counters(
        direction: IoDirection,
        mut counters: Box<dyn DiskCounters>,
        normalization: RateNormalization,
    ) -> Result<Self, PermonError> {
        let start = counters.read()?.get(direction);
        Ok(Self {
            direction,
            backend: Backend::Counters {
                counters,
                tracker: RateTracker::new(start, normalization),
            },
            last: 0.0,
        })
    }

    pub fn from_iostat(direction: IoDirection, handle: IostatHandle) -> Self {
        Self {
            direction,
            backend: Backend::Iostat(handle),
            last: 0.0,
        }
    }
}

impl MetricSource for DiskSpeed {
    fn name(&self) -> &str {
        name(self.direction)
    }

    fn tag(&self) -> &str {
        tag(self.direction)
    }

    fn sample(&mut self) -> MetricSample {
        let value = match &mut self.backend {
            Backend::Counters { counters, tracker } => match counters.read() {
                Ok(current) => tracker.poll(current.get(self.direction)),
                Err(e) => {
                    log::debug!("{}: keeping last value: {e}", tag(self.direction));
                    self.last
                }
            },
            Backend::Iostat(handle) => handle.rate(self.direction),
        };
        self.last = value;
        MetricSample::Scalar(value)
    }

    fn bounds(&self) -> Bounds {
        Bounds::from_minimum(0.0)
    }
}

fn tag(direction: IoDirection) -> &'static str {
    match direction {
        IoDirection::Read => "core.read_speed",
        IoDirection::Write => "core.write_speed",
    }
}

fn name(direction: IoDirection) -> &'static str {
    match direction {
        IoDirection::Read => "Disk Read Speed in MiB / s",
        IoDirection::Write => "Disk Write Speed in MiB / s",
    }
}

fn parse_settings(
    direction: IoDirection,
    settings: &Settings,
) -> Result<(DiskBackend, RateNormalization), PermonError> {
    let invalid = |reason: String| PermonError::InvalidSettings {
        tag: tag(direction).to_string(),
        reason,
    };
    let backend = get_str(settings, "backend", "counters")
        .parse::<DiskBackend>()
        .map_err(|e| invalid(e.to_string()))?;
    let normalization = match get_str(settings, "normalization", "elapsed") {
        "elapsed" => RateNormalization::Elapsed,
        "nominal_window" => RateNormalization::NominalWindow,
        other => {
            return Err(invalid(format!(
                "unknown normalization \"{other}\" (expected elapsed or nominal_window)"
            )))
        }
    };
    Ok((backend, normalization))
}

/// Factory for [`DiskSpeed`], one per direction
#[derive(Debug, Clone, Copy)]
pub struct DiskSpeedFactory {
    direction: IoDirection,
}

impl DiskSpeedFactory {
    pub fn read() -> Self {
        Self {
            direction: IoDirection::Read,
        }
    }

    pub fn write() -> Self {
        Self {
            direction: IoDirection::Write,
        }
    }
}

impl StatFactory for DiskSpeedFactory {
    fn tag(&self) -> &str {
        tag(self.direction)
    }

    fn name(&self) -> &str {
        name(self.direction)
    }

    fn default_settings(&self) -> Settings {
        let mut settings = Settings::new();
        settings.insert("backend".to_string(), json!("counters"));
        settings.insert("normalization".to_string(), json!("elapsed"));
        settings
    }

    fn check_availability(
        &self,
        ctx: &StatContext,
        settings: &Settings,
    ) -> Result<(), PermonError> {
        let (backend, _) = parse_settings(self.direction, settings)?;
        match backend {
            DiskBackend::Counters => {
                ctx.disk_counters()
                    .read()
                    .map(|_| ())
                    .map_err(|e| PermonError::SourceUnavailable {
                        tag: tag(self.direction).to_string(),
                        reason: e.to_string(),
                    })
            }
            DiskBackend::Iostat => ctx.iostat.check_availability(),
        }
    }

    fn create(
        &self,
        ctx: &StatContext,
        settings: &Settings,
    ) -> Result<Box<dyn MetricSource>, PermonError> {
        let (backend, normalization) = parse_settings(self.direction, settings)?;
        let source = match backend {
            DiskBackend::Counters => {
                DiskSpeed::from_counters(self.direction, ctx.disk_counters(), normalization)?
            }
            DiskBackend::Iostat => DiskSpeed::from_iostat(self.direction, ctx.iostat.attach()?),
        };
        Ok(Box::new(source))
    }
}
