use std::sync::Arc;

use super::settings::Settings;
use super::{MetricSource, StatContext, StatFactory};
use crate::sample::{Bounds, MetricSample};
use crate::PermonError;

type SampleFn = Box<dyn FnMut() -> MetricSample + Send>;
type BuildFn = dyn Fn(&Settings) -> Result<SampleFn, PermonError> + Send + Sync;
type CheckFn = dyn Fn(&Settings) -> Result<(), PermonError> + Send + Sync;

/// A metric source backed by a closure.
pub struct CustomStat {
    tag: String,
    name: String,
    bounds: Bounds,
    sample: SampleFn,
}

impl CustomStat {
    pub fn new<F>(
        tag: impl Into<String>,
        name: impl Into<String>,
        bounds: Bounds,
        sample: F,
    ) -> Self
    where
        F: FnMut() -> MetricSample + Send + 'static,
    {
        Self {
            tag: tag.into(),
            name: name.into(),
            bounds,
            sample: Box::new(sample),
        }
    }
}

impl MetricSource for CustomStat {
    fn name(&self) -> &str {
        &self.name
    }

    fn tag(&self) -> &str {
        &self.tag
    }

    fn sample(&mut self) -> MetricSample {
        (self.sample)()
    }

    fn bounds(&self) -> Bounds {
        self.bounds
    }
}

/// Registers a closure-backed stat without a dedicated trait impl.
///
/// ```
/// use permon_core::stats::{CustomStatFactory, StatRegistry};
/// use permon_core::{Bounds, MetricSample, StatContext};
///
/// let mut registry = StatRegistry::new(StatContext::default());
/// registry
///     .register(CustomStatFactory::new(
///         "demo.constant",
///         "Always Seven",
///         Bounds::fixed(0.0, 10.0),
///         |_settings| Ok(Box::new(|| MetricSample::Scalar(7.0))),
///     ))
///     .unwrap();
/// let mut stat = registry.create("demo.constant", &Default::default()).unwrap();
/// assert_eq!(stat.sample().value(), 7.0);
/// ```
#[derive(Clone)]
pub struct CustomStatFactory {
    tag: String,
    name: String,
    bounds: Bounds,
    defaults: Settings,
    build: Arc<BuildFn>,
    check: Option<Arc<CheckFn>>,
}

impl CustomStatFactory {
    pub fn new<F>(
        tag: impl Into<String>,
        name: impl Into<String>,
        bounds: Bounds,
        build: F,
    ) -> Self
    where
        F: Fn(&Settings) -> Result<Box<dyn FnMut() -> MetricSample + Send>, PermonError>
            + Send
            + Sync
            + 'static,
    {
        Self {
            tag: tag.into(),
            name: name.into(),
            bounds,
            defaults: Settings::new(),
            build: Arc::new(build),
            check: None,
        }
    }

    pub fn with_settings(mut self, defaults: Settings) -> Self {
        self.defaults = defaults;
        self
    }

    pub fn with_availability<F>(mut self, check: F) -> Self
    where
        F: Fn(&Settings) -> Result<(), PermonError> + Send + Sync + 'static,
    {
        self.check = Some(Arc::new(check));
        self
    }
}

impl StatFactory for CustomStatFactory {
    fn tag(&self) -> &str {
        &self.tag
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn default_settings(&self) -> Settings {
        self.defaults.clone()
    }

    fn check_availability(
        &self,
        _ctx: &StatContext,
        settings: &Settings,
    ) -> Result<(), PermonError> {
        match &self.check {
            Some(check) => check(settings),
            None => Ok(()),
        }
    }

    fn create(
        &self,
        _ctx: &StatContext,
        settings: &Settings,
    ) -> Result<Box<dyn MetricSource>, PermonError> {
        let sample = (self.build)(settings)?;
        Ok(Box::new(CustomStat {
            tag: self.tag.clone(),
            name: self.name.clone(),
            bounds: self.bounds,
            sample,
        }))
    }
}

impl std::fmt::Debug for CustomStatFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CustomStatFactory")
            .field("tag", &self.tag)
            .field("bounds", &self.bounds)
            .finish_non_exhaustive()
    }
}
