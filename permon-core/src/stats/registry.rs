use std::sync::Arc;

use super::settings::{merge_settings, Settings};
use super::{
    CpuUsageFactory, DiskSpeedFactory, MetricSource, RamUsageFactory, StatContext, StatFactory,
};
use crate::PermonError;

/// Ordered set of stat factories keyed by tag.
///
/// Registration is explicit; [`StatRegistry::with_defaults`] registers the
/// built-in `core.*` stats.
pub struct StatRegistry {
    factories: Vec<Arc<dyn StatFactory>>,
    context: StatContext,
}

impl StatRegistry {
    /// Empty registry
    pub fn new(context: StatContext) -> Self {
        Self {
            factories: Vec::new(),
            context,
        }
    }

    /// Registry holding the CPU, RAM and disk read/write stats
    pub fn with_defaults(context: StatContext) -> Self {
        let contributors = context.contributors;
        let mut registry = Self::new(context);
        let defaults: [Arc<dyn StatFactory>; 4] = [
            Arc::new(CpuUsageFactory::new(contributors)),
            Arc::new(RamUsageFactory::new(contributors)),
            Arc::new(DiskSpeedFactory::read()),
            Arc::new(DiskSpeedFactory::write()),
        ];
        // Tags are distinct, so registration cannot fail here.
        registry.factories.extend(defaults);
        registry
    }

    /// Add a factory. Tags must be non-empty and unique.
    pub fn register<F>(&mut self, factory: F) -> Result<(), PermonError>
    where
        F: StatFactory + 'static,
    {
        self.register_arc(Arc::new(factory))
    }

    pub fn register_arc(&mut self, factory: Arc<dyn StatFactory>) -> Result<(), PermonError> {
        let tag = factory.tag();
        if tag.trim().is_empty() {
            return Err(PermonError::Configuration(
                "stats must have a non-empty tag".to_string(),
            ));
        }
        if self.get(tag).is_some() {
            return Err(PermonError::Configuration(format!(
                "stat \"{tag}\" is already registered"
            )));
        }
        log::debug!("registered stat {tag}");
        self.factories.push(factory);
        Ok(())
    }

    pub fn get(&self, tag: &str) -> Option<&dyn StatFactory> {
        self.factories
            .iter()
            .find(|f| f.tag() == tag)
            .map(|f| f.as_ref())
    }

    pub fn tags(&self) -> impl Iterator<Item = &str> + '_ {
        self.factories.iter().map(|f| f.tag())
    }

    pub fn factories(&self) -> impl Iterator<Item = &dyn StatFactory> + '_ {
        self.factories.iter().map(|f| f.as_ref())
    }

    pub fn context(&self) -> &StatContext {
        &self.context
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }

    /// Availability of `tag` with its default settings
    pub fn check(&self, tag: &str) -> Result<(), PermonError> {
        let factory = self.lookup(tag)?;
        factory.check_availability(&self.context, &factory.default_settings())
    }

    /// Tags whose availability check passes with default settings
    pub fn available(&self) -> Vec<&str> {
        self.factories
            .iter()
            .filter(|f| {
                f.check_availability(&self.context, &f.default_settings())
                    .map_err(|e| log::debug!("{} unavailable: {e}", f.tag()))
                    .is_ok()
            })
            .map(|f| f.tag())
            .collect()
    }

    /// Fail with [`PermonError::UnknownStat`] on the first unregistered tag.
    pub fn verify_tags<S: AsRef<str>>(&self, tags: &[S]) -> Result<(), PermonError> {
        for tag in tags {
            self.lookup(tag.as_ref())?;
        }
        Ok(())
    }

    /// Build the stat `tag` with `overrides` merged onto its defaults.
    ///
    /// The availability check always runs first; an unavailable stat is
    /// never constructed.
    pub fn create(
        &self,
        tag: &str,
        overrides: &Settings,
    ) -> Result<Box<dyn MetricSource>, PermonError> {
        let factory = self.lookup(tag)?;
        let settings = merge_settings(tag, &factory.default_settings(), overrides)?;
        factory.check_availability(&self.context, &settings)?;
        let source = factory.create(&self.context, &settings)?;
        log::debug!("created stat {tag}");
        Ok(source)
    }

    fn lookup(&self, tag: &str) -> Result<&dyn StatFactory, PermonError> {
        self.get(tag)
            .ok_or_else(|| PermonError::UnknownStat(tag.to_string()))
    }
}

impl std::fmt::Debug for StatRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatRegistry")
            .field("tags", &self.tags().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}
