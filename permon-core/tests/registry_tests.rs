//! Stat registry: registration, availability and creation

use permon_core::disk::{DiskCounters, IoCounters, IostatService};
use permon_core::process::{ProcessEnumerator, ProcessUsage};
use permon_core::sampler::SamplerConfig;
use permon_core::stats::CustomStatFactory;
use permon_core::{
    Bounds, MetricSample, PermonError, ProcessSampler, Settings, StatContext, StatRegistry,
};
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

struct EmptyEnumerator;

impl ProcessEnumerator for EmptyEnumerator {
    fn enumerate(&mut self) -> Result<Vec<ProcessUsage>, PermonError> {
        Ok(Vec::new())
    }
}

struct FixedCounters;

impl DiskCounters for FixedCounters {
    fn read(&mut self) -> Result<IoCounters, PermonError> {
        Ok(IoCounters {
            read_bytes: 4096,
            write_bytes: 8192,
        })
    }
}

fn context() -> StatContext {
    let sampler =
        ProcessSampler::with_enumerator(SamplerConfig::default(), || Box::new(EmptyEnumerator));
    StatContext::new(sampler)
        .with_disk_counters(|| Box::new(FixedCounters))
        .with_iostat(IostatService::with_program("permon-test-missing-iostat"))
}

fn settings(value: serde_json::Value) -> Settings {
    match value {
        serde_json::Value::Object(map) => map,
        _ => Settings::new(),
    }
}

fn constant(tag: &str) -> CustomStatFactory {
    CustomStatFactory::new(tag, "Constant", Bounds::fixed(0.0, 10.0), |settings| {
        let value = settings.get("value").and_then(|v| v.as_f64()).unwrap_or(1.0);
        Ok(Box::new(move || MetricSample::Scalar(value)))
    })
    .with_settings(settings(json!({"value": 1.0})))
}

#[test]
fn test_defaults_are_registered_in_order() {
    let registry = StatRegistry::with_defaults(context());
    let tags: Vec<&str> = registry.tags().collect();
    assert_eq!(
        tags,
        vec![
            "core.cpu_usage",
            "core.ram_usage",
            "core.read_speed",
            "core.write_speed"
        ]
    );
    assert_eq!(registry.get("core.ram_usage").unwrap().name(), "RAM Usage in MiB");
}

#[test]
fn test_duplicate_tags_are_rejected() {
    let mut registry = StatRegistry::with_defaults(context());
    registry.register(constant("user.constant")).unwrap();
    let err = registry.register(constant("user.constant")).unwrap_err();
    assert!(matches!(err, PermonError::Configuration(_)));
    assert!(registry.register(constant("core.cpu_usage")).is_err());
    assert_eq!(registry.len(), 5);
}

#[test]
fn test_unknown_tags() {
    let registry = StatRegistry::with_defaults(context());
    registry
        .verify_tags(&["core.cpu_usage", "core.write_speed"])
        .unwrap();
    assert_eq!(
        registry.verify_tags(&["core.cpu_usage", "gpu.vram"]),
        Err(PermonError::UnknownStat("gpu.vram".to_string()))
    );
    assert!(matches!(
        registry.create("gpu.vram", &Settings::new()),
        Err(PermonError::UnknownStat(_))
    ));
}

#[test]
fn test_unavailable_stat_is_never_constructed() {
    let built = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&built);
    let factory = CustomStatFactory::new("user.sensor", "Sensor", Bounds::adaptive(), move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(|| MetricSample::Scalar(0.0)))
    })
    .with_availability(|_| {
        Err(PermonError::SourceUnavailable {
            tag: "user.sensor".to_string(),
            reason: "no sensor".to_string(),
        })
    });

    let mut registry = StatRegistry::new(context());
    registry.register(factory).unwrap();
    registry.register(constant("user.constant")).unwrap();

    assert!(matches!(
        registry.create("user.sensor", &Settings::new()),
        Err(PermonError::SourceUnavailable { .. })
    ));
    assert_eq!(built.load(Ordering::SeqCst), 0);
    assert_eq!(registry.available(), vec!["user.constant"]);
}

#[test]
fn test_settings_are_merged_and_cast() {
    let mut registry = StatRegistry::new(context());
    registry.register(constant("user.constant")).unwrap();

    let mut stat = registry
        .create("user.constant", &settings(json!({"value": "2.5"})))
        .unwrap();
    assert_eq!(stat.sample().value(), 2.5);
    assert_eq!(stat.tag(), "user.constant");

    let err = registry
        .create("user.constant", &settings(json!({"colour": "red"})))
        .err()
        .unwrap();
    assert!(matches!(err, PermonError::InvalidSettings { .. }));
}

#[test]
fn test_disk_stats_use_injected_counters() {
    let registry = StatRegistry::with_defaults(context());
    let mut read = registry.create("core.read_speed", &Settings::new()).unwrap();
    assert_eq!(read.sample(), MetricSample::Scalar(0.0));
    assert_eq!(read.bounds(), Bounds::from_minimum(0.0));
}

#[test]
fn test_missing_iostat_is_an_external_tool_error() {
    let registry = StatRegistry::with_defaults(context());
    let err = registry
        .create("core.write_speed", &settings(json!({"backend": "iostat"})))
        .err()
        .unwrap();
    assert!(matches!(err, PermonError::ExternalTool { .. }));
}

#[test]
fn test_breakdown_stats_attach_to_shared_sampler() {
    let ctx = context();
    let sampler = ctx.sampler.clone();
    let registry = StatRegistry::with_defaults(ctx);

    let mut cpu = registry.create("core.cpu_usage", &Settings::new()).unwrap();
    let ram = registry
        .create("core.ram_usage", &settings(json!({"contributors": 3})))
        .unwrap();
    assert_eq!(sampler.consumers(), 2);
    assert!(sampler.is_running());

    assert!(cpu.sample().has_breakdown());
    let bounds = cpu.bounds();
    assert_eq!(bounds.minimum, Some(0.0));
    assert!(bounds.maximum.unwrap() >= 100.0);

    drop(cpu);
    assert!(sampler.is_running());
    drop(ram);
    assert!(!sampler.is_running());
}
