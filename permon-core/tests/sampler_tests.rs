//! Lifecycle tests for the shared process sampler

use crossbeam_channel::{unbounded, Receiver, Sender};
use permon_core::process::{MemoryKind, ProcessEnumerator, ProcessUsage};
use permon_core::sampler::SamplerConfig;
use permon_core::{PermonError, ProcessSampler, UsageKind};
use std::time::{Duration, Instant};

struct FakeEnumerator {
    calls: Sender<()>,
    deny: bool,
}

impl ProcessEnumerator for FakeEnumerator {
    fn enumerate(&mut self) -> Result<Vec<ProcessUsage>, PermonError> {
        let _ = self.calls.send(());
        if self.deny {
            return Err(PermonError::AccessDenied("test".to_string()));
        }
        Ok(vec![
            usage(1, "a", 80.0),
            usage(2, "b worker", 10.0),
            usage(3, "b", 5.0),
            usage(4, "c", 5.0),
        ])
    }
}

fn usage(pid: u32, name: &str, cpu: f32) -> ProcessUsage {
    ProcessUsage {
        pid,
        name: name.to_string(),
        cpu_percent: cpu,
        resident_bytes: 1024 * 1024,
        virtual_bytes: 2 * 1024 * 1024,
    }
}

fn fake_sampler(deny: bool) -> (ProcessSampler, Receiver<()>) {
    let (tx, rx) = unbounded();
    let config = SamplerConfig {
        interval: Duration::from_millis(10),
        memory_kind: MemoryKind::Resident,
    };
    let sampler = ProcessSampler::with_enumerator(config, move || {
        Box::new(FakeEnumerator {
            calls: tx.clone(),
            deny,
        })
    });
    (sampler, rx)
}

fn wait_for_cycle(sampler: &ProcessSampler) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while sampler.cycles_completed() == 0 {
        assert!(Instant::now() < deadline, "sampler never completed a cycle");
        std::thread::sleep(Duration::from_millis(5));
    }
}

#[test]
fn test_loop_stops_only_after_last_detach() {
    let (sampler, calls) = fake_sampler(false);
    assert!(!sampler.is_running());

    let first = sampler.attach();
    let second = sampler.attach();
    let third = sampler.attach();
    assert_eq!(sampler.consumers(), 3);
    assert!(sampler.is_running());
    calls.recv_timeout(Duration::from_secs(5)).unwrap();

    first.detach();
    assert!(sampler.is_running());
    second.detach();
    assert!(sampler.is_running());
    calls.recv_timeout(Duration::from_secs(5)).unwrap();

    third.detach();
    assert!(!sampler.is_running());
    assert_eq!(sampler.consumers(), 0);

    // Joined: no cycle can run after detach returned.
    while calls.try_recv().is_ok() {}
    std::thread::sleep(Duration::from_millis(50));
    assert!(calls.try_recv().is_err());
}

#[test]
fn test_dropping_handles_detaches() {
    let (sampler, _calls) = fake_sampler(false);
    {
        let _a = sampler.attach();
        let _b = sampler.attach();
        assert_eq!(sampler.consumers(), 2);
    }
    assert_eq!(sampler.consumers(), 0);
    assert!(!sampler.is_running());
}

#[test]
fn test_contributors_from_latest_table() {
    let (sampler, _calls) = fake_sampler(false);
    let handle = sampler.attach();
    wait_for_cycle(&sampler);

    let top = handle.contributors(UsageKind::Cpu, 2, Some(100.0));
    assert_eq!(top.len(), 2);
    assert_eq!(top[0].name, "other");
    assert!((top[0].value - 20.0).abs() < 1e-6);
    assert_eq!(top[1].name, "a");
    assert!((top[1].value - 80.0).abs() < 1e-6);

    // "b worker" and "b" are merged under one name.
    let raw = handle.contributors(UsageKind::Cpu, 5, None);
    let b = raw.iter().find(|c| c.name == "b").unwrap();
    assert!((b.value - 15.0).abs() < 1e-6);

    let ram = handle.contributors(UsageKind::Ram, 5, None);
    assert!((ram.iter().find(|c| c.name == "b").unwrap().value - 2.0).abs() < 1e-9);
}

#[test]
fn test_denied_cycles_are_absorbed() {
    let (sampler, calls) = fake_sampler(true);
    let handle = sampler.attach();

    for _ in 0..3 {
        calls.recv_timeout(Duration::from_secs(5)).unwrap();
    }
    assert!(sampler.is_running());
    assert_eq!(sampler.cycles_completed(), 0);
    assert!(handle.contributors(UsageKind::Cpu, 5, Some(50.0)).is_empty());
}

#[test]
fn test_restart_does_not_serve_stale_table() {
    let (sampler, _calls) = fake_sampler(false);
    let handle = sampler.attach();
    wait_for_cycle(&sampler);
    assert!(sampler.snapshot().is_some());
    handle.detach();

    assert!(sampler.snapshot().is_none());
    let again = sampler.attach();
    assert!(sampler.is_running());
    again.detach();
}
