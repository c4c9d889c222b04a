//! Shared per-host process sampler
//!
//! One background thread enumerates all processes on a fixed cadence and
//! publishes a per-name usage table. Any number of stats attach to the same
//! sampler; the thread starts with the first attach and is stopped (and
//! joined) by the last detach.

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, RwLock};
use std::time::{Duration, Instant};

use crate::apportion::top_contributors;
use crate::process::{
    normalize_name, MemoryKind, ProcessEnumerator, ProcessUsage, SysinfoEnumerator,
};
use crate::sample::Contributor;
use crate::worker::PeriodicWorker;
use crate::{PermonError, MIB};

/// Which usage table to read contributors from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UsageKind {
    Cpu,
    Ram,
}

impl FromStr for UsageKind {
    type Err = PermonError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cpu" => Ok(UsageKind::Cpu),
            "ram" => Ok(UsageKind::Ram),
            other => Err(PermonError::Configuration(format!(
                "unknown usage table \"{other}\""
            ))),
        }
    }
}

/// Per-name usage aggregated over one complete enumeration
#[derive(Debug, Clone)]
pub struct ProcessTable {
    pub taken_at: Instant,
    pub process_count: usize,
    /// CPU percent per normalized name
    pub cpu: HashMap<String, f64>,
    /// Memory in MiB per normalized name
    pub ram: HashMap<String, f64>,
}

impl ProcessTable {
    /// Aggregate raw process usage by normalized name.
    pub fn build(processes: &[ProcessUsage], memory_kind: MemoryKind) -> Self {
        let mut cpu: HashMap<String, f64> = HashMap::new();
        let mut ram: HashMap<String, f64> = HashMap::new();

        for process in processes {
            let Some(name) = normalize_name(&process.name) else {
                log::trace!("skipping pid {} with unnamed image", process.pid);
                continue;
            };
            *cpu.entry(name.to_string()).or_insert(0.0) += f64::from(process.cpu_percent);
            *ram.entry(name.to_string()).or_insert(0.0) +=
                process.memory_bytes(memory_kind) as f64 / MIB;
        }

        Self {
            taken_at: Instant::now(),
            process_count: processes.len(),
            cpu,
            ram,
        }
    }

    pub fn values(&self, kind: UsageKind) -> &HashMap<String, f64> {
        match kind {
            UsageKind::Cpu => &self.cpu,
            UsageKind::Ram => &self.ram,
        }
    }
}

/// Sampler tuning
#[derive(Debug, Clone, Copy)]
pub struct SamplerConfig {
    pub interval: Duration,
    pub memory_kind: MemoryKind,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            memory_kind: MemoryKind::Resident,
        }
    }
}

type EnumeratorFactory = dyn Fn() -> Box<dyn ProcessEnumerator> + Send + Sync;
type Published = Arc<RwLock<Option<Arc<ProcessTable>>>>;

struct Shared {
    config: SamplerConfig,
    factory: Box<EnumeratorFactory>,
    latest: Published,
    consumers: AtomicUsize,
    cycles: Arc<AtomicU64>,
    worker: Mutex<Option<PeriodicWorker>>,
}

/// Handle to the shared process sampler. Cloning is cheap and every clone
/// refers to the same background loop.
#[derive(Clone)]
pub struct ProcessSampler {
    shared: Arc<Shared>,
}

impl ProcessSampler {
    /// Sampler backed by the live OS process list
    pub fn new(config: SamplerConfig) -> Self {
        Self::with_enumerator(config, || Box::new(SysinfoEnumerator::new()))
    }

    /// Sampler with a custom enumerator; `factory` runs every time the
    /// background loop is started.
    pub fn with_enumerator<F>(config: SamplerConfig, factory: F) -> Self
    where
        F: Fn() -> Box<dyn ProcessEnumerator> + Send + Sync + 'static,
    {
        Self {
            shared: Arc::new(Shared {
                config,
                factory: Box::new(factory),
                latest: Arc::new(RwLock::new(None)),
                consumers: AtomicUsize::new(0),
                cycles: Arc::new(AtomicU64::new(0)),
                worker: Mutex::new(None),
            }),
        }
    }

    /// Register a consumer, starting the background loop if needed.
    pub fn attach(&self) -> SamplerHandle {
        let mut worker = self.lock_worker();
        let previous = self.shared.consumers.fetch_add(1, Ordering::SeqCst);

        if worker.is_none() {
            log::debug!("starting process sampler (consumers: {})", previous + 1);
            *worker = self.spawn_loop();
        }

        SamplerHandle {
            sampler: self.clone(),
            attached: true,
        }
    }

    fn detach_one(&self) {
        let mut worker = self.lock_worker();
        let previous = self.shared.consumers.fetch_sub(1, Ordering::SeqCst);
        if previous > 1 {
            return;
        }

        if let Some(mut running) = worker.take() {
            log::debug!("last consumer detached, stopping process sampler");
            running.stop();
        }
        // A restarted loop must not serve a table from a previous run.
        match self.shared.latest.write() {
            Ok(mut guard) => *guard = None,
            Err(poisoned) => *poisoned.into_inner() = None,
        }
    }

    fn spawn_loop(&self) -> Option<PeriodicWorker> {
        let mut enumerator = (self.shared.factory)();
        let latest = Arc::clone(&self.shared.latest);
        let cycles = Arc::clone(&self.shared.cycles);
        let memory_kind = self.shared.config.memory_kind;

        let spawned = PeriodicWorker::spawn("permon-sampler", self.shared.config.interval, move || {
            match enumerator.enumerate() {
                Ok(processes) => {
                    let table = Arc::new(ProcessTable::build(&processes, memory_kind));
                    match latest.write() {
                        Ok(mut guard) => *guard = Some(table),
                        Err(poisoned) => *poisoned.into_inner() = Some(table),
                    }
                    cycles.fetch_add(1, Ordering::SeqCst);
                }
                Err(e) => {
                    // Keep the previous table; the next cycle retries.
                    log::warn!("process sampling cycle abandoned: {e}");
                }
            }
        });

        match spawned {
            Ok(worker) => Some(worker),
            Err(e) => {
                log::error!("failed to spawn process sampler thread: {e}");
                None
            }
        }
    }

    fn lock_worker(&self) -> MutexGuard<'_, Option<PeriodicWorker>> {
        match self.shared.worker.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Latest complete table, if a cycle has finished since the loop started.
    pub fn snapshot(&self) -> Option<Arc<ProcessTable>> {
        match self.shared.latest.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Top `n` contributors for `kind` from the latest table, optionally
    /// rescaled to sum to `adapt_to`. Empty until the first cycle completes.
    pub fn contributors(&self, kind: UsageKind, n: usize, adapt_to: Option<f64>) -> Vec<Contributor> {
        let Some(table) = self.snapshot() else {
            return Vec::new();
        };
        top_contributors(
            table.values(kind).iter().map(|(name, value)| (name.as_str(), *value)),
            n,
            adapt_to,
        )
    }

    pub fn is_running(&self) -> bool {
        self.lock_worker().is_some()
    }

    pub fn consumers(&self) -> usize {
        self.shared.consumers.load(Ordering::SeqCst)
    }

    /// Number of cycles that published a table since construction
    pub fn cycles_completed(&self) -> u64 {
        self.shared.cycles.load(Ordering::SeqCst)
    }

    pub fn interval(&self) -> Duration {
        self.shared.config.interval
    }
}

impl Default for ProcessSampler {
    fn default() -> Self {
        Self::new(SamplerConfig::default())
    }
}

impl std::fmt::Debug for ProcessSampler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessSampler")
            .field("config", &self.shared.config)
            .field("consumers", &self.consumers())
            .finish()
    }
}

/// One attachment to a [`ProcessSampler`]. Dropping it detaches.
pub struct SamplerHandle {
    sampler: ProcessSampler,
    attached: bool,
}

impl SamplerHandle {
    /// Detach explicitly. Blocks until the background loop has stopped if
    /// this was the last consumer.
    pub fn detach(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if std::mem::take(&mut self.attached) {
            self.sampler.detach_one();
        }
    }

    pub fn contributors(&self, kind: UsageKind, n: usize, adapt_to: Option<f64>) -> Vec<Contributor> {
        self.sampler.contributors(kind, n, adapt_to)
    }

    pub fn sampler(&self) -> &ProcessSampler {
        &self.sampler
    }
}

impl Drop for SamplerHandle {
    fn drop(&mut self) {
        self.release();
    }
}
