use std::io::{BufRead, BufReader};
use std::process::{Child, Command, Stdio};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::JoinHandle;

use super::IoDirection;
use crate::PermonError;

/// Name of the sysstat binary
pub const IOSTAT: &str = "iostat";

const IOSTAT_ARGS: [&str; 7] = ["-d", "-m", "-g", "ALL", "-H", "1", "-y"];

/// Parse the `ALL` group row of `iostat -m -g ALL -H` into
/// `(read MiB/s, write MiB/s)`. Locales printing decimal commas are accepted.
pub fn parse_iostat_line(line: &str) -> Option<(f64, f64)> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.first() != Some(&"ALL") || fields.len() < 4 {
        return None;
    }
    let parse = |s: &str| s.replace(',', ".").parse::<f64>().ok();
    Some((parse(fields[2])?, parse(fields[3])?))
}

struct IostatProcess {
    child: Child,
    reader: Option<JoinHandle<()>>,
    stopping: Arc<AtomicBool>,
}

impl IostatProcess {
    fn stop(&mut self) {
        self.stopping.store(true, Ordering::SeqCst);
        // Killing the child closes its stdout, which ends the reader loop.
        if let Err(e) = self.child.kill() {
            log::debug!("iostat already exited: {e}");
        }
        let _ = self.child.wait();
        if let Some(reader) = self.reader.take() {
            if reader.join().is_err() {
                log::error!("iostat reader thread panicked");
            }
        }
    }
}

struct Shared {
    program: String,
    latest: Arc<Mutex<(f64, f64)>>,
    consumers: AtomicUsize,
    running: Mutex<Option<IostatProcess>>,
}

/// Shared `iostat` subprocess publishing host-wide disk rates.
///
/// The subprocess and its reader thread start with the first attach and are
/// killed and joined by the last detach. If `iostat` dies on its own it is
/// not restarted; the last published rates stay in place.
#[derive(Clone)]
pub struct IostatService {
    shared: Arc<Shared>,
}

impl IostatService {
    pub fn new() -> Self {
        Self::with_program(IOSTAT)
    }

    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            shared: Arc::new(Shared {
                program: program.into(),
                latest: Arc::new(Mutex::new((0.0, 0.0))),
                consumers: AtomicUsize::new(0),
                running: Mutex::new(None),
            }),
        }
    }

    /// Check that the binary can be executed at all.
    pub fn check_availability(&self) -> Result<(), PermonError> {
        Command::new(&self.shared.program)
            .arg("-V")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|_| ())
            .map_err(|e| PermonError::ExternalTool {
                tool: self.shared.program.clone(),
                reason: e.to_string(),
            })
    }

    /// Register a consumer, spawning the subprocess on first use.
    pub fn attach(&self) -> Result<IostatHandle, PermonError> {
        let mut running = self.lock_running();
        if running.is_none() {
            *running = Some(self.spawn()?);
        }
        self.shared.consumers.fetch_add(1, Ordering::SeqCst);

        Ok(IostatHandle {
            service: self.clone(),
            attached: true,
        })
    }

    fn detach_one(&self) {
        let mut running = self.lock_running();
        if self.shared.consumers.fetch_sub(1, Ordering::SeqCst) > 1 {
            return;
        }
        if let Some(mut process) = running.take() {
            log::debug!("last consumer detached, stopping {}", self.shared.program);
            process.stop();
        }
        *lock(&self.shared.latest) = (0.0, 0.0);
    }

    fn spawn(&self) -> Result<IostatProcess, PermonError> {
        let program = self.shared.program.clone();
        let tool_error = |reason: String| PermonError::ExternalTool {
            tool: program.clone(),
            reason,
        };

        let mut child = Command::new(&program)
            .args(IOSTAT_ARGS)
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| tool_error(e.to_string()))?;

        let Some(stdout) = child.stdout.take() else {
            let _ = child.kill();
            let _ = child.wait();
            return Err(tool_error("stdout not captured".to_string()));
        };

        let latest = Arc::clone(&self.shared.latest);
        let stopping = Arc::new(AtomicBool::new(false));
        let stop_flag = Arc::clone(&stopping);
        let name = program.clone();

        let reader = std::thread::Builder::new()
            .name("permon-iostat".to_string())
            .spawn(move || {
                for line in BufReader::new(stdout).lines() {
                    let Ok(line) = line else { break };
                    if let Some(rates) = parse_iostat_line(&line) {
                        *lock(&latest) = rates;
                    }
                }
                if !stop_flag.load(Ordering::SeqCst) {
                    log::warn!("{name} exited unexpectedly; disk rates are frozen");
                }
            });

        match reader {
            Ok(handle) => {
                log::debug!("started {} (pid {})", program, child.id());
                Ok(IostatProcess {
                    child,
                    reader: Some(handle),
                    stopping,
                })
            }
            Err(e) => {
                let _ = child.kill();
                let _ = child.wait();
                Err(tool_error(format!("reader thread: {e}")))
            }
        }
    }

    fn lock_running(&self) -> MutexGuard<'_, Option<IostatProcess>> {
        lock(&self.shared.running)
    }

    /// Latest rate in MiB/s for `direction`
    pub fn rate(&self, direction: IoDirection) -> f64 {
        let (read, write) = *lock(&self.shared.latest);
        match direction {
            IoDirection::Read => read,
            IoDirection::Write => write,
        }
    }

    pub fn is_running(&self) -> bool {
        self.lock_running().is_some()
    }

    /// Process id of the running subprocess
    pub fn pid(&self) -> Option<u32> {
        self.lock_running().as_ref().map(|process| process.child.id())
    }

    pub fn consumers(&self) -> usize {
        self.shared.consumers.load(Ordering::SeqCst)
    }
}

impl Default for IostatService {
    fn default() -> Self {
        Self::new()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// One attachment to an [`IostatService`]. Dropping it detaches.
pub struct IostatHandle {
    service: IostatService,
    attached: bool,
}

impl IostatHandle {
    pub fn rate(&self, direction: IoDirection) -> f64 {
        self.service.rate(direction)
    }

    pub fn detach(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if std::mem::take(&mut self.attached) {
            self.service.detach_one();
        }
    }
}

impl Drop for IostatHandle {
    fn drop(&mut self) {
        self.release();
    }
}
