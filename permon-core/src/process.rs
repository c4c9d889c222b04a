//! Process enumeration functionality

use serde::{Deserialize, Serialize};
use sysinfo::{ProcessesToUpdate, System};

use crate::PermonError;

/// Resource usage of one live process at enumeration time
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessUsage {
    pub pid: u32,
    /// Image name as reported by the OS (e.g. "chrome Helper (Renderer)")
    pub name: String,
    /// CPU percentage of one core (can exceed 100 on multi-core hosts)
    pub cpu_percent: f32,
    /// Resident set size in bytes
    pub resident_bytes: u64,
    /// Virtual memory size in bytes
    pub virtual_bytes: u64,
}

/// Which memory figure is attributed to a process
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemoryKind {
    #[default]
    Resident,
    Virtual,
}

impl ProcessUsage {
    pub fn memory_bytes(&self, kind: MemoryKind) -> u64 {
        match kind {
            MemoryKind::Resident => self.resident_bytes,
            MemoryKind::Virtual => self.virtual_bytes,
        }
    }
}

/// Source of per-process usage, refreshed once per sampling cycle.
///
/// Implementations skip individual processes they cannot read and return
/// [`PermonError::AccessDenied`] only when nothing at all could be read.
pub trait ProcessEnumerator: Send {
    fn enumerate(&mut self) -> Result<Vec<ProcessUsage>, PermonError>;
}

/// Enumerator backed by `sysinfo`.
///
/// CPU usage is computed from the delta between two refreshes, so the first
/// cycle reports 0% for every process.
pub struct SysinfoEnumerator {
    system: System,
}

impl SysinfoEnumerator {
    pub fn new() -> Self {
        Self {
            system: System::new(),
        }
    }
}

impl Default for SysinfoEnumerator {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessEnumerator for SysinfoEnumerator {
    fn enumerate(&mut self) -> Result<Vec<ProcessUsage>, PermonError> {
        self.system.refresh_processes(ProcessesToUpdate::All, true);

        let processes = self.system.processes();
        if processes.is_empty() {
            return Err(PermonError::AccessDenied(
                "no process could be enumerated".to_string(),
            ));
        }

        Ok(processes
            .iter()
            .map(|(pid, process)| ProcessUsage {
                pid: pid.as_u32(),
                name: process.name().to_string_lossy().into_owned(),
                cpu_percent: process.cpu_usage(),
                resident_bytes: process.memory(),
                virtual_bytes: process.virtual_memory(),
            })
            .collect())
    }
}

/// Collapse decorated process names onto the program they belong to.
///
/// The name is cut at the first character that is not alphanumeric or `_`,
/// so `"chrome Helper (Renderer)"` and `"chrome.exe"` both become `"chrome"`.
/// Names starting with decoration fall back to their first word. Returns
/// `None` when no word character is present.
pub fn normalize_name(name: &str) -> Option<&str> {
    name.split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .find(|part| !part.is_empty())
}
