//! Host-wide disk I/O counters

mod iostat;

pub use iostat::{parse_iostat_line, IostatHandle, IostatService, IOSTAT};

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::PermonError;

const DISKSTATS_PATH: &str = "/proc/diskstats";
const SECTOR_SIZE: u64 = 512;

/// Cumulative bytes transferred since boot
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IoCounters {
    pub read_bytes: u64,
    pub write_bytes: u64,
}

/// Direction of a disk transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IoDirection {
    Read,
    Write,
}

impl IoCounters {
    pub fn get(&self, direction: IoDirection) -> u64 {
        match direction {
            IoDirection::Read => self.read_bytes,
            IoDirection::Write => self.write_bytes,
        }
    }
}

/// Where the disk stats take their numbers from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiskBackend {
    /// Cumulative kernel counters fed through a rate tracker
    #[default]
    Counters,
    /// Rates parsed from a shared `iostat` subprocess
    Iostat,
}

impl std::str::FromStr for DiskBackend {
    type Err = PermonError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "counters" => Ok(DiskBackend::Counters),
            "iostat" => Ok(DiskBackend::Iostat),
            other => Err(PermonError::Configuration(format!(
                "unknown disk backend \"{other}\" (expected counters or iostat)"
            ))),
        }
    }
}

/// A readable source of cumulative disk counters
pub trait DiskCounters: Send {
    fn read(&mut self) -> Result<IoCounters, PermonError>;
}

/// Reads `/proc/diskstats`, summing whole-disk devices only.
#[derive(Debug, Clone)]
pub struct ProcDiskStats {
    path: PathBuf,
}

impl ProcDiskStats {
    pub fn new() -> Self {
        Self::with_path(DISKSTATS_PATH)
    }

    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Check that the counters can be read on this host.
    pub fn check(&self) -> Result<(), PermonError> {
        let mut probe = self.clone();
        probe.read().map(|_| ())
    }
}

impl Default for ProcDiskStats {
    fn default() -> Self {
        Self::new()
    }
}

impl DiskCounters for ProcDiskStats {
    fn read(&mut self) -> Result<IoCounters, PermonError> {
        let text = std::fs::read_to_string(&self.path).map_err(|e| {
            PermonError::SourceUnavailable {
                tag: "disk".to_string(),
                reason: format!("cannot read {}: {e}", self.path.display()),
            }
        })?;
        Ok(parse_diskstats(&text))
    }
}

/// Sum read/write bytes over the whole-disk rows of `/proc/diskstats`.
///
/// Field layout per row: major, minor, name, reads completed, reads merged,
/// sectors read, ms reading, writes completed, writes merged, sectors
/// written, ... Malformed rows are skipped.
pub fn parse_diskstats(text: &str) -> IoCounters {
    let mut counters = IoCounters::default();

    for line in text.lines() {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < 10 || !is_whole_disk(fields[2]) {
            continue;
        }
        let (Ok(sectors_read), Ok(sectors_written)) =
            (fields[5].parse::<u64>(), fields[9].parse::<u64>())
        else {
            log::trace!("skipping malformed diskstats row: {line}");
            continue;
        };
        counters.read_bytes = counters
            .read_bytes
            .saturating_add(sectors_read.saturating_mul(SECTOR_SIZE));
        counters.write_bytes = counters
            .write_bytes
            .saturating_add(sectors_written.saturating_mul(SECTOR_SIZE));
    }

    counters
}

/// Whether a block device name is a physical disk rather than a partition
/// or a virtual device stacked on other disks.
pub fn is_whole_disk(name: &str) -> bool {
    const VIRTUAL: [&str; 5] = ["loop", "ram", "zram", "dm-", "md"];
    if VIRTUAL.iter().any(|prefix| name.starts_with(prefix)) {
        return false;
    }

    // nvme0n1p2, mmcblk0p1: partitions carry a `p<N>` suffix.
    if name.starts_with("nvme") || name.starts_with("mmcblk") {
        return match name.rsplit_once('p') {
            Some((head, tail)) => {
                !(head.ends_with(|c: char| c.is_ascii_digit())
                    && !tail.is_empty()
                    && tail.chars().all(|c| c.is_ascii_digit()))
            }
            None => true,
        };
    }

    // sda1, vdb2, xvda1: partitions end in a digit.
    !name.ends_with(|c: char| c.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
   7       0 loop0 56 0 2142 13 0 0 0 0 0 24 13 0 0 0 0 0 0
   8       0 sda 1000 10 2000 300 500 20 4000 200 0 400 500 0 0 0 0 0 0
   8       1 sda1 900 10 1800 250 450 20 3600 180 0 350 430 0 0 0 0 0 0
 259       0 nvme0n1 10 0 100 1 20 0 200 2 0 3 3 0 0 0 0 0 0
 259       1 nvme0n1p1 5 0 50 1 10 0 100 1 0 2 2 0 0 0 0 0 0
 253       0 dm-0 40 0 400 1 20 0 200 2 0 3 3 0 0 0 0 0 0
garbage line
";

    #[test]
    fn parse_sums_whole_disks_only() {
        let counters = parse_diskstats(SAMPLE);
        assert_eq!(counters.read_bytes, (2000 + 100) * 512);
        assert_eq!(counters.write_bytes, (4000 + 200) * 512);
    }

    #[test]
    fn whole_disk_detection() {
        assert!(is_whole_disk("sda"));
        assert!(!is_whole_disk("sda1"));
        assert!(is_whole_disk("nvme0n1"));
        assert!(!is_whole_disk("nvme0n1p3"));
        assert!(is_whole_disk("mmcblk0"));
        assert!(!is_whole_disk("mmcblk0p1"));
        assert!(!is_whole_disk("loop3"));
        assert!(!is_whole_disk("dm-1"));
        assert!(!is_whole_disk("zram0"));
    }

    #[test]
    fn missing_file_is_unavailable() {
        let stats = ProcDiskStats::with_path("/nonexistent/diskstats");
        assert!(matches!(
            stats.check(),
            Err(PermonError::SourceUnavailable { .. })
        ));
    }

    #[test]
    fn backend_parses_from_setting() {
        assert_eq!("iostat".parse::<DiskBackend>().unwrap(), DiskBackend::Iostat);
        assert_eq!(
            "counters".parse::<DiskBackend>().unwrap(),
            DiskBackend::Counters
        );
        assert!("smart".parse::<DiskBackend>().is_err());
    }

    #[test]
    fn counters_by_direction() {
        let c = IoCounters {
            read_bytes: 3,
            write_bytes: 7,
        };
        assert_eq!(c.get(IoDirection::Read), 3);
        assert_eq!(c.get(IoDirection::Write), 7);
    }
}
