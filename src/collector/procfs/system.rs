//! System collector: OS identity, kernel, boot time, CPU and memory totals.

use std::path::Path;

use crate::collector::FactCollector;
use crate::collector::procfs::parser::{
    parse_global_stat, parse_loadavg, parse_meminfo, parse_os_release, parse_uptime,
};
use crate::collector::traits::FileSystem;
use crate::config::ProbeConfig;
use crate::error::ProbeError;
use crate::storage::model::{CollectorKind, FactValue, Facts, Outcome};
use crate::util::command::capture_all;
use crate::util::{epoch_to_iso, is_container};

/// Raw, read-only surfaces captured when commands are enabled.
const SYSTEM_COMMANDS: &[&[&str]] = &[
    &["uname", "-a"],
    &["uptime"],
    &["free", "-h"],
    &["lsmod"],
    &["lspci", "-nn"],
    &["lsusb"],
    &["systemctl", "--no-pager", "--plain", "--failed"],
    &["systemctl", "--no-pager", "--plain", "list-units", "--all"],
    &["systemctl", "--no-pager", "--plain", "list-timers", "--all"],
    &["journalctl", "-k", "-b", "--no-pager", "-n", "200"],
];

/// Collects host-wide identity and capacity facts.
pub struct SystemCollector<F: FileSystem> {
    fs: F,
}

impl<F: FileSystem> SystemCollector<F> {
    pub fn new(fs: F) -> Self {
        Self { fs }
    }

    fn read(&self, path: &Path) -> Result<String, ProbeError> {
        self.fs
            .read_to_string(path)
            .map_err(|e| ProbeError::from_io(path.display(), e))
    }

    fn read_trimmed(&self, path: &Path) -> Result<String, ProbeError> {
        self.read(path).map(|s| s.trim().to_string())
    }
}

impl<F: FileSystem> FactCollector for SystemCollector<F> {
    fn kind(&self) -> CollectorKind {
        CollectorKind::System
    }

    fn collect(&self, config: &ProbeConfig) -> Outcome {
        let proc = &config.proc_path;
        let mut facts = Facts::new();
        let mut errors = Vec::new();

        let kernel = proc.join("sys/kernel");
        for (name, file) in [
            ("os_type", "ostype"),
            ("kernel_release", "osrelease"),
            ("kernel_version", "version"),
            ("hostname", "hostname"),
        ] {
            match self.read_trimmed(&kernel.join(file)) {
                Ok(value) => {
                    facts.insert(name.to_string(), value.into());
                }
                Err(e) => errors.push(e),
            }
        }

        match self.read(&config.etc_path.join("os-release")) {
            Ok(content) => {
                facts.insert("os_release".to_string(), parse_os_release(&content).into());
            }
            Err(e) => errors.push(e),
        }

        match self.read(&proc.join("stat")).and_then(|c| {
            parse_global_stat(&c).map_err(|e| ProbeError::Parse(e.message))
        }) {
            Ok(stat) => {
                facts.insert("cpu_count".to_string(), stat.cpu_count.into());
                if stat.btime > 0 {
                    facts.insert(
                        "boot_time".to_string(),
                        epoch_to_iso(stat.btime as i64).into(),
                    );
                }
            }
            Err(e) => errors.push(e),
        }

        match self
            .read(&proc.join("uptime"))
            .and_then(|c| parse_uptime(&c).map_err(|e| ProbeError::Parse(e.message)))
        {
            Ok(uptime) => {
                facts.insert("uptime_seconds".to_string(), uptime.into());
            }
            Err(e) => errors.push(e),
        }

        match self
            .read(&proc.join("meminfo"))
            .and_then(|c| parse_meminfo(&c).map_err(|e| ProbeError::Parse(e.message)))
        {
            Ok(mem) => {
                facts.insert("mem_total_kb".to_string(), mem.mem_total.into());
                facts.insert("mem_available_kb".to_string(), mem.mem_available.into());
                facts.insert("swap_total_kb".to_string(), mem.swap_total.into());
            }
            Err(e) => errors.push(e),
        }

        match self
            .read(&proc.join("loadavg"))
            .and_then(|c| parse_loadavg(&c).map_err(|e| ProbeError::Parse(e.message)))
        {
            Ok(avg) => {
                facts.insert(
                    "load_average".to_string(),
                    vec![avg.load1, avg.load5, avg.load15].into(),
                );
            }
            Err(e) => errors.push(e),
        }

        if !facts.is_empty() {
            facts.insert(
                "in_container".to_string(),
                is_container(&self.fs, config).into(),
            );
        }

        if config.run_commands {
            facts.insert(
                "commands".to_string(),
                capture_all(SYSTEM_COMMANDS, &config.command_limits),
            );
        }

        Outcome::from_parts(CollectorKind::System, facts, errors)
    }
}

/// Stable identity of the probed host.
///
/// `machine-id` when present, else the kernel hostname, else `"unknown"`.
pub fn host_identity<F: FileSystem>(fs: &F, config: &ProbeConfig) -> String {
    let candidates = [
        config.etc_path.join("machine-id"),
        config.proc_path.join("sys/kernel/hostname"),
    ];
    candidates
        .iter()
        .filter_map(|path| fs.read_to_string(path).ok())
        .map(|s| s.trim().to_string())
        .find(|s| !s.is_empty())
        .unwrap_or_else(|| "unknown".to_string())
}
