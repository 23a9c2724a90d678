//! Process collector for gathering per-process identity from `/proc/[pid]/`.

use std::path::Path;

use crate::collector::FactCollector;
use crate::collector::procfs::parser::{
    UserResolver, parse_cmdline, parse_global_stat, parse_proc_stat, parse_proc_status,
};
use crate::collector::traits::FileSystem;
use crate::config::ProbeConfig;
use crate::error::ProbeError;
use crate::storage::model::{CollectorKind, FactValue, Facts, Outcome};
use crate::util::epoch_to_iso;

/// Clock ticks per second (USER_HZ). Standard value for Linux.
const CLK_TCK: u64 = 100;

/// Collects the processes visible to the invoking user.
pub struct ProcessCollector<F: FileSystem> {
    fs: F,
}

/// Identity of one process.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessEntry {
    pub pid: u32,
    pub ppid: u32,
    pub state: char,
    pub command: String,
    pub uid: Option<u32>,
    pub threads: i32,
    /// Start time in seconds since epoch; `None` without boot time.
    pub start_time: Option<i64>,
}

impl<F: FileSystem> ProcessCollector<F> {
    pub fn new(fs: F) -> Self {
        Self { fs }
    }

    /// Reads one process. `None` when it vanished mid-scan.
    fn collect_process(&self, proc_dir: &Path, pid: u32, boot_time: u64) -> Option<ProcessEntry> {
        let stat = self
            .fs
            .read_to_string(&proc_dir.join("stat"))
            .ok()
            .and_then(|c| parse_proc_stat(&c).ok())?;

        let status = self
            .fs
            .read_to_string(&proc_dir.join("status"))
            .map(|c| parse_proc_status(&c))
            .unwrap_or_default();

        let command = self
            .fs
            .read_to_string(&proc_dir.join("cmdline"))
            .ok()
            .and_then(|c| parse_cmdline(&c))
            .unwrap_or_else(|| format!("[{}]", stat.comm));

        let start_time =
            (boot_time > 0).then(|| (boot_time + stat.starttime / CLK_TCK) as i64);

        Some(ProcessEntry {
            pid,
            ppid: stat.ppid,
            state: stat.state,
            command,
            uid: status.uid,
            threads: stat.num_threads,
            start_time,
        })
    }

    /// Lists all numeric `/proc` entries, sorted by pid.
    pub fn collect_all_processes(
        &self,
        proc_path: &Path,
        boot_time: u64,
    ) -> Result<Vec<ProcessEntry>, ProbeError> {
        let entries = self
            .fs
            .read_dir(proc_path)
            .map_err(|e| ProbeError::from_io(proc_path.display(), e))?;

        let mut processes: Vec<ProcessEntry> = entries
            .iter()
            .filter_map(|path| {
                let pid = path.file_name()?.to_str()?.parse::<u32>().ok()?;
                self.collect_process(path, pid, boot_time)
            })
            .collect();

        processes.sort_by_key(|p| p.pid);
        Ok(processes)
    }

    fn boot_time(&self, proc_path: &Path) -> Result<u64, ProbeError> {
        let path = proc_path.join("stat");
        let content = self
            .fs
            .read_to_string(&path)
            .map_err(|e| ProbeError::from_io(path.display(), e))?;
        let stat = parse_global_stat(&content).map_err(|e| ProbeError::Parse(e.message))?;
        if stat.btime == 0 {
            return Err(ProbeError::Parse("btime missing from stat".to_string()));
        }
        Ok(stat.btime)
    }
}

impl<F: FileSystem> FactCollector for ProcessCollector<F> {
    fn kind(&self) -> CollectorKind {
        CollectorKind::Process
    }

    fn collect(&self, config: &ProbeConfig) -> Outcome {
        let mut errors = Vec::new();

        let boot_time = match self.boot_time(&config.proc_path) {
            Ok(btime) => btime,
            Err(e) => {
                errors.push(ProbeError::Parse(format!(
                    "boot time unavailable, start times omitted ({})",
                    e
                )));
                0
            }
        };

        let processes = match self.collect_all_processes(&config.proc_path, boot_time) {
            Ok(processes) => processes,
            Err(e) => return Outcome::from_parts(CollectorKind::Process, Facts::new(), vec![e]),
        };

        let mut users = UserResolver::new();
        if let Ok(passwd) = self.fs.read_to_string(&config.etc_path.join("passwd")) {
            users.load_from_content(&passwd);
        }

        let list: Vec<FactValue> = processes
            .iter()
            .map(|p| {
                FactValue::map([
                    ("pid", FactValue::from(p.pid)),
                    ("ppid", FactValue::from(p.ppid)),
                    ("state", FactValue::from(p.state.to_string())),
                    ("command", FactValue::from(p.command.as_str())),
                    ("uid", FactValue::from(p.uid)),
                    ("owner", FactValue::from(p.uid.map(|uid| users.resolve(uid)))),
                    ("threads", FactValue::from(p.threads)),
                    (
                        "start_time",
                        FactValue::from(p.start_time.and_then(epoch_to_iso)),
                    ),
                ])
            })
            .collect();

        let mut facts = Facts::new();
        facts.insert("count".to_string(), list.len().into());
        facts.insert("processes".to_string(), FactValue::List(list));

        Outcome::from_parts(CollectorKind::Process, facts, errors)
    }
}
