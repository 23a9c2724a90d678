//! Parsers for `/proc` and `/etc` files.
//!
//! These are pure functions that parse the content of host files into
//! structured data. They are designed to be easily testable with string inputs.

use std::collections::{BTreeMap, HashMap};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

/// Error type for parsing failures.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    pub message: String,
}

impl ParseError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self {
            message: msg.into(),
        }
    }
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Parse error: {}", self.message)
    }
}

impl std::error::Error for ParseError {}

/// Fields of `/proc/[pid]/stat` used for process identity.
#[derive(Debug, Clone, Default)]
pub struct ProcStat {
    pub pid: u32,
    pub comm: String,
    pub state: char,
    pub ppid: u32,
    pub num_threads: i32,
    /// Start time in clock ticks after boot.
    pub starttime: u64,
}

/// Parses `/proc/[pid]/stat` content.
///
/// The comm field can contain spaces and parentheses, so it is delimited by
/// the first `(` and the last `)`.
/// Format: pid (comm) state ppid pgrp session tty_nr ...
pub fn parse_proc_stat(content: &str) -> Result<ProcStat, ParseError> {
    let content = content.trim();

    let open_paren = content
        .find('(')
        .ok_or_else(|| ParseError::new("missing '(' in stat"))?;
    let close_paren = content
        .rfind(')')
        .ok_or_else(|| ParseError::new("missing ')' in stat"))?;

    if close_paren <= open_paren {
        return Err(ParseError::new("invalid parentheses in stat"));
    }

    let pid: u32 = content[..open_paren]
        .trim()
        .parse()
        .map_err(|_| ParseError::new("invalid pid"))?;

    let comm = content[open_paren + 1..close_paren].to_string();

    let fields: Vec<&str> = content[close_paren + 1..].split_whitespace().collect();
    if fields.len() < 20 {
        return Err(ParseError::new(format!(
            "not enough fields in stat: expected 20+, got {}",
            fields.len()
        )));
    }

    let field = |idx: usize, name: &str| -> Result<i64, ParseError> {
        fields[idx]
            .parse()
            .map_err(|_| ParseError::new(format!("invalid {}", name)))
    };

    Ok(ProcStat {
        pid,
        comm,
        state: fields[0].chars().next().unwrap_or('?'),
        ppid: field(1, "ppid")? as u32,
        num_threads: field(17, "num_threads")? as i32,
        starttime: fields[19]
            .parse()
            .map_err(|_| ParseError::new("invalid starttime"))?,
    })
}

/// Fields of `/proc/[pid]/status` used for ownership.
#[derive(Debug, Clone, Default)]
pub struct ProcStatus {
    pub uid: Option<u32>,
}

/// Parses `/proc/[pid]/status` content.
///
/// Format is key:\tvalue pairs, one per line. `Uid` holds
/// `real effective saved fs`; the real uid is taken.
pub fn parse_proc_status(content: &str) -> ProcStatus {
    let mut status = ProcStatus::default();

    for line in content.lines() {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        if key.trim() == "Uid" {
            status.uid = value.split_whitespace().next().and_then(|s| s.parse().ok());
            break;
        }
    }

    status
}

/// Decodes `/proc/[pid]/cmdline` (NUL-separated argv).
///
/// Returns `None` for kernel threads, whose cmdline is empty.
pub fn parse_cmdline(content: &str) -> Option<String> {
    let args: Vec<&str> = content.split('\0').filter(|s| !s.is_empty()).collect();
    if args.is_empty() {
        None
    } else {
        Some(args.join(" "))
    }
}

/// Memory totals from `/proc/meminfo`, in kB.
#[derive(Debug, Clone, Default)]
pub struct MemInfo {
    pub mem_total: u64,
    pub mem_available: u64,
    pub swap_total: u64,
}

/// Parses `/proc/meminfo` content.
pub fn parse_meminfo(content: &str) -> Result<MemInfo, ParseError> {
    let mut info = MemInfo::default();
    let mut seen_total = false;

    for line in content.lines() {
        let mut parts = line.split_whitespace();
        let (Some(key), Some(value)) = (parts.next(), parts.next()) else {
            continue;
        };
        let value: u64 = value.parse().unwrap_or(0);
        match key {
            "MemTotal:" => {
                info.mem_total = value;
                seen_total = true;
            }
            "MemAvailable:" => info.mem_available = value,
            "SwapTotal:" => info.swap_total = value,
            _ => {}
        }
    }

    if !seen_total {
        return Err(ParseError::new("MemTotal missing from meminfo"));
    }
    Ok(info)
}

/// Global stats from `/proc/stat`.
#[derive(Debug, Clone, Default)]
pub struct GlobalStat {
    /// Number of per-CPU lines (`cpuN`).
    pub cpu_count: u32,
    /// Boot time, seconds since epoch. Zero when absent.
    pub btime: u64,
}

/// Parses `/proc/stat` content.
pub fn parse_global_stat(content: &str) -> Result<GlobalStat, ParseError> {
    let mut stat = GlobalStat::default();

    for line in content.lines() {
        let parts: Vec<&str> = line.split_whitespace().collect();
        let Some(key) = parts.first() else {
            continue;
        };

        if let Some(id) = key.strip_prefix("cpu") {
            if !id.is_empty() && id.parse::<u32>().is_ok() {
                stat.cpu_count += 1;
            }
        } else if *key == "btime" {
            stat.btime = parts.get(1).and_then(|s| s.parse().ok()).unwrap_or(0);
        }
    }

    if stat.cpu_count == 0 && stat.btime == 0 {
        return Err(ParseError::new("no cpu lines and no btime in stat"));
    }
    Ok(stat)
}

/// Parsed data from `/proc/loadavg`.
#[derive(Debug, Clone, Default)]
pub struct LoadAvg {
    pub load1: f64,
    pub load5: f64,
    pub load15: f64,
}

/// Parses `/proc/loadavg` content.
pub fn parse_loadavg(content: &str) -> Result<LoadAvg, ParseError> {
    let parts: Vec<&str> = content.split_whitespace().collect();
    if parts.len() < 3 {
        return Err(ParseError::new("invalid loadavg format"));
    }

    let load = |idx: usize, name: &str| -> Result<f64, ParseError> {
        parts[idx]
            .parse()
            .map_err(|_| ParseError::new(format!("invalid {}", name)))
    };

    Ok(LoadAvg {
        load1: load(0, "load1")?,
        load5: load(1, "load5")?,
        load15: load(2, "load15")?,
    })
}

/// Parses `/proc/uptime` and returns seconds since boot.
pub fn parse_uptime(content: &str) -> Result<f64, ParseError> {
    content
        .split_whitespace()
        .next()
        .ok_or_else(|| ParseError::new("empty uptime"))?
        .parse()
        .map_err(|_| ParseError::new("invalid uptime"))
}

/// Parses `/etc/os-release` into a key/value map with quotes stripped.
pub fn parse_os_release(content: &str) -> BTreeMap<String, String> {
    let mut map = BTreeMap::new();
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some((key, value)) = line.split_once('=') {
            let value = value.trim().trim_matches('"').trim_matches('\'');
            map.insert(key.trim().to_string(), value.to_string());
        }
    }
    map
}

/// Parses `/etc/passwd` content and returns a map of UID -> username.
///
/// Format: username:password:uid:gid:gecos:home:shell
pub fn parse_passwd(content: &str) -> HashMap<u32, String> {
    let mut map = HashMap::new();
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let parts: Vec<&str> = line.split(':').collect();
        if parts.len() >= 3
            && let Ok(uid) = parts[2].parse::<u32>()
        {
            map.insert(uid, parts[0].to_string());
        }
    }
    map
}

/// Resolver for UID -> username mapping.
#[derive(Debug, Clone, Default)]
pub struct UserResolver {
    uid_to_name: HashMap<u32, String>,
}

impl UserResolver {
    /// Creates a new empty resolver.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads user mappings from /etc/passwd content.
    pub fn load_from_content(&mut self, content: &str) {
        self.uid_to_name = parse_passwd(content);
    }

    /// Resolves UID to username, returns UID as string if not found.
    pub fn resolve(&self, uid: u32) -> String {
        self.uid_to_name
            .get(&uid)
            .cloned()
            .unwrap_or_else(|| uid.to_string())
    }
}

// ============ Mount Info Parser ============

/// One line of `/proc/self/mountinfo`.
#[derive(Debug, Clone, PartialEq)]
pub struct MountEntry {
    pub mount_point: String,
    pub fstype: String,
    pub source: String,
    pub options: String,
}

/// Parses `/proc/self/mountinfo`.
///
/// Format (man 5 proc):
/// `mount_id parent_id major:minor root mount_point options [optional...] - fstype source superoptions`
///
/// Octal escapes in the mount point (`\040` for space) are decoded.
pub fn parse_mountinfo(content: &str) -> Vec<MountEntry> {
    let mut mounts = Vec::new();

    for line in content.lines() {
        let Some((pre, post)) = line.split_once(" - ") else {
            continue;
        };
        let pre: Vec<&str> = pre.split_whitespace().collect();
        let post: Vec<&str> = post.split_whitespace().collect();
        if pre.len() < 6 || post.len() < 2 {
            continue;
        }

        mounts.push(MountEntry {
            mount_point: unescape_octal(pre[4]),
            fstype: post[0].to_string(),
            source: post[1].to_string(),
            options: pre[5].to_string(),
        });
    }

    mounts
}

fn unescape_octal(s: &str) -> String {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'\\'
            && let Some(digits) = bytes.get(i + 1..i + 4)
            && digits.iter().all(|b| (b'0'..=b'7').contains(b))
        {
            let value = digits.iter().fold(0u32, |acc, b| acc * 8 + u32::from(b - b'0'));
            out.push(value as u8);
            i += 4;
            continue;
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

// ============ Network Device Stats Parser ============

/// Parsed data from `/proc/net/dev`.
#[derive(Debug, Clone, Default)]
pub struct NetDevStats {
    /// Interface name (eth0, lo, etc.)
    pub interface: String,
    pub rx_bytes: u64,
    pub rx_packets: u64,
    pub rx_errs: u64,
    pub tx_bytes: u64,
    pub tx_packets: u64,
    pub tx_errs: u64,
}

/// Parses `/proc/net/dev` content.
///
/// Format:
/// Inter-|   Receive                                                |  Transmit
///  face |bytes    packets errs drop fifo frame compressed multicast|bytes    packets errs drop fifo colls carrier compressed
///    lo: 1234567     1234    0    0    0     0          0         0  1234567     1234    0    0    0     0       0          0
pub fn parse_net_dev(content: &str) -> Result<Vec<NetDevStats>, ParseError> {
    let mut devices = Vec::new();

    for line in content.lines() {
        if line.contains('|') || line.trim().is_empty() {
            continue;
        }

        let Some((interface, rest)) = line.split_once(':') else {
            continue;
        };
        let values: Vec<&str> = rest.split_whitespace().collect();
        if values.len() < 16 {
            continue;
        }

        let get_val =
            |idx: usize| -> u64 { values.get(idx).and_then(|s| s.parse().ok()).unwrap_or(0) };

        devices.push(NetDevStats {
            interface: interface.trim().to_string(),
            rx_bytes: get_val(0),
            rx_packets: get_val(1),
            rx_errs: get_val(2),
            tx_bytes: get_val(8),
            tx_packets: get_val(9),
            tx_errs: get_val(10),
        });
    }

    if devices.is_empty() {
        return Err(ParseError::new("no interfaces in net/dev"));
    }
    Ok(devices)
}

// ============ Socket Table Parser ============

/// TCP_LISTEN in `/proc/net/tcp*`.
const TCP_LISTEN: u8 = 0x0A;
/// TCP_CLOSE, which is how unconnected UDP sockets are reported.
const UDP_UNCONNECTED: u8 = 0x07;

/// One socket from `/proc/net/{tcp,tcp6,udp,udp6}`.
#[derive(Debug, Clone, PartialEq)]
pub struct SocketEntry {
    pub local_addr: IpAddr,
    pub local_port: u16,
    pub state: u8,
    pub uid: u32,
    pub inode: u64,
}

impl SocketEntry {
    /// True for sockets accepting traffic: listening TCP or unconnected UDP.
    pub fn is_listening(&self, udp: bool) -> bool {
        if udp {
            self.state == UDP_UNCONNECTED
        } else {
            self.state == TCP_LISTEN
        }
    }
}

/// Parses a socket table.
///
/// Addresses are hex-encoded 32-bit words in host (little-endian) order:
/// `0100007F:1F90` is `127.0.0.1:8080`.
pub fn parse_net_sockets(content: &str) -> Result<Vec<SocketEntry>, ParseError> {
    let mut sockets = Vec::new();

    for line in content.lines().skip(1) {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < 10 {
            continue;
        }

        let (addr, port) = fields[1]
            .split_once(':')
            .ok_or_else(|| ParseError::new(format!("invalid local address {}", fields[1])))?;

        sockets.push(SocketEntry {
            local_addr: parse_hex_addr(addr)?,
            local_port: u16::from_str_radix(port, 16)
                .map_err(|_| ParseError::new(format!("invalid port {}", port)))?,
            state: u8::from_str_radix(fields[3], 16)
                .map_err(|_| ParseError::new(format!("invalid state {}", fields[3])))?,
            uid: fields[7].parse().unwrap_or(0),
            inode: fields[9].parse().unwrap_or(0),
        });
    }

    Ok(sockets)
}

fn parse_hex_addr(hex: &str) -> Result<IpAddr, ParseError> {
    let word = |chunk: &str| -> Result<[u8; 4], ParseError> {
        u32::from_str_radix(chunk, 16)
            .map(u32::to_le_bytes)
            .map_err(|_| ParseError::new(format!("invalid address {}", hex)))
    };

    match hex.len() {
        8 => Ok(IpAddr::V4(Ipv4Addr::from(word(hex)?))),
        32 => {
            let mut octets = [0u8; 16];
            for i in 0..4 {
                octets[i * 4..i * 4 + 4].copy_from_slice(&word(&hex[i * 8..i * 8 + 8])?);
            }
            Ok(IpAddr::V6(Ipv6Addr::from(octets)))
        }
        _ => Err(ParseError::new(format!("invalid address length {}", hex))),
    }
}
