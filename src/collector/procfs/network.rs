//! Network collector: interfaces and listening sockets from `/proc/net/`.

use crate::collector::FactCollector;
use crate::collector::procfs::parser::{parse_net_dev, parse_net_sockets};
use crate::collector::traits::FileSystem;
use crate::config::ProbeConfig;
use crate::error::ProbeError;
use crate::storage::model::{CollectorKind, FactValue, Facts, Outcome};
use crate::util::command::capture_all;

/// Socket tables and whether they hold UDP sockets.
const SOCKET_TABLES: [(&str, bool); 4] = [
    ("tcp", false),
    ("tcp6", false),
    ("udp", true),
    ("udp6", true),
];

/// Link, address, radio and network-manager surfaces.
///
/// The manager group covers NetworkManager, wpa_supplicant and iwd so a
/// host running more than one of them shows up as such.
const NETWORK_COMMANDS: &[&[&str]] = &[
    &["ip", "-br", "link", "show"],
    &["ip", "-br", "addr", "show"],
    &["ip", "route", "show"],
    &["iw", "dev"],
    &["iw", "phy"],
    &["rfkill", "list"],
    &["nmcli", "-t", "dev", "status"],
    &["systemctl", "--no-pager", "--plain", "status", "NetworkManager.service"],
    &["systemctl", "--no-pager", "--plain", "status", "wpa_supplicant.service"],
    &["systemctl", "--no-pager", "--plain", "status", "iwd.service"],
    &["pgrep", "-a", "-f", "NetworkManager"],
    &["pgrep", "-a", "-f", "wpa_supplicant"],
    &["pgrep", "-a", "-f", "iwd"],
    &["wg", "show"],
];

/// Collects interfaces and listening sockets visible to the invoking user.
pub struct NetworkCollector<F: FileSystem> {
    fs: F,
}

impl<F: FileSystem> NetworkCollector<F> {
    pub fn new(fs: F) -> Self {
        Self { fs }
    }

    fn read_table(&self, config: &ProbeConfig, name: &str) -> Result<String, ProbeError> {
        let path = config.proc_path.join("net").join(name);
        self.fs
            .read_to_string(&path)
            .map_err(|e| ProbeError::from_io(path.display(), e))
    }
}

impl<F: FileSystem> FactCollector for NetworkCollector<F> {
    fn kind(&self) -> CollectorKind {
        CollectorKind::Network
    }

    fn collect(&self, config: &ProbeConfig) -> Outcome {
        let mut facts = Facts::new();
        let mut errors = Vec::new();

        match self
            .read_table(config, "dev")
            .and_then(|c| parse_net_dev(&c).map_err(|e| ProbeError::Parse(e.message)))
        {
            Ok(devices) => {
                let interfaces: Vec<FactValue> = devices
                    .into_iter()
                    .map(|d| {
                        FactValue::map([
                            ("name", FactValue::from(d.interface)),
                            ("rx_bytes", FactValue::from(d.rx_bytes)),
                            ("rx_packets", FactValue::from(d.rx_packets)),
                            ("rx_errs", FactValue::from(d.rx_errs)),
                            ("tx_bytes", FactValue::from(d.tx_bytes)),
                            ("tx_packets", FactValue::from(d.tx_packets)),
                            ("tx_errs", FactValue::from(d.tx_errs)),
                        ])
                    })
                    .collect();
                facts.insert("interfaces".to_string(), FactValue::List(interfaces));
            }
            Err(e) => errors.push(e),
        }

        let mut listening = Vec::new();
        let mut tables_read = 0;
        for (table, udp) in SOCKET_TABLES {
            let sockets = match self
                .read_table(config, table)
                .and_then(|c| parse_net_sockets(&c).map_err(|e| ProbeError::Parse(e.message)))
            {
                Ok(sockets) => sockets,
                Err(e) => {
                    errors.push(e);
                    continue;
                }
            };
            tables_read += 1;

            listening.extend(sockets.iter().filter(|s| s.is_listening(udp)).map(|s| {
                FactValue::map([
                    ("protocol", FactValue::from(table)),
                    ("address", FactValue::from(s.local_addr.to_string())),
                    ("port", FactValue::from(s.local_port)),
                    ("uid", FactValue::from(s.uid)),
                    ("inode", FactValue::from(s.inode)),
                ])
            }));
        }
        if tables_read > 0 {
            facts.insert("listening".to_string(), FactValue::List(listening));
        }

        if config.run_commands {
            facts.insert(
                "commands".to_string(),
                capture_all(NETWORK_COMMANDS, &config.command_limits),
            );
        }

        Outcome::from_parts(CollectorKind::Network, facts, errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::mock::MockFs;
    use crate::storage::model::OutcomeStatus;
    use crate::util::command::CommandLimits;

    fn config() -> ProbeConfig {
        ProbeConfig::new("/srv/app").with_commands(false)
    }

    #[test]
    fn test_listening_sockets() {
        let outcome = NetworkCollector::new(MockFs::typical_host()).collect(&config());
        assert_eq!(outcome.status, OutcomeStatus::Ok, "{:?}", outcome.error);

        let listening = outcome.fact("listening").and_then(FactValue::as_list).unwrap();
        let endpoints: Vec<(String, String, u64)> = listening
            .iter()
            .map(|s| {
                (
                    s.get("protocol").and_then(FactValue::as_str).unwrap().to_string(),
                    s.get("address").and_then(FactValue::as_str).unwrap().to_string(),
                    s.get("port").and_then(FactValue::as_u64).unwrap(),
                )
            })
            .collect();

        assert_eq!(
            endpoints,
            vec![
                ("tcp".to_string(), "0.0.0.0".to_string(), 22),
                ("tcp".to_string(), "127.0.0.1".to_string(), 8080),
                ("tcp6".to_string(), "::".to_string(), 80),
                ("udp".to_string(), "127.0.0.53".to_string(), 53),
            ]
        );

        let interfaces = outcome.fact("interfaces").and_then(FactValue::as_list).unwrap();
        assert_eq!(interfaces.len(), 2);
        assert_eq!(interfaces[1].get("name").and_then(FactValue::as_str), Some("eth0"));
    }

    #[test]
    fn test_missing_table_is_partial() {
        let mut fs = MockFs::typical_host();
        fs.deny("/proc/net/tcp6");
        let outcome = NetworkCollector::new(fs).collect(&config());

        assert_eq!(outcome.status, OutcomeStatus::PartialFailure);
        assert!(outcome.error.as_deref().unwrap().contains("/proc/net/tcp6"));
        assert_eq!(
            outcome.fact("listening").and_then(FactValue::as_list).map(|l| l.len()),
            Some(3)
        );
    }

    #[test]
    fn test_manager_commands_cover_every_manager() {
        let captured: Vec<String> = NETWORK_COMMANDS.iter().map(|argv| argv.join(" ")).collect();
        for manager in ["NetworkManager", "wpa_supplicant", "iwd"] {
            assert!(captured.contains(&format!(
                "systemctl --no-pager --plain status {}.service",
                manager
            )));
            assert!(captured.contains(&format!("pgrep -a -f {}", manager)));
        }
        assert!(captured.contains(&"iw phy".to_string()));

        let worst = CommandLimits::default().timeout * NETWORK_COMMANDS.len() as u32;
        assert!(worst < ProbeConfig::DEFAULT_COLLECTOR_TIMEOUT);
    }

    #[test]
    fn test_no_proc_net_is_failed() {
        let outcome = NetworkCollector::new(MockFs::new()).collect(&config());
        assert_eq!(outcome.status, OutcomeStatus::Failed);
    }
}
