//! Pre-built mock host scenarios for testing.
//!
//! These scenarios provide realistic `/proc`, `/etc` and project-root states
//! for exercising every collector hermetically.

use super::filesystem::MockFs;

/// Boot time (`btime`) written into the typical host's `/proc/stat`.
pub const TYPICAL_BTIME: u64 = 1_700_000_000;

impl MockFs {
    /// Creates a typical host: a few processes, two interfaces, listening
    /// sockets, and a project root at `/srv/app` with manifests.
    pub fn typical_host() -> Self {
        let mut fs = Self::new();

        // Identity
        fs.add_file("/etc/machine-id", "4c4c4544004e3010804cb4c04f4d3732\n");
        fs.add_file(
            "/etc/os-release",
            "\
NAME=\"Debian GNU/Linux\"
VERSION_ID=\"12\"
VERSION=\"12 (bookworm)\"
ID=debian
PRETTY_NAME=\"Debian GNU/Linux 12 (bookworm)\"
# comment line
",
        );
        fs.add_file(
            "/etc/passwd",
            "\
root:x:0:0:root:/root:/bin/bash
daemon:x:1:1:daemon:/usr/sbin:/usr/sbin/nologin
www-data:x:33:33:www-data:/var/www:/usr/sbin/nologin
user:x:1000:1000:User:/home/user:/bin/bash
",
        );
        fs.add_file("/proc/sys/kernel/ostype", "Linux\n");
        fs.add_file("/proc/sys/kernel/osrelease", "6.1.0-18-amd64\n");
        fs.add_file(
            "/proc/sys/kernel/version",
            "#1 SMP PREEMPT_DYNAMIC Debian 6.1.76-1 (2024-02-01)\n",
        );
        fs.add_file("/proc/sys/kernel/hostname", "edge-01\n");

        // System-wide files
        fs.add_file("/proc/uptime", "12345.67 98765.43\n");
        fs.add_file("/proc/loadavg", "0.15 0.10 0.05 1/150 1234\n");
        fs.add_file(
            "/proc/meminfo",
            "\
MemTotal:       16384000 kB
MemFree:         8192000 kB
MemAvailable:   12000000 kB
SwapTotal:       4096000 kB
SwapFree:        4096000 kB
",
        );
        fs.add_file(
            "/proc/stat",
            format!(
                "\
cpu  10000 500 3000 80000 1000 200 100 0 0 0
cpu0 2500 125 750 20000 250 50 25 0 0 0
cpu1 2500 125 750 20000 250 50 25 0 0 0
cpu2 2500 125 750 20000 250 50 25 0 0 0
cpu3 2500 125 750 20000 250 50 25 0 0 0
ctxt 500000
btime {}
processes 10000
procs_running 2
procs_blocked 0
",
                TYPICAL_BTIME
            ),
        );
        fs.add_file(
            "/proc/self/mountinfo",
            "\
22 1 259:2 / / rw,relatime shared:1 - ext4 /dev/nvme0n1p2 rw
23 22 0:21 / /proc rw,nosuid,nodev,noexec,relatime shared:12 - proc proc rw
40 22 259:3 / /srv rw,relatime shared:30 - xfs /dev/nvme0n1p3 rw
41 40 0:45 / /srv/app/data\\040store rw,relatime shared:31 - tmpfs tmpfs rw,size=65536k
42 22 0:46 / /home rw,relatime shared:32 - ext4 /dev/nvme0n1p4 rw
",
        );

        // Network
        fs.add_file(
            "/proc/net/dev",
            "\
Inter-|   Receive                                                |  Transmit
 face |bytes    packets errs drop fifo frame compressed multicast|bytes    packets errs drop fifo colls carrier compressed
    lo: 12345678     9876    0    0    0     0          0         0 12345678     9876    0    0    0     0       0          0
  eth0: 987654321   654321    5   10    0     0          0       100 123456789   456789    2    5    0     0       0          0
",
        );
        fs.add_file(
            "/proc/net/tcp",
            "\
  sl  local_address rem_address   st tx_queue rx_queue tr tm->when retrnsmt   uid  timeout inode
   0: 00000000:0016 00000000:0000 0A 00000000:00000000 00:00000000 00000000     0        0 15501 1 0000000000000000 100 0 0 10 0
   1: 0100007F:1F90 00000000:0000 0A 00000000:00000000 00:00000000 00000000    33        0 22334 1 0000000000000000 100 0 0 10 0
   2: 0A00000A:0016 0B00000A:D431 01 00000000:00000000 02:0009C2E2 00000000     0        0 30001 4 0000000000000000 20 4 30 10 -1
",
        );
        fs.add_file(
            "/proc/net/tcp6",
            "\
  sl  local_address                         remote_address                        st tx_queue rx_queue tr tm->when retrnsmt   uid  timeout inode
   0: 00000000000000000000000000000000:0050 00000000000000000000000000000000:0000 0A 00000000:00000000 00:00000000 00000000    33        0 22335 1 0000000000000000 100 0 0 10 0
",
        );
        fs.add_file(
            "/proc/net/udp",
            "\
   sl  local_address rem_address   st tx_queue rx_queue tr tm->when retrnsmt   uid  timeout inode ref pointer drops
  100: 3500007F:0035 00000000:0000 07 00000000:00000000 00:00000000 00000000   101        0 18000 2 0000000000000000 0
",
        );
        fs.add_file(
            "/proc/net/udp6",
            "   sl  local_address                         remote_address                        st tx_queue rx_queue tr tm->when retrnsmt   uid  timeout inode ref pointer drops\n",
        );

        // Processes
        fs.add_process(
            1,
            "1 (systemd) S 0 1 1 0 -1 4194560 50000 1000000 100 500 1000 500 2000 1000 20 0 1 0 1 170000000 3000 18446744073709551615 0 0 0 0 0 0 0 0 1073745152 0 0 0 17 0 0 0 0 0 0 0 0 0 0 0 0 0 0",
            "Name:\tsystemd\nPid:\t1\nPPid:\t0\nUid:\t0\t0\t0\t0\nGid:\t0\t0\t0\t0\n",
            "/sbin/init\0splash\0",
            "systemd\n",
        );
        fs.add_process(
            1000,
            "1000 (bash) S 999 1000 1000 34816 1001 4194304 5000 50000 0 0 100 50 200 100 20 0 1 0 100000 25000000 2000 18446744073709551615 0 0 0 0 0 0 65536 3670020 1266777851 0 0 0 17 2 0 0 0 0 0 0 0 0 0 0 0 0 0",
            "Name:\tbash\nPid:\t1000\nPPid:\t999\nUid:\t1000\t1000\t1000\t1000\nGid:\t1000\t1000\t1000\t1000\n",
            "/bin/bash\0--login\0",
            "bash\n",
        );
        fs.add_process(
            2000,
            "2000 (kworker/0:1) I 2 0 0 0 -1 69238880 0 0 0 0 0 50 0 0 20 0 1 0 200 0 0 18446744073709551615 0 0 0 0 0 0 0 2147483647 0 0 0 0 17 0 0 0 0 0 0 0 0 0 0 0 0 0 0",
            "Name:\tkworker/0:1\nPid:\t2000\nPPid:\t2\nUid:\t0\t0\t0\t0\nGid:\t0\t0\t0\t0\n",
            "",
            "kworker/0:1\n",
        );
        fs.add_symlink("/proc/self", "/proc/1000");

        // Project root
        fs.add_file("/srv/app/README.md", "# app\n");
        fs.add_file("/srv/app/bin/run.sh", "#!/bin/sh\nexec ./server\n");
        fs.set_mode("/srv/app/bin/run.sh", 0o755);
        fs.add_file(
            "/srv/app/Cargo.lock",
            "\
# This file is automatically @generated by Cargo.
version = 3

[[package]]
name = \"app\"
version = \"0.3.1\"

[[package]]
name = \"serde\"
version = \"1.0.197\"
source = \"registry+https://github.com/rust-lang/crates.io-index\"
",
        );
        fs.add_file(
            "/srv/app/requirements.txt",
            "\
# pinned
fastapi==0.110.0
uvicorn[standard]==0.29.0
requests>=2.31
",
        );
        fs.add_dir("/srv/app/data store");

        fs
    }
}
