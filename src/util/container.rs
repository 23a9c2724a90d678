//! Container environment detection.
//!
//! Detects whether the probed host is a container (Docker, Kubernetes,
//! Podman, LXC, etc.) rather than bare metal. Every marker is read through
//! `FileSystem` below the configured host paths, so a mounted host view or
//! a mock host is judged by its own files.

use std::path::Path;

use crate::collector::traits::FileSystem;
use crate::config::ProbeConfig;

/// Returns `true` if the host seen through `fs` looks like a container.
pub fn is_container<F: FileSystem>(fs: &F, config: &ProbeConfig) -> bool {
    let host_root = config.etc_path.parent().unwrap_or(Path::new("/"));

    check_k8s_env(fs, &config.proc_path)
        || check_service_account(fs, host_root)
        || check_container_markers(fs, host_root)
        || check_cgroup(fs, &config.proc_path)
}

/// Kubernetes injects `KUBERNETES_SERVICE_HOST` into every pod's init process.
fn check_k8s_env<F: FileSystem>(fs: &F, proc_path: &Path) -> bool {
    let Ok(environ) = fs.read_to_string(&proc_path.join("1/environ")) else {
        return false;
    };
    environ
        .split('\0')
        .any(|var| var.starts_with("KUBERNETES_SERVICE_HOST="))
}

fn check_service_account<F: FileSystem>(fs: &F, host_root: &Path) -> bool {
    fs.exists(&host_root.join("var/run/secrets/kubernetes.io/serviceaccount/token"))
}

fn check_container_markers<F: FileSystem>(fs: &F, host_root: &Path) -> bool {
    fs.exists(&host_root.join(".dockerenv")) || fs.exists(&host_root.join("run/.containerenv"))
}

fn check_cgroup<F: FileSystem>(fs: &F, proc_path: &Path) -> bool {
    let Ok(content) = fs.read_to_string(&proc_path.join("1/cgroup")) else {
        return false;
    };

    let patterns = [
        "kubepods",
        "docker",
        "containerd",
        "lxc",
        "/system.slice/containerd",
    ];
    patterns.iter().any(|p| content.contains(p))
}
