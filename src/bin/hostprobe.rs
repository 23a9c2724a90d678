//! hostprobe - capture one read-only snapshot of this host.
//!
//! Usage:
//!   hostprobe --root /srv/app                          # records to stdout
//!   hostprobe --root /srv/app --out probe.jsonl        # append to a file
//!   hostprobe --root /srv/app --app openapi:openapi.json
//!
//! Exit status: 0 ok, 1 degraded, 2 failed, 3 output sink unusable.

use tikv_jemallocator::Jemalloc;
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing::{Level, info};
use tracing_subscriber::EnvFilter;

use hostprobe::app::AppResolver;
use hostprobe::collector::RealFs;
use hostprobe::util::command::CommandLimits;
use hostprobe::{OutputSink, Probe, ProbeConfig};

/// Read-only host state capture probe.
#[derive(Parser)]
#[command(name = "hostprobe", about = "Read-only host state capture probe", version)]
struct Args {
    /// Scope of the filesystem and package collectors.
    #[arg(short, long, env = "HOSTPROBE_ROOT", default_value = ".")]
    root: String,

    /// Application to introspect: openapi:<path>, routes:<path> or <module>:<attr>.
    /// Empty disables route collection.
    #[arg(short, long, env = "HOSTPROBE_APP")]
    app: Option<String>,

    /// Record sink. "-" writes to stdout; files are appended, never truncated.
    #[arg(short, long, env = "HOSTPROBE_OUT", default_value = "-")]
    out: String,

    /// Per-collector time budget in seconds.
    #[arg(long, env = "HOSTPROBE_TIMEOUT", default_value = "90")]
    timeout: u64,

    /// Per-command time budget in seconds.
    #[arg(long, env = "HOSTPROBE_COMMAND_TIMEOUT", default_value = "4")]
    command_timeout: u64,

    /// Maximum captured stdout characters per command.
    #[arg(long, env = "HOSTPROBE_MAX_STDOUT", default_value = "200000")]
    max_stdout: usize,

    /// Maximum captured stderr characters per command.
    #[arg(long, env = "HOSTPROBE_MAX_STDERR", default_value = "50000")]
    max_stderr: usize,

    /// Maximum directory depth walked below the root.
    #[arg(long, env = "HOSTPROBE_MAX_DEPTH", default_value = "4")]
    max_depth: usize,

    /// Maximum number of filesystem entries reported.
    #[arg(long, env = "HOSTPROBE_MAX_ENTRIES", default_value = "5000")]
    max_entries: usize,

    /// Run collectors one after another instead of concurrently.
    #[arg(long, env = "HOSTPROBE_SEQUENTIAL")]
    sequential: bool,

    /// Skip raw command captures.
    #[arg(long, env = "HOSTPROBE_NO_COMMANDS")]
    no_commands: bool,

    /// Path to /proc filesystem.
    #[arg(long, env = "HOSTPROBE_PROC_PATH", default_value = "/proc")]
    proc_path: String,

    /// Increase logging verbosity (-v for debug, -vv for trace). Default is warn level.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Quiet mode - only show errors.
    #[arg(short, long)]
    quiet: bool,
}

/// Initializes the tracing subscriber on stderr, keeping stdout free for records.
fn init_logging(verbose: u8, quiet: bool) {
    let level = if quiet {
        Level::ERROR
    } else {
        match verbose {
            0 => Level::WARN,
            1 => Level::DEBUG,
            _ => Level::TRACE,
        }
    };

    let mut filter = EnvFilter::from_default_env();
    if let Ok(directive) = format!("hostprobe={}", level).parse() {
        filter = filter.add_directive(directive);
    }

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn build_config(args: &Args) -> ProbeConfig {
    let limits = CommandLimits {
        timeout: Duration::from_secs(args.command_timeout),
        max_stdout_chars: args.max_stdout,
        max_stderr_chars: args.max_stderr,
    };

    let mut config = ProbeConfig::new(&args.root)
        .with_sink(OutputSink::parse(&args.out))
        .with_proc_path(&args.proc_path)
        .with_collector_timeout(Duration::from_secs(args.timeout))
        .with_parallel(!args.sequential)
        .with_commands(!args.no_commands)
        .with_command_limits(limits)
        .with_walk_limits(args.max_depth, args.max_entries);
    if let Some(app) = &args.app {
        config = config.with_app_spec(app);
    }
    config
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.verbose, args.quiet);

    let config = build_config(&args);
    info!(
        "hostprobe {} starting: root={}, app={}, out={}",
        env!("CARGO_PKG_VERSION"),
        config.root.display(),
        config.app_spec.as_deref().unwrap_or("-"),
        args.out
    );

    let fs = RealFs::new();
    let resolver = Arc::new(AppResolver::new(fs));
    let mut probe = Probe::for_host(fs, resolver, config);
    let report = probe.run();

    eprintln!("{}", report.summary());
    ExitCode::from(report.exit_code())
}
