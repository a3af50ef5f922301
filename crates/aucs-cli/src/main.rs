//! AUCS batch scoring entrypoint.

mod scoring;

use std::path::PathBuf;
use std::sync::Once;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use tracing_appender::non_blocking::WorkerGuard;

use scoring::RunConfig;

/// CLI arguments.
#[derive(Parser, Debug)]
#[command(name = "aucs", version, about = "Aker Urban Convenience Score batch scoring engine")]
struct Args {
    /// Directory containing the input contract tables (places.csv, skims.csv, ...).
    #[arg(long = "input-dir")]
    input_dir: PathBuf,

    /// Directory the run writes artifacts, the manifest, and the lock file into.
    #[arg(long = "output-dir")]
    output_dir: PathBuf,

    /// Path to the parameter snapshot TOML file.
    #[arg(long = "params")]
    params: PathBuf,

    /// Worker threads for the concurrent subscore fan-out. Defaults to the
    /// available parallelism, overridable via `AUCS_MAX_WORKERS`.
    #[arg(long = "max-workers")]
    max_workers: Option<usize>,

    /// Per-stage timeout in seconds for the concurrent subscore fan-out,
    /// overridable via `AUCS_STAGE_TIMEOUT_SECS`.
    #[arg(long = "stage-timeout-secs", default_value_t = 300)]
    stage_timeout_secs: u64,
}

fn configure_logging() -> Option<WorkerGuard> {
    let log_dir = std::path::Path::new(".");
    let file_appender = tracing_appender::rolling::never(log_dir, "aucs.log");
    let (nb_writer, guard) = tracing_appender::non_blocking(file_appender);
    match tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(nb_writer)
        .try_init()
    {
        Ok(_) => Some(guard),
        Err(_) => None,
    }
}

fn install_panic_hook() {
    static HOOK: Once = Once::new();
    HOOK.call_once(|| {
        let default_panic = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            tracing::error!(target: "runtime.panic", ?info, "panic");
            default_panic(info);
        }));
    });
}

fn resolve_max_workers(arg: Option<usize>) -> usize {
    if let Some(n) = arg {
        return n.max(1);
    }
    if let Ok(s) = std::env::var("AUCS_MAX_WORKERS") {
        if let Ok(n) = s.parse::<usize>() {
            return n.max(1);
        }
    }
    std::thread::available_parallelism().map(|n| n.get()).unwrap_or(4)
}

fn resolve_stage_timeout(arg_secs: u64) -> Duration {
    if let Ok(s) = std::env::var("AUCS_STAGE_TIMEOUT_SECS") {
        if let Ok(n) = s.parse::<u64>() {
            return Duration::from_secs(n);
        }
    }
    Duration::from_secs(arg_secs)
}

fn main() -> Result<()> {
    let _log_guard = configure_logging();
    install_panic_hook();

    let args = Args::parse();
    let max_workers = resolve_max_workers(args.max_workers);
    let stage_timeout = resolve_stage_timeout(args.stage_timeout_secs);

    tracing::info!(
        target: "runtime",
        input_dir = %args.input_dir.display(),
        output_dir = %args.output_dir.display(),
        max_workers,
        stage_timeout_ms = stage_timeout.as_millis() as u64,
        "startup"
    );

    if let Err(e) = std::fs::create_dir_all(&args.output_dir) {
        tracing::error!(target: "runtime", ?e, "failed to create output directory");
        std::process::exit(2);
    }

    let cfg = RunConfig {
        input_dir: &args.input_dir,
        output_dir: &args.output_dir,
        params_path: &args.params,
        max_workers,
        stage_timeout,
    };

    match scoring::run(&cfg) {
        Ok(()) => {
            tracing::info!(target: "runtime", "shutdown");
            Ok(())
        }
        Err(e) => {
            tracing::error!(target: "runtime", error = %e, "run failed");
            let code = e.exit_code();
            std::process::exit(code);
        }
    }
}
