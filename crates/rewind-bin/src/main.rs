//! Rewind entrypoint: replay an edit script against the undo engine.
use anyhow::{Context, Result};
use clap::Parser;
use core_config::load_from;
use core_events::{
    CHANNEL_SEND_FAILURES, DEBOUNCE_CANCELS, DEBOUNCE_FIRES, DEBOUNCE_RESTARTS, DEBOUNCE_STALE,
};
use rewind::{ScriptRunner, parse_script};
use std::path::{Path, PathBuf};
use std::sync::atomic::Ordering;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;

/// CLI arguments.
#[derive(Parser, Debug)]
#[command(name = "rewind", version, about = "Replay edit scripts through the patch-based undo engine")]
struct Args {
    /// Script to replay (one command per line).
    pub script: PathBuf,
    /// Optional configuration file path (overrides discovery of `rewind.toml`).
    #[arg(long = "config")]
    pub config: Option<PathBuf>,
}

fn configure_logging() -> Option<WorkerGuard> {
    let log_dir = Path::new(".");
    let log_path = log_dir.join("rewind.log");
    if log_path.exists() {
        let _ = std::fs::remove_file(&log_path);
    }

    let file_appender = tracing_appender::rolling::never(log_dir, "rewind.log");
    let (nb_writer, guard) = tracing_appender::non_blocking(file_appender);
    match tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(nb_writer)
        .try_init()
    {
        Ok(_) => Some(guard),
        // Global tracing subscriber already installed; drop guard so writer shuts down.
        Err(_err) => None,
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let _log_guard = configure_logging();
    let args = Args::parse();
    info!(target: "runtime", "startup");

    let config = load_from(args.config.clone())?;
    let source = std::fs::read_to_string(&args.script)
        .with_context(|| format!("reading script {}", args.script.display()))?;
    let commands = parse_script(&source)
        .with_context(|| format!("parsing script {}", args.script.display()))?;
    info!(
        target: "runtime.startup",
        script = %args.script.display(),
        commands = commands.len(),
        config_override = args.config.is_some(),
        stack_bound = config.file.history.stack_bound,
        debounce_ms = config.file.capture.debounce_ms,
        "bootstrap_complete"
    );

    let mut runner = ScriptRunner::new(&config);
    for line in runner.run(&commands).await {
        println!("{line}");
    }

    info!(
        target: "runtime.events",
        restarts = DEBOUNCE_RESTARTS.load(Ordering::Relaxed),
        fires = DEBOUNCE_FIRES.load(Ordering::Relaxed),
        cancels = DEBOUNCE_CANCELS.load(Ordering::Relaxed),
        stale = DEBOUNCE_STALE.load(Ordering::Relaxed),
        send_failures = CHANNEL_SEND_FAILURES.load(Ordering::Relaxed),
        "shutdown_telemetry"
    );
    Ok(())
}
