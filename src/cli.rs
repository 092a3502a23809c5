use crate::{
    config::Config,
    pipeline::Pipeline,
    script::Script,
    services::{HeuristicAnalyzer, NoPreview},
    timezone,
    util::{ensure_dir, parse_rfc3339, rfc3339},
};
use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

#[derive(Parser, Debug)]
#[command(name = "fax-broadcast")]
#[command(about = "Fax broadcast drafting, scheduling and job-status core (intake + review + dispatcher)")]
pub struct Args {
    #[command(subcommand)]
    pub cmd: Command,

    /// Path to config TOML. If omitted, uses ./fax-broadcast.toml if present.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Override log level (trace/debug/info/warn/error).
    #[arg(long)]
    pub log_level: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Show a delivery instant in every configured time zone.
    Zones {
        /// RFC 3339 instant, e.g. 2024-10-31T15:00:00Z.
        #[arg(long)]
        at: String,
    },
    /// Replay a scripted session: intake, review, submit, then job actions.
    Run {
        #[arg(long)]
        script: PathBuf,
    },
    /// Print the effective configuration.
    Config {},
}

pub fn dispatch(args: Args) -> Result<()> {
    let cfg = match resolve_config_path(args.config.as_deref()) {
        Some(path) => Config::load(&path)?,
        None => Config::default(),
    };
    let log_path = resolve_log_path(&cfg);
    let _guard = init_logging(&args, &cfg, log_path.as_deref())?;

    match &args.cmd {
        Command::Zones { at } => zones(&cfg, at),
        Command::Run { script } => run(&cfg, script),
        Command::Config {} => {
            print!("{}", cfg.to_toml());
            Ok(())
        }
    }
}

fn resolve_config_path(user: Option<&Path>) -> Option<PathBuf> {
    if let Some(p) = user {
        return Some(p.to_path_buf());
    }
    let default = PathBuf::from("fax-broadcast.toml");
    default.exists().then_some(default)
}

fn init_logging(args: &Args, cfg: &Config, file_path: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let level = args
        .log_level
        .as_deref()
        .unwrap_or(cfg.logging.level.as_str());

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    // Stdout carries the JSON report, so logs go to stderr.
    let stderr_layer = if cfg.logging.json {
        tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_target(true)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .boxed()
    };

    let (file_layer, guard) = if let Some(path) = file_path {
        let parent = path.parent().unwrap_or_else(|| Path::new("."));
        ensure_dir(parent)?;
        let file = std::fs::File::create(path)
            .with_context(|| format!("create log file: {}", path.display()))?;
        let (non_blocking, guard) = tracing_appender::non_blocking(file);
        let layer = tracing_subscriber::fmt::layer()
            .with_writer(non_blocking)
            .with_ansi(false)
            .with_target(true)
            .boxed();
        (Some(layer), Some(guard))
    } else {
        (None, None)
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| anyhow!("failed to init logging: {e}"))?;

    Ok(guard)
}

fn zones(cfg: &Config, at: &str) -> Result<()> {
    let base = parse_rfc3339(at)?;
    let table = timezone::project(Some(base), &cfg.time_zones);
    println!(
        "{}",
        serde_json::to_string_pretty(&serde_json::json!({
            "at": rfc3339(base),
            "zones": table,
        }))?
    );
    Ok(())
}

fn run(cfg: &Config, script_path: &Path) -> Result<()> {
    let script = Script::load(script_path)?;
    let base_dir = script_path.parent().unwrap_or_else(|| Path::new("."));
    info!(
        script = %script_path.display(),
        documents = script.documents.len(),
        actions = script.actions.len(),
        "running session"
    );

    let pipeline = Pipeline::new(cfg, HeuristicAnalyzer, NoPreview);
    let report = pipeline.run_script(&script, base_dir)?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn resolve_log_path(cfg: &Config) -> Option<PathBuf> {
    if !cfg.logging.write_to_file {
        return None;
    }
    if !cfg.logging.file_path.is_empty() {
        return Some(PathBuf::from(&cfg.logging.file_path));
    }
    Some(PathBuf::from("fax-broadcast.log"))
}
