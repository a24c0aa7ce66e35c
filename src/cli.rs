use crate::{
    adapter::Adapter,
    batch::{Job, run_get_batch},
    config::Config,
    util::{WriteMode, ensure_dir, write_atomic},
};
use anyhow::{Context, Result, anyhow, bail};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, Layer, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "dfconvert")]
#[command(about = "Convert between Word documents and HTML (get, put, create, normalize)")]
pub struct Args {
    #[command(subcommand)]
    pub cmd: Command,

    /// Path to config TOML. If omitted, uses ./dfconvert.toml if present.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Override log level (trace/debug/info/warn/error).
    #[arg(long)]
    pub log_level: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Render a .docx as a new HTML file.
    Get { concrete: PathBuf, abstract_path: PathBuf },
    /// Write edits in an HTML file back into the .docx.
    Put { concrete: PathBuf, abstract_path: PathBuf },
    /// Create a new .docx from an HTML file.
    Create { concrete: PathBuf, abstract_path: PathBuf },
    /// Normalize an HTML file in place.
    Normalize {
        path: PathBuf,
        /// Print the result instead of rewriting the file.
        #[arg(long)]
        stdout: bool,
    },
    /// Render one .docx into several HTML files concurrently.
    Batch {
        #[arg(long)]
        input: PathBuf,
        #[arg(long, required = true, num_args = 1..)]
        output: Vec<PathBuf>,
        /// Worker threads; defaults to batch.workers from the config.
        #[arg(long)]
        workers: Option<usize>,
        /// Write the JSON batch report here.
        #[arg(long)]
        report: Option<PathBuf>,
    },
    /// Show the configured engine and whether its tools can run.
    Doctor {},
}

pub fn dispatch(args: Args) -> Result<()> {
    let cfg = match resolve_config_path(args.config.as_deref()) {
        Some(path) => Config::load(&path)?,
        None => Config::default(),
    };
    let log_path = resolve_log_path(&cfg);
    let _guard = init_logging(&args, &cfg, log_path.as_deref())?;

    let adapter = Adapter::from_config(&cfg)?;
    match &args.cmd {
        Command::Get {
            concrete,
            abstract_path,
        } => {
            adapter.try_get(concrete, abstract_path)?;
            summary(&cfg, "get", abstract_path)
        }
        Command::Put {
            concrete,
            abstract_path,
        } => {
            adapter.try_put(concrete, abstract_path)?;
            summary(&cfg, "put", concrete)
        }
        Command::Create {
            concrete,
            abstract_path,
        } => {
            adapter.try_create(concrete, abstract_path)?;
            summary(&cfg, "create", concrete)
        }
        Command::Normalize { path, stdout } => {
            if *stdout {
                print!("{}", adapter.try_normalized(path)?);
                Ok(())
            } else {
                adapter.try_normalize(path)?;
                summary(&cfg, "normalize", path)
            }
        }
        Command::Batch {
            input,
            output,
            workers,
            report,
        } => batch(&cfg, &adapter, input, output, *workers, report.as_deref()),
        Command::Doctor {} => {
            let info = adapter.engine().describe();
            println!("{}", serde_json::to_string_pretty(&info)?);
            if info.ok {
                Ok(())
            } else {
                Err(anyhow!(info.error.unwrap_or_else(|| "engine not usable".into())))
            }
        }
    }
}

fn batch(
    cfg: &Config,
    adapter: &Adapter,
    input: &Path,
    outputs: &[PathBuf],
    workers: Option<usize>,
    report_path: Option<&Path>,
) -> Result<()> {
    let jobs: Vec<Job> = outputs.iter().map(|o| Job::get(input, o)).collect();
    let report = run_get_batch(adapter, &jobs, workers.unwrap_or(cfg.batch.workers))?;

    let json = serde_json::to_string_pretty(&report)?;
    if let Some(path) = report_path {
        write_atomic(path, json.as_bytes(), WriteMode::Replace)
            .with_context(|| format!("writing report: {}", path.display()))?;
        info!("report written to {}", path.display());
    }
    if cfg.output.print_summary {
        println!("{json}");
    }

    if !report.all_ok() {
        bail!("{} of {} jobs failed", report.failed, report.jobs.len());
    }
    Ok(())
}

fn summary(cfg: &Config, op: &str, path: &Path) -> Result<()> {
    if cfg.output.print_summary {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "op": op,
                "path": path,
                "status": "ok"
            }))?
        );
    }
    Ok(())
}

fn resolve_config_path(user: Option<&Path>) -> Option<PathBuf> {
    if let Some(p) = user {
        return Some(p.to_path_buf());
    }
    let default = PathBuf::from("dfconvert.toml");
    default.exists().then_some(default)
}

fn init_logging(args: &Args, cfg: &Config, file_path: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let level = args
        .log_level
        .as_deref()
        .unwrap_or(cfg.logging.level.as_str());

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    // stdout carries command output, so logs go to stderr
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

fn resolve_log_path(cfg: &Config) -> Option<PathBuf> {
    if !cfg.logging.write_to_file {
        return None;
    }
    if !cfg.logging.file_path.is_empty() {
        return Some(PathBuf::from(&cfg.logging.file_path));
    }
    Some(PathBuf::from("dfconvert.log"))
}
