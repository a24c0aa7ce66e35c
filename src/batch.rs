//! Many `get` calls at once, one independent task per output.

use crate::adapter::Adapter;
use crate::error::{ConvertError, ConvertResult};
use crate::report::{BatchReport, JobReport};
use crate::util::{hash_file, now_rfc3339};
use anyhow::{Context, Result};
use rayon::prelude::*;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, warn};

#[derive(Debug, Clone)]
pub struct Job {
    pub concrete: PathBuf,
    pub abstract_path: PathBuf,
}

impl Job {
    pub fn get(concrete: impl Into<PathBuf>, abstract_path: impl Into<PathBuf>) -> Self {
        Self {
            concrete: concrete.into(),
            abstract_path: abstract_path.into(),
        }
    }
}

/// Runs every job's `get` on a pool of `workers` threads (0 = one per CPU) and returns
/// once all of them have finished.
///
/// Jobs that share an output path (after resolving the parent directory) fail with
/// `DuplicateOutput` and never run.
pub fn run_get_batch(adapter: &Adapter, jobs: &[Job], workers: usize) -> Result<BatchReport> {
    let started = now_rfc3339();
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .thread_name(|i| format!("dfconvert-batch-{i}"))
        .build()
        .with_context(|| "building batch thread pool")?;
    let threads = pool.current_num_threads();

    let keys: Vec<PathBuf> = jobs.iter().map(|j| output_key(&j.abstract_path)).collect();
    let mut uses: HashMap<&Path, usize> = HashMap::new();
    for key in &keys {
        *uses.entry(key.as_path()).or_default() += 1;
    }

    info!("batch: {} jobs on {} threads", jobs.len(), threads);
    let reports: Vec<JobReport> = pool.install(|| {
        jobs.par_iter()
            .enumerate()
            .map(|(index, job)| {
                let duplicate = uses.get(keys[index].as_path()).is_some_and(|n| *n > 1);
                run_job(adapter, index, job, duplicate)
            })
            .collect()
    });

    let failed = reports.iter().filter(|r| !r.ok).count();
    if failed > 0 {
        warn!("batch: {failed} of {} jobs failed", reports.len());
    }
    Ok(BatchReport {
        started,
        finished: now_rfc3339(),
        workers: threads,
        ok: reports.len() - failed,
        failed,
        jobs: reports,
    })
}

/// `out.html`, `./out.html` and `sub/../out.html` all map to the same key.
fn output_key(path: &Path) -> PathBuf {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let dir = std::fs::canonicalize(parent).unwrap_or_else(|_| parent.to_path_buf());
    match path.file_name() {
        Some(name) => dir.join(name),
        None => dir,
    }
}

fn run_job(adapter: &Adapter, index: usize, job: &Job, duplicate: bool) -> JobReport {
    let started = Instant::now();
    let result: ConvertResult<()> = if duplicate {
        Err(ConvertError::DuplicateOutput(job.abstract_path.clone()))
    } else {
        adapter.try_get(&job.concrete, &job.abstract_path)
    };
    let elapsed_ms = started.elapsed().as_millis() as u64;

    match result {
        Ok(()) => {
            let output_sha256 = match hash_file(&job.abstract_path) {
                Ok(h) => Some(h),
                Err(e) => {
                    warn!("job {index}: hashing output: {e:#}");
                    None
                }
            };
            JobReport {
                index,
                concrete: job.concrete.clone(),
                abstract_path: job.abstract_path.clone(),
                ok: true,
                error_kind: None,
                error: None,
                elapsed_ms,
                output_sha256,
            }
        }
        Err(err) => {
            warn!("job {index}: {err}");
            JobReport {
                index,
                concrete: job.concrete.clone(),
                abstract_path: job.abstract_path.clone(),
                ok: false,
                error_kind: Some(err.kind()),
                error: Some(err.to_string()),
                elapsed_ms,
                output_sha256: None,
            }
        }
    }
}
