use super::{Engine, EngineInfo, ToolInfo};
use crate::config::Config;
use crate::error::{ConvertError, ConvertResult};
use crate::util::{WriteMode, write_atomic};
use anyhow::{Context, Result, anyhow};
use std::ffi::OsStr;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Output, Stdio};
use std::thread::ScopedJoinHandle;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Forwards every operation to the DocFormats command-line tools.
pub struct ProcessEngine {
    cfg: Config,
    dfconvert_exe: PathBuf,
    dfutil_exe: PathBuf,
}

impl ProcessEngine {
    pub fn new(cfg: &Config) -> Self {
        Self {
            cfg: cfg.clone(),
            dfconvert_exe: expand_tilde(&cfg.engine.dfconvert_exe),
            dfutil_exe: expand_tilde(&cfg.engine.dfutil_exe),
        }
    }

    fn run(&self, exe: &Path, args: &[&OsStr]) -> Result<Output> {
        let timeout = self.cfg.engine.timeout_seconds;
        debug!("process run {} {:?} timeout={}s", exe.display(), args, timeout);

        let mut cmd = Command::new(exe);
        cmd.args(args);
        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
        for (k, v) in &self.cfg.engine.env {
            cmd.env(k, v);
        }

        let mut child = cmd
            .spawn()
            .with_context(|| format!("spawning {}", exe.display()))?;

        let output = if timeout > 0 {
            match wait_with_timeout(&mut child, Duration::from_secs(timeout))? {
                Finished::Exited(output) => output,
                Finished::TimedOut(partial) => {
                    warn!("{} killed after {timeout}s", exe.display());
                    return Err(anyhow!(
                        "{} timed out after {timeout}s; stderr: {}",
                        exe.display(),
                        String::from_utf8_lossy(&partial.stderr).trim()
                    ));
                }
            }
        } else {
            child
                .wait_with_output()
                .with_context(|| format!("waiting for {}", exe.display()))?
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(anyhow!(
                "{} failed ({}): {}",
                exe.display(),
                output.status,
                stderr.trim()
            ));
        }

        if self.cfg.debug.keep_process_stderr && !output.stderr.is_empty() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            debug!("process stderr {}: {}", exe.display(), stderr.trim());
        }
        Ok(output)
    }

    /// Runs `dfconvert <op> <concrete> <abstract>`.
    fn convert(&self, op: &str, concrete: &Path, abstract_path: &Path) -> Result<()> {
        self.run(
            &self.dfconvert_exe,
            &[OsStr::new(op), concrete.as_os_str(), abstract_path.as_os_str()],
        )?;
        Ok(())
    }

    /// Lets the tool write `target` inside a scratch directory next to it, then moves the
    /// result into place without clobbering.
    fn convert_new(
        &self,
        op: &str,
        concrete: &Path,
        abstract_path: &Path,
        target: &Path,
    ) -> ConvertResult<()> {
        let dir = match target.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        let file_name = target
            .file_name()
            .ok_or_else(|| ConvertError::conversion(target, anyhow!("output has no file name")))?;
        let scratch = tempfile::Builder::new()
            .prefix(".dfconvert-")
            .tempdir_in(dir)
            .map_err(|e| ConvertError::write(target, e))?;
        let staged = scratch.path().join(file_name);

        let (c, a) = if target == concrete {
            (staged.as_path(), abstract_path)
        } else {
            (concrete, staged.as_path())
        };
        self.convert(op, c, a)
            .map_err(|e| ConvertError::conversion(concrete, e))?;

        let bytes = std::fs::read(&staged).map_err(|e| {
            ConvertError::conversion(target, anyhow!("tool produced no output: {e}"))
        })?;
        write_atomic(target, &bytes, WriteMode::CreateNew).map_err(|e| ConvertError::write(target, e))
    }

    fn probe_tool(&self, name: &str, exe: &Path) -> ToolInfo {
        let runnable = Command::new(exe)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .is_ok();
        ToolInfo {
            name: name.to_string(),
            path: exe.display().to_string(),
            runnable,
        }
    }
}

impl Engine for ProcessEngine {
    fn describe(&self) -> EngineInfo {
        let tools = vec![
            self.probe_tool("dfconvert", &self.dfconvert_exe),
            self.probe_tool("dfutil", &self.dfutil_exe),
        ];
        let missing: Vec<&str> = tools
            .iter()
            .filter(|t| !t.runnable)
            .map(|t| t.path.as_str())
            .collect();
        EngineInfo {
            kind: "process".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            ok: missing.is_empty(),
            error: (!missing.is_empty()).then(|| format!("cannot run: {}", missing.join(", "))),
            tools,
        }
    }

    fn normalized(&self, path: &Path) -> ConvertResult<String> {
        let output = self
            .run(&self.dfutil_exe, &[OsStr::new("-normalize"), path.as_os_str()])
            .map_err(|e| ConvertError::conversion(path, e))?;
        String::from_utf8(output.stdout)
            .map_err(|e| ConvertError::conversion(path, anyhow!("output is not UTF-8: {e}")))
    }

    fn get(&self, concrete: &Path, abstract_path: &Path) -> ConvertResult<()> {
        self.convert_new("get", concrete, abstract_path, abstract_path)
    }

    fn put(&self, concrete: &Path, abstract_path: &Path) -> ConvertResult<()> {
        self.convert("put", concrete, abstract_path)
            .map_err(|e| ConvertError::conversion(concrete, e))
    }

    fn create(&self, concrete: &Path, abstract_path: &Path) -> ConvertResult<()> {
        self.convert_new("create", concrete, abstract_path, concrete)
    }
}

fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/")
        && let Ok(home) = std::env::var("HOME")
    {
        return PathBuf::from(home).join(rest);
    }
    PathBuf::from(path)
}

/// How a child run under a deadline ended. Both arms carry what the pipes produced.
enum Finished {
    Exited(Output),
    TimedOut(Output),
}

const POLL_INTERVAL: Duration = Duration::from_millis(50);

fn wait_with_timeout(child: &mut Child, timeout: Duration) -> Result<Finished> {
    let stdout = child.stdout.take();
    let stderr = child.stderr.take();

    std::thread::scope(|scope| {
        // both pipes drain while we poll, or a chatty tool stalls on a full buffer
        let stdout = scope.spawn(move || drain(stdout));
        let stderr = scope.spawn(move || drain(stderr));

        let deadline = Instant::now() + timeout;
        let (status, timed_out) = loop {
            match child.try_wait() {
                Ok(Some(status)) => break (status, false),
                Ok(None) if Instant::now() >= deadline => {
                    let _ = child.kill();
                    break (child.wait().context("reaping killed child")?, true);
                }
                Ok(None) => std::thread::sleep(POLL_INTERVAL),
                Err(e) => {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(e).context("polling child");
                }
            }
        };

        let output = Output {
            status,
            stdout: joined(stdout, "stdout")?,
            stderr: joined(stderr, "stderr")?,
        };
        Ok(if timed_out {
            Finished::TimedOut(output)
        } else {
            Finished::Exited(output)
        })
    })
}

fn drain(pipe: Option<impl Read>) -> std::io::Result<Vec<u8>> {
    let mut buf = Vec::new();
    if let Some(mut pipe) = pipe {
        pipe.read_to_end(&mut buf)?;
    }
    Ok(buf)
}

fn joined(handle: ScopedJoinHandle<'_, std::io::Result<Vec<u8>>>, pipe: &str) -> Result<Vec<u8>> {
    handle
        .join()
        .map_err(|_| anyhow!("{pipe} reader panicked"))?
        .with_context(|| format!("reading {pipe}"))
}
