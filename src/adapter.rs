//! Path-level entry points in front of an [`Engine`].
//!
//! Every operation exists twice: `try_*` returns the [`ConvertError`] kind, and the
//! plain form logs the error and collapses it to `bool`.

use crate::config::Config;
use crate::engine::{self, Engine};
use crate::error::{ConvertError, ConvertResult};
use std::path::Path;
use std::time::Instant;
use tracing::{debug, error, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocFormat {
    /// Concrete side: Word `.docx`.
    Docx,
    /// Abstract side: `.html`, `.htm` or `.xhtml`.
    Html,
}

impl DocFormat {
    pub fn of(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "docx" => Some(DocFormat::Docx),
            "html" | "htm" | "xhtml" => Some(DocFormat::Html),
            _ => None,
        }
    }

    fn describe(self) -> &'static str {
        match self {
            DocFormat::Docx => "expected a .docx file",
            DocFormat::Html => "expected an .html, .htm or .xhtml file",
        }
    }
}

pub struct Adapter {
    engine: Box<dyn Engine>,
    max_input_bytes: u64,
}

impl Adapter {
    pub fn new(engine: Box<dyn Engine>, max_input_bytes: u64) -> Self {
        Self {
            engine,
            max_input_bytes,
        }
    }

    pub fn from_config(cfg: &Config) -> anyhow::Result<Self> {
        Ok(Self::new(
            engine::from_config(cfg)?,
            cfg.limits.max_input_file_bytes,
        ))
    }

    pub fn engine(&self) -> &dyn Engine {
        self.engine.as_ref()
    }

    pub fn normalize(&self, path: &Path) -> bool {
        report("normalize", self.try_normalize(path))
    }

    pub fn get(&self, input: &Path, output: &Path) -> bool {
        report("get", self.try_get(input, output))
    }

    pub fn put(&self, input: &Path, output: &Path) -> bool {
        report("put", self.try_put(input, output))
    }

    pub fn create(&self, output: &Path, input: &Path) -> bool {
        report("create", self.try_create(output, input))
    }

    /// Normalizes the HTML document at `path` in place.
    pub fn try_normalize(&self, path: &Path) -> ConvertResult<()> {
        self.check_input(path, DocFormat::Html)?;
        timed("normalize", path, || self.engine.normalize(path))
    }

    /// Normalized serialization of `path`, leaving the file untouched.
    pub fn try_normalized(&self, path: &Path) -> ConvertResult<String> {
        self.check_input(path, DocFormat::Html)?;
        self.engine.normalized(path)
    }

    /// Renders the concrete `input` into a new abstract file at `output`.
    pub fn try_get(&self, input: &Path, output: &Path) -> ConvertResult<()> {
        self.check_input(input, DocFormat::Docx)?;
        check_output(output, DocFormat::Html)?;
        timed("get", input, || self.engine.get(input, output))
    }

    /// Updates the concrete `input` in place from the abstract `output`.
    pub fn try_put(&self, input: &Path, output: &Path) -> ConvertResult<()> {
        self.check_input(input, DocFormat::Docx)?;
        self.check_input(output, DocFormat::Html)?;
        timed("put", input, || self.engine.put(input, output))
    }

    /// Creates a new concrete document at `output` from the abstract `input`.
    pub fn try_create(&self, output: &Path, input: &Path) -> ConvertResult<()> {
        self.check_input(input, DocFormat::Html)?;
        check_output(output, DocFormat::Docx)?;
        timed("create", output, || self.engine.create(output, input))
    }

    fn check_input(&self, path: &Path, format: DocFormat) -> ConvertResult<()> {
        let meta = match std::fs::metadata(path) {
            Ok(meta) if meta.is_file() => meta,
            _ => return Err(ConvertError::InputNotFound(path.to_path_buf())),
        };
        check_format(path, format)?;
        if meta.len() > self.max_input_bytes {
            return Err(ConvertError::ConversionFailed {
                path: path.to_path_buf(),
                message: format!(
                    "input is {} bytes, limit is {}",
                    meta.len(),
                    self.max_input_bytes
                ),
            });
        }
        Ok(())
    }
}

fn check_output(path: &Path, format: DocFormat) -> ConvertResult<()> {
    check_format(path, format)?;
    if path.exists() {
        return Err(ConvertError::OutputExists(path.to_path_buf()));
    }
    Ok(())
}

fn check_format(path: &Path, format: DocFormat) -> ConvertResult<()> {
    if DocFormat::of(path) == Some(format) {
        return Ok(());
    }
    Err(ConvertError::UnsupportedFormat {
        path: path.to_path_buf(),
        reason: format.describe().to_string(),
    })
}

fn timed<T>(op: &str, path: &Path, f: impl FnOnce() -> ConvertResult<T>) -> ConvertResult<T> {
    let started = Instant::now();
    let out = f()?;
    debug!(
        "{op} {} done in {}ms",
        path.display(),
        started.elapsed().as_millis()
    );
    Ok(out)
}

fn report(op: &str, result: ConvertResult<()>) -> bool {
    match result {
        Ok(()) => {
            info!("{op}: ok");
            true
        }
        Err(err) => {
            error!(kind = ?err.kind(), "{op}: {err}");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_follow_the_extension() {
        assert_eq!(DocFormat::of(Path::new("a/B.DOCX")), Some(DocFormat::Docx));
        assert_eq!(DocFormat::of(Path::new("page.xhtml")), Some(DocFormat::Html));
        assert_eq!(DocFormat::of(Path::new("notes.odt")), None);
        assert_eq!(DocFormat::of(Path::new("README")), None);
    }
}
