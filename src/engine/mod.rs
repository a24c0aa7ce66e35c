pub mod native;
pub mod process;
pub mod types;

use crate::config::Config;
use crate::error::{ConvertError, ConvertResult};
use crate::util::{WriteMode, write_atomic};
use anyhow::{Result, bail};
use std::path::Path;

pub use native::NativeEngine;
pub use process::ProcessEngine;
pub use types::{EngineInfo, ToolInfo};

/// A conversion backend. Paths are already validated by the adapter.
///
/// Implementations hold no mutable state, so one engine can serve many threads as long
/// as concurrent calls write to different outputs.
pub trait Engine: Send + Sync {
    fn describe(&self) -> EngineInfo;

    /// Normalized serialization of the HTML document at `path`.
    fn normalized(&self, path: &Path) -> ConvertResult<String>;

    /// Renders `concrete` into a new HTML file at `abstract_path`.
    fn get(&self, concrete: &Path, abstract_path: &Path) -> ConvertResult<()>;

    /// Writes the edits in `abstract_path` back into `concrete`.
    fn put(&self, concrete: &Path, abstract_path: &Path) -> ConvertResult<()>;

    /// Creates a new document at `concrete` from `abstract_path`.
    fn create(&self, concrete: &Path, abstract_path: &Path) -> ConvertResult<()>;

    /// Normalizes the HTML document at `path` in place.
    fn normalize(&self, path: &Path) -> ConvertResult<()> {
        let out = self.normalized(path)?;
        write_atomic(path, out.as_bytes(), WriteMode::Replace)
            .map_err(|e| ConvertError::write(path, e))
    }
}

pub fn from_config(cfg: &Config) -> Result<Box<dyn Engine>> {
    match cfg.engine.kind.as_str() {
        "native" => Ok(Box::new(NativeEngine::new(cfg))),
        "process" => Ok(Box::new(ProcessEngine::new(cfg))),
        other => bail!("unknown engine.kind: {other}"),
    }
}
