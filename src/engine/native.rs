use super::{Engine, EngineInfo};
use crate::config::Config;
use crate::error::{ConvertError, ConvertResult};
use crate::html::{indent::safe_indent, normalize_document, parse_html_file, to_xhtml};
use crate::util::{WriteMode, write_atomic};
use crate::word::{self, LensOptions, package::Package};
use std::path::Path;
use tracing::debug;

/// In-process engine built on the Word lens.
pub struct NativeEngine {
    opts: LensOptions,
    max_expanded: u64,
}

impl NativeEngine {
    pub fn new(cfg: &Config) -> Self {
        Self {
            opts: LensOptions::from_config(&cfg.conversion),
            max_expanded: cfg.limits.max_expanded_bytes,
        }
    }

    fn open(&self, concrete: &Path) -> ConvertResult<Package> {
        Package::open(concrete, self.max_expanded).map_err(|e| ConvertError::conversion(concrete, e))
    }
}

impl Engine for NativeEngine {
    fn describe(&self) -> EngineInfo {
        EngineInfo {
            kind: "native".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            ok: true,
            tools: Vec::new(),
            error: None,
        }
    }

    fn normalized(&self, path: &Path) -> ConvertResult<String> {
        let mut doc = parse_html_file(path).map_err(|e| ConvertError::conversion(path, e))?;
        normalize_document(&mut doc);
        if self.opts.indent {
            safe_indent(&mut doc.root, 0);
        }
        Ok(to_xhtml(&doc))
    }

    fn get(&self, concrete: &Path, abstract_path: &Path) -> ConvertResult<()> {
        let pkg = self.open(concrete)?;
        let doc = word::get(&pkg, &self.opts).map_err(|e| ConvertError::conversion(concrete, e))?;
        let html = to_xhtml(&doc);
        debug!("get {} -> {} ({} bytes)", concrete.display(), abstract_path.display(), html.len());
        write_atomic(abstract_path, html.as_bytes(), WriteMode::CreateNew)
            .map_err(|e| ConvertError::write(abstract_path, e))
    }

    fn put(&self, concrete: &Path, abstract_path: &Path) -> ConvertResult<()> {
        let html =
            parse_html_file(abstract_path).map_err(|e| ConvertError::conversion(abstract_path, e))?;
        let mut pkg = self.open(concrete)?;
        word::put(&mut pkg, &html, &self.opts).map_err(|e| ConvertError::conversion(concrete, e))?;
        let bytes = pkg
            .to_bytes()
            .map_err(|e| ConvertError::conversion(concrete, e))?;
        debug!("put {} -> {}", abstract_path.display(), concrete.display());
        write_atomic(concrete, &bytes, WriteMode::Replace).map_err(|e| ConvertError::write(concrete, e))
    }

    fn create(&self, concrete: &Path, abstract_path: &Path) -> ConvertResult<()> {
        let html =
            parse_html_file(abstract_path).map_err(|e| ConvertError::conversion(abstract_path, e))?;
        let pkg = word::create(&html, &self.opts).map_err(|e| ConvertError::conversion(concrete, e))?;
        let bytes = pkg
            .to_bytes()
            .map_err(|e| ConvertError::conversion(concrete, e))?;
        debug!("create {} from {}", concrete.display(), abstract_path.display());
        write_atomic(concrete, &bytes, WriteMode::CreateNew)
            .map_err(|e| ConvertError::write(concrete, e))
    }
}
