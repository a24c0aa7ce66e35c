use anyhow::{Context, Result, anyhow, bail};
use std::io::{Cursor, Read, Seek, Write};
use std::path::Path;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

pub const DOCUMENT_PART: &str = "word/document.xml";
pub const DOCUMENT_RELS_PART: &str = "word/_rels/document.xml.rels";
pub const STYLES_PART: &str = "word/styles.xml";

/// An OPC package held fully in memory, entries kept in archive order.
#[derive(Debug, Clone, Default)]
pub struct Package {
    entries: Vec<(String, Vec<u8>)>,
}

impl Package {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open(path: &Path, max_expanded: u64) -> Result<Self> {
        let file = std::fs::File::open(path)
            .with_context(|| format!("opening package: {}", path.display()))?;
        Self::read_from(file, max_expanded)
            .with_context(|| format!("reading package: {}", path.display()))
    }

    /// Reads every entry into memory. `max_expanded` bounds the total uncompressed
    /// size; the sizes the archive declares are not trusted.
    pub fn read_from<R: Read + Seek>(reader: R, max_expanded: u64) -> Result<Self> {
        let mut archive = ZipArchive::new(reader).with_context(|| "not a zip archive")?;
        let mut entries = Vec::with_capacity(archive.len());
        let mut budget = max_expanded;
        for i in 0..archive.len() {
            let file = archive.by_index(i)?;
            if file.is_dir() {
                continue;
            }
            let name = file.name().to_string();
            let mut data = Vec::with_capacity(file.size().min(budget).min(1 << 20) as usize);
            let read = file
                .take(budget.saturating_add(1))
                .read_to_end(&mut data)
                .with_context(|| format!("reading entry {name}"))? as u64;
            if read > budget {
                bail!("package expands past {max_expanded} bytes at {name}");
            }
            budget -= read;
            entries.push((name, data));
        }
        Ok(Self { entries })
    }

    pub fn get(&self, name: &str) -> Option<&[u8]> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, d)| d.as_slice())
    }

    pub fn get_str(&self, name: &str) -> Result<Option<String>> {
        match self.get(name) {
            Some(bytes) => {
                let s = std::str::from_utf8(bytes)
                    .map_err(|e| anyhow!("{name} is not UTF-8: {e}"))?;
                Ok(Some(s.trim_start_matches('\u{feff}').to_string()))
            }
            None => Ok(None),
        }
    }

    pub fn require_str(&self, name: &str) -> Result<String> {
        self.get_str(name)?
            .ok_or_else(|| anyhow!("package has no {name} part"))
    }

    /// Replaces an existing entry in place or appends a new one.
    pub fn put(&mut self, name: &str, data: Vec<u8>) {
        match self.entries.iter_mut().find(|(n, _)| n == name) {
            Some(slot) => slot.1 = data,
            None => self.entries.push((name.to_string(), data)),
        }
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(n, _)| n.as_str())
    }

    pub fn write_to<W: Write + Seek>(&self, writer: W) -> Result<()> {
        let mut zip = ZipWriter::new(writer);
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        for (name, data) in &self.entries {
            zip.start_file(name.as_str(), options)?;
            zip.write_all(data)?;
        }
        zip.finish()?;
        Ok(())
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        self.write_to(Cursor::new(&mut buf))?;
        Ok(buf)
    }
}
