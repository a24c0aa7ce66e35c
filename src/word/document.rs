//! Splits `word/document.xml` into raw top-level body blocks.
//!
//! Blocks keep their exact source text so that an untouched block can be written
//! back byte-for-byte.

use anyhow::{Result, anyhow};
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    Paragraph,
    Table,
    Other,
}

#[derive(Debug, Clone)]
pub struct Block {
    /// Position among the body's children, excluding `w:sectPr`.
    pub seq: usize,
    pub kind: BlockKind,
    pub raw: String,
}

#[derive(Debug, Clone)]
pub struct Body {
    pub head: String,
    pub blocks: Vec<Block>,
    pub sect_pr: Option<String>,
    pub tail: String,
}

impl Body {
    pub fn parse(xml: &str) -> Result<Self> {
        let scan = scan_element(xml, b"body")?
            .ok_or_else(|| anyhow!("document has no w:body element"))?;

        let (head, tail) = if scan.self_closing {
            (
                format!("{}<w:body>", &xml[..scan.start]),
                format!("</w:body>{}", &xml[scan.end..]),
            )
        } else {
            (
                xml[..scan.content_start].to_string(),
                xml[scan.content_end..].to_string(),
            )
        };

        let mut blocks = Vec::new();
        let mut sect_pr = None;
        for child in scan.children {
            let raw = xml[child.start..child.end].to_string();
            let kind = match child.name.as_str() {
                "sectPr" => {
                    sect_pr = Some(raw);
                    continue;
                }
                "p" => BlockKind::Paragraph,
                "tbl" => BlockKind::Table,
                _ => BlockKind::Other,
            };
            blocks.push(Block {
                seq: blocks.len(),
                kind,
                raw,
            });
        }

        Ok(Self {
            head,
            blocks,
            sect_pr,
            tail,
        })
    }

    pub fn block(&self, seq: usize) -> Option<&Block> {
        self.blocks.get(seq)
    }

    /// Reassembles a document from new block XML, keeping head, section properties and tail.
    pub fn assemble<'a>(&self, blocks: impl IntoIterator<Item = &'a str>) -> String {
        let mut out = self.head.clone();
        for b in blocks {
            out.push_str(b);
        }
        if let Some(sect) = &self.sect_pr {
            out.push_str(sect);
        }
        out.push_str(&self.tail);
        out
    }
}

#[derive(Debug, Clone)]
pub struct ChildRange {
    /// Local name, prefix stripped.
    pub name: String,
    pub start: usize,
    pub end: usize,
}

#[derive(Debug, Clone)]
pub struct Scan {
    pub start: usize,
    pub end: usize,
    pub content_start: usize,
    pub content_end: usize,
    pub self_closing: bool,
    pub children: Vec<ChildRange>,
}

/// Finds the first element whose local name is `root` and records the byte ranges of
/// its direct element children.
pub fn scan_element(xml: &str, root: &[u8]) -> Result<Option<Scan>> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(false);

    let mut depth = 0usize;
    let mut root_depth: Option<usize> = None;
    let mut scan = Scan {
        start: 0,
        end: 0,
        content_start: 0,
        content_end: 0,
        self_closing: false,
        children: Vec::new(),
    };
    let mut open_child: Option<(String, usize)> = None;

    loop {
        let before = reader.buffer_position();
        let event = reader
            .read_event()
            .map_err(|e| anyhow!("malformed XML at byte {before}: {e}"))?;
        let after = reader.buffer_position();
        // the reader may already have consumed the `<` while reading preceding text
        let tag_start = xml[..after].rfind('<').unwrap_or(before);

        match event {
            Event::Start(e) => {
                depth += 1;
                match root_depth {
                    None if e.local_name().as_ref() == root => {
                        root_depth = Some(depth);
                        scan.start = tag_start;
                        scan.content_start = after;
                    }
                    Some(rd) if depth == rd + 1 => open_child = Some((local_name(&e), tag_start)),
                    _ => {}
                }
            }
            Event::Empty(e) => match root_depth {
                None if e.local_name().as_ref() == root => {
                    scan.start = tag_start;
                    scan.end = after;
                    scan.content_start = after;
                    scan.content_end = after;
                    scan.self_closing = true;
                    return Ok(Some(scan));
                }
                Some(rd) if depth == rd => scan.children.push(ChildRange {
                    name: local_name(&e),
                    start: tag_start,
                    end: after,
                }),
                _ => {}
            },
            Event::End(_) => {
                if let Some(rd) = root_depth {
                    if depth == rd + 1 {
                        if let Some((name, start)) = open_child.take() {
                            scan.children.push(ChildRange {
                                name,
                                start,
                                end: after,
                            });
                        }
                    } else if depth == rd {
                        scan.content_end = tag_start;
                        scan.end = after;
                        return Ok(Some(scan));
                    }
                }
                depth = depth.saturating_sub(1);
            }
            Event::Eof => break,
            _ => {}
        }
    }

    match root_depth {
        Some(_) => Err(anyhow!("unterminated element")),
        None => Ok(None),
    }
}

fn local_name(e: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(e.local_name().as_ref()).into_owned()
}
