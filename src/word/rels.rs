use super::xml::parse_fragment;
use anyhow::Result;
use quick_xml::escape::escape;
use regex::Regex;

pub const RELATIONSHIPS_NS: &str = "http://schemas.openxmlformats.org/package/2006/relationships";
pub const HYPERLINK_TYPE: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/hyperlink";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relationship {
    pub id: String,
    pub kind: String,
    pub target: String,
    pub external: bool,
}

/// Relationships of the main document part.
#[derive(Debug, Clone, Default)]
pub struct Relationships {
    rels: Vec<Relationship>,
    changed: bool,
}

impl Relationships {
    pub fn parse(xml: &str) -> Result<Self> {
        let root = parse_fragment(xml)?;
        let rels = root
            .elements()
            .filter(|e| e.local() == "Relationship")
            .filter_map(|e| {
                Some(Relationship {
                    id: e.attr("Id")?.to_string(),
                    kind: e.attr("Type").unwrap_or_default().to_string(),
                    target: e.attr("Target").unwrap_or_default().to_string(),
                    external: e.attr("TargetMode") == Some("External"),
                })
            })
            .collect();
        Ok(Self {
            rels,
            changed: false,
        })
    }

    pub fn get(&self, id: &str) -> Option<&Relationship> {
        self.rels.iter().find(|r| r.id == id)
    }

    pub fn hyperlink_target(&self, id: &str) -> Option<&str> {
        self.get(id)
            .filter(|r| r.kind == HYPERLINK_TYPE)
            .map(|r| r.target.as_str())
    }

    /// Returns the id of an external hyperlink to `target`, adding one if needed.
    pub fn add_hyperlink(&mut self, target: &str) -> Result<String> {
        if let Some(r) = self
            .rels
            .iter()
            .find(|r| r.kind == HYPERLINK_TYPE && r.external && r.target == target)
        {
            return Ok(r.id.clone());
        }
        let id = format!("rId{}", self.next_number()?);
        self.rels.push(Relationship {
            id: id.clone(),
            kind: HYPERLINK_TYPE.to_string(),
            target: target.to_string(),
            external: true,
        });
        self.changed = true;
        Ok(id)
    }

    pub fn is_changed(&self) -> bool {
        self.changed
    }

    fn next_number(&self) -> Result<u32> {
        let re = Regex::new(r"^rId(\d+)$")?;
        let max = self
            .rels
            .iter()
            .filter_map(|r| re.captures(&r.id))
            .filter_map(|c| c[1].parse::<u32>().ok())
            .max()
            .unwrap_or(0);
        Ok(max + 1)
    }

    pub fn to_xml(&self) -> String {
        let mut out = String::from(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
        out.push_str("\n<Relationships xmlns=\"");
        out.push_str(RELATIONSHIPS_NS);
        out.push_str("\">");
        for r in &self.rels {
            out.push_str(&format!(
                "<Relationship Id=\"{}\" Type=\"{}\" Target=\"{}\"",
                escape(r.id.as_str()),
                escape(r.kind.as_str()),
                escape(r.target.as_str())
            ));
            if r.external {
                out.push_str(" TargetMode=\"External\"");
            }
            out.push_str("/>");
        }
        out.push_str("</Relationships>");
        out
    }
}
