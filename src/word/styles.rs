use super::xml::parse_fragment;
use anyhow::Result;
use regex::Regex;
use std::collections::BTreeMap;

pub const DEFAULT_PARAGRAPH_STYLE: &str = "Normal";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Style {
    pub id: String,
    pub name: Option<String>,
    pub heading: Option<u8>,
}

/// Paragraph styles from `word/styles.xml`, keyed by style id.
#[derive(Debug, Clone, Default)]
pub struct StyleSheet {
    styles: BTreeMap<String, Style>,
}

impl StyleSheet {
    pub fn parse(xml: &str) -> Result<Self> {
        let heading = Regex::new(r"(?i)^heading\s*([1-6])$")?;
        let root = parse_fragment(xml)?;

        let mut styles = BTreeMap::new();
        for el in root.elements().filter(|e| e.local() == "style") {
            if el.attr("type").is_some_and(|t| t != "paragraph") {
                continue;
            }
            let Some(id) = el.attr("styleId") else {
                continue;
            };
            let name = el
                .child("name")
                .and_then(|n| n.attr("val"))
                .map(str::to_string);
            let level = name
                .as_deref()
                .and_then(|n| heading_level(&heading, n))
                .or_else(|| heading_level(&heading, id));
            styles.insert(
                id.to_string(),
                Style {
                    id: id.to_string(),
                    name,
                    heading: level,
                },
            );
        }
        Ok(Self { styles })
    }

    pub fn get(&self, id: &str) -> Option<&Style> {
        self.styles.get(id)
    }

    /// Heading level of a paragraph style. Unknown ids named `HeadingN` still count.
    pub fn heading_level(&self, id: &str) -> Option<u8> {
        match self.styles.get(id) {
            Some(style) => style.heading,
            None => builtin_heading(id),
        }
    }

    /// Style id to use for a heading of `level`.
    pub fn heading_style(&self, level: u8) -> String {
        self.styles
            .values()
            .find(|s| s.heading == Some(level))
            .map(|s| s.id.clone())
            .unwrap_or_else(|| format!("Heading{level}"))
    }
}

fn heading_level(re: &Regex, s: &str) -> Option<u8> {
    re.captures(s)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

fn builtin_heading(id: &str) -> Option<u8> {
    let level: u8 = id.strip_prefix("Heading")?.parse().ok()?;
    (1..=6).contains(&level).then_some(level)
}
