use std::collections::BTreeMap;

/// Declarations from a `style` attribute, kept sorted so serialization is stable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CssProperties(BTreeMap<String, String>);

impl CssProperties {
    pub fn parse(text: &str) -> Self {
        let mut props = Self::default();
        props.merge_str(text);
        props
    }

    /// Later declarations win, matching how a browser applies an inline style.
    pub fn merge_str(&mut self, text: &str) {
        for decl in text.split(';') {
            let Some((name, value)) = decl.split_once(':') else {
                continue;
            };
            let name = name.trim().to_ascii_lowercase();
            let value = value.trim();
            if name.is_empty() || value.is_empty() {
                continue;
            }
            self.0.insert(name, value.to_string());
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    pub fn set(&mut self, name: &str, value: &str) {
        self.0.insert(name.to_string(), value.to_string());
    }

    pub fn remove(&mut self, name: &str) -> Option<String> {
        self.0.remove(name)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn to_css(&self) -> String {
        self.0
            .iter()
            .map(|(k, v)| format!("{k}: {v}"))
            .collect::<Vec<_>>()
            .join("; ")
    }

    pub fn is_bold(&self) -> bool {
        match self.get("font-weight") {
            Some("bold") | Some("bolder") => true,
            Some(v) => v.parse::<u32>().is_ok_and(|w| w >= 600),
            None => false,
        }
    }

    pub fn is_italic(&self) -> bool {
        matches!(self.get("font-style"), Some("italic") | Some("oblique"))
    }

    pub fn is_underline(&self) -> bool {
        self.get("text-decoration")
            .is_some_and(|v| v.split_ascii_whitespace().any(|t| t == "underline"))
    }
}
