use serde::{Deserialize, Serialize};

/// What `doctor` reports about the configured engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineInfo {
    pub kind: String,
    pub version: String,
    pub ok: bool,
    #[serde(default)]
    pub tools: Vec<ToolInfo>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolInfo {
    pub name: String,
    pub path: String,
    pub runnable: bool,
}
