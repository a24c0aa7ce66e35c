use crate::error::ErrorKind;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchReport {
    pub started: String,
    pub finished: String,
    pub workers: usize,
    pub ok: usize,
    pub failed: usize,
    pub jobs: Vec<JobReport>,
}

impl BatchReport {
    pub fn all_ok(&self) -> bool {
        self.failed == 0
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobReport {
    pub index: usize,
    pub concrete: PathBuf,
    #[serde(rename = "abstract")]
    pub abstract_path: PathBuf,
    pub ok: bool,
    #[serde(default)]
    pub error_kind: Option<ErrorKind>,
    #[serde(default)]
    pub error: Option<String>,
    pub elapsed_ms: u64,
    #[serde(default)]
    pub output_sha256: Option<String>,
}
