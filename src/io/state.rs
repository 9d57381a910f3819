//! Read/write the run-state JSON file.
//!
//! The file records which monthly file was fetched last and which one was last
//! transformed. A month is transformed at most once: when both labels match,
//! the run is skipped before touching the store.
//!
//! Fields owned by other pipeline steps (e.g. the next fetch date) are kept as-is.

use std::fs::File;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::AppError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunState {
    /// Label of the most recently fetched file, e.g. `aug2025`.
    pub latest_file: String,
    /// Label of the last file that was transformed and loaded.
    #[serde(default)]
    pub last_transformation: Option<String>,
    #[serde(flatten)]
    pub other: serde_json::Map<String, serde_json::Value>,
}

impl RunState {
    pub fn already_transformed(&self) -> bool {
        self.last_transformation
            .as_deref()
            .is_some_and(|last| last.eq_ignore_ascii_case(&self.latest_file))
    }

    pub fn mark_transformed(&mut self) {
        self.last_transformation = Some(self.latest_file.clone());
    }
}

pub fn read_state_json(path: &Path) -> Result<RunState, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::config(format!("Failed to open state JSON '{}': {e}", path.display())))?;
    serde_json::from_reader(file).map_err(|e| AppError::config(format!("Invalid state JSON: {e}")))
}

pub fn write_state_json(path: &Path, state: &RunState) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::config(format!("Failed to create state JSON '{}': {e}", path.display())))?;
    serde_json::to_writer_pretty(file, state)
        .map_err(|e| AppError::config(format!("Failed to write state JSON: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skip_when_latest_matches_last_transformation() {
        let state: RunState =
            serde_json::from_str(r#"{"latest_file": "aug2025", "last_transformation": "AUG2025"}"#).unwrap();
        assert!(state.already_transformed());

        let state: RunState = serde_json::from_str(r#"{"latest_file": "sep2025"}"#).unwrap();
        assert!(!state.already_transformed());
    }

    #[test]
    fn round_trip_preserves_unknown_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{"latest_file": "aug2025", "last_transformation": "jul2025", "next_file_date": "sep2025"}"#,
        )
        .unwrap();

        let mut state = read_state_json(&path).unwrap();
        state.mark_transformed();
        write_state_json(&path, &state).unwrap();

        let reread = read_state_json(&path).unwrap();
        assert_eq!(reread.last_transformation.as_deref(), Some("aug2025"));
        assert_eq!(reread.other.get("next_file_date").and_then(|v| v.as_str()), Some("sep2025"));
    }

    #[test]
    fn missing_file_is_a_config_error() {
        let err = read_state_json(Path::new("/nonexistent/config.json")).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Config);
    }
}
