// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Temporary directory layout for store and controller tests.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use herald_history::HistoryLog;
use tempfile::TempDir;

/// A temp root holding `working/` and `history/`, removed on drop.
pub struct TestDirs {
    _root: TempDir,
    working: PathBuf,
    history: PathBuf,
}

impl TestDirs {
    /// Creates the temp root. The subdirectories are created lazily by the code under test.
    pub fn new() -> std::io::Result<Self> {
        let root = tempfile::tempdir()?;
        let working = root.path().join("working");
        let history = root.path().join("history");
        Ok(Self {
            _root: root,
            working,
            history,
        })
    }

    pub fn working(&self) -> &Path {
        &self.working
    }

    pub fn history(&self) -> &Path {
        &self.history
    }

    /// A history log rooted in `history/`.
    pub fn history_log(&self) -> Arc<HistoryLog> {
        Arc::new(HistoryLog::new(&self.history))
    }

    /// Names of files currently in `working/`, sorted.
    pub fn working_files(&self) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(&self.working)
            .map(|entries| {
                entries
                    .filter_map(|e| e.ok())
                    .map(|e| e.file_name().to_string_lossy().into_owned())
                    .collect()
            })
            .unwrap_or_default();
        names.sort();
        names
    }

    /// Raw contents of a file in `working/`.
    pub fn read_working(&self, name: &str) -> std::io::Result<String> {
        std::fs::read_to_string(self.working.join(name))
    }
}
