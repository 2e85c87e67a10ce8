//! Append-only CSV record of finished sessions.

use chrono::Local;
use serde::Serialize;
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};

use crate::app_dirs::AppDirs;
use crate::error::Result;
use crate::ledger::SessionSummary;

#[derive(Debug, Serialize)]
struct ResultRow<'a> {
    date: &'a str,
    target_valid_rounds: u32,
    player_wins: u32,
    computer_wins: u32,
    draws: u32,
    mean_reaction_secs: String,
}

#[derive(Debug, Clone)]
pub struct ResultsLog {
    path: PathBuf,
}

impl ResultsLog {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Log under the platform state dir, if one can be resolved.
    pub fn default_location() -> Option<Self> {
        AppDirs::results_path().map(Self::new)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&self, summary: &SessionSummary, target_valid_rounds: u32) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        // header only when starting a new file
        let needs_header = !self.path.exists();

        let file = OpenOptions::new()
            .append(true)
            .create(true)
            .open(&self.path)?;
        let mut writer = csv::WriterBuilder::new()
            .has_headers(needs_header)
            .from_writer(file);

        let date = Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
        writer.serialize(ResultRow {
            date: &date,
            target_valid_rounds,
            player_wins: summary.player_wins,
            computer_wins: summary.computer_wins,
            draws: summary.draws,
            mean_reaction_secs: format!("{:.2}", summary.mean_reaction_secs),
        })?;
        writer.flush()?;
        Ok(())
    }
}
