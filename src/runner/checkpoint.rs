//! Append-only checkpoint log shared by concurrently finishing episodes.
//!
//! Each completion reads the existing record list, appends one record, and
//! writes the whole list back, all under an exclusive file lock so
//! near-simultaneous writers cannot interleave partial writes. This is the
//! only shared mutable state between episodes.

use std::fs::OpenOptions;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use fs2::FileExt;

use crate::types::EpisodeResult;

#[derive(Debug, Clone)]
pub struct CheckpointLog {
    path: PathBuf,
}

impl CheckpointLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read-merge-write one record under an exclusive lock.
    pub fn append(&self, record: &EpisodeResult) -> Result<()> {
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&self.path)
            .with_context(|| format!("failed to open checkpoint {}", self.path.display()))?;
        file.lock_exclusive()
            .context("failed to lock checkpoint file")?;

        let result = (|| -> Result<()> {
            let mut text = String::new();
            file.read_to_string(&mut text)?;
            let mut records: Vec<EpisodeResult> = if text.trim().is_empty() {
                Vec::new()
            } else {
                serde_json::from_str(&text).context("checkpoint file is corrupted")?
            };
            records.push(record.clone());

            file.set_len(0)?;
            file.seek(SeekFrom::Start(0))?;
            serde_json::to_writer_pretty(&mut file, &records)?;
            file.flush()?;
            Ok(())
        })();

        let _ = FileExt::unlock(&file);
        result
    }

    /// Read every record currently in the log.
    pub fn read(&self) -> Result<Vec<EpisodeResult>> {
        let text = std::fs::read_to_string(&self.path)
            .with_context(|| format!("failed to read checkpoint {}", self.path.display()))?;
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }
        serde_json::from_str(&text).context("checkpoint file is corrupted")
    }
}
