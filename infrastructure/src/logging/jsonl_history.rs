//! JSONL file writer for completed exchanges.
//!
//! Each recorded [`Turn`] becomes one JSON line tagged with the user id,
//! appended via a buffered writer. The file is opened in append mode so a
//! transcript survives restarts.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use persona_application::{HistoryRecorder, RecorderError};
use persona_domain::{Speaker, Turn};
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, Serialize, Deserialize)]
struct HistoryLine {
    user_id: String,
    role: Speaker,
    content: String,
    timestamp: DateTime<Utc>,
}

/// JSONL history recorder that writes one JSON object per turn.
///
/// Thread-safe via `Mutex<BufWriter<File>>`. Flushes after every line and on
/// `Drop`.
pub struct JsonlHistoryRecorder {
    writer: Mutex<BufWriter<File>>,
    path: PathBuf,
}

impl JsonlHistoryRecorder {
    /// Open `path` for appending.
    ///
    /// Creates the file (and parent directories) if they don't exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, RecorderError> {
        let path = path.as_ref();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new().create(true).append(true).open(path)?;
        debug!(path = %path.display(), "Opened history log");

        Ok(Self {
            writer: Mutex::new(BufWriter::new(file)),
            path: path.to_path_buf(),
        })
    }

    /// Get the path to the log file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl HistoryRecorder for JsonlHistoryRecorder {
    fn record(&self, user_id: &str, turn: &Turn) -> Result<(), RecorderError> {
        let line = serde_json::to_string(&HistoryLine {
            user_id: user_id.to_string(),
            role: turn.speaker(),
            content: turn.text().to_string(),
            timestamp: turn.timestamp(),
        })?;

        let mut writer = self.writer.lock();
        writeln!(writer, "{}", line)?;
        // JSONL is append-only; flush each line so a crash loses at most one
        writer.flush()?;
        Ok(())
    }

    fn history(&self, user_id: &str) -> Result<Vec<Turn>, RecorderError> {
        self.writer.lock().flush()?;

        let reader = BufReader::new(File::open(&self.path)?);
        let mut turns = Vec::new();
        for (number, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<HistoryLine>(&line) {
                Ok(entry) if entry.user_id == user_id => {
                    turns.push(Turn::new(entry.role, entry.content, entry.timestamp));
                }
                Ok(_) => {}
                Err(e) => debug!(line = number + 1, "Skipping malformed history line: {}", e),
            }
        }
        Ok(turns)
    }
}

impl Drop for JsonlHistoryRecorder {
    fn drop(&mut self) {
        let _ = self.writer.lock().flush();
    }
}
