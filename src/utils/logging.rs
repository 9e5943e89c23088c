//! Transcript logging to a markdown file.
//!
//! This is a write-only export of the conversation, not session state: the
//! session never reads it back, and it survives only as a file on disk.

use std::fs::OpenOptions;
use std::io::{BufWriter, Write};

use chrono::Utc;

pub struct TranscriptLog {
    file_path: Option<String>,
    is_active: bool,
}

impl TranscriptLog {
    /// Logging is active from startup when a file path is provided.
    pub fn new(log_file: Option<String>) -> Result<Self, Box<dyn std::error::Error>> {
        let log = TranscriptLog {
            is_active: log_file.is_some(),
            file_path: log_file,
        };
        if let Some(path) = &log.file_path {
            log.test_file_access(path)?;
        }
        Ok(log)
    }

    pub fn is_active(&self) -> bool {
        self.is_active
    }

    /// Mark the start of a session in the log.
    pub fn log_session_start(&self) -> Result<(), Box<dyn std::error::Error>> {
        let stamp = Utc::now().format("%Y-%m-%d %H:%M:%S UTC");
        self.log_message(&format!("## Conversation started {stamp}"))
    }

    /// User turns carry the display name prefix.
    pub fn log_user_message(
        &self,
        display_name: &str,
        content: &str,
    ) -> Result<(), Box<dyn std::error::Error>> {
        self.log_message(&format!("{display_name}: {content}"))
    }

    /// Assistant turns are written verbatim, preserving their markdown.
    pub fn log_assistant_message(&self, content: &str) -> Result<(), Box<dyn std::error::Error>> {
        self.log_message(content)
    }

    fn log_message(&self, content: &str) -> Result<(), Box<dyn std::error::Error>> {
        if !self.is_active {
            return Ok(());
        }
        let Some(file_path) = self.file_path.as_ref() else {
            return Ok(());
        };

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(file_path)?;
        let mut writer = BufWriter::new(file);

        for line in content.lines() {
            writeln!(writer, "{line}")?;
        }
        // Blank line after each message for spacing, matching screen display.
        writeln!(writer)?;
        writer.flush()?;
        Ok(())
    }

    fn test_file_access(&self, path: &str) -> Result<(), Box<dyn std::error::Error>> {
        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        file.flush()?;
        Ok(())
    }
}
