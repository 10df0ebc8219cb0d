//! JSONL run log.

use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;

use ai_director::FrameReport;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectorEvent {
    pub timestamp: DateTime<Utc>,
    pub event_type: String,
    pub frame: Option<u64>,
    pub message: String,
    #[serde(default)]
    pub metadata: serde_json::Value,
}

/// Appends one JSON object per line.
pub struct EventEmitter {
    out: BufWriter<File>,
}

impl EventEmitter {
    pub fn create(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("opening event log {}", path.display()))?;
        Ok(Self {
            out: BufWriter::new(file),
        })
    }

    pub fn emit(&mut self, event: &DirectorEvent) -> Result<()> {
        let line = serde_json::to_string(event)?;
        writeln!(self.out, "{line}")?;
        Ok(())
    }

    pub fn emit_simple(
        &mut self,
        event_type: &str,
        frame: Option<u64>,
        message: impl Into<String>,
        metadata: serde_json::Value,
    ) -> Result<()> {
        self.emit(&DirectorEvent {
            timestamp: Utc::now(),
            event_type: event_type.to_string(),
            frame,
            message: message.into(),
            metadata,
        })
    }

    pub fn emit_frame(&mut self, report: &FrameReport) -> Result<()> {
        self.emit_simple(
            "frame",
            report.frame,
            format!("serviced {} agents", report.serviced.len()),
            serde_json::to_value(report)?,
        )
    }

    pub fn flush(&mut self) -> Result<()> {
        self.out.flush().context("flushing event log")
    }
}
