//! Build and export progress reporting.
//!
//! Reports which pipeline phase is running and, where the amount of work is
//! known, how far it has got. Progress is emitted on **stderr** so stdout
//! stays reserved for command summaries.

use anyhow::{bail, Result};
use std::io::Write;

/// Phase of the build or export pipeline.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Phase {
    /// Reading transcript XML or restored records.
    Reading,
    /// Normalising, tagging and filtering words.
    Processing,
    /// Pairwise fragment comparison.
    Comparing,
    /// Selecting related fragments for each dataset.
    Selecting,
    /// Writing reports.
    Writing,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Reading => "reading",
            Phase::Processing => "processing",
            Phase::Comparing => "comparing",
            Phase::Selecting => "selecting",
            Phase::Writing => "writing",
        }
    }
}

/// A single progress event.
#[derive(Clone, Debug)]
pub enum ProgressEvent {
    /// A phase has started; no count is available.
    Started { command: &'static str, phase: Phase },
    /// `n` of `total` items of a phase are done.
    Advanced {
        command: &'static str,
        phase: Phase,
        n: u64,
        total: u64,
        unit: &'static str,
    },
}

/// Reports pipeline progress. Implementations write to stderr.
pub trait ProgressReporter {
    fn report(&self, event: ProgressEvent);
}

/// Human-friendly progress on stderr: "build  reading  3 / 12 transcripts (25%)".
pub struct StderrProgress;

impl ProgressReporter for StderrProgress {
    fn report(&self, event: ProgressEvent) {
        let line = match &event {
            ProgressEvent::Started { command, phase } => {
                format!("{}  {}...\n", command, phase.as_str())
            }
            ProgressEvent::Advanced {
                command,
                phase,
                n,
                total,
                unit,
            } => format!(
                "{}  {}  {} / {} {} ({}%)\n",
                command,
                phase.as_str(),
                format_number(*n),
                format_number(*total),
                unit,
                percent(*n, *total)
            ),
        };
        let mut stderr = std::io::stderr().lock();
        let _ = stderr.write_all(line.as_bytes());
        let _ = stderr.flush();
    }
}

/// Machine-readable progress: one JSON object per line on stderr.
pub struct JsonProgress;

impl ProgressReporter for JsonProgress {
    fn report(&self, event: ProgressEvent) {
        let obj = match &event {
            ProgressEvent::Started { command, phase } => serde_json::json!({
                "event": "started",
                "command": command,
                "phase": phase.as_str()
            }),
            ProgressEvent::Advanced {
                command,
                phase,
                n,
                total,
                unit,
            } => serde_json::json!({
                "event": "advanced",
                "command": command,
                "phase": phase.as_str(),
                "n": n,
                "total": total,
                "unit": unit
            }),
        };
        if let Ok(line) = serde_json::to_string(&obj) {
            let mut stderr = std::io::stderr().lock();
            let _ = writeln!(stderr, "{}", line);
            let _ = stderr.flush();
        }
    }
}

/// No-op reporter when progress is disabled.
pub struct NoProgress;

impl ProgressReporter for NoProgress {
    fn report(&self, _event: ProgressEvent) {}
}

fn percent(n: u64, total: u64) -> u64 {
    if total == 0 {
        100
    } else {
        n.saturating_mul(100) / total
    }
}

fn format_number(n: u64) -> String {
    let s = n.to_string();
    let mut result = String::with_capacity(s.len() + s.len() / 3);
    for (i, c) in s.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(c);
    }
    result.chars().rev().collect()
}

/// Progress mode for the CLI: off, human (stderr), or JSON (stderr).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ProgressMode {
    Off,
    Human,
    Json,
}

impl ProgressMode {
    /// Default: human progress when stderr is a TTY, otherwise off.
    pub fn default_for_tty() -> Self {
        if atty::is(atty::Stream::Stderr) {
            ProgressMode::Human
        } else {
            ProgressMode::Off
        }
    }

    /// Resolve a configured mode name, `auto` deferring to the terminal.
    pub fn from_setting(setting: &str) -> Result<Self> {
        Ok(match setting {
            "auto" => Self::default_for_tty(),
            "human" => ProgressMode::Human,
            "json" => ProgressMode::Json,
            "off" => ProgressMode::Off,
            other => bail!(
                "Unknown progress mode: '{}'. Must be auto, human, json, or off.",
                other
            ),
        })
    }

    pub fn reporter(&self) -> Box<dyn ProgressReporter> {
        match self {
            ProgressMode::Off => Box::new(NoProgress),
            ProgressMode::Human => Box::new(StderrProgress),
            ProgressMode::Json => Box::new(JsonProgress),
        }
    }
}
