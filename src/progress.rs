//! Extraction progress reporting.
//!
//! Reports observable progress during `ctxds extract` so users see which
//! task is being processed and how many are left. Progress is emitted on
//! **stderr** so stdout remains parseable for scripts.

use std::io::Write;

use clap::ValueEnum;

/// A single progress event for an extraction run.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ExtractProgressEvent {
    /// Listing tasks of the workspace. Total unknown.
    Discovering { workspace_id: String },
    /// Task `n` of `total` is being processed (1-based).
    Extracting { task_id: String, n: u64, total: u64 },
}

/// Reports extraction progress. Implementations write to stderr (human or JSON).
pub trait ExtractProgressReporter: Send + Sync {
    fn report(&self, event: ExtractProgressEvent);
}

/// Human-friendly progress on stderr: "extract ws-1  task 12 / 1,204  t-abc".
pub struct StderrProgress;

impl ExtractProgressReporter for StderrProgress {
    fn report(&self, event: ExtractProgressEvent) {
        let line = match &event {
            ExtractProgressEvent::Discovering { workspace_id } => {
                format!("extract {}  discovering...\n", workspace_id)
            }
            ExtractProgressEvent::Extracting { task_id, n, total } => format!(
                "extract  task {} / {}  {}\n",
                format_number(*n),
                format_number(*total),
                task_id
            ),
        };
        let _ = std::io::stderr().lock().write_all(line.as_bytes());
        let _ = std::io::stderr().lock().flush();
    }
}

/// Machine-readable progress: one JSON object per line on stderr.
pub struct JsonProgress;

impl ExtractProgressReporter for JsonProgress {
    fn report(&self, event: ExtractProgressEvent) {
        let obj = match &event {
            ExtractProgressEvent::Discovering { workspace_id } => serde_json::json!({
                "event": "progress",
                "workspace": workspace_id,
                "phase": "discovering"
            }),
            ExtractProgressEvent::Extracting { task_id, n, total } => serde_json::json!({
                "event": "progress",
                "phase": "extracting",
                "task": task_id,
                "n": n,
                "total": total
            }),
        };
        if let Ok(line) = serde_json::to_string(&obj) {
            let _ = writeln!(std::io::stderr().lock(), "{}", line);
            let _ = std::io::stderr().lock().flush();
        }
    }
}

/// No-op reporter when progress is disabled.
pub struct NoProgress;

impl ExtractProgressReporter for NoProgress {
    fn report(&self, _event: ExtractProgressEvent) {}
}

fn format_number(n: u64) -> String {
    let s = n.to_string();
    let mut result = String::with_capacity(s.len() + (s.len() - 1) / 3);
    let chars: Vec<char> = s.chars().rev().collect();
    for (i, c) in chars.iter().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(*c);
    }
    result.chars().rev().collect()
}

/// Progress mode for the CLI: off, human (stderr), or JSON (stderr).
#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
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

    pub fn reporter(&self) -> Box<dyn ExtractProgressReporter> {
        match self {
            ProgressMode::Off => Box::new(NoProgress),
            ProgressMode::Human => Box::new(StderrProgress),
            ProgressMode::Json => Box::new(JsonProgress),
        }
    }
}
