//! Scan progress reporting.
//!
//! Reports observable progress during `edda scan` so users see which
//! table is being profiled and how many remain. Progress is emitted on
//! **stderr** so stdout remains parseable for scripts.

use std::io::Write;

use edda_core::progress::{NoProgress, ScanProgressEvent, ScanProgressReporter};

/// Human-friendly progress on stderr: "scan 12  profiling  3 / 40  public.orders".
pub struct StderrProgress;

impl ScanProgressReporter for StderrProgress {
    fn report(&self, event: ScanProgressEvent) {
        let line = human_line(&event);
        let mut err = std::io::stderr().lock();
        let _ = err.write_all(line.as_bytes());
        let _ = err.flush();
    }
}

fn human_line(event: &ScanProgressEvent) -> String {
    match event {
        ScanProgressEvent::Extracting { scan_run_id } => {
            format!("scan {}  extracting schema...\n", scan_run_id)
        }
        ScanProgressEvent::Profiling {
            scan_run_id,
            table,
            n,
            total,
        } => format!(
            "scan {}  profiling  {} / {}  {}\n",
            scan_run_id,
            format_number(*n),
            format_number(*total),
            table
        ),
        ScanProgressEvent::Finished {
            scan_run_id,
            status,
        } => format!("scan {}  {}\n", scan_run_id, status),
    }
}

/// Machine-readable progress: one JSON object per line on stderr.
pub struct JsonProgress;

impl ScanProgressReporter for JsonProgress {
    fn report(&self, event: ScanProgressEvent) {
        let obj = json_event(&event);
        if let Ok(line) = serde_json::to_string(&obj) {
            let mut err = std::io::stderr().lock();
            let _ = writeln!(err, "{}", line);
            let _ = err.flush();
        }
    }
}

fn json_event(event: &ScanProgressEvent) -> serde_json::Value {
    match event {
        ScanProgressEvent::Extracting { scan_run_id } => serde_json::json!({
            "event": "progress",
            "scan_run_id": scan_run_id,
            "phase": "extracting"
        }),
        ScanProgressEvent::Profiling {
            scan_run_id,
            table,
            n,
            total,
        } => serde_json::json!({
            "event": "progress",
            "scan_run_id": scan_run_id,
            "phase": "profiling",
            "table": table,
            "n": n,
            "total": total
        }),
        ScanProgressEvent::Finished {
            scan_run_id,
            status,
        } => serde_json::json!({
            "event": "finished",
            "scan_run_id": scan_run_id,
            "status": status.as_str()
        }),
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
#[derive(Clone, Copy, Debug, Eq, PartialEq, clap::ValueEnum)]
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

    pub fn reporter(&self) -> Box<dyn ScanProgressReporter> {
        match self {
            ProgressMode::Off => Box::new(NoProgress),
            ProgressMode::Human => Box::new(StderrProgress),
            ProgressMode::Json => Box::new(JsonProgress),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use edda_core::models::ScanStatus;

    #[test]
    fn format_number_comma() {
        assert_eq!(format_number(0), "0");
        assert_eq!(format_number(999), "999");
        assert_eq!(format_number(1000), "1,000");
        assert_eq!(format_number(1234567), "1,234,567");
    }

    #[test]
    fn human_lines() {
        let line = human_line(&ScanProgressEvent::Profiling {
            scan_run_id: 3,
            table: "public.orders".into(),
            n: 2,
            total: 1500,
        });
        assert_eq!(line, "scan 3  profiling  2 / 1,500  public.orders\n");
        let done = human_line(&ScanProgressEvent::Finished {
            scan_run_id: 3,
            status: ScanStatus::Failed,
        });
        assert_eq!(done, "scan 3  failed\n");
    }

    #[test]
    fn json_events_carry_phase() {
        let v = json_event(&ScanProgressEvent::Extracting { scan_run_id: 9 });
        assert_eq!(v["phase"], "extracting");
        assert_eq!(v["scan_run_id"], 9);
        let v = json_event(&ScanProgressEvent::Finished {
            scan_run_id: 9,
            status: ScanStatus::Completed,
        });
        assert_eq!(v["event"], "finished");
        assert_eq!(v["status"], "completed");
    }
}
