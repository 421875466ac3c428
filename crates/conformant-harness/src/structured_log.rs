//! Structured JSONL run log.
//!
//! Provides:
//! - [`LogEntry`]: canonical JSONL record with required + optional fields.
//! - [`LogEmitter`]: writes JSONL lines to a file or any writer, and doubles
//!   as a [`ProgressSink`] so every completed case becomes one line.
//! - [`validate_log_line`]: checks one record against the contract.
//! - [`validate_run_log`] / [`validate_log_file`]: check a whole run (one run
//!   id, increasing sequence numbers, summary last).

use std::io::Write;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::executor::ProgressSink;
use crate::result::{CaseResult, Suite};

// ---------------------------------------------------------------------------
// Log entry
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

/// Case outcome as recorded in the log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Pass,
    Fail,
    /// The validator errored or panicked.
    Error,
}

impl Outcome {
    #[must_use]
    pub fn of(result: &CaseResult) -> Self {
        match (result.passed, &result.error) {
            (true, _) => Self::Pass,
            (false, Some(_)) => Self::Error,
            (false, None) => Self::Fail,
        }
    }
}

/// Canonical structured log entry.
///
/// Required fields: `timestamp`, `trace_id`, `level`, `event`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    // Required
    pub timestamp: String,
    pub trace_id: String,
    pub level: LogLevel,
    pub event: String,

    // Optional
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub case_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<Outcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ns: Option<u64>,
    /// Wall-clock duration for a whole run (milliseconds).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl LogEntry {
    /// Create a new log entry with required fields only.
    #[must_use]
    pub fn new(trace_id: impl Into<String>, level: LogLevel, event: impl Into<String>) -> Self {
        Self {
            timestamp: now_utc(),
            trace_id: trace_id.into(),
            level,
            event: event.into(),
            source: None,
            case_id: None,
            file: None,
            outcome: None,
            latency_ns: None,
            duration_ms: None,
            error: None,
            details: None,
        }
    }

    /// Entry describing one executed case.
    #[must_use]
    pub fn for_case(result: &CaseResult) -> Self {
        let outcome = Outcome::of(result);
        let level = match outcome {
            Outcome::Pass => LogLevel::Info,
            Outcome::Fail => LogLevel::Warn,
            Outcome::Error => LogLevel::Error,
        };
        let mut entry = Self::new("", level, "case_result")
            .with_case(&result.id, result.file.display().to_string())
            .with_outcome(outcome)
            .with_latency_ns(u64::try_from(result.duration.as_nanos()).unwrap_or(u64::MAX));
        entry.error = result.error.clone().or_else(|| result.message.clone());
        entry
    }

    #[must_use]
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    #[must_use]
    pub fn with_case(mut self, case_id: impl Into<String>, file: impl Into<String>) -> Self {
        self.case_id = Some(case_id.into());
        self.file = Some(file.into());
        self
    }

    #[must_use]
    pub fn with_outcome(mut self, outcome: Outcome) -> Self {
        self.outcome = Some(outcome);
        self
    }

    #[must_use]
    pub fn with_latency_ns(mut self, ns: u64) -> Self {
        self.latency_ns = Some(ns);
        self
    }

    #[must_use]
    pub fn with_duration_ms(mut self, ms: u64) -> Self {
        self.duration_ms = Some(ms);
        self
    }

    #[must_use]
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Serialize to a single JSONL line (no trailing newline).
    pub fn to_jsonl(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

// ---------------------------------------------------------------------------
// Log emitter
// ---------------------------------------------------------------------------

/// Writes structured JSONL log entries.
pub struct LogEmitter {
    writer: Box<dyn Write + Send>,
    seq: u64,
    run_id: String,
}

impl LogEmitter {
    /// Create an emitter that writes to a file.
    pub fn to_file(path: &Path, run_id: &str) -> std::io::Result<Self> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        let file = std::fs::File::create(path)?;
        Ok(Self::to_writer(std::io::BufWriter::new(file), run_id))
    }

    #[must_use]
    pub fn to_writer(writer: impl Write + Send + 'static, run_id: &str) -> Self {
        Self {
            writer: Box::new(writer),
            seq: 0,
            run_id: run_id.to_string(),
        }
    }

    fn next_trace_id(&mut self) -> String {
        self.seq += 1;
        format!("{}::{:03}", self.run_id, self.seq)
    }

    /// Emit a bare event with an auto-generated trace_id.
    pub fn emit(&mut self, level: LogLevel, event: &str) -> std::io::Result<LogEntry> {
        let trace_id = self.next_trace_id();
        let entry = LogEntry::new(&trace_id, level, event);
        let line = serde_json::to_string(&entry).map_err(std::io::Error::other)?;
        writeln!(self.writer, "{line}")?;
        Ok(entry)
    }

    /// Emit a fully-populated log entry, assigning a trace_id if it has none.
    pub fn emit_entry(&mut self, mut entry: LogEntry) -> std::io::Result<()> {
        if entry.trace_id.is_empty() {
            entry.trace_id = self.next_trace_id();
        }
        let line = serde_json::to_string(&entry).map_err(std::io::Error::other)?;
        writeln!(self.writer, "{line}")
    }

    /// Emit the closing `suite_summary` record for a run.
    pub fn emit_summary(&mut self, suite: &Suite) -> std::io::Result<()> {
        let level = if suite.all_passed() {
            LogLevel::Info
        } else {
            LogLevel::Warn
        };
        let entry = LogEntry::new("", level, "suite_summary")
            .with_source(&suite.name)
            .with_duration_ms(u64::try_from(suite.duration.as_millis()).unwrap_or(u64::MAX))
            .with_details(serde_json::json!({
                "total": suite.total_tests(),
                "passed": suite.passed_tests(),
                "failed": suite.failed_tests(),
                "pass_rate": suite.pass_rate(),
            }));
        self.emit_entry(entry)
    }

    pub fn flush(&mut self) -> std::io::Result<()> {
        self.writer.flush()
    }
}

impl ProgressSink for LogEmitter {
    fn advance(&mut self, result: &CaseResult) {
        if let Err(err) = self.emit_entry(LogEntry::for_case(result)) {
            tracing::warn!(case = %result.id, error = %err, "failed to write run log entry");
        }
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Validation error for a log line.
#[derive(Debug)]
pub struct LogValidationError {
    pub line_number: usize,
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for LogValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "line {}: field '{}': {}",
            self.line_number, self.field, self.message
        )
    }
}

/// Validate a single JSONL line against the contract.
pub fn validate_log_line(
    line: &str,
    line_number: usize,
) -> Result<LogEntry, Vec<LogValidationError>> {
    let mut errors = Vec::new();
    let mut fail = |field: &str, message: String| {
        errors.push(LogValidationError {
            line_number,
            field: field.to_string(),
            message,
        });
    };

    let value: serde_json::Value = match serde_json::from_str(line) {
        Ok(v) => v,
        Err(e) => {
            fail("<json>", format!("invalid JSON: {e}"));
            return Err(errors);
        }
    };

    let Some(obj) = value.as_object() else {
        fail("<root>", "expected JSON object".to_string());
        return Err(errors);
    };

    for field in ["timestamp", "trace_id", "level", "event"] {
        if !obj.contains_key(field) {
            fail(field, "required field missing".to_string());
        }
    }

    if let Some(level) = obj.get("level").and_then(|v| v.as_str())
        && !["trace", "debug", "info", "warn", "error"].contains(&level)
    {
        fail("level", format!("invalid level: '{level}'"));
    }

    if let Some(outcome) = obj.get("outcome").and_then(|v| v.as_str())
        && !["pass", "fail", "error"].contains(&outcome)
    {
        fail("outcome", format!("invalid outcome: '{outcome}'"));
    }

    if obj.get("event").and_then(|v| v.as_str()) == Some("case_result")
        && !obj.get("case_id").is_some_and(serde_json::Value::is_string)
    {
        fail("case_id", "case_result events must carry case_id".to_string());
    }

    if let Some(trace_id) = obj.get("trace_id").and_then(|v| v.as_str())
        && !trace_id.contains("::")
    {
        fail(
            "trace_id",
            format!("trace_id should follow <run_id>::<seq> format, got: '{trace_id}'"),
        );
    }

    if !errors.is_empty() {
        return Err(errors);
    }

    serde_json::from_value::<LogEntry>(value).map_err(|e| {
        vec![LogValidationError {
            line_number,
            field: "<deserialization>".to_string(),
            message: format!("failed to deserialize: {e}"),
        }]
    })
}

/// Summary of a whole run log.
#[derive(Debug, Default)]
pub struct RunLogReport {
    /// Non-empty lines seen.
    pub lines: usize,
    /// `case_result` records that passed line validation.
    pub case_results: usize,
    /// Whether the log ends with a `suite_summary` record.
    pub summarized: bool,
    pub errors: Vec<LogValidationError>,
}

impl RunLogReport {
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Validate a run log held in memory.
///
/// On top of per-line checks, a run log must use one run id with strictly
/// increasing sequence numbers, and `suite_summary` may only be the last record.
#[must_use]
pub fn validate_run_log(content: &str) -> RunLogReport {
    let mut report = RunLogReport::default();
    let mut previous: Option<(String, u64)> = None;
    let mut summary_line: Option<usize> = None;

    for (i, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let line_number = i + 1;
        report.lines += 1;

        let entry = match validate_log_line(line, line_number) {
            Ok(entry) => entry,
            Err(errs) => {
                report.errors.extend(errs);
                continue;
            }
        };

        if let Some(earlier) = summary_line {
            report.errors.push(LogValidationError {
                line_number,
                field: "event".to_string(),
                message: format!("record follows the suite_summary on line {earlier}"),
            });
        }
        match entry.event.as_str() {
            "case_result" => report.case_results += 1,
            "suite_summary" => summary_line = Some(line_number),
            _ => {}
        }

        if let Some((run, seq)) = split_trace_id(&entry.trace_id) {
            if let Some((prev_run, prev_seq)) = &previous
                && (run != prev_run.as_str() || seq <= *prev_seq)
            {
                report.errors.push(LogValidationError {
                    line_number,
                    field: "trace_id".to_string(),
                    message: format!(
                        "expected {prev_run}::<seq > {prev_seq}>, got '{}'",
                        entry.trace_id
                    ),
                });
            }
            previous = Some((run.to_string(), seq));
        }
    }

    report.summarized = summary_line.is_some();
    report
}

/// Validate a run log file; see [`validate_run_log`].
pub fn validate_log_file(path: &Path) -> std::io::Result<RunLogReport> {
    Ok(validate_run_log(&std::fs::read_to_string(path)?))
}

fn split_trace_id(trace_id: &str) -> Option<(&str, u64)> {
    let (run, seq) = trace_id.rsplit_once("::")?;
    Some((run, seq.parse().ok()?))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// RFC 3339 UTC timestamp with millisecond precision.
fn now_utc() -> String {
    let duration = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default();
    let secs = duration.as_secs();
    let (year, month, day) = civil_from_days(secs / 86_400);
    format!(
        "{year:04}-{month:02}-{day:02}T{:02}:{:02}:{:02}.{:03}Z",
        (secs % 86_400) / 3_600,
        (secs % 3_600) / 60,
        secs % 60,
        duration.subsec_millis(),
    )
}

/// Days since 1970-01-01 to a proleptic Gregorian date.
fn civil_from_days(days: u64) -> (u64, u64, u64) {
    let z = days + 719_468;
    let era = z / 146_097;
    let doe = z % 146_097;
    let yoe = (doe - doe / 1_460 + doe / 36_524 - doe / 146_096) / 365;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let day = doy - (153 * mp + 2) / 5 + 1;
    let month = if mp < 10 { mp + 3 } else { mp - 9 };
    let year = yoe + era * 400 + u64::from(month <= 2);
    (year, month, day)
}
