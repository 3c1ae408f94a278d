//! Entry rendering
//!
//! Formatters turn a (request, outcome, level) tuple into the lines of a
//! `LogEntry`. Formatting is pure: the same inputs always render the same
//! lines, so output can be snapshot-tested. Timestamps are attached by the
//! logger when the entry is built, not here.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::FormatError;
use crate::events::{Level, RequestDescriptor, RequestId, ResponseOutcome};

/// Default body truncation threshold in bytes
pub const DEFAULT_TRUNCATE_BODY_AT: usize = 1024;

/// What stage of a request an entry describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    /// Request was started
    Start,
    /// Request finished with a response or error
    Finish,
    /// Finish event arrived without a matching start
    UnmatchedFinish,
}

/// Rendered unit handed to the output sink
#[derive(Debug, Clone, Serialize)]
pub struct LogEntry {
    /// Level the entry was rendered at
    pub level: Level,
    /// When the entry was built
    pub timestamp: DateTime<Utc>,
    /// Stage of the request lifecycle
    pub kind: EntryKind,
    /// Rendered lines, in output order
    pub lines: Vec<String>,
}

impl LogEntry {
    /// Create an entry, stamping it with the current time
    pub fn new(level: Level, kind: EntryKind, lines: Vec<String>) -> Self {
        Self {
            level,
            timestamp: Utc::now(),
            kind,
            lines,
        }
    }
}

/// Renders lifecycle events into entry lines
pub trait Formatter: Send + Sync {
    /// Render a start event
    fn format_start(
        &self,
        request: &RequestDescriptor,
        level: Level,
    ) -> Result<Vec<String>, FormatError>;

    /// Render a finish event
    fn format_finish(
        &self,
        request: &RequestDescriptor,
        outcome: &ResponseOutcome,
        level: Level,
    ) -> Result<Vec<String>, FormatError>;

    /// Render the diagnostic for a finish with no matching start
    fn format_unmatched(&self, id: RequestId) -> Result<Vec<String>, FormatError> {
        Ok(vec![format!("⚠ unmatched finish (request {})", id)])
    }
}

/// Human-readable arrow-prefixed lines
///
/// `Info` renders one line per event; `Debug` appends indented header lines
/// and a body line, truncating the body at a configurable byte count.
#[derive(Debug, Clone)]
pub struct TextFormatter {
    truncate_body_at: usize,
}

impl TextFormatter {
    /// Create a formatter that truncates bodies at `truncate_body_at` bytes
    pub fn new(truncate_body_at: usize) -> Self {
        Self { truncate_body_at }
    }
}

impl Default for TextFormatter {
    fn default() -> Self {
        Self::new(DEFAULT_TRUNCATE_BODY_AT)
    }
}

impl Formatter for TextFormatter {
    fn format_start(
        &self,
        request: &RequestDescriptor,
        level: Level,
    ) -> Result<Vec<String>, FormatError> {
        if level < Level::Info {
            return Ok(Vec::new());
        }

        let mut lines = vec![format!("→ {} {}", request.method, request.url)];
        if level >= Level::Debug {
            push_headers(&mut lines, &request.headers);
            push_body(&mut lines, request.body.as_deref(), self.truncate_body_at);
        }
        Ok(lines)
    }

    fn format_finish(
        &self,
        request: &RequestDescriptor,
        outcome: &ResponseOutcome,
        level: Level,
    ) -> Result<Vec<String>, FormatError> {
        if level < Level::Info {
            return Ok(Vec::new());
        }

        match outcome {
            ResponseOutcome::Success {
                status,
                headers,
                body,
                elapsed,
            } => {
                let mut lines = vec![format!(
                    "← {} {} {} ({}ms)",
                    status,
                    request.method,
                    request.url,
                    elapsed.as_millis()
                )];
                if level >= Level::Debug {
                    push_headers(&mut lines, headers);
                    push_body(&mut lines, body.as_deref(), self.truncate_body_at);
                }
                Ok(lines)
            }
            ResponseOutcome::Failure { error, elapsed } => Ok(vec![format!(
                "✗ {} {} {} ({}ms)",
                error,
                request.method,
                request.url,
                elapsed.as_millis()
            )]),
        }
    }
}

/// One structured JSON record per event, rendered as a single line
///
/// Keys are emitted in sorted order, so identical inputs produce
/// byte-identical records.
#[derive(Debug, Clone)]
pub struct JsonFormatter {
    truncate_body_at: usize,
}

impl JsonFormatter {
    /// Create a formatter that truncates bodies at `truncate_body_at` bytes
    pub fn new(truncate_body_at: usize) -> Self {
        Self { truncate_body_at }
    }
}

impl Default for JsonFormatter {
    fn default() -> Self {
        Self::new(DEFAULT_TRUNCATE_BODY_AT)
    }
}

impl Formatter for JsonFormatter {
    fn format_start(
        &self,
        request: &RequestDescriptor,
        level: Level,
    ) -> Result<Vec<String>, FormatError> {
        if level < Level::Info {
            return Ok(Vec::new());
        }

        let mut record = serde_json::json!({
            "event": "start",
            "method": request.method,
            "url": request.url,
        });
        if level >= Level::Debug {
            attach_detail(
                &mut record,
                &request.headers,
                request.body.as_deref(),
                self.truncate_body_at,
            )?;
        }
        Ok(vec![serde_json::to_string(&record)?])
    }

    fn format_finish(
        &self,
        request: &RequestDescriptor,
        outcome: &ResponseOutcome,
        level: Level,
    ) -> Result<Vec<String>, FormatError> {
        if level < Level::Info {
            return Ok(Vec::new());
        }

        let mut record = match outcome {
            ResponseOutcome::Success {
                status, elapsed, ..
            } => serde_json::json!({
                "event": "finish",
                "method": request.method,
                "url": request.url,
                "status": status,
                "elapsed_ms": elapsed.as_millis() as u64,
            }),
            ResponseOutcome::Failure { error, elapsed } => serde_json::json!({
                "event": "finish",
                "method": request.method,
                "url": request.url,
                "error": error,
                "elapsed_ms": elapsed.as_millis() as u64,
            }),
        };

        if level >= Level::Debug {
            if let ResponseOutcome::Success { headers, body, .. } = outcome {
                attach_detail(&mut record, headers, body.as_deref(), self.truncate_body_at)?;
            }
        }
        Ok(vec![serde_json::to_string(&record)?])
    }

    fn format_unmatched(&self, id: RequestId) -> Result<Vec<String>, FormatError> {
        let record = serde_json::json!({
            "event": "unmatched_finish",
            "request_id": id.0,
        });
        Ok(vec![serde_json::to_string(&record)?])
    }
}

fn attach_detail(
    record: &mut serde_json::Value,
    headers: &[(String, String)],
    body: Option<&[u8]>,
    truncate_at: usize,
) -> Result<(), FormatError> {
    if let Some(map) = record.as_object_mut() {
        if !headers.is_empty() {
            map.insert("headers".to_string(), serde_json::to_value(headers)?);
        }
        if let Some(body) = body {
            if !body.is_empty() {
                map.insert(
                    "body".to_string(),
                    serde_json::Value::String(render_body(body, truncate_at)),
                );
            }
        }
    }
    Ok(())
}

fn push_headers(lines: &mut Vec<String>, headers: &[(String, String)]) {
    for (name, value) in headers {
        lines.push(format!("  {}: {}", name, value));
    }
}

fn push_body(lines: &mut Vec<String>, body: Option<&[u8]>, truncate_at: usize) {
    let body = match body {
        Some(body) if !body.is_empty() => body,
        _ => return,
    };
    lines.push(format!("  {}", render_body(body, truncate_at)));
}

/// Lossy-decode a body, truncating at a UTF-8 boundary at or below the limit
fn render_body(body: &[u8], truncate_at: usize) -> String {
    if body.len() <= truncate_at {
        return String::from_utf8_lossy(body).into_owned();
    }

    // Back up over continuation bytes so a multi-byte character is never split
    let mut cut = truncate_at;
    while cut > 0 && (body[cut] & 0b1100_0000) == 0b1000_0000 {
        cut -= 1;
    }
    let shown = String::from_utf8_lossy(&body[..cut]);
    format!("{}… (+{} bytes)", shown, body.len() - cut)
}
