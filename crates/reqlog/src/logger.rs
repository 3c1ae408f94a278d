//! Activity logger orchestration
//!
//! `ActivityLogger` is the coordination point of the pipeline: it subscribes
//! to the event bus, correlates start and finish events through a pending
//! table, applies the filter and level policy, invokes the formatter, and
//! hands entries to the output sink.
//!
//! All shared state sits behind a single mutex. Rendering and sink writes
//! happen after the lock is released, so slow sinks never block unrelated
//! event processing. No failure in this pipeline ever propagates back to the
//! code performing the network request.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use once_cell::sync::Lazy;
use parking_lot::Mutex;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::bus::EventBus;
use crate::config::LoggerConfig;
use crate::error::{ActivityLogError, FormatError, Result};
use crate::events::{
    Level, RequestDescriptor, RequestEvent, RequestId, RequestResult, ResponseOutcome,
};
use crate::filter::RequestFilter;
use crate::format::{EntryKind, Formatter, JsonFormatter, LogEntry, TextFormatter};
use crate::sink::{ConsoleSink, Sink};

static SHARED: Lazy<ActivityLogger> = Lazy::new(ActivityLogger::new);

/// In-flight bookkeeping entry correlating a start event to its finish
struct PendingRequest {
    request: RequestDescriptor,
    started: Instant,
    /// Suppression is decided once at start time and applies to the finish,
    /// even if the filter is replaced while the request is in flight
    suppressed: bool,
}

struct LoggerState {
    enabled: bool,
    level: Level,
    filter: Option<RequestFilter>,
    formatter: Arc<dyn Formatter>,
    sink: Arc<dyn Sink>,
    report_sink_failures: bool,
    pending: HashMap<RequestId, PendingRequest>,
    pump: Option<JoinHandle<()>>,
}

impl LoggerState {
    fn render_context(&self) -> RenderContext {
        RenderContext {
            formatter: Arc::clone(&self.formatter),
            sink: Arc::clone(&self.sink),
            level: self.level,
            report_sink_failures: self.report_sink_failures,
        }
    }
}

/// Snapshot of the state needed to render and dispatch outside the lock
struct RenderContext {
    formatter: Arc<dyn Formatter>,
    sink: Arc<dyn Sink>,
    level: Level,
    report_sink_failures: bool,
}

enum FinishWork {
    Finish(RequestDescriptor, ResponseOutcome),
    Unmatched(RequestId),
}

/// Orchestrates the event-to-log-entry pipeline
///
/// Cloning is cheap and clones share state, so a logger can be handed to
/// multiple tasks. Event sources either publish to [`ActivityLogger::bus`]
/// (delivered by the pump task spawned in [`ActivityLogger::start_logging`])
/// or call [`ActivityLogger::on_request_started`] /
/// [`ActivityLogger::on_request_finished`] directly.
#[derive(Clone)]
pub struct ActivityLogger {
    bus: EventBus,
    state: Arc<Mutex<LoggerState>>,
}

impl ActivityLogger {
    /// Create a logger with the default configuration, writing to the console
    pub fn new() -> Self {
        Self::with_config(LoggerConfig::default())
    }

    /// Create a logger from a configuration
    pub fn with_config(config: LoggerConfig) -> Self {
        let formatter: Arc<dyn Formatter> = if config.json_format {
            Arc::new(JsonFormatter::new(config.truncate_body_at))
        } else {
            Arc::new(TextFormatter::new(config.truncate_body_at))
        };

        let state = LoggerState {
            enabled: false,
            level: config.level,
            filter: config.filter(),
            formatter,
            sink: Arc::new(ConsoleSink::new()),
            report_sink_failures: config.report_sink_failures,
            pending: HashMap::new(),
            pump: None,
        };

        Self {
            bus: EventBus::new(),
            state: Arc::new(Mutex::new(state)),
        }
    }

    /// Process-wide shared instance, created on first access
    ///
    /// Explicit construction and injection is the primary API; this exists
    /// for applications that want one logger without plumbing it through.
    pub fn shared() -> &'static ActivityLogger {
        &SHARED
    }

    /// Bus this logger listens on; hand clones to event sources
    pub fn bus(&self) -> EventBus {
        self.bus.clone()
    }

    /// Begin reacting to events
    ///
    /// Spawns the pump task that drains the bus, so a tokio runtime must be
    /// running. Idempotent: calling while already active is a no-op and never
    /// creates a second subscription.
    pub fn start_logging(&self) -> Result<()> {
        tokio::runtime::Handle::try_current()
            .map_err(|error| ActivityLogError::Runtime(error.to_string()))?;

        let mut state = self.state.lock();
        if state.enabled {
            return Ok(());
        }

        let mut receiver = self.bus.subscribe();
        let logger = self.clone();
        let pump = tokio::spawn(async move {
            loop {
                match receiver.recv().await {
                    Ok(event) => logger.handle_event(event),
                    Err(RecvError::Lagged(skipped)) => {
                        warn!("activity event stream lagged, {} events dropped", skipped);
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        });

        state.enabled = true;
        state.pump = Some(pump);
        debug!("activity logging started");
        Ok(())
    }

    /// Stop reacting to events
    ///
    /// Aborts the pump task and discards all in-flight bookkeeping, so a
    /// finish arriving after a later restart is reported as unmatched.
    /// Idempotent. Does not cancel the network operations being observed.
    pub fn stop_logging(&self) {
        let mut state = self.state.lock();
        if let Some(pump) = state.pump.take() {
            pump.abort();
        }
        state.pending.clear();
        if state.enabled {
            state.enabled = false;
            debug!("activity logging stopped");
        }
    }

    /// Whether the logger is currently reacting to events
    pub fn is_logging(&self) -> bool {
        self.state.lock().enabled
    }

    /// Replace the output sink; takes effect for the next event
    pub fn set_output(&self, sink: Arc<dyn Sink>) {
        self.state.lock().sink = sink;
    }

    /// Replace the suppression filter; takes effect for the next start event
    pub fn set_filter(&self, filter: RequestFilter) {
        self.state.lock().filter = Some(filter);
    }

    /// Remove the suppression filter
    pub fn clear_filter(&self) {
        self.state.lock().filter = None;
    }

    /// Replace the verbosity level; takes effect for the next event
    pub fn set_level(&self, level: Level) {
        self.state.lock().level = level;
    }

    /// Current verbosity level
    pub fn level(&self) -> Level {
        self.state.lock().level
    }

    /// Replace the formatter; takes effect for the next event
    pub fn set_formatter(&self, formatter: Arc<dyn Formatter>) {
        self.state.lock().formatter = formatter;
    }

    /// Number of requests currently awaiting their finish event
    pub fn pending_count(&self) -> usize {
        self.state.lock().pending.len()
    }

    /// Deliver one event; sources may call this instead of using the bus
    pub fn handle_event(&self, event: RequestEvent) {
        match event {
            RequestEvent::Started { id, request } => self.on_request_started(id, request),
            RequestEvent::Finished { id, result } => self.on_request_finished(id, result),
        }
    }

    /// Handle a request-started event
    ///
    /// Bookkeeping runs at every level, including `Off`, so raising the level
    /// mid-flight still yields a well-formed finish entry.
    pub fn on_request_started(&self, id: RequestId, request: RequestDescriptor) {
        let context = {
            let mut state = self.state.lock();
            if !state.enabled {
                return;
            }

            let suppressed = state
                .filter
                .as_ref()
                .map(|filter| filter.suppresses(&request))
                .unwrap_or(false);
            state.pending.insert(
                id,
                PendingRequest {
                    request: request.clone(),
                    started: Instant::now(),
                    suppressed,
                },
            );

            if suppressed || state.level < Level::Info {
                return;
            }
            state.render_context()
        };

        let lines = context
            .formatter
            .format_start(&request, context.level)
            .unwrap_or_else(|error| degraded_lines(&error));
        dispatch(context, EntryKind::Start, lines);
    }

    /// Handle a request-finished event
    ///
    /// A finish with no matching start produces a single diagnostic entry
    /// instead of failing.
    pub fn on_request_finished(&self, id: RequestId, result: RequestResult) {
        let (context, work) = {
            let mut state = self.state.lock();
            if !state.enabled {
                return;
            }

            match state.pending.remove(&id) {
                Some(pending) if pending.suppressed => return,
                Some(pending) => {
                    if state.level < Level::Info {
                        return;
                    }
                    let outcome =
                        ResponseOutcome::from_result(result, pending.started.elapsed());
                    (
                        state.render_context(),
                        FinishWork::Finish(pending.request, outcome),
                    )
                }
                None => {
                    if state.level < Level::Info {
                        return;
                    }
                    debug!("finish event without matching start for request {}", id);
                    (state.render_context(), FinishWork::Unmatched(id))
                }
            }
        };

        match work {
            FinishWork::Finish(request, outcome) => {
                let lines = context
                    .formatter
                    .format_finish(&request, &outcome, context.level)
                    .unwrap_or_else(|error| degraded_lines(&error));
                dispatch(context, EntryKind::Finish, lines);
            }
            FinishWork::Unmatched(id) => {
                let lines = context
                    .formatter
                    .format_unmatched(id)
                    .unwrap_or_else(|error| degraded_lines(&error));
                dispatch(context, EntryKind::UnmatchedFinish, lines);
            }
        }
    }
}

impl Default for ActivityLogger {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ActivityLogger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("ActivityLogger")
            .field("enabled", &state.enabled)
            .field("level", &state.level)
            .field("pending", &state.pending.len())
            .finish()
    }
}

/// Build the entry and write it, swallowing sink failures
fn dispatch(context: RenderContext, kind: EntryKind, lines: Vec<String>) {
    if lines.is_empty() {
        return;
    }
    let entry = LogEntry::new(context.level, kind, lines);
    if let Err(error) = context.sink.write(&entry) {
        if context.report_sink_failures {
            warn!("activity log sink write failed: {}", error);
        }
    }
}

/// Minimal entry used when the formatter itself fails
fn degraded_lines(error: &FormatError) -> Vec<String> {
    vec![format!("failed to format: {}", error)]
}
