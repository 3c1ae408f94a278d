//! Structured activity logging for outbound HTTP requests
//!
//! `reqlog` renders the lifecycle of outbound requests (started, finished
//! with a response, finished with an error) as log entries, without touching
//! the traffic it observes. Instrumentation is added once at the client
//! layer; every request flowing through it becomes observable.
//!
//! The pipeline: an event source publishes [`RequestEvent`]s, the
//! [`ActivityLogger`] correlates starts with finishes, applies the
//! [`RequestFilter`] and [`Level`] policy, renders entries through a
//! [`Formatter`], and hands them to a pluggable [`Sink`]. Logging is strictly
//! best-effort: no failure in the pipeline ever aborts or alters a request.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use reqlog::{
//!     ActivityLogger, Level, LoggerConfig, MemorySink, RequestDescriptor, RequestId,
//!     RequestResult, ResponseSnapshot,
//! };
//!
//! tokio_test::block_on(async {
//!     let logger = ActivityLogger::with_config(LoggerConfig::new().with_level(Level::Info));
//!     let sink = Arc::new(MemorySink::default());
//!     logger.set_output(sink.clone());
//!     logger.start_logging()?;
//!
//!     logger.on_request_started(
//!         RequestId(1),
//!         RequestDescriptor::new("GET", "https://api.example.com/users"),
//!     );
//!     logger.on_request_finished(
//!         RequestId(1),
//!         RequestResult::Response(ResponseSnapshot::new(200)),
//!     );
//!
//!     assert_eq!(sink.lines()[0], "→ GET https://api.example.com/users");
//!     logger.stop_logging();
//!     # Ok::<(), reqlog::ActivityLogError>(())
//! })
//! .unwrap();
//! ```

pub mod bus;
pub mod config;
pub mod error;
pub mod events;
pub mod filter;
pub mod format;
pub mod logger;
pub mod sink;

pub use bus::EventBus;
pub use config::LoggerConfig;
pub use error::{error_chain, ActivityLogError, FormatError, Result, SinkError};
pub use events::{
    Level, RequestDescriptor, RequestEvent, RequestId, RequestResult, ResponseOutcome,
    ResponseSnapshot,
};
pub use filter::{FilterField, FilterRule, MatchOp, RequestFilter};
pub use format::{EntryKind, Formatter, JsonFormatter, LogEntry, TextFormatter};
pub use logger::ActivityLogger;
pub use sink::{ConsoleSink, MemorySink, Sink, TracingSink};
