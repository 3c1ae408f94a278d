//! Request lifecycle events and the verbosity level

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Verbosity tiers, ordered by increasing detail
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    /// Render nothing (lifecycle bookkeeping still runs)
    Off,
    /// One line per start and one per finish
    Info,
    /// Info content plus headers and a truncated body
    Debug,
}

impl Level {
    /// Parse a level from its lowercase or uppercase name
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "off" => Some(Level::Off),
            "info" => Some(Level::Info),
            "debug" => Some(Level::Debug),
            _ => None,
        }
    }

    /// Level name as a static string
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Off => "off",
            Level::Info => "info",
            Level::Debug => "debug",
        }
    }
}

/// Correlation key for a single network operation, supplied by the event source
///
/// Any stable, equality-comparable handle works; sources typically allocate
/// from an atomic counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RequestId(pub u64);

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Immutable snapshot of an outbound request, taken when it starts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestDescriptor {
    /// HTTP method, e.g. `GET`
    pub method: String,
    /// Full request URL
    pub url: String,
    /// Header name/value pairs in wire order
    pub headers: Vec<(String, String)>,
    /// Request body bytes, when the source had them materialized
    pub body: Option<Vec<u8>>,
}

impl RequestDescriptor {
    /// Create a descriptor with just a method and URL
    pub fn new(method: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            url: url.into(),
            headers: Vec::new(),
            body: None,
        }
    }

    /// Replace the header list
    pub fn with_headers(mut self, headers: Vec<(String, String)>) -> Self {
        self.headers = headers;
        self
    }

    /// Append a single header
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Attach the request body bytes
    pub fn with_body(mut self, body: Vec<u8>) -> Self {
        self.body = Some(body);
        self
    }

    /// Host component of the URL, if the URL parses
    pub fn host(&self) -> Option<String> {
        url::Url::parse(&self.url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_string))
    }
}

/// Immutable snapshot of a response, as carried by a finish event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseSnapshot {
    /// HTTP status code
    pub status: u16,
    /// Header name/value pairs in wire order
    pub headers: Vec<(String, String)>,
    /// Response body bytes, when the source had them materialized
    pub body: Option<Vec<u8>>,
}

impl ResponseSnapshot {
    /// Create a snapshot with just a status code
    pub fn new(status: u16) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: None,
        }
    }

    /// Replace the header list
    pub fn with_headers(mut self, headers: Vec<(String, String)>) -> Self {
        self.headers = headers;
        self
    }

    /// Append a single header pair
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Attach the response body bytes
    pub fn with_body(mut self, body: Vec<u8>) -> Self {
        self.body = Some(body);
        self
    }
}

/// Payload of a finish event: the response, or a transport-level error
#[derive(Debug, Clone)]
pub enum RequestResult {
    /// The request produced a response (any status code)
    Response(ResponseSnapshot),
    /// The request failed before producing a response
    Error(String),
}

/// Final pairing of a request with its result and measured duration
///
/// Built by the logger from the finish payload plus the elapsed time since
/// the matching start event.
#[derive(Debug, Clone)]
pub enum ResponseOutcome {
    /// The request completed with a response
    Success {
        status: u16,
        headers: Vec<(String, String)>,
        body: Option<Vec<u8>>,
        elapsed: Duration,
    },
    /// The request failed in transit
    Failure { error: String, elapsed: Duration },
}

impl ResponseOutcome {
    /// Combine a finish payload with the measured elapsed time
    pub fn from_result(result: RequestResult, elapsed: Duration) -> Self {
        match result {
            RequestResult::Response(snapshot) => ResponseOutcome::Success {
                status: snapshot.status,
                headers: snapshot.headers,
                body: snapshot.body,
                elapsed,
            },
            RequestResult::Error(error) => ResponseOutcome::Failure { error, elapsed },
        }
    }

    /// Time between the start and finish events
    pub fn elapsed(&self) -> Duration {
        match self {
            ResponseOutcome::Success { elapsed, .. } => *elapsed,
            ResponseOutcome::Failure { elapsed, .. } => *elapsed,
        }
    }

    /// Whether the request produced a response
    pub fn is_success(&self) -> bool {
        matches!(self, ResponseOutcome::Success { .. })
    }
}

/// Lifecycle event published by an event source
#[derive(Debug, Clone)]
pub enum RequestEvent {
    /// A request was handed to the transport
    Started {
        id: RequestId,
        request: RequestDescriptor,
    },
    /// A request finished, successfully or not
    Finished { id: RequestId, result: RequestResult },
}

impl RequestEvent {
    /// Correlation key of the request this event belongs to
    pub fn id(&self) -> RequestId {
        match self {
            RequestEvent::Started { id, .. } => *id,
            RequestEvent::Finished { id, .. } => *id,
        }
    }
}
