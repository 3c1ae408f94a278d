//! Request suppression filters
//!
//! A filter decides, once per request at start time, whether that request is
//! omitted from the activity log. The decision is sticky: the matching finish
//! event is suppressed as well, even if the filter is replaced mid-flight.
//!
//! Two forms are supported: an arbitrary typed predicate, and a declarative
//! rule list that can be loaded from configuration. All matching is
//! case-insensitive.

use std::fmt;
use std::sync::Arc;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::events::RequestDescriptor;

/// Predicate over request descriptors; a match suppresses the request
#[derive(Clone)]
pub struct RequestFilter {
    inner: FilterKind,
}

#[derive(Clone)]
enum FilterKind {
    Predicate(Arc<dyn Fn(&RequestDescriptor) -> bool + Send + Sync>),
    Rules(Vec<FilterRule>),
}

impl RequestFilter {
    /// Suppress requests for which the closure returns true
    pub fn predicate<F>(predicate: F) -> Self
    where
        F: Fn(&RequestDescriptor) -> bool + Send + Sync + 'static,
    {
        Self {
            inner: FilterKind::Predicate(Arc::new(predicate)),
        }
    }

    /// Suppress requests matching any of the given rules
    pub fn rules(rules: Vec<FilterRule>) -> Self {
        Self {
            inner: FilterKind::Rules(rules),
        }
    }

    /// Whether this filter suppresses the given request
    pub fn suppresses(&self, request: &RequestDescriptor) -> bool {
        match &self.inner {
            FilterKind::Predicate(predicate) => predicate(request),
            FilterKind::Rules(rules) => rules.iter().any(|rule| rule.matches(request)),
        }
    }
}

impl fmt::Debug for RequestFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.inner {
            FilterKind::Predicate(_) => f.write_str("RequestFilter::Predicate"),
            FilterKind::Rules(rules) => write!(f, "RequestFilter::Rules({} rules)", rules.len()),
        }
    }
}

/// Request field a rule inspects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterField {
    /// HTTP method
    Method,
    /// Host component of the URL
    Host,
    /// Full URL string
    Url,
}

/// How a rule's value is compared against the field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchOp {
    /// Exact match
    Equals,
    /// Substring match
    Contains,
    /// `*`-wildcard pattern match
    Wildcard,
}

/// One declarative suppression rule: (field, operator, value)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterRule {
    /// Field to inspect
    pub field: FilterField,
    /// Comparison operator
    pub op: MatchOp,
    /// Value or pattern to compare against
    pub value: String,
}

impl FilterRule {
    /// Create a rule
    pub fn new(field: FilterField, op: MatchOp, value: impl Into<String>) -> Self {
        Self {
            field,
            op,
            value: value.into(),
        }
    }

    /// Whether this rule matches the given request
    pub fn matches(&self, request: &RequestDescriptor) -> bool {
        let target = match self.field {
            FilterField::Method => Some(request.method.clone()),
            FilterField::Host => request.host(),
            FilterField::Url => Some(request.url.clone()),
        };

        let target = match target {
            Some(target) => target,
            None => return false,
        };

        match self.op {
            MatchOp::Equals => target.eq_ignore_ascii_case(&self.value),
            MatchOp::Contains => target
                .to_ascii_lowercase()
                .contains(&self.value.to_ascii_lowercase()),
            MatchOp::Wildcard => wildcard_match(&target, &self.value),
        }
    }
}

/// Case-insensitive `*`-wildcard matching; literal segments are escaped
fn wildcard_match(text: &str, pattern: &str) -> bool {
    if pattern.contains('*') {
        let escaped: Vec<String> = pattern.split('*').map(regex::escape).collect();
        let regex_pattern = format!("(?i)^{}$", escaped.join(".*"));
        match Regex::new(&regex_pattern) {
            Ok(regex) => regex.is_match(text),
            Err(_) => text.contains(pattern.trim_matches('*')),
        }
    } else {
        text.eq_ignore_ascii_case(pattern)
    }
}
