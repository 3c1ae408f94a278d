//! Logger configuration
//!
//! One flat configuration struct covers the whole surface: verbosity, body
//! truncation, output format, declarative filter rules, and sink-failure
//! reporting. Every field has a default, and deserialization treats absent
//! fields as "keep the default", so partial configuration files work.

use serde::{Deserialize, Serialize};

use crate::events::Level;
use crate::filter::{FilterRule, RequestFilter};
use crate::format::DEFAULT_TRUNCATE_BODY_AT;

/// Configuration for an [`ActivityLogger`](crate::ActivityLogger)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggerConfig {
    /// Verbosity level
    #[serde(default = "default_level")]
    pub level: Level,
    /// Byte count at which rendered bodies are truncated
    #[serde(default = "default_truncate_body_at")]
    pub truncate_body_at: usize,
    /// Render entries as JSON records instead of text lines
    #[serde(default)]
    pub json_format: bool,
    /// Declarative suppression rules; any match suppresses the request
    #[serde(default)]
    pub filter_rules: Vec<FilterRule>,
    /// Report sink write failures through `tracing`; silently drop when false
    #[serde(default = "default_report_sink_failures")]
    pub report_sink_failures: bool,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            truncate_body_at: default_truncate_body_at(),
            json_format: false,
            filter_rules: Vec::new(),
            report_sink_failures: default_report_sink_failures(),
        }
    }
}

impl LoggerConfig {
    /// Create a configuration with all defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Debug-level output with full request and response detail
    pub fn verbose() -> Self {
        Self::default().with_level(Level::Debug)
    }

    /// Render nothing and drop sink failures silently
    ///
    /// Correlation bookkeeping still runs, so raising the level later picks
    /// up in-flight requests cleanly.
    pub fn quiet() -> Self {
        Self::default()
            .with_level(Level::Off)
            .with_report_sink_failures(false)
    }

    /// Set the verbosity level
    pub fn with_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    /// Set the body truncation threshold in bytes
    pub fn with_truncate_body_at(mut self, bytes: usize) -> Self {
        self.truncate_body_at = bytes;
        self
    }

    /// Toggle JSON record output
    pub fn with_json_format(mut self, json_format: bool) -> Self {
        self.json_format = json_format;
        self
    }

    /// Replace the suppression rule list
    pub fn with_filter_rules(mut self, rules: Vec<FilterRule>) -> Self {
        self.filter_rules = rules;
        self
    }

    /// Append one suppression rule
    pub fn with_filter_rule(mut self, rule: FilterRule) -> Self {
        self.filter_rules.push(rule);
        self
    }

    /// Toggle sink-failure reporting
    pub fn with_report_sink_failures(mut self, report: bool) -> Self {
        self.report_sink_failures = report;
        self
    }

    /// Filter built from the configured rules, if any
    pub fn filter(&self) -> Option<RequestFilter> {
        if self.filter_rules.is_empty() {
            None
        } else {
            Some(RequestFilter::rules(self.filter_rules.clone()))
        }
    }
}

fn default_level() -> Level {
    Level::Info
}

fn default_truncate_body_at() -> usize {
    DEFAULT_TRUNCATE_BODY_AT
}

fn default_report_sink_failures() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{FilterField, MatchOp};

    #[test]
    fn test_default_config() {
        let config = LoggerConfig::default();

        assert_eq!(config.level, Level::Info);
        assert_eq!(config.truncate_body_at, DEFAULT_TRUNCATE_BODY_AT);
        assert!(!config.json_format);
        assert!(config.filter_rules.is_empty());
        assert!(config.report_sink_failures);
    }

    #[test]
    fn test_builder_chain() {
        let config = LoggerConfig::new()
            .with_level(Level::Debug)
            .with_truncate_body_at(256)
            .with_json_format(true)
            .with_filter_rule(FilterRule::new(
                FilterField::Host,
                MatchOp::Equals,
                "api.internal",
            ));

        assert_eq!(config.level, Level::Debug);
        assert_eq!(config.truncate_body_at, 256);
        assert!(config.json_format);
        assert_eq!(config.filter_rules.len(), 1);
    }

    #[test]
    fn test_deserialize_with_missing_fields_keeps_defaults() {
        let config: LoggerConfig = serde_json::from_str(r#"{"level": "debug"}"#).unwrap();

        assert_eq!(config.level, Level::Debug);
        assert_eq!(config.truncate_body_at, DEFAULT_TRUNCATE_BODY_AT);
        assert!(config.report_sink_failures);
    }

    #[test]
    fn test_deserialize_full_config() {
        let config: LoggerConfig = serde_json::from_str(
            r#"{
                "level": "info",
                "truncate_body_at": 512,
                "json_format": true,
                "filter_rules": [
                    {"field": "host", "op": "equals", "value": "api.internal"}
                ],
                "report_sink_failures": false
            }"#,
        )
        .unwrap();

        assert_eq!(config.level, Level::Info);
        assert_eq!(config.truncate_body_at, 512);
        assert!(config.json_format);
        assert_eq!(config.filter_rules.len(), 1);
        assert!(!config.report_sink_failures);
    }

    #[test]
    fn test_filter_from_rules() {
        let config = LoggerConfig::new();
        assert!(config.filter().is_none());

        let config = config.with_filter_rule(FilterRule::new(
            FilterField::Method,
            MatchOp::Equals,
            "OPTIONS",
        ));
        let filter = config.filter().unwrap();
        assert!(filter.suppresses(&crate::events::RequestDescriptor::new(
            "OPTIONS",
            "https://example.com"
        )));
    }

    #[test]
    fn test_presets() {
        assert_eq!(LoggerConfig::verbose().level, Level::Debug);

        let quiet = LoggerConfig::quiet();
        assert_eq!(quiet.level, Level::Off);
        assert!(!quiet.report_sink_failures);
    }
}
