//! Parsing of intercepted log writes.
//!
//! Grammar, tried in order:
//!
//! 1. `TIMESTAMP WS "[" LABEL "]" WS MESSAGE` where the message runs to the
//!    end of the buffer, newlines included.
//! 2. `TIMESTAMP WS MESSAGE` where the message is the rest of that line.
//! 3. Anything else is kept verbatim.
//!
//! `TIMESTAMP` is `YYYY/MM/DD HH:MM:SS`. Matches are unanchored and only the
//! first one in a buffer counts.

use std::sync::OnceLock;

use regex::Regex;

use crate::logger::Level;

const LABELED_PATTERN: &str = r"\d{4}/\d{2}/\d{2}\s+\d{2}:\d{2}:\d{2}\s+\[(\w+)\]\s+((?s:.+))";
const TIMESTAMPED_PATTERN: &str = r"\d{4}/\d{2}/\d{2}\s+\d{2}:\d{2}:\d{2}\s+(.+)";
const RECORD_START_PATTERN: &str = r"(?m)^\d{4}/\d{2}/\d{2}\s+\d{2}:\d{2}:\d{2}\s";

fn labeled_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(LABELED_PATTERN).expect("labeled pattern compiles"))
}

fn timestamped_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(TIMESTAMPED_PATTERN).expect("timestamped pattern compiles"))
}

fn record_start_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(RECORD_START_PATTERN).expect("record start pattern compiles"))
}

/// Which grammar rule produced a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordForm {
    /// Timestamp, bracketed label and message.
    Labeled,
    /// Timestamp and free text, no label.
    Timestamped,
    /// Nothing matched; the message is the raw input.
    Unparsed,
}

/// One parsed log write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    /// Bracketed label, when the write carried one.
    pub label: Option<String>,
    /// Message body with trailing newlines removed (raw input when unparsed).
    pub message: String,
    pub form: RecordForm,
}

impl LogRecord {
    /// Parse a single write. Never fails; unmatched input degrades to
    /// [`RecordForm::Unparsed`].
    pub fn parse(text: &str) -> Self {
        if let Some(caps) = labeled_re().captures(text) {
            return Self {
                label: Some(caps[1].to_string()),
                message: caps[2].trim_end_matches('\n').to_string(),
                form: RecordForm::Labeled,
            };
        }

        if let Some(caps) = timestamped_re().captures(text) {
            return Self {
                label: None,
                message: caps[1].to_string(),
                form: RecordForm::Timestamped,
            };
        }

        Self {
            label: None,
            message: text.to_string(),
            form: RecordForm::Unparsed,
        }
    }

    pub fn is_well_formed(&self) -> bool {
        self.form != RecordForm::Unparsed
    }

    /// Severity for a recognized label.
    pub fn level(&self) -> Option<Level> {
        self.label.as_deref().and_then(Level::from_label)
    }
}

/// Split a buffer at every line that starts with a timestamp.
///
/// Lines without a timestamp stay attached to the record before them; text
/// ahead of the first timestamp forms its own segment. Blank segments are
/// dropped.
pub fn split_records(text: &str) -> Vec<&str> {
    let starts: Vec<usize> = record_start_re().find_iter(text).map(|m| m.start()).collect();
    if starts.is_empty() {
        return vec![text];
    }

    let mut bounds = Vec::with_capacity(starts.len() + 1);
    if starts[0] > 0 {
        bounds.push(0);
    }
    bounds.extend(starts);

    bounds
        .iter()
        .enumerate()
        .map(|(i, &start)| {
            let end = bounds.get(i + 1).copied().unwrap_or(text.len());
            &text[start..end]
        })
        .filter(|segment| !segment.trim().is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_labeled() {
        let record = LogRecord::parse("2024/01/02 03:04:05 [ERROR] disk full\n");

        assert_eq!(record.form, RecordForm::Labeled);
        assert_eq!(record.label.as_deref(), Some("ERROR"));
        assert_eq!(record.message, "disk full");
        assert_eq!(record.level(), Some(Level::Error));
    }

    #[test]
    fn test_parse_labeled_keeps_multiline_body() {
        let record = LogRecord::parse("2024/01/02 03:04:05 [DEBUG] first\nsecond\n\n");

        assert_eq!(record.message, "first\nsecond");
    }

    #[test]
    fn test_parse_unknown_label() {
        let record = LogRecord::parse("2024/01/02 03:04:05 [FOO] odd case\n");

        assert_eq!(record.label.as_deref(), Some("FOO"));
        assert_eq!(record.level(), None);
        assert!(record.is_well_formed());
    }

    #[test]
    fn test_parse_timestamp_only() {
        let record = LogRecord::parse("2024/01/02 03:04:05 plain text\nmore\n");

        assert_eq!(record.form, RecordForm::Timestamped);
        assert_eq!(record.label, None);
        assert_eq!(record.message, "plain text");
    }

    #[test]
    fn test_parse_unparsed() {
        let record = LogRecord::parse("hello\n");

        assert_eq!(record.form, RecordForm::Unparsed);
        assert_eq!(record.message, "hello\n");
        assert!(!record.is_well_formed());
    }

    #[test]
    fn test_parse_label_without_body_falls_back_to_timestamped() {
        let record = LogRecord::parse("2024/01/02 03:04:05 [INFO]\n");

        assert_eq!(record.form, RecordForm::Timestamped);
        assert_eq!(record.message, "[INFO]");
    }

    #[test]
    fn test_split_records() {
        let text = "preamble\n2024/01/02 03:04:05 [INFO] a\ncontinued\n2024/01/02 03:04:06 [WARN] b\n";

        let segments = split_records(text);

        assert_eq!(
            segments,
            vec![
                "preamble\n",
                "2024/01/02 03:04:05 [INFO] a\ncontinued\n",
                "2024/01/02 03:04:06 [WARN] b\n",
            ]
        );
    }

    #[test]
    fn test_split_records_without_timestamps() {
        assert_eq!(split_records("just text"), vec!["just text"]);
    }
}
