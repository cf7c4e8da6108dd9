//! Dual-format log line parsing.
//!
//! The relay emits structured JSON records when configured to, but
//! older builds and some code paths write plain text. Parsing is
//! structured-first with a permissive textual fallback that can only
//! recover a correlation key, never byte counts.

use serde::Deserialize;

/// A structured relay activity record.
///
/// All fields are optional on the wire; absent numerics default to 0.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct LogRecord {
    #[serde(default)]
    pub time: String,
    #[serde(default)]
    pub level: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub uuid: String,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub dest: String,
    #[serde(default)]
    pub protocol: String,
    #[serde(default)]
    pub upload: i64,
    #[serde(default)]
    pub download: i64,
}

impl LogRecord {
    /// Correlation key: the connection identifier when present, else
    /// the username. `None` when the record identifies nobody.
    pub fn correlation_key(&self) -> Option<&str> {
        if !self.uuid.is_empty() {
            Some(&self.uuid)
        } else if !self.email.is_empty() {
            Some(&self.email)
        } else {
            None
        }
    }
}

/// Result of parsing one log line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedLine {
    /// Structured record carrying byte counts.
    Structured(LogRecord),
    /// Textual line from which only a correlation key was recovered.
    Correlatable(String),
    /// Nothing usable; skipped silently.
    Unrecognized,
}

/// Parse a single log line, structured-first.
pub fn parse_line(line: &str) -> ParsedLine {
    let line = line.trim();
    if line.is_empty() {
        return ParsedLine::Unrecognized;
    }

    if let Ok(record) = serde_json::from_str::<LogRecord>(line) {
        if record.correlation_key().is_some() {
            return ParsedLine::Structured(record);
        }
        return ParsedLine::Unrecognized;
    }

    parse_text(line)
}

/// Textual fallback, e.g.:
/// `2024/12/24 12:00:00 [Info] [email: user@example.com] accepted connection`
fn parse_text(line: &str) -> ParsedLine {
    if !line.contains("accepted") && !line.contains("connection") {
        return ParsedLine::Unrecognized;
    }
    let idx = match line.find("email:") {
        Some(idx) => idx,
        None => return ParsedLine::Unrecognized,
    };
    let rest = line[idx + 6..].trim_start();
    let end = rest.find([' ', ']']).unwrap_or(rest.len());
    let key = rest[..end].trim();
    if key.is_empty() {
        ParsedLine::Unrecognized
    } else {
        ParsedLine::Correlatable(key.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn structured_record_with_uuid_key() {
        let line = r#"{"time":"2024-12-24T12:00:00Z","email":"alice","uuid":"550e8400-e29b-41d4-a716-446655440000","upload":100,"download":200}"#;
        match parse_line(line) {
            ParsedLine::Structured(record) => {
                assert_eq!(
                    record.correlation_key(),
                    Some("550e8400-e29b-41d4-a716-446655440000")
                );
                assert_eq!(record.upload, 100);
                assert_eq!(record.download, 200);
            }
            other => panic!("expected structured record, got {other:?}"),
        }
    }

    #[test]
    fn structured_record_falls_back_to_email_key() {
        let line = r#"{"email":"alice","upload":5}"#;
        match parse_line(line) {
            ParsedLine::Structured(record) => {
                assert_eq!(record.correlation_key(), Some("alice"));
            }
            other => panic!("expected structured record, got {other:?}"),
        }
    }

    #[test]
    fn structured_record_without_identity_is_skipped() {
        let line = r#"{"upload":100,"download":200}"#;
        assert_eq!(parse_line(line), ParsedLine::Unrecognized);
    }

    #[test]
    fn textual_line_yields_correlation_key() {
        let line = "2024/12/24 12:00:00 [Info] [email: user@example.com] accepted connection";
        assert_eq!(
            parse_line(line),
            ParsedLine::Correlatable("user@example.com".to_string())
        );
    }

    #[test]
    fn textual_line_without_marker_is_skipped() {
        assert_eq!(
            parse_line("2024/12/24 12:00:00 [Info] accepted connection"),
            ParsedLine::Unrecognized
        );
    }

    #[test]
    fn unrelated_text_is_skipped() {
        assert_eq!(parse_line("starting relay v1.8.3"), ParsedLine::Unrecognized);
        assert_eq!(parse_line(""), ParsedLine::Unrecognized);
        assert_eq!(parse_line("   "), ParsedLine::Unrecognized);
    }

    #[test]
    fn malformed_json_falls_back_to_text_scan() {
        let line = "???? [email: bob] accepted connection";
        assert_eq!(parse_line(line), ParsedLine::Correlatable("bob".to_string()));
    }
}
