//! Metric point model shared by all output formats.

use chrono::Utc;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::Write as _;

/// A single typed field value on a metric point.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Integer(i64),
    Float(f64),
    Str(String),
}

impl From<i64> for FieldValue {
    fn from(v: i64) -> Self {
        Self::Integer(v)
    }
}

impl From<f64> for FieldValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<String> for FieldValue {
    fn from(v: String) -> Self {
        Self::Str(v)
    }
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        Self::Str(v.to_string())
    }
}

/// One measurement sample with tags, fields and a nanosecond timestamp.
///
/// Tags and fields are kept in sorted maps so rendered output is
/// deterministic regardless of insertion order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricPoint {
    pub measurement: String,
    pub tags: BTreeMap<String, String>,
    pub fields: BTreeMap<String, FieldValue>,
    pub timestamp_ns: i64,
}

impl MetricPoint {
    pub fn new(measurement: &str, timestamp_ns: i64) -> Self {
        Self {
            measurement: measurement.to_string(),
            tags: BTreeMap::new(),
            fields: BTreeMap::new(),
            timestamp_ns,
        }
    }

    pub fn tag(mut self, key: &str, value: &str) -> Self {
        self.tags.insert(key.to_string(), value.to_string());
        self
    }

    pub fn field(mut self, key: &str, value: impl Into<FieldValue>) -> Self {
        self.fields.insert(key.to_string(), value.into());
        self
    }

    /// Renders the point in InfluxDB line protocol.
    ///
    /// Integer fields carry the `i` suffix, string fields are quoted with
    /// `"` and `\` escaped, and measurement/tag text escapes commas,
    /// equals signs and spaces.
    pub fn to_line_protocol(&self) -> String {
        let mut line = escape_measurement(&self.measurement);
        for (key, value) in &self.tags {
            let _ = write!(line, ",{}={}", escape_tag(key), escape_tag(value));
        }
        line.push(' ');
        for (i, (key, value)) in self.fields.iter().enumerate() {
            if i > 0 {
                line.push(',');
            }
            let _ = write!(line, "{}=", escape_tag(key));
            match value {
                FieldValue::Integer(n) => {
                    let _ = write!(line, "{}i", n);
                }
                FieldValue::Float(f) => {
                    let _ = write!(line, "{}", f);
                }
                FieldValue::Str(s) => {
                    let _ = write!(line, "\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\""));
                }
            }
        }
        let _ = write!(line, " {}", self.timestamp_ns);
        line
    }
}

fn escape_measurement(s: &str) -> String {
    s.replace(',', "\\,").replace(' ', "\\ ")
}

fn escape_tag(s: &str) -> String {
    s.replace(',', "\\,").replace('=', "\\=").replace(' ', "\\ ")
}

/// Current wall-clock time as nanoseconds since the epoch.
pub fn now_timestamp_ns() -> i64 {
    Utc::now().timestamp_nanos_opt().unwrap_or_default()
}
