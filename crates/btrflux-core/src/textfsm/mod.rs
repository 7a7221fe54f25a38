//! Template-driven row tokenizer for semi-structured command output.
//!
//! Implements the TextFSM subset needed by the shipped btrfs templates:
//! `Value` declarations with `Filldown`/`Required` options, a `Start`
//! state (plus optional named states), and rule actions `Next`, `Record`,
//! `Continue` and `Continue.Record`. The tokenizer consumes one text line
//! at a time and publishes [`Row`]s: ordered sequences of string fields
//! with one slot per declared value and absent fields left empty.
//!
//! Rows are handed to the consumer through a rendezvous channel pipeline
//! (see [`spawn_rows`]): one thread feeds raw output lines, one thread
//! runs the state machine and publishes rows, and the caller drains the
//! receiver until the channel closes. End of stream is signaled by sender
//! drop, never by a sentinel value.

mod machine;
mod template;

pub use machine::{Machine, spawn_rows};
pub use template::{Template, TemplateError};

/// One tokenized record of string fields, in value-declaration order.
///
/// Rows are immutable once produced. Fields that were never captured are
/// empty strings, and out-of-range access also yields an empty string so
/// classification code can probe columns without bounds checks.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Row(Vec<String>);

impl Row {
    /// Creates a row from owned field values.
    pub fn new(fields: Vec<String>) -> Self {
        Self(fields)
    }

    /// Returns the field at `idx`, or `""` if absent.
    pub fn field(&self, idx: usize) -> &str {
        self.0.get(idx).map(String::as_str).unwrap_or("")
    }

    /// Number of field slots in this row.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if the row has no field slots.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<&str>> for Row {
    fn from(fields: Vec<&str>) -> Self {
        Self(fields.into_iter().map(str::to_string).collect())
    }
}
