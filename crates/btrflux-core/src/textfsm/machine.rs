//! Rule-set execution over a stream of text lines.

use crate::textfsm::template::{LineAction, Template};
use crate::textfsm::Row;
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;

/// Executes a compiled [`Template`] against input lines, producing rows.
///
/// The machine holds one slot per declared value. A matching rule copies
/// its named captures into the slots; a `Record` action snapshots the
/// slots into a [`Row`] and clears everything that is not `Filldown`.
/// Rows missing a `Required` value are suppressed, including the implicit
/// record emitted at end of input.
pub struct Machine<'t> {
    template: &'t Template,
    state: usize,
    slots: Vec<String>,
}

impl<'t> Machine<'t> {
    /// Creates a machine positioned in the template's `Start` state.
    pub fn new(template: &'t Template) -> Self {
        Self {
            template,
            state: template.start_state(),
            slots: vec![String::new(); template.width()],
        }
    }

    /// Feeds one input line, returning any rows recorded by it.
    ///
    /// Rules are tried in declaration order; the first match wins unless
    /// its action is a `Continue` form, which keeps trying subsequent
    /// rules against the same line. Lines matching no rule are ignored.
    pub fn feed(&mut self, line: &str) -> Vec<Row> {
        let template = self.template;
        let mut out = Vec::new();

        for rule in &template.states[self.state].rules {
            let Some(caps) = rule.regex.captures(line) else {
                continue;
            };
            for (idx, value) in template.values.iter().enumerate() {
                if let Some(m) = caps.name(&value.name) {
                    self.slots[idx] = m.as_str().to_string();
                }
            }
            if rule.record
                && let Some(row) = self.take_row()
            {
                out.push(row);
            }
            if let Some(target) = &rule.next_state
                && let Some(idx) = self.template.state_index(target)
            {
                self.state = idx;
            }
            match rule.line_action {
                LineAction::Next => break,
                LineAction::Continue => continue,
            }
        }

        out
    }

    /// Signals end of input, returning the pending row if one is due.
    pub fn finish(mut self) -> Option<Row> {
        self.take_row()
    }

    /// Snapshots the current slots into a row and clears non-Filldown
    /// values. Returns `None` when the row is all-empty or missing a
    /// `Required` value.
    fn take_row(&mut self) -> Option<Row> {
        let template = self.template;
        let complete = template
            .values
            .iter()
            .enumerate()
            .all(|(idx, v)| !v.required || !self.slots[idx].is_empty());
        let non_empty = self.slots.iter().any(|s| !s.is_empty());
        let fields = self.slots.clone();

        for (idx, value) in template.values.iter().enumerate() {
            if !value.filldown {
                self.slots[idx].clear();
            }
        }

        if complete && non_empty {
            Some(Row::new(fields))
        } else {
            None
        }
    }
}

/// Spawns the tokenizer pipeline for one command output.
///
/// One thread feeds raw output lines through a rendezvous channel, a
/// second runs the state machine and publishes rows through another
/// rendezvous channel. The returned receiver yields rows until the
/// tokenizer finishes and drops its sender; dropping the receiver early
/// unwinds the producers through their failed sends.
pub fn spawn_rows(template: Arc<Template>, text: String) -> mpsc::Receiver<Row> {
    let (line_tx, line_rx) = mpsc::sync_channel::<String>(0);
    thread::spawn(move || {
        for line in text.lines() {
            if line_tx.send(line.to_string()).is_err() {
                return;
            }
        }
    });

    let (row_tx, row_rx) = mpsc::sync_channel::<Row>(0);
    thread::spawn(move || {
        let mut machine = Machine::new(&template);
        for line in line_rx {
            for row in machine.feed(&line) {
                if row_tx.send(row).is_err() {
                    return;
                }
            }
        }
        if let Some(row) = machine.finish() {
            let _ = row_tx.send(row);
        }
    });

    row_rx
}
