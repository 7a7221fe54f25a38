//! Parsing of template descriptions into compiled rule sets.
//!
//! A template has two sections: `Value` declarations, then one or more
//! state blocks. State blocks start with an unindented state name and
//! contain indented `^pattern [-> action]` rules. `${Name}` references in
//! a rule pattern expand to named capture groups built from the value's
//! declared regex.

use regex::Regex;
use std::path::Path;
use std::sync::mpsc;
use std::thread;

/// Error type for template loading and parsing failures.
#[derive(Debug)]
pub enum TemplateError {
    /// I/O error reading the template file.
    Io(std::io::Error),
    /// Malformed template line.
    Syntax { line: usize, message: String },
    /// A value or rule regex failed to compile.
    Regex { line: usize, message: String },
}

impl std::fmt::Display for TemplateError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TemplateError::Io(e) => write!(f, "I/O error: {}", e),
            TemplateError::Syntax { line, message } => {
                write!(f, "syntax error at line {}: {}", line, message)
            }
            TemplateError::Regex { line, message } => {
                write!(f, "invalid regex at line {}: {}", line, message)
            }
        }
    }
}

impl std::error::Error for TemplateError {}

impl From<std::io::Error> for TemplateError {
    fn from(e: std::io::Error) -> Self {
        TemplateError::Io(e)
    }
}

/// A declared value: one row column.
#[derive(Debug, Clone)]
pub(crate) struct ValueDef {
    pub(crate) name: String,
    /// Declared regex, including the outer capture parentheses.
    pattern: String,
    /// Value survives `Record` instead of being cleared.
    pub(crate) filldown: bool,
    /// Records missing this value are suppressed.
    pub(crate) required: bool,
}

impl ValueDef {
    /// The declared regex without its outer parentheses.
    fn inner_pattern(&self) -> &str {
        &self.pattern[1..self.pattern.len() - 1]
    }
}

/// What the machine does with the rest of the line after a rule matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) enum LineAction {
    /// Stop matching and move to the next input line.
    #[default]
    Next,
    /// Keep trying subsequent rules against the same line.
    Continue,
}

/// One compiled rule within a state.
#[derive(Debug)]
pub(crate) struct Rule {
    pub(crate) regex: Regex,
    pub(crate) record: bool,
    pub(crate) line_action: LineAction,
    pub(crate) next_state: Option<String>,
    line: usize,
}

/// A named state block.
#[derive(Debug)]
pub(crate) struct State {
    name: String,
    pub(crate) rules: Vec<Rule>,
}

/// A compiled template: value declarations plus state rule sets.
#[derive(Debug)]
pub struct Template {
    pub(crate) values: Vec<ValueDef>,
    pub(crate) states: Vec<State>,
    start: usize,
}

impl Template {
    /// Loads and compiles a template file.
    ///
    /// The file's lines are fed through a rendezvous channel by a reader
    /// thread, and the parser consumes the channel until it closes.
    pub fn load(path: &Path) -> Result<Self, TemplateError> {
        let text = std::fs::read_to_string(path)?;
        let (tx, rx) = mpsc::sync_channel::<String>(0);
        thread::spawn(move || {
            for line in text.lines() {
                if tx.send(line.to_string()).is_err() {
                    return;
                }
            }
        });
        Self::from_lines(rx)
    }

    /// Compiles a template from an in-memory description.
    pub fn parse(text: &str) -> Result<Self, TemplateError> {
        Self::from_lines(text.lines().map(str::to_string))
    }

    /// Compiles a template from a stream of lines.
    pub fn from_lines(lines: impl IntoIterator<Item = String>) -> Result<Self, TemplateError> {
        let mut values: Vec<ValueDef> = Vec::new();
        let mut states: Vec<State> = Vec::new();

        for (idx, line) in lines.into_iter().enumerate() {
            let lineno = idx + 1;
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }

            if let Some(rest) = line.strip_prefix("Value ") {
                if !states.is_empty() {
                    return Err(syntax(lineno, "value declared after state section"));
                }
                values.push(parse_value(rest.trim(), lineno)?);
                if let Some(dup) = duplicate_name(&values) {
                    return Err(syntax(lineno, format!("duplicate value '{}'", dup)));
                }
            } else if !line.starts_with(' ') && !line.starts_with('\t') {
                let name = trimmed;
                if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
                    return Err(syntax(lineno, format!("invalid state name '{}'", name)));
                }
                if states.iter().any(|s| s.name == name) {
                    return Err(syntax(lineno, format!("duplicate state '{}'", name)));
                }
                states.push(State {
                    name: name.to_string(),
                    rules: Vec::new(),
                });
            } else {
                let Some(state) = states.last_mut() else {
                    return Err(syntax(lineno, "rule outside of a state block"));
                };
                state.rules.push(parse_rule(trimmed, &values, lineno)?);
            }
        }

        if values.is_empty() {
            return Err(syntax(0, "template declares no values"));
        }
        let Some(start) = states.iter().position(|s| s.name == "Start") else {
            return Err(syntax(0, "template has no Start state"));
        };

        // Transitions can only name states that exist.
        for state in &states {
            for rule in &state.rules {
                if let Some(target) = &rule.next_state
                    && !states.iter().any(|s| s.name == *target)
                {
                    return Err(syntax(rule.line, format!("unknown state '{}'", target)));
                }
            }
        }

        Ok(Template {
            values,
            states,
            start,
        })
    }

    /// Index of the `Start` state.
    pub(crate) fn start_state(&self) -> usize {
        self.start
    }

    /// Resolves a state name to its index. Names are validated at parse
    /// time, so this only returns `None` for internal misuse.
    pub(crate) fn state_index(&self, name: &str) -> Option<usize> {
        self.states.iter().position(|s| s.name == name)
    }

    /// Number of declared values, i.e. the row width.
    pub fn width(&self) -> usize {
        self.values.len()
    }
}

fn syntax(line: usize, message: impl Into<String>) -> TemplateError {
    TemplateError::Syntax {
        line,
        message: message.into(),
    }
}

fn duplicate_name(values: &[ValueDef]) -> Option<&str> {
    let last = values.last()?;
    values[..values.len() - 1]
        .iter()
        .find(|v| v.name == last.name)
        .map(|v| v.name.as_str())
}

/// Parses the remainder of a `Value` line: `[option[,option]] Name (regex)`.
fn parse_value(rest: &str, lineno: usize) -> Result<ValueDef, TemplateError> {
    let Some((first, remainder)) = rest.split_once(char::is_whitespace) else {
        return Err(syntax(lineno, "expected 'Value [options] Name (regex)'"));
    };
    let remainder = remainder.trim();

    let (options, name, pattern) = if remainder.starts_with('(') {
        ("", first, remainder)
    } else {
        let Some((name, pattern)) = remainder.split_once(char::is_whitespace) else {
            return Err(syntax(lineno, "expected 'Value [options] Name (regex)'"));
        };
        (first, name, pattern.trim())
    };

    let mut filldown = false;
    let mut required = false;
    for option in options.split(',').filter(|o| !o.is_empty()) {
        match option {
            "Filldown" => filldown = true,
            "Required" => required = true,
            other => {
                return Err(syntax(lineno, format!("unsupported option '{}'", other)));
            }
        }
    }

    if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(syntax(lineno, format!("invalid value name '{}'", name)));
    }
    if !pattern.starts_with('(') || !pattern.ends_with(')') || pattern.len() < 2 {
        return Err(syntax(lineno, "value regex must be parenthesized"));
    }
    Regex::new(pattern).map_err(|e| TemplateError::Regex {
        line: lineno,
        message: e.to_string(),
    })?;

    Ok(ValueDef {
        name: name.to_string(),
        pattern: pattern.to_string(),
        filldown,
        required,
    })
}

/// Parses an indented rule line: `^pattern [-> action]`.
fn parse_rule(rule: &str, values: &[ValueDef], lineno: usize) -> Result<Rule, TemplateError> {
    let (pattern, action) = match rule.split_once("->") {
        Some((p, a)) => (p.trim_end(), a.trim()),
        None => (rule, ""),
    };
    if !pattern.starts_with('^') {
        return Err(syntax(lineno, "rule pattern must start with '^'"));
    }

    let mut record = false;
    let mut line_action = LineAction::Next;
    let mut next_state = None;
    for token in action.split_whitespace() {
        match token {
            "Next" => line_action = LineAction::Next,
            "Continue" => line_action = LineAction::Continue,
            "Record" => record = true,
            "Continue.Record" => {
                line_action = LineAction::Continue;
                record = true;
            }
            "Next.Record" => record = true,
            other if next_state.is_none() => next_state = Some(other.to_string()),
            other => {
                return Err(syntax(lineno, format!("unexpected action token '{}'", other)));
            }
        }
    }

    let expanded = expand_pattern(pattern, values, lineno)?;
    let regex = Regex::new(&expanded).map_err(|e| TemplateError::Regex {
        line: lineno,
        message: e.to_string(),
    })?;

    Ok(Rule {
        regex,
        record,
        line_action,
        next_state,
        line: lineno,
    })
}

/// Expands `${Name}` references into named capture groups.
fn expand_pattern(
    pattern: &str,
    values: &[ValueDef],
    lineno: usize,
) -> Result<String, TemplateError> {
    let mut out = String::with_capacity(pattern.len());
    let mut rest = pattern;
    while let Some(pos) = rest.find("${") {
        out.push_str(&rest[..pos]);
        let after = &rest[pos + 2..];
        let Some(end) = after.find('}') else {
            return Err(syntax(lineno, "unterminated value reference"));
        };
        let name = &after[..end];
        let Some(value) = values.iter().find(|v| v.name == name) else {
            return Err(syntax(lineno, format!("unknown value '{}'", name)));
        };
        out.push_str("(?P<");
        out.push_str(&value.name);
        out.push('>');
        out.push_str(value.inner_pattern());
        out.push(')');
        rest = &after[end + 1..];
    }
    out.push_str(rest);
    Ok(out)
}
