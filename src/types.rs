//! GDB/MI record tree: the data model produced by the parser, and the
//! lookup helpers consumers use to pick named fields out of it.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Record classification, keyed by the one-character MI type prefix.
///
/// `Prompt` doubles as the "nothing meaningful on this line" marker: empty
/// lines and lines with an unrecognized prefix are downgraded to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RecordKind {
    /// The `(gdb)` ready prompt, or a line that did not parse as a record.
    Prompt,
    /// `^` command result (`^done`, `^error`, ...).
    Result,
    /// `*` exec async output (`*stopped`, `*running`).
    ExecAsync,
    /// `+` status async output (e.g. `+download`).
    StatusAsync,
    /// `=` notify async output (`=breakpoint-created`, `=thread-exited`, ...).
    NotifyAsync,
    /// `~` console stream text.
    ConsoleStream,
    /// `@` target stream text.
    TargetStream,
    /// `&` log stream text.
    LogStream,
}

impl RecordKind {
    /// Maps an MI type prefix character to its record kind.
    pub fn from_prefix(c: char) -> Option<Self> {
        match c {
            '^' => Some(RecordKind::Result),
            '*' => Some(RecordKind::ExecAsync),
            '+' => Some(RecordKind::StatusAsync),
            '=' => Some(RecordKind::NotifyAsync),
            '~' => Some(RecordKind::ConsoleStream),
            '@' => Some(RecordKind::TargetStream),
            '&' => Some(RecordKind::LogStream),
            _ => None,
        }
    }

    /// Stream records carry decoded text in `class` instead of a class name.
    pub fn is_stream(self) -> bool {
        matches!(
            self,
            RecordKind::ConsoleStream | RecordKind::TargetStream | RecordKind::LogStream
        )
    }
}

/// A parsed MI value: decoded string content, or an ordered sequence of
/// results. Tuples `{}` and lists `[]` both parse to `List`; GDB mixes
/// named and anonymous entries freely inside either.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MiValue {
    String(String),
    List(Vec<MiResult>),
}

impl MiValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            MiValue::String(s) => Some(s),
            MiValue::List(_) => None,
        }
    }

    pub fn as_list(&self) -> Option<&[MiResult]> {
        match self {
            MiValue::String(_) => None,
            MiValue::List(entries) => Some(entries),
        }
    }

    /// Looks up a named entry inside a list value, first occurrence wins.
    pub fn get(&self, name: &str) -> Option<&MiValue> {
        lookup(self.as_list()?, name)
    }

    /// Like [`MiValue::get`], restricted to string-valued entries.
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name)?.as_str()
    }
}

/// One `name=value` entry. `var` is `None` for anonymous entries, which GDB
/// produces inside list values (`[2,3]`, frame lists, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MiResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub var: Option<String>,
    pub value: MiValue,
}

/// First entry whose name equals `name`. Linear scan; duplicate names
/// resolve to the first occurrence.
fn lookup<'a>(results: &'a [MiResult], name: &str) -> Option<&'a MiValue> {
    results
        .iter()
        .find(|r| r.var.as_deref() == Some(name))
        .map(|r| &r.value)
}

/// One fully parsed line of MI output.
///
/// For stream records `class` holds the decoded stream text; for result and
/// async records it holds the class name (`done`, `breakpoint-created`, ...)
/// and `results` the comma-separated fields. A `Prompt` record carries
/// nothing, except possibly a token left over from a degenerate line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MiRecord {
    pub kind: RecordKind,
    /// Numeric command token prefix, kept verbatim.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub class: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub results: Vec<MiResult>,
}

impl MiRecord {
    pub(crate) fn prompt(token: Option<String>) -> Self {
        MiRecord {
            kind: RecordKind::Prompt,
            token,
            class: String::new(),
            results: Vec::new(),
        }
    }

    /// Lines that parsed to nothing meaningful should be skipped by callers.
    pub fn is_prompt(&self) -> bool {
        self.kind == RecordKind::Prompt
    }

    /// Looks up a top-level field by name, first occurrence wins.
    pub fn get(&self, name: &str) -> Option<&MiValue> {
        lookup(&self.results, name)
    }

    /// Like [`MiRecord::get`], restricted to string-valued fields.
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name)?.as_str()
    }

    /// Walks a `/`-separated path of field names through nested lists,
    /// e.g. `BreakpointTable/body` on a `-break-list` result. Every
    /// intermediate step must resolve to a list value.
    pub fn get_path(&self, path: &str) -> Option<&MiValue> {
        let mut results: &[MiResult] = &self.results;
        let mut found = None;
        for name in path.split('/') {
            let value = lookup(results, name)?;
            results = match value {
                MiValue::List(entries) => entries,
                MiValue::String(_) => &[],
            };
            found = Some(value);
        }
        found
    }

    /// Exact kind and class comparison, case-sensitive.
    pub fn matches(&self, kind: RecordKind, class: &str) -> bool {
        self.kind == kind && self.class == class
    }

    /// Checks kind and class, then extracts every named field as a string.
    ///
    /// All-or-nothing: the first failure aborts the whole call. Values come
    /// back in the order the names were given. A name whose first occurrence
    /// is list-valued fails with [`MatchError::FieldNotString`].
    pub fn expect_fields<'a>(
        &'a self,
        kind: RecordKind,
        class: &str,
        names: &[&str],
    ) -> Result<Vec<&'a str>, MatchError> {
        if self.kind != kind {
            return Err(MatchError::KindMismatch {
                expected: kind,
                actual: self.kind,
            });
        }
        if self.class != class {
            return Err(MatchError::ClassMismatch {
                expected: class.to_owned(),
                actual: self.class.clone(),
            });
        }
        let mut values = Vec::with_capacity(names.len());
        for &name in names {
            match self.get(name) {
                Some(MiValue::String(s)) => values.push(s.as_str()),
                Some(MiValue::List(_)) => {
                    return Err(MatchError::FieldNotString(name.to_owned()))
                }
                None => return Err(MatchError::MissingField(name.to_owned())),
            }
        }
        Ok(values)
    }
}

/// Why a record failed to match in [`MiRecord::expect_fields`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MatchError {
    #[error("record kind mismatch: expected {expected:?}, got {actual:?}")]
    KindMismatch {
        expected: RecordKind,
        actual: RecordKind,
    },
    #[error("record class mismatch: expected {expected:?}, got {actual:?}")]
    ClassMismatch { expected: String, actual: String },
    #[error("missing field {0:?}")]
    MissingField(String),
    #[error("field {0:?} is not a string")]
    FieldNotString(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::MiParser;

    fn parse(line: &str) -> MiRecord {
        MiParser::new().parse_line(line)
    }

    #[test]
    fn test_get_first_occurrence() {
        let record = parse("^done,id=\"1\",id=\"2\"");
        assert_eq!(record.get_str("id"), Some("1"));
    }

    #[test]
    fn test_get_str_rejects_lists() {
        let record = parse("^done,bkpt={number=\"1\"}");
        assert!(record.get("bkpt").is_some());
        assert_eq!(record.get_str("bkpt"), None);
        assert_eq!(record.get("missing"), None);
    }

    #[test]
    fn test_value_lookup() {
        let record = parse("^done,frame={level=\"0\",func=\"main\"}");
        let frame = record.get("frame").unwrap();
        assert_eq!(frame.get_str("func"), Some("main"));
        assert_eq!(frame.as_str(), None);
        assert_eq!(frame.as_list().unwrap().len(), 2);
    }

    #[test]
    fn test_get_path() {
        let record = parse(
            "^done,BreakpointTable={nr_rows=\"1\",body=[bkpt={number=\"1\",line=\"12\"}]}",
        );
        let body = record.get_path("BreakpointTable/body").unwrap();
        let entries = body.as_list().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].var.as_deref(), Some("bkpt"));
        assert_eq!(entries[0].value.get_str("number"), Some("1"));
        assert_eq!(record.get_path("BreakpointTable/missing"), None);
        // a string on the way blocks further descent
        assert_eq!(record.get_path("BreakpointTable/nr_rows/x"), None);
    }

    #[test]
    fn test_matches() {
        let record = parse("=thread-created,id=\"2\",group-id=\"i1\"");
        assert!(record.matches(RecordKind::NotifyAsync, "thread-created"));
        assert!(!record.matches(RecordKind::NotifyAsync, "thread-exited"));
        assert!(!record.matches(RecordKind::ExecAsync, "thread-created"));
    }

    #[test]
    fn test_expect_fields() {
        let record = parse("=thread-created,id=\"2\",group-id=\"i1\"");
        let fields = record
            .expect_fields(RecordKind::NotifyAsync, "thread-created", &["id", "group-id"])
            .unwrap();
        assert_eq!(fields, vec!["2", "i1"]);
    }

    #[test]
    fn test_expect_fields_failures() {
        let record = parse("=thread-created,id=\"2\"");
        assert_eq!(
            record.expect_fields(RecordKind::NotifyAsync, "thread-exited", &["id"]),
            Err(MatchError::ClassMismatch {
                expected: "thread-exited".to_owned(),
                actual: "thread-created".to_owned(),
            })
        );
        assert_eq!(
            record.expect_fields(RecordKind::ExecAsync, "thread-created", &["id"]),
            Err(MatchError::KindMismatch {
                expected: RecordKind::ExecAsync,
                actual: RecordKind::NotifyAsync,
            })
        );
        assert_eq!(
            record.expect_fields(RecordKind::NotifyAsync, "thread-created", &["id", "name"]),
            Err(MatchError::MissingField("name".to_owned()))
        );
        let record = parse("^done,bkpt={number=\"1\"}");
        assert_eq!(
            record.expect_fields(RecordKind::Result, "done", &["bkpt"]),
            Err(MatchError::FieldNotString("bkpt".to_owned()))
        );
    }

    #[test]
    fn test_record_kind_prefixes() {
        assert_eq!(RecordKind::from_prefix('^'), Some(RecordKind::Result));
        assert_eq!(RecordKind::from_prefix('*'), Some(RecordKind::ExecAsync));
        assert_eq!(RecordKind::from_prefix('+'), Some(RecordKind::StatusAsync));
        assert_eq!(RecordKind::from_prefix('='), Some(RecordKind::NotifyAsync));
        assert_eq!(RecordKind::from_prefix('~'), Some(RecordKind::ConsoleStream));
        assert_eq!(RecordKind::from_prefix('@'), Some(RecordKind::TargetStream));
        assert_eq!(RecordKind::from_prefix('&'), Some(RecordKind::LogStream));
        assert_eq!(RecordKind::from_prefix('!'), None);
        assert!(RecordKind::LogStream.is_stream());
        assert!(!RecordKind::Result.is_stream());
    }

    #[test]
    fn test_serialization_shape() {
        let record = parse("^done,ids=[\"1\",\"2\"]");
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["kind"], "result");
        assert_eq!(json["class"], "done");
        assert_eq!(json["results"][0]["var"], "ids");
        assert_eq!(json["results"][0]["value"][0]["value"], "1");
        assert!(json["results"][0]["value"][0].get("var").is_none());
        assert!(json.get("token").is_none());
    }
}
