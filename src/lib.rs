//! Parser for GDB's Machine Interface (MI) output.
//!
//! GDB in MI mode emits line-oriented records: command results (`^done`),
//! async events (`*stopped`, `=breakpoint-created`), and stream text
//! (`~"..."`). [`MiParser::parse_line`] turns one such line into an
//! [`MiRecord`] tree of named string/list fields, which callers inspect
//! through [`MiRecord::get`], [`MiRecord::get_path`] and
//! [`MiRecord::expect_fields`].
//!
//! The parser is deliberately forgiving: malformed input never fails a
//! parse. It degrades to a partial record or to an ignorable `Prompt`
//! record, with diagnostics on the `tracing` channels.

pub mod parser;
pub mod types;

pub use parser::{MiParser, DEFAULT_MAX_DEPTH};
pub use types::{MatchError, MiRecord, MiResult, MiValue, RecordKind};
