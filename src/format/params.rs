use std::borrow::Cow;
use std::fmt::Write as _;

use chrono::{DateTime, Utc};

use crate::datetime::format_timestamp;

const NULL: &str = "NULL";

/// A typed argument for [`format_query`](super::format_query).
///
/// ```rust
/// use sql_multiplex::prelude::*;
///
/// let sql = format_query(
///     "UPDATE users SET active = $2 WHERE login = $1",
///     &[Param::Str(Some("bob")), Param::Bool(false)],
/// );
/// assert_eq!(sql, "UPDATE users SET active = FALSE WHERE login = 'bob'");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Param<'a> {
    Int(i32),
    UInt(u32),
    Int64(i64),
    UInt64(u64),
    /// Text escaped as a SQL literal; `None` renders `NULL`.
    Str(Option<&'a str>),
    /// Text wrapped in single quotes as-is; the caller guarantees it is safe.
    Constant(Option<&'a str>),
    /// A raw SQL fragment inserted verbatim.
    Statement(&'a str),
    /// 16 bytes of hash material rendered as quoted lowercase hex.
    Md5Hash([u8; 16]),
    Bool(bool),
    /// Rendered as a quoted UTC timestamp with microseconds.
    Timestamp(DateTime<Utc>),
}

impl<'a> Param<'a> {
    /// SQL text for this parameter.
    ///
    /// Keywords, raw statements and the `NULL` marker come back borrowed;
    /// everything else is rendered into a fresh buffer.
    #[must_use]
    pub fn render(&self) -> Cow<'a, str> {
        match *self {
            Param::Int(v) => Cow::Owned(v.to_string()),
            Param::UInt(v) => Cow::Owned(v.to_string()),
            Param::Int64(v) => Cow::Owned(v.to_string()),
            Param::UInt64(v) => Cow::Owned(v.to_string()),
            Param::Str(Some(s)) => Cow::Owned(escape_literal(s)),
            Param::Str(None) | Param::Constant(None) => Cow::Borrowed(NULL),
            Param::Constant(Some(s)) => Cow::Owned(format!("'{s}'")),
            Param::Statement(s) => Cow::Borrowed(s),
            Param::Md5Hash(bytes) => {
                let mut out = String::with_capacity(34);
                out.push('\'');
                for b in bytes {
                    let _ = write!(out, "{b:02x}");
                }
                out.push('\'');
                Cow::Owned(out)
            }
            Param::Bool(true) => Cow::Borrowed("TRUE"),
            Param::Bool(false) => Cow::Borrowed("FALSE"),
            Param::Timestamp(ts) => Cow::Owned(format!("'{}'", format_timestamp(&ts))),
        }
    }
}

/// Quote `text` as a SQL string literal.
///
/// Single quotes are doubled. Text containing a backslash is written as an
/// escape-string literal (` E'...'`) with backslashes doubled, so it means the
/// same thing whatever `standard_conforming_strings` is set to.
#[must_use]
pub fn escape_literal(text: &str) -> String {
    let has_backslash = text.contains('\\');
    let mut out = String::with_capacity(text.len() + 4);
    if has_backslash {
        out.push_str(" E");
    }
    out.push('\'');
    for ch in text.chars() {
        if ch == '\'' || ch == '\\' {
            out.push(ch);
        }
        out.push(ch);
    }
    out.push('\'');
    out
}

impl From<i32> for Param<'_> {
    fn from(v: i32) -> Self {
        Param::Int(v)
    }
}

impl From<u32> for Param<'_> {
    fn from(v: u32) -> Self {
        Param::UInt(v)
    }
}

impl From<i64> for Param<'_> {
    fn from(v: i64) -> Self {
        Param::Int64(v)
    }
}

impl From<u64> for Param<'_> {
    fn from(v: u64) -> Self {
        Param::UInt64(v)
    }
}

impl From<bool> for Param<'_> {
    fn from(v: bool) -> Self {
        Param::Bool(v)
    }
}

impl<'a> From<&'a str> for Param<'a> {
    fn from(v: &'a str) -> Self {
        Param::Str(Some(v))
    }
}

impl<'a> From<Option<&'a str>> for Param<'a> {
    fn from(v: Option<&'a str>) -> Self {
        Param::Str(v)
    }
}

impl From<DateTime<Utc>> for Param<'_> {
    fn from(v: DateTime<Utc>) -> Self {
        Param::Timestamp(v)
    }
}
