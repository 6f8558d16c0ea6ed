//! Positional parameter substitution for SQL templates.
//!
//! Templates reference parameters as `$1`..`$N`. Substitution is textual: the
//! rendered parameter replaces the whole `$N` token. A `$` that is not followed
//! by a numeral in `1..=N` is ordinary text and is copied unchanged, together
//! with whatever follows it.

use std::borrow::Cow;

mod params;
mod scanner;

pub use params::{Param, escape_literal};
use scanner::placeholder;

/// Substitute `params` into `template`.
///
/// The output length is computed first so the result is allocated once.
/// ```rust
/// use sql_multiplex::prelude::*;
///
/// let sql = format_query(
///     "SELECT * FROM t WHERE a=$1 AND b=$2",
///     &[Param::Int(5), Param::Str(Some("o'hara"))],
/// );
/// assert_eq!(sql, "SELECT * FROM t WHERE a=5 AND b='o''hara'");
/// ```
#[must_use]
pub fn format_query(template: &str, params: &[Param<'_>]) -> String {
    let rendered: Vec<Cow<'_, str>> = params.iter().map(Param::render).collect();
    let bytes = template.as_bytes();

    let total = formatted_len(bytes, &rendered);

    let mut out = String::with_capacity(total);
    let mut copied = 0;
    let mut idx = 0;
    while idx < bytes.len() {
        if let Some((end, slot)) = placeholder(bytes, idx, rendered.len()) {
            out.push_str(&template[copied..idx]);
            out.push_str(&rendered[slot]);
            idx = end;
            copied = end;
        } else {
            idx += 1;
        }
    }
    out.push_str(&template[copied..]);

    debug_assert_eq!(out.len(), total);
    out
}

/// Length in bytes of the substituted template.
fn formatted_len(bytes: &[u8], rendered: &[Cow<'_, str>]) -> usize {
    let mut total = 0;
    let mut idx = 0;
    while idx < bytes.len() {
        if let Some((end, slot)) = placeholder(bytes, idx, rendered.len()) {
            total += rendered[slot].len();
            idx = end;
        } else {
            total += 1;
            idx += 1;
        }
    }
    total
}
