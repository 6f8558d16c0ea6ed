use std::collections::VecDeque;

use tokio_postgres::SimpleQueryMessage;

use crate::results::QueryResult;

/// The parts of a simple-query reply that shape result objects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Frame {
    Columns(Vec<String>),
    Row(Vec<Option<String>>),
    Complete(u64),
}

impl Frame {
    fn from_message(message: SimpleQueryMessage) -> Option<Self> {
        match message {
            SimpleQueryMessage::RowDescription(cols) => Some(Frame::Columns(
                cols.iter().map(|col| col.name().to_string()).collect(),
            )),
            SimpleQueryMessage::Row(row) => Some(Frame::Row(
                (0..row.len())
                    .map(|idx| row.get(idx).map(str::to_owned))
                    .collect(),
            )),
            SimpleQueryMessage::CommandComplete(affected) => Some(Frame::Complete(affected)),
            _ => None,
        }
    }
}

/// Split the messages of one simple query into per-statement result objects.
///
/// `failure` is the error that ended the batch, if any. It becomes the last
/// result object, so it lands at the index of the statement that failed.
#[must_use]
pub fn collect_results(
    messages: Vec<SimpleQueryMessage>,
    failure: Option<String>,
) -> VecDeque<QueryResult> {
    group_frames(messages.into_iter().filter_map(Frame::from_message), failure)
}

/// A statement that described columns (or produced rows) becomes a row result,
/// even when empty; any other statement becomes a command result carrying its
/// affected-row count. Rows of a statement that never completed are dropped.
pub(crate) fn group_frames(
    frames: impl IntoIterator<Item = Frame>,
    failure: Option<String>,
) -> VecDeque<QueryResult> {
    let mut out = VecDeque::new();
    let mut columns: Option<Vec<String>> = None;
    let mut rows: Vec<Vec<Option<String>>> = Vec::new();

    for frame in frames {
        match frame {
            Frame::Columns(names) => columns = Some(names),
            Frame::Row(values) => {
                if columns.is_none() {
                    columns = Some((0..values.len()).map(|i| format!("?column?{i}")).collect());
                }
                rows.push(values);
            }
            Frame::Complete(affected) => {
                let result = match columns.take() {
                    Some(names) => QueryResult::tuples(names, std::mem::take(&mut rows))
                        .with_rows_affected(affected),
                    None => QueryResult::command(affected),
                };
                out.push_back(result);
            }
        }
    }
    if let Some(message) = failure {
        out.push_back(QueryResult::error(message));
    }
    out
}

/// Error text in the `SEVERITY:  message` shape libpq uses.
#[must_use]
pub fn describe(err: &tokio_postgres::Error) -> String {
    match err.as_db_error() {
        Some(db) => format!("{}:  {}", db.severity(), db.message()),
        None => err.to_string(),
    }
}
