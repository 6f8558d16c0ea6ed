use crate::results::QueryResult;

/// Receives the outcome of one submitted request.
///
/// Each result object of the request is reported in order with its sequence
/// index (starting at 0). Successful objects go to [`on_result`]; returning
/// `false` from it keeps the object, which is then handed over through
/// [`retain`]. Returning `true` lets the multiplexer free it.
///
/// [`on_result`]: QueryHandler::on_result
/// [`retain`]: QueryHandler::retain
pub trait QueryHandler {
    /// Return `false` to take ownership of `result`.
    fn on_result(&mut self, result: &QueryResult, index: usize) -> bool;

    /// Called with the object `on_result` chose to keep.
    fn retain(&mut self, result: QueryResult, index: usize) {
        let _ = (result, index);
    }

    /// A result object reported a failure; `sql` is the text that ran.
    fn on_error(&mut self, message: &str, index: usize, sql: &str);
}

/// [`QueryHandler`] built from a pair of closures, see [`handler`].
pub struct FnHandler<R, E> {
    on_result: R,
    on_error: E,
}

/// Build a handler from closures.
///
/// ```rust
/// use sql_multiplex::prelude::*;
///
/// let h = handler(
///     |rs: &QueryResult, i: usize| {
///         println!("result {i}: {} rows", rs.n_rows());
///         true
///     },
///     |msg: &str, i: usize, sql: &str| eprintln!("{sql} failed at {i}: {msg}"),
/// );
/// # let _ = h;
/// ```
pub fn handler<R, E>(on_result: R, on_error: E) -> FnHandler<R, E>
where
    R: FnMut(&QueryResult, usize) -> bool,
    E: FnMut(&str, usize, &str),
{
    FnHandler {
        on_result,
        on_error,
    }
}

impl<R, E> QueryHandler for FnHandler<R, E>
where
    R: FnMut(&QueryResult, usize) -> bool,
    E: FnMut(&str, usize, &str),
{
    fn on_result(&mut self, result: &QueryResult, index: usize) -> bool {
        (self.on_result)(result, index)
    }

    fn on_error(&mut self, message: &str, index: usize, sql: &str) {
        (self.on_error)(message, index, sql);
    }
}

/// Handler that ignores everything; used for fire-and-forget statements.
#[derive(Debug, Default, Clone, Copy)]
pub struct Discard;

impl QueryHandler for Discard {
    fn on_result(&mut self, _result: &QueryResult, _index: usize) -> bool {
        true
    }

    fn on_error(&mut self, message: &str, index: usize, sql: &str) {
        tracing::debug!(index, sql, message, "discarded query error");
    }
}
