pub mod query_result;
pub mod row;

pub use query_result::{QueryResult, ResultStatus};
pub use row::RowRef;
