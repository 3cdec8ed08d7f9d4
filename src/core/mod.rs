//! Core filtering and statement-rendering logic shared by every store operation.

mod filter;
mod sql;

pub use filter::{ColumnPredicate, FieldFilter};
pub use sql::{Statement, StatementBuilder, INSERT_BATCH_ROWS};
