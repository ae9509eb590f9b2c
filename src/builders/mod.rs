pub(crate) mod create;
pub(crate) mod delete;
pub(crate) mod insert;
mod query;

pub use query::{Query, SortDirection};
