//! Request extractors.

pub mod path;
pub mod query;

pub use path::QueryPath;
pub use query::EntitiesQuery;
