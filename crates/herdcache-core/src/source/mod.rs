//! Record source abstraction.
//!
//! The record source is the authoritative store (a database in production)
//! the cache sits in front of. Herdcache only needs a single read operation
//! from it.

mod fixture;
mod traits;

pub use fixture::StaticSource;
pub use traits::{RecordSource, SourceError};
