//! Herdcache Core - Domain types and traits
//!
//! This crate provides the foundational types shared by every herdcache
//! component: the cached entity, the payload codec used to store collections
//! in the remote cache, the record source abstraction and the error taxonomy
//! surfaced to callers.

pub mod codec;
pub mod entity;
pub mod error;
pub mod source;

pub use codec::{CodecError, JsonCodec, PayloadCodec};
pub use entity::{Sex, Student};
pub use error::{CacheError, Result};
pub use source::{RecordSource, SourceError, StaticSource};

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
