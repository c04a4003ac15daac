//! The single-flight fetch cache used for call tracking lookups.
//!
//! The [`Cacher`] guarantees that a given [`CacheKey`] is fetched at most once
//! between [`clear`](Cacher::clear) events, and that all requesters of that key
//! observe the same outcome, whether they arrive while the fetch is still in
//! flight or long after it has resolved.

#![warn(missing_docs)]

mod cacher;
mod error;

pub use cacher::{CacheKey, Cacher};
pub use error::{CacheEntry, CacheError};
