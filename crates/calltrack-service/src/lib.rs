//! Resolves call tracking phone numbers from remote vendor endpoints.
//!
//! A call tracking vendor exposes a JSON endpoint that returns the phone
//! number to display for the current visitor. This crate fetches and decodes
//! those responses, deduplicating requests through the single-flight
//! [`Cacher`](calltrack_cache::Cacher) so each config URL is hit at most once
//! per cache lifetime, and turns the decoded payload into the `tel:` link
//! rewrite an embedding environment applies to its hyperlink.

pub mod config;
mod fetch;
mod service;
mod types;

pub use config::Config;
pub use fetch::NumberFetcher;
pub use service::CallTrackingService;
pub use types::{CallTrackingResponse, LinkRewrite};
