//! Backend lookup abstraction: primary and secondary share one capability — start a lookup,
//! get back a channel that will receive exactly one [`LookupResponse`].
//!
//! Exposing it as a trait rather than two bespoke functions is what lets
//! `resolver::resolve` stay backend-agnostic, and lets tests inject fakes
//! with controlled latency and errors instead of standing up a real MySQL
//! and Redis.

pub mod cache;
pub mod db;
pub mod static_file;

use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;

use crate::error::ResolveError;
use crate::ocsp::ParsedRequest;

/// Exactly one of `Ok`/`Err` is ever sent down the channel a [`LookupSource`]
/// returns; the producer closes the channel by being dropped immediately
/// after sending. Closing without sending is a programmer error —
/// nothing in this codebase does it, so the resolver simply treats
/// a closed-without-value channel as `ResolveError::Internal`.
pub type LookupResponse = Result<Vec<u8>, ResolveError>;

/// A backend capable of answering "what's the stored OCSP response bytes
/// for this request's serial". Implemented by the MySQL-backed primary and
/// the Redis-backed secondary; both are driven identically by the resolver.
pub trait LookupSource: Send + Sync {
    /// Start the lookup as a background task bound to `cancel`, returning a
    /// receiver that will carry exactly one [`LookupResponse`]. Cancelling
    /// `cancel` must cause the spawned task to stop promptly without
    /// panicking if the receiver has already been dropped.
    fn lookup(&self, request: &ParsedRequest, cancel: CancellationToken) -> oneshot::Receiver<LookupResponse>;
}
