//! The race coordinator — the heart of the system.
//!
//! Safety property: the bytes returned to a client never represent a
//! less-severe status than what the primary source would currently report.
//! "Good" must never override a "Revoked" primary result. Every branch
//! below exists to preserve that property under every interleaving of
//! primary/secondary/cancellation.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::error;

use crate::error::ResolveError;
use crate::issuer::AdmissionFilter;
use crate::lookup::{LookupResponse, LookupSource};
use crate::ocsp::{request::parse_request, wire, ParsedRequest};

/// Which metric labels a single resolve should record. The HTTP
/// layer increments the actual counters; `resolve` only decides which ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupResult {
    Canceled,
    MysqlSuccess,
    MysqlFailed,
    RedisSuccess,
    RedisFailed,
    RedisMismatch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceUsed {
    Mysql,
    Redis,
    ErrorReturned,
}

/// Headers the resolver computes alongside a response.
#[derive(Debug, Clone, Default)]
pub struct ResponseHeaders {
    pub edge_cache_tag: Option<String>,
}

pub struct Resolved {
    pub bytes: LookupOutcome,
    pub headers: ResponseHeaders,
    pub lookup_result: LookupResult,
    pub source_used: SourceUsed,
}

/// Either the wire bytes to send, or the internal error that produced them
/// (the HTTP layer still needs an OCSP-shaped body even on error — see
/// `ocsp::wire::error_response_for`).
pub type LookupOutcome = Result<Vec<u8>, ResolveError>;

pub struct Resolver {
    admission: Arc<AdmissionFilter>,
    primary: Arc<dyn LookupSource>,
    secondary: Option<Arc<dyn LookupSource>>,
    request_timeout: Option<Duration>,
}

impl Resolver {
    pub fn new(
        admission: Arc<AdmissionFilter>,
        primary: Arc<dyn LookupSource>,
        secondary: Option<Arc<dyn LookupSource>>,
        request_timeout: Option<Duration>,
    ) -> Self {
        Self {
            admission,
            primary,
            secondary,
            request_timeout,
        }
    }

    /// Decode, admit, race, and arbitrate. `cancel` is the inbound request's own cancellation
    /// signal (dropped connection, server shutdown); a configured
    /// per-request timeout is layered on top of it here.
    pub async fn resolve(&self, der_request: &[u8], cancel: CancellationToken) -> Resolved {
        let request = match parse_request(der_request) {
            Ok(request) => request,
            Err(e) => {
                return Resolved {
                    bytes: Err(e),
                    headers: ResponseHeaders::default(),
                    lookup_result: LookupResult::MysqlFailed,
                    source_used: SourceUsed::ErrorReturned,
                }
            }
        };

        // Step 1: admission. On rejection neither backend is contacted.
        if let Err(rejection) = self.admission.check(&request) {
            return Resolved {
                bytes: Err(ResolveError::not_found(rejection.reason())),
                headers: ResponseHeaders::default(),
                lookup_result: LookupResult::MysqlFailed,
                source_used: SourceUsed::ErrorReturned,
            };
        }

        // Step 2: headers.
        let headers = ResponseHeaders {
            edge_cache_tag: crate::serial::edge_cache_tag(&request.serial_hex).map(str::to_owned),
        };

        // Step 3: bounded deadline, layered over the caller's own token. The
        // child fires when either the caller cancels or the timeout elapses;
        // nothing downstream needs to know which.
        let bounded = cancel.child_token();
        let timeout_guard = self.request_timeout.map(|timeout| {
            let bounded = bounded.clone();
            tokio::spawn(async move {
                tokio::time::sleep(timeout).await;
                bounded.cancel();
            })
        });

        let (result, lookup_result, source_used) = self.race(&request, bounded).await;

        if let Some(guard) = timeout_guard {
            guard.abort();
        }

        Resolved {
            bytes: result,
            headers,
            lookup_result,
            source_used,
        }
    }

    async fn race(
        &self,
        request: &ParsedRequest,
        cancel: CancellationToken,
    ) -> (LookupOutcome, LookupResult, SourceUsed) {
        let mut primary_rx = self.primary.lookup(request, cancel.clone());
        let secondary_rx = self.secondary.as_ref().map(|s| s.lookup(request, cancel.clone()));

        match secondary_rx {
            None => match self.await_primary(&cancel, &mut primary_rx).await {
                Ok(bytes) => (Ok(bytes), LookupResult::MysqlSuccess, SourceUsed::Mysql),
                Err(ResolveError::Cancelled) => {
                    (Err(ResolveError::Cancelled), LookupResult::Canceled, SourceUsed::ErrorReturned)
                }
                Err(e) => (Err(e), LookupResult::MysqlFailed, SourceUsed::ErrorReturned),
            },
            Some(mut secondary_rx) => {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => {
                        (Err(ResolveError::Cancelled), LookupResult::Canceled, SourceUsed::ErrorReturned)
                    }
                    primary = &mut primary_rx => {
                        self.on_primary_first(primary)
                    }
                    secondary = &mut secondary_rx => {
                        self.on_secondary_first(secondary, &cancel, &mut primary_rx).await
                    }
                }
            }
        }
    }

    fn on_primary_first(
        &self,
        primary: Result<LookupResponse, tokio::sync::oneshot::error::RecvError>,
    ) -> (LookupOutcome, LookupResult, SourceUsed) {
        let primary_result = flatten(primary);
        match primary_result {
            Err(ResolveError::Cancelled) => {
                (Err(ResolveError::Cancelled), LookupResult::Canceled, SourceUsed::ErrorReturned)
            }
            Err(e) => (Err(e), LookupResult::MysqlFailed, SourceUsed::ErrorReturned),
            Ok(bytes) => match wire::parse_response(&bytes) {
                Ok(_) => (Ok(bytes), LookupResult::MysqlSuccess, SourceUsed::Mysql),
                Err(e) => (Err(e), LookupResult::MysqlFailed, SourceUsed::ErrorReturned),
            },
        }
    }

    async fn on_secondary_first(
        &self,
        secondary: Result<LookupResponse, tokio::sync::oneshot::error::RecvError>,
        cancel: &CancellationToken,
        primary_rx: &mut tokio::sync::oneshot::Receiver<LookupResponse>,
    ) -> (LookupOutcome, LookupResult, SourceUsed) {
        // Secondary answered first, but safety requires waiting on primary
        // before trusting it.
        let primary_result = self.await_primary(cancel, primary_rx).await;

        let primary_bytes = match primary_result {
            Err(ResolveError::Cancelled) => {
                return (Err(ResolveError::Cancelled), LookupResult::Canceled, SourceUsed::ErrorReturned)
            }
            Err(e) => return (Err(e), LookupResult::MysqlFailed, SourceUsed::ErrorReturned),
            Ok(bytes) => bytes,
        };

        let primary_parsed = match wire::parse_response(&primary_bytes) {
            Ok(parsed) => parsed,
            Err(e) => return (Err(e), LookupResult::MysqlFailed, SourceUsed::ErrorReturned),
        };

        let secondary_result = flatten(secondary);
        let secondary_bytes = match secondary_result {
            Ok(bytes) => bytes,
            Err(_) => {
                // Secondary errored outright; primary already succeeded and
                // validated, so we still have an answer.
                return (Ok(primary_bytes), LookupResult::RedisFailed, SourceUsed::Mysql);
            }
        };

        let secondary_parsed = match wire::parse_response(&secondary_bytes) {
            Ok(parsed) => parsed,
            Err(_) => {
                return (Ok(primary_bytes), LookupResult::RedisFailed, SourceUsed::Mysql);
            }
        };

        if primary_parsed.status != secondary_parsed.status {
            error!(
                serial = %primary_parsed.serial_hex,
                primary = ?primary_parsed.status,
                secondary = ?secondary_parsed.status,
                "secondary cache disagrees with primary store"
            );
            return (Ok(primary_bytes), LookupResult::RedisMismatch, SourceUsed::Mysql);
        }

        (Ok(secondary_bytes), LookupResult::RedisSuccess, SourceUsed::Redis)
    }

    async fn await_primary(
        &self,
        cancel: &CancellationToken,
        primary_rx: &mut tokio::sync::oneshot::Receiver<LookupResponse>,
    ) -> LookupResponse {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(ResolveError::Cancelled),
            primary = primary_rx => flatten(primary),
        }
    }
}

fn flatten(received: Result<LookupResponse, tokio::sync::oneshot::error::RecvError>) -> LookupResponse {
    match received {
        Ok(result) => result,
        Err(_) => Err(ResolveError::internal("lookup task dropped its sender without replying")),
    }
}
