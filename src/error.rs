//! Internal error taxonomy.
//!
//! Every layer of the pipeline — admission, the two lookups, the resolver —
//! maps its failures into one of these four variants. The HTTP surface maps
//! them back out into an RFC 6960 response status; nothing downstream of
//! `resolver::resolve` ever sees a raw DB or cache error type.

use thiserror::Error;

/// Taxonomy used internally by the admission filter, both lookups, and the
/// resolver.
#[derive(Debug, Error, Clone)]
pub enum ResolveError {
    /// Admission rejected the request, or the backing store has no usable
    /// row for this serial (missing, expired, unpopulated, issuer mismatch).
    #[error("not found: {0}")]
    NotFound(String),

    /// The inbound request could not be decoded as a DER `OCSPRequest`.
    #[error("malformed request: {0}")]
    MalformedRequest(String),

    /// A backing store failed, or a stored response failed to parse as a
    /// structurally valid OCSP response.
    #[error("internal error: {0}")]
    Internal(String),

    /// The request's context was cancelled or its deadline elapsed before a
    /// verdict was reached.
    #[error("cancelled")]
    Cancelled,
}

impl ResolveError {
    pub fn not_found(reason: impl Into<String>) -> Self {
        Self::NotFound(reason.into())
    }

    pub fn internal(reason: impl Into<String>) -> Self {
        Self::Internal(reason.into())
    }

    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedRequest(reason.into())
    }

    /// The RFC 6960 `OCSPResponseStatus` this error maps to on the wire.
    pub fn wire_status(&self) -> rasn_ocsp::OcspResponseStatus {
        match self {
            Self::NotFound(_) => rasn_ocsp::OcspResponseStatus::Unauthorized,
            Self::MalformedRequest(_) => rasn_ocsp::OcspResponseStatus::MalformedRequest,
            Self::Internal(_) => rasn_ocsp::OcspResponseStatus::InternalError,
            // Cancellation never reaches the wire as a status: the HTTP
            // surface closes the connection instead. TryLater is supplied
            // here only for callers that need a response byte string anyway.
            Self::Cancelled => rasn_ocsp::OcspResponseStatus::TryLater,
        }
    }
}
