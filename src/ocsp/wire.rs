//! DER encode/decode for `OCSPResponse` and the handful of unsigned
//! error-status responses this responder is allowed to manufacture itself.
//!
//! Built on the `rasn-ocsp` ASN.1 module definitions (the `rasn` project's
//! own `standards/ocsp` crate) rather than hand-pushing raw DER tag bytes.

use rasn_ocsp::{BasicOcspResponse, CertStatus as WireCertStatus, OcspResponse, OcspResponseStatus};

use crate::error::ResolveError;

/// The three statuses a `CertStatus` choice can resolve to, stripped of the
/// ASN.1 payload we don't need (revocation time/reason are not compared —
/// only the coarse status is, per the resolver's safety property).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CertStatus {
    Good,
    Revoked,
    Unknown,
}

impl From<&WireCertStatus> for CertStatus {
    fn from(status: &WireCertStatus) -> Self {
        match status {
            WireCertStatus::Good => CertStatus::Good,
            WireCertStatus::Revoked(_) => CertStatus::Revoked,
            WireCertStatus::Unknown(_) => CertStatus::Unknown,
        }
    }
}

/// The parts of a stored, pre-signed `OCSPResponse` the resolver needs:
/// the single certificate's status, and its canonical serial (used by
/// static-file indexing to learn which serial a stored response covers).
#[derive(Debug, Clone)]
pub struct ParsedResponse {
    pub status: CertStatus,
    pub serial_hex: String,
}

/// Decode a stored/returned `OCSPResponse` and pull out the single
/// response's status. Fails if the response isn't `successful`, has no
/// response bytes, isn't parseable as `BasicOCSPResponse`, or has no
/// (or more than one) `SingleResponse` — this responder only ever deals in
/// single-certificate requests.
pub fn parse_response(der: &[u8]) -> Result<ParsedResponse, ResolveError> {
    let response: OcspResponse = rasn::der::decode(der)
        .map_err(|e| ResolveError::internal(format!("failed to decode OCSPResponse: {e}")))?;

    if response.status != OcspResponseStatus::Successful {
        return Err(ResolveError::internal(format!(
            "stored response is not successful: {:?}",
            response.status
        )));
    }

    let response_bytes = response
        .bytes
        .as_ref()
        .ok_or_else(|| ResolveError::internal("successful response missing responseBytes"))?;

    let basic: BasicOcspResponse = rasn::der::decode(response_bytes.response.as_ref())
        .map_err(|e| ResolveError::internal(format!("failed to decode BasicOCSPResponse: {e}")))?;

    let single = basic
        .tbs_response_data
        .responses
        .first()
        .ok_or_else(|| ResolveError::internal("BasicOCSPResponse has no SingleResponse"))?;

    let serial_hex = crate::serial::to_canonical_hex(&single.cert_id.serial_number.to_signed_bytes_be());

    Ok(ParsedResponse {
        status: CertStatus::from(&single.cert_status),
        serial_hex,
    })
}

/// Build the DER bytes for an unsigned `OCSPResponse` carrying only a
/// non-successful `OCSPResponseStatus` (no `responseBytes`). This is the
/// entire shape of every error response this responder ever emits — it
/// never signs anything of its own.
pub fn build_error_response(status: OcspResponseStatus) -> Vec<u8> {
    let response = OcspResponse {
        status,
        bytes: None,
    };
    // Encoding a response with no optional fields set cannot fail.
    rasn::der::encode(&response).unwrap_or_default()
}

/// Map a [`ResolveError`] straight to its unsigned wire response.
pub fn error_response_for(err: &ResolveError) -> Vec<u8> {
    build_error_response(err.wire_status())
}
