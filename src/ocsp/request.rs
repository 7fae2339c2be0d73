//! Inbound `OCSPRequest` decoding and admission-relevant extraction.
//!
//! An `OCSPRequest` can in principle carry a `TBSRequest` with more than one
//! `Request`, a `requestorName`, and an `optionalSignature`. This responder
//! only ever serves the first `Request`'s `CertID` — multi-cert requests
//! and signed requests are both out of scope; any
//! additional entries are silently ignored rather than rejected, matching
//! RFC 6960 §2.1's permissive reading.

use rasn_ocsp::{CertId as WireCertId, OcspRequest};

use crate::error::ResolveError;

/// The one `CertID` this responder acts on, with the serial already
/// rendered into its canonical lookup key.
#[derive(Debug, Clone)]
pub struct ParsedRequest {
    pub hash_algorithm_oid: rasn::types::ObjectIdentifier,
    pub issuer_name_hash: Vec<u8>,
    pub issuer_key_hash: Vec<u8>,
    pub serial_hex: String,
}

/// Decode a DER `OCSPRequest` and pull out its first `Request`'s `CertID`.
///
/// Fails with [`ResolveError::MalformedRequest`] if the bytes don't parse as
/// an `OCSPRequest`, or if `tbsRequest.requestList` is empty.
pub fn parse_request(der: &[u8]) -> Result<ParsedRequest, ResolveError> {
    let request: OcspRequest = rasn::der::decode(der)
        .map_err(|e| ResolveError::malformed(format!("failed to decode OCSPRequest: {e}")))?;

    let first = request
        .tbs_request
        .request_list
        .first()
        .ok_or_else(|| ResolveError::malformed("OCSPRequest has an empty requestList"))?;

    Ok(from_wire_cert_id(&first.req_cert))
}

fn from_wire_cert_id(cert_id: &WireCertId) -> ParsedRequest {
    let serial_hex = crate::serial::to_canonical_hex(&cert_id.serial_number.to_signed_bytes_be());
    ParsedRequest {
        hash_algorithm_oid: cert_id.hash_algorithm.algorithm.clone(),
        issuer_name_hash: cert_id.issuer_name_hash.to_vec(),
        issuer_key_hash: cert_id.issuer_key_hash.to_vec(),
        serial_hex,
    }
}

/// The SHA-1 algorithm OID, `1.3.14.3.2.26` — the only `hashAlgorithm` this
/// responder admits, the first of the admission filter's checks.
pub fn is_sha1(oid: &rasn::types::ObjectIdentifier) -> bool {
    oid.as_ref() == [1, 3, 14, 3, 2, 26]
}
