//! Hand-built OCSP request/response DER for integration tests. Mirrors the
//! fixture helpers in `resolver.rs`'s own unit tests; duplicated rather than
//! shared because an integration test file can't reach into a library
//! crate's `#[cfg(test)]` module.
#![allow(dead_code)]

use rasn::types::{GeneralizedTime, Integer, ObjectIdentifier, OctetString};
use rasn_ocsp::{
    BasicOcspResponse, CertId, CertStatus as WireCertStatus, OcspRequest, OcspResponse,
    OcspResponseStatus, Request as WireRequest, ResponderId, ResponseBytes, ResponseData,
    RevokedInfo, SingleResponse, TbsRequest,
};
use rasn_pkix::AlgorithmIdentifier;

const SHA1_OID: [u32; 6] = [1, 3, 14, 3, 2, 26];
pub const TEST_KEY_HASH: [u8; 20] = [0xab; 20];

fn sha1_algorithm_identifier() -> AlgorithmIdentifier {
    AlgorithmIdentifier {
        algorithm: ObjectIdentifier::new(SHA1_OID.to_vec()).unwrap(),
        parameters: None,
    }
}

fn cert_id(serial: i64) -> CertId {
    CertId {
        hash_algorithm: sha1_algorithm_identifier(),
        issuer_name_hash: OctetString::from(vec![0u8; 20]),
        issuer_key_hash: OctetString::from(TEST_KEY_HASH.to_vec()),
        serial_number: Integer::from(serial),
    }
}

pub fn build_request_der(serial: i64) -> Vec<u8> {
    let request = OcspRequest {
        tbs_request: TbsRequest {
            version: Integer::from(0),
            requestor_name: None,
            request_list: vec![WireRequest {
                req_cert: cert_id(serial),
                single_request_extensions: None,
            }],
            request_extensions: None,
        },
        optional_signature: None,
    };
    rasn::der::encode(&request).unwrap()
}

fn build_response_der(serial: i64, status: WireCertStatus) -> Vec<u8> {
    let single = SingleResponse {
        cert_id: cert_id(serial),
        cert_status: status,
        this_update: GeneralizedTime::from(chrono::Utc::now()),
        next_update: None,
        single_extensions: None,
    };
    let basic = BasicOcspResponse {
        tbs_response_data: ResponseData {
            version: Integer::from(0),
            responder_id: ResponderId::ByKey(OctetString::from(TEST_KEY_HASH.to_vec())),
            produced_at: GeneralizedTime::from(chrono::Utc::now()),
            responses: vec![single],
            response_extensions: None,
        },
        signature_algorithm: sha1_algorithm_identifier(),
        signature: Default::default(),
        certs: None,
    };
    let basic_der = rasn::der::encode(&basic).unwrap();
    let response = OcspResponse {
        status: OcspResponseStatus::Successful,
        bytes: Some(ResponseBytes {
            r#type: ObjectIdentifier::new(SHA1_OID.to_vec()).unwrap(),
            response: OctetString::from(basic_der),
        }),
    };
    rasn::der::encode(&response).unwrap()
}

pub fn good_response_der(serial: i64) -> Vec<u8> {
    build_response_der(serial, WireCertStatus::Good)
}

pub fn revoked_response_der(serial: i64) -> Vec<u8> {
    build_response_der(
        serial,
        WireCertStatus::Revoked(RevokedInfo {
            revocation_time: GeneralizedTime::from(chrono::Utc::now()),
            revocation_reason: None,
        }),
    )
}
