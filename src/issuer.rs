//! Issuer descriptors and the admission filter.
//!
//! Issuer certificates are parsed once at startup into an immutable
//! [`AdmissionFilter`]; everything after construction is read-only, so the
//! filter is shared across request tasks behind a plain `Arc` with no
//! locking — there's nothing to guard once construction finishes.

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use sha1::{Digest, Sha1};
use sha2::Sha256;
use x509_parser::prelude::*;

use crate::config::IssuerConfig;
use crate::ocsp::ParsedRequest;
use crate::ocsp::request::is_sha1;

/// SHA-1 over the raw `subjectPublicKey` BIT STRING contents — not the full
/// SPKI wrapper. RFC 6960 / RFC 4055 / RFC 5480.
pub type IssuerKeyHash = [u8; 20];

#[derive(Debug, Clone)]
struct IssuerEntry {
    key_hash: IssuerKeyHash,
}

/// Owns the three immutable maps the admission filter consults, plus the
/// configured serial prefixes. Built once at startup from the configured
/// issuer certificates; never mutated afterward.
pub struct AdmissionFilter {
    by_issuer_id: HashMap<u64, IssuerEntry>,
    by_issuer_name_id: HashMap<u64, IssuerEntry>,
    key_hashes: Vec<IssuerKeyHash>,
    serial_prefixes: Vec<String>,
}

/// Why the admission filter rejected a request — folded into
/// [`crate::error::ResolveError::NotFound`] at the call site.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    UnsupportedHashAlgorithm,
    UnknownIssuer,
    DisallowedSerialPrefix,
}

impl Rejection {
    pub fn reason(&self) -> &'static str {
        match self {
            Self::UnsupportedHashAlgorithm => "unsupported hash algorithm",
            Self::UnknownIssuer => "wrong issuer",
            Self::DisallowedSerialPrefix => "wrong serial prefix",
        }
    }
}

impl AdmissionFilter {
    /// Load and parse every configured issuer certificate, deriving
    /// `IssuerID` and `IssuerNameID` for each, then freeze.
    pub fn load(issuers: &[IssuerConfig], serial_prefixes: &[String]) -> Result<Self> {
        let mut by_issuer_id = HashMap::new();
        let mut by_issuer_name_id = HashMap::new();
        let mut key_hashes = Vec::new();

        for issuer in issuers {
            let der = std::fs::read(&issuer.cert_path)
                .with_context(|| format!("reading issuer cert {}", issuer.cert_path.display()))?;
            let der = pem_or_der(&der, &issuer.cert_path)?;
            let (_, cert) = X509Certificate::from_der(&der)
                .with_context(|| format!("parsing issuer cert {}", issuer.cert_path.display()))?;

            let spki_bits = cert.public_key().subject_public_key.data.as_ref();
            let key_hash: IssuerKeyHash = Sha1::digest(spki_bits).into();

            let issuer_id = legacy_issuer_id(&der);
            let issuer_name_id = issuer_name_id(&cert);

            let entry = IssuerEntry { key_hash };
            by_issuer_id.insert(issuer_id, entry.clone());
            by_issuer_name_id.insert(issuer_name_id, entry);
            key_hashes.push(key_hash);
        }

        Ok(Self {
            by_issuer_id,
            by_issuer_name_id,
            key_hashes,
            serial_prefixes: serial_prefixes.to_vec(),
        })
    }

    /// Evaluate the three admission rules in order; first failure wins.
    pub fn check(&self, request: &ParsedRequest) -> Result<(), Rejection> {
        if !is_sha1(&request.hash_algorithm_oid) {
            return Err(Rejection::UnsupportedHashAlgorithm);
        }

        let known = self
            .key_hashes
            .iter()
            .any(|h| h.as_slice() == request.issuer_key_hash.as_slice());
        if !known {
            return Err(Rejection::UnknownIssuer);
        }

        if !self.serial_prefixes.is_empty()
            && !self
                .serial_prefixes
                .iter()
                .any(|prefix| request.serial_hex.starts_with(prefix.as_str()))
        {
            return Err(Rejection::DisallowedSerialPrefix);
        }

        Ok(())
    }

    /// Build a filter directly from already-known key hashes, bypassing
    /// certificate parsing. Used by the resolver's own tests and by callers
    /// wiring the `LookupSource` trait against fakes — the resolver needs to
    /// be testable without a real DB or cache, and that means without real
    /// certificates either. Gated by the `test-util` feature rather than
    /// `cfg(test)` alone so that integration tests under `tests/`, which
    /// depend on this crate like any other, can reach it too.
    #[cfg(any(test, feature = "test-util"))]
    pub fn for_testing(key_hashes: Vec<IssuerKeyHash>, serial_prefixes: Vec<String>) -> Self {
        Self {
            by_issuer_id: HashMap::new(),
            by_issuer_name_id: HashMap::new(),
            key_hashes,
            serial_prefixes,
        }
    }

    /// `responseMatchesIssuer`: resolve `issuer_id` against
    /// `IssuerNameID` first, falling back to the legacy `IssuerID` map; the
    /// resulting key hash must equal the request's `issuerKeyHash`.
    pub fn response_matches_issuer(&self, issuer_id: u64, request: &ParsedRequest) -> bool {
        let entry = self
            .by_issuer_name_id
            .get(&issuer_id)
            .or_else(|| self.by_issuer_id.get(&issuer_id));
        match entry {
            Some(entry) => entry.key_hash.as_slice() == request.issuer_key_hash.as_slice(),
            None => false,
        }
    }
}

/// Accept either a PEM-armored or raw-DER issuer certificate file.
fn pem_or_der(bytes: &[u8], path: &Path) -> Result<Vec<u8>> {
    if bytes.starts_with(b"-----BEGIN") {
        let pem = x509_parser::pem::Pem::iter_from_buffer(bytes)
            .next()
            .with_context(|| format!("no PEM block in {}", path.display()))?
            .with_context(|| format!("invalid PEM in {}", path.display()))?;
        Ok(pem.contents)
    } else {
        Ok(bytes.to_vec())
    }
}

/// Legacy `IssuerID`: derived from the full issuer certificate (SHA-256 over
/// the whole certificate DER, truncated to 64 bits). There is no single
/// canonical algorithm for this identifier across CA deployments; this
/// responder only needs it to be stable and collision-free across its own
/// configured issuer set, which a cryptographic hash guarantees in practice.
fn legacy_issuer_id(cert_der: &[u8]) -> u64 {
    let digest = Sha256::digest(cert_der);
    u64::from_be_bytes(digest[..8].try_into().unwrap())
}

/// `IssuerNameID`: derived from the issuer's distinguished name and public
/// key together (SHA-256 over `raw_subject || subjectPublicKey bits`,
/// truncated to 64 bits), matching RFC 6960's guidance that it (unlike the
/// legacy ID) binds name and key rather than the whole certificate.
fn issuer_name_id(cert: &X509Certificate) -> u64 {
    let mut hasher = Sha256::new();
    hasher.update(cert.subject().as_raw());
    hasher.update(cert.public_key().subject_public_key.data.as_ref());
    let digest = hasher.finalize();
    u64::from_be_bytes(digest[..8].try_into().unwrap())
}
