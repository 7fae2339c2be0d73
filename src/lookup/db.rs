//! Primary lookup: the authoritative database.
//!
//! An indexed-row-by-key query over `sqlx`, on the `mysql` feature rather
//! than `postgres` to match this responder's `mysql_*` metric names and a
//! MySQL-backed CA deployment.

use sqlx::mysql::MySqlPool;
use sqlx::Row;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::error::ResolveError;
use crate::issuer::AdmissionFilter;
use crate::lookup::{LookupResponse, LookupSource};
use crate::ocsp::ParsedRequest;

/// A single row as fetched from the `certificateStatus`-shaped table:
/// `{ serialNumber, ocspResponse, ocspLastUpdated, isExpired, issuerID }`.
struct CertificateStatusRow {
    ocsp_response: Vec<u8>,
    ocsp_last_updated: i64,
    is_expired: bool,
    issuer_id: i64,
}

pub struct DbLookup {
    pool: MySqlPool,
    admission: std::sync::Arc<AdmissionFilter>,
}

impl DbLookup {
    pub fn new(pool: MySqlPool, admission: std::sync::Arc<AdmissionFilter>) -> Self {
        Self { pool, admission }
    }

    async fn fetch(&self, serial_hex: &str) -> Result<Option<CertificateStatusRow>, sqlx::Error> {
        let row = sqlx::query(
            "SELECT ocspResponse, ocspLastUpdated, isExpired, issuerID \
             FROM certificateStatus WHERE serialNumber = ? LIMIT 1",
        )
        .bind(serial_hex)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|row| CertificateStatusRow {
            ocsp_response: row.get("ocspResponse"),
            ocsp_last_updated: row.get("ocspLastUpdated"),
            is_expired: row.get("isExpired"),
            issuer_id: row.get("issuerID"),
        }))
    }

    async fn resolve_one(&self, request: ParsedRequest) -> LookupResponse {
        let row = match self.fetch(&request.serial_hex).await {
            Ok(Some(row)) => row,
            Ok(None) => {
                return Err(ResolveError::not_found(format!(
                    "no row for serial {}",
                    request.serial_hex
                )))
            }
            Err(e) => return Err(ResolveError::internal(format!("db query failed: {e}"))),
        };

        if row.is_expired {
            info!(serial = %request.serial_hex, "primary row is expired");
            return Err(ResolveError::not_found("row is expired"));
        }
        if row.ocsp_last_updated == 0 {
            warn!(serial = %request.serial_hex, "signer has not yet populated this row");
            return Err(ResolveError::not_found("ocspLastUpdated is zero"));
        }
        if !self
            .admission
            .response_matches_issuer(row.issuer_id as u64, &request)
        {
            warn!(serial = %request.serial_hex, "stored row's issuer does not match request");
            return Err(ResolveError::not_found("issuer mismatch"));
        }

        Ok(row.ocsp_response)
    }
}

impl LookupSource for DbLookup {
    fn lookup(&self, request: &ParsedRequest, cancel: CancellationToken) -> oneshot::Receiver<LookupResponse> {
        let (tx, rx) = oneshot::channel();
        let request = request.clone();
        let pool = self.pool.clone();
        let admission = self.admission.clone();
        let worker = DbLookup { pool, admission };

        tokio::spawn(async move {
            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => Err(ResolveError::Cancelled),
                result = worker.resolve_one(request) => result,
            };
            // The receiver may already be gone (resolver abandoned this
            // lookup after the other side won); that's not an error here.
            let _ = tx.send(result);
        });

        rx
    }
}
