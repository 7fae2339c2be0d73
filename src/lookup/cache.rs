//! Secondary lookup: the fast cache.
//!
//! A `ConnectionManager` gives transparent reconnection so a single flaky
//! cache node just shows up as per-request errors, never a held lock or a
//! crashed task.

use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;

use crate::error::ResolveError;
use crate::lookup::{LookupResponse, LookupSource};
use crate::ocsp::ParsedRequest;

pub struct CacheLookup {
    manager: ConnectionManager,
}

impl CacheLookup {
    pub fn new(manager: ConnectionManager) -> Self {
        Self { manager }
    }

    async fn get(mut manager: ConnectionManager, serial_hex: &str) -> LookupResponse {
        let value: Option<Vec<u8>> = manager
            .get(serial_hex)
            .await
            .map_err(|e| ResolveError::internal(format!("cache get failed: {e}")))?;
        value.ok_or_else(|| ResolveError::not_found(format!("no cache entry for serial {serial_hex}")))
    }
}

impl LookupSource for CacheLookup {
    fn lookup(&self, request: &ParsedRequest, cancel: CancellationToken) -> oneshot::Receiver<LookupResponse> {
        let (tx, rx) = oneshot::channel();
        let manager = self.manager.clone();
        let serial_hex = request.serial_hex.clone();

        tokio::spawn(async move {
            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => Err(ResolveError::Cancelled),
                result = Self::get(manager, &serial_hex) => result,
            };
            let _ = tx.send(result);
        });

        rx
    }
}
