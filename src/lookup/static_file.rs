//! Static-file mode: an alternative to the DB-backed primary. A file holding a list of base64 DER OCSP
//! responses is decoded and indexed by serial once at startup; the racing
//! resolver is bypassed entirely in this mode, replaced by a plain
//! in-memory map lookup — there is nothing to race when every answer is
//! already resident in memory.

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use base64::Engine;

use crate::error::ResolveError;
use crate::ocsp::wire;

/// Built once at startup, then shared read-only. Used for long-lived root/intermediate responses that never
/// need the primary/secondary race.
pub struct StaticFileLookup {
    by_serial: HashMap<String, Vec<u8>>,
}

impl StaticFileLookup {
    /// Load `path`, a file of newline-separated base64 DER `OCSPResponse`
    /// values (blank lines and `#`-prefixed lines ignored), indexing each
    /// by the serial its `BasicOCSPResponse` certifies.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading static response file {}", path.display()))?;

        let mut by_serial = HashMap::new();
        for (line_no, line) in raw.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let der = base64::engine::general_purpose::STANDARD
                .decode(line)
                .with_context(|| format!("{}:{}: invalid base64", path.display(), line_no + 1))?;
            let parsed = wire::parse_response(&der)
                .with_context(|| format!("{}:{}: invalid OCSP response", path.display(), line_no + 1))?;
            by_serial.insert(parsed.serial_hex, der);
        }

        Ok(Self { by_serial })
    }

    /// Look up a pre-signed response by canonical serial. This is the
    /// entire lookup in static-file mode — no channel, no race, no
    /// cancellation: the answer is already in memory or it isn't.
    pub fn lookup(&self, serial_hex: &str) -> Result<Vec<u8>, ResolveError> {
        self.by_serial
            .get(serial_hex)
            .cloned()
            .ok_or_else(|| ResolveError::not_found(format!("no static response for serial {serial_hex}")))
    }
}
