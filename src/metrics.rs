//! Metrics & Observability.
//!
//! The `metrics` facade paired with `metrics-exporter-prometheus`. The
//! exporter runs its own tiny HTTP listener (`metrics_listen_addr`),
//! separate from the OCSP surface, so scraping never competes with
//! request traffic.

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{Context, Result};
use metrics_exporter_prometheus::PrometheusBuilder;

use crate::resolver::{LookupResult, SourceUsed};

const LOOKUPS_COUNTER: &str = "ocsp_lookups";
const SOURCE_USED_COUNTER: &str = "lookup_source_used";
const DB_MAX_CONNECTIONS_GAUGE: &str = "ocsp_db_max_connections";
const HTTP_REQUESTS_COUNTER: &str = "http_requests_total";
const HTTP_REQUEST_DURATION_HISTOGRAM: &str = "http_request_duration_seconds";

/// Install the global Prometheus recorder and, if `listen_addr` is set,
/// bind its scrape endpoint. Must run once at startup before any counter is
/// incremented.
pub fn install(listen_addr: Option<SocketAddr>) -> Result<()> {
    let builder = PrometheusBuilder::new();
    let builder = match listen_addr {
        Some(addr) => builder.with_http_listener(addr),
        None => builder,
    };
    builder
        .install()
        .context("failed to install Prometheus metrics recorder")
}

fn lookup_result_label(result: LookupResult) -> &'static str {
    match result {
        LookupResult::Canceled => "canceled",
        LookupResult::MysqlSuccess => "mysql_success",
        LookupResult::MysqlFailed => "mysql_failed",
        LookupResult::RedisSuccess => "redis_success",
        LookupResult::RedisFailed => "redis_failed",
        LookupResult::RedisMismatch => "redis_mismatch",
    }
}

fn source_used_label(source: SourceUsed) -> &'static str {
    match source {
        SourceUsed::Mysql => "mysql",
        SourceUsed::Redis => "redis",
        SourceUsed::ErrorReturned => "error_returned",
    }
}

/// Increment the two fixed-label-set counters exactly once per served
/// request: exactly one of `lookup_source_used{source=...}` is incremented
/// per served request.
pub fn record_resolve(result: LookupResult, source: SourceUsed) {
    metrics::counter!(LOOKUPS_COUNTER, "result" => lookup_result_label(result)).increment(1);
    metrics::counter!(SOURCE_USED_COUNTER, "source" => source_used_label(source)).increment(1);
}

/// Set once at startup: the pool's configured maximum connection count.
pub fn set_db_max_connections(max_connections: u32) {
    metrics::gauge!(DB_MAX_CONNECTIONS_GAUGE).set(max_connections as f64);
}

/// One counter increment and one histogram observation per HTTP request,
/// labeled by method and response status, mirroring the
/// `http_requests_total` / `http_request_duration_seconds` pairing common
/// across this codebase's surrounding ecosystem. Called from the
/// axum middleware wrapping every route, not from `resolver::resolve`
/// itself, since root `/` and framing-rejected requests never reach it.
pub fn record_http_request(method: &str, status: u16, duration: Duration) {
    let status = status.to_string();
    metrics::counter!(HTTP_REQUESTS_COUNTER, "method" => method.to_string(), "status" => status.clone())
        .increment(1);
    metrics::histogram!(HTTP_REQUEST_DURATION_HISTOGRAM, "method" => method.to_string(), "status" => status)
        .record(duration.as_secs_f64());
}
