use lazy_static::lazy_static;
use prometheus::{CounterVec, Encoder, IntCounter, IntGauge, Opts, Registry, TextEncoder};

/// Metric name prefix for all catalog sync metrics
const PREFIX: &str = "catalog_sync";

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();

    pub static ref UPSERTS_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_upserts_total"), "Upserts by outcome"),
        &["outcome"]
    ).expect("Failed to create upserts_total metric");

    pub static ref FIELDS_WRITTEN_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_fields_written_total"), "Fields overwritten by upserts"),
        &["field"]
    ).expect("Failed to create fields_written_total metric");

    pub static ref PROTECTED_SKIPS_TOTAL: CounterVec = CounterVec::new(
        Opts::new(
            format!("{PREFIX}_protected_skips_total"),
            "Incoming values dropped because the field is read-only"
        ),
        &["field"]
    ).expect("Failed to create protected_skips_total metric");

    pub static ref COMMITS_TOTAL: IntCounter = IntCounter::new(
        format!("{PREFIX}_commits_total"),
        "Batches committed to the store"
    ).expect("Failed to create commits_total metric");

    pub static ref STAGED_RECORDS: IntGauge = IntGauge::new(
        format!("{PREFIX}_staged_records"),
        "Records staged and not yet committed"
    ).expect("Failed to create staged_records metric");
}

/// Register all metrics with the crate registry
pub fn init_metrics() {
    // Ignore errors if already registered (for tests)
    let _ = REGISTRY.register(Box::new(UPSERTS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(FIELDS_WRITTEN_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(PROTECTED_SKIPS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(COMMITS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(STAGED_RECORDS.clone()));

    tracing::debug!("Metrics initialized");
}

pub fn record_upsert(outcome: &str) {
    UPSERTS_TOTAL.with_label_values(&[outcome]).inc();
}

pub fn record_field_written(field: &str) {
    FIELDS_WRITTEN_TOTAL.with_label_values(&[field]).inc();
}

pub fn record_protected_skip(field: &str) {
    PROTECTED_SKIPS_TOTAL.with_label_values(&[field]).inc();
}

pub fn record_commit(staged_after: usize) {
    COMMITS_TOTAL.inc();
    STAGED_RECORDS.set(staged_after as i64);
}

pub fn set_staged_records(count: usize) {
    STAGED_RECORDS.set(count as i64);
}

/// Render the registry in Prometheus text exposition format.
pub fn render() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!("Failed to encode metrics: {}", e);
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}
