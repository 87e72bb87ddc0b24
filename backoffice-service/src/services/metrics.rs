use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use prometheus::{IntCounterVec, Opts, Registry};
use std::sync::OnceLock;

pub static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();
pub static PROMETHEUS_REGISTRY: OnceLock<Registry> = OnceLock::new();
pub static PAYMENTS_RECORDED_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();
pub static PAYMENT_VOLUME_CENTS_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();

pub fn init_metrics() {
    if METRICS_HANDLE.get().is_some() {
        return;
    }

    let builder = PrometheusBuilder::new();
    let handle = builder
        .install_recorder()
        .expect("failed to install Prometheus recorder");

    if METRICS_HANDLE.set(handle).is_err() {
        return;
    }

    let registry = Registry::new();

    let payments_counter = IntCounterVec::new(
        Opts::new(
            "backoffice_payments_recorded_total",
            "Payments recorded against invoices, by settlement classification",
        ),
        &["settlement"],
    )
    .expect("Failed to create backoffice_payments_recorded_total metric");

    let volume_counter = IntCounterVec::new(
        Opts::new(
            "backoffice_payment_volume_cents_total",
            "Payment volume applied to invoices, in cents, by currency",
        ),
        &["currency"],
    )
    .expect("Failed to create backoffice_payment_volume_cents_total metric");

    registry
        .register(Box::new(payments_counter.clone()))
        .expect("Failed to register backoffice_payments_recorded_total");
    registry
        .register(Box::new(volume_counter.clone()))
        .expect("Failed to register backoffice_payment_volume_cents_total");

    PROMETHEUS_REGISTRY
        .set(registry)
        .expect("Failed to set prometheus registry");
    PAYMENTS_RECORDED_TOTAL
        .set(payments_counter)
        .expect("Failed to set backoffice_payments_recorded_total");
    PAYMENT_VOLUME_CENTS_TOTAL
        .set(volume_counter)
        .expect("Failed to set backoffice_payment_volume_cents_total");
}

pub fn get_metrics() -> String {
    let mut output = METRICS_HANDLE
        .get()
        .map(|handle| handle.render())
        .unwrap_or_else(|| "# Metrics recorder not initialized\n".to_string());

    if let Some(registry) = PROMETHEUS_REGISTRY.get() {
        use prometheus::Encoder;
        let encoder = prometheus::TextEncoder::new();
        let metric_families = registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer).ok();
        if let Ok(custom_metrics) = String::from_utf8(buffer) {
            output.push_str(&custom_metrics);
        }
    }

    output
}

/// Record an applied payment for reporting.
pub fn record_payment(settlement: &str, currency: &str, amount: f64) {
    if let Some(counter) = PAYMENTS_RECORDED_TOTAL.get() {
        counter.with_label_values(&[settlement]).inc();
    }
    if let Some(counter) = PAYMENT_VOLUME_CENTS_TOTAL.get() {
        let cents = (amount * 100.0).round().max(0.0) as u64;
        counter.with_label_values(&[currency]).inc_by(cents);
    }
}
