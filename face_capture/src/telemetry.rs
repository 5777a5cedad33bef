use opentelemetry::{
    global,
    metrics::{Counter, Histogram, MeterProvider},
    KeyValue,
};
use prometheus::Registry;
use std::collections::HashSet;

pub struct Metrics {
    snapshot_counter: Counter<u64>,
    snapshot_duration: Histogram<u64>,
    faces_detected: Counter<u64>,
    pub registry: Registry,
}

impl Metrics {
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();
        // TODO: opentelemetry-prometheus is deprecated, move to an OTLP exporter
        let exporter = opentelemetry_prometheus::exporter()
            .with_registry(registry.clone())
            .build()
            .map_err(|e| anyhow::anyhow!("failed to build prometheus exporter: {}", e))?;

        let provider = opentelemetry_sdk::metrics::SdkMeterProvider::builder()
            .with_reader(exporter)
            .build();

        let meter = provider.meter("face_capture");
        global::set_meter_provider(provider);

        let snapshot_counter = meter
            .u64_counter("snapshots_total")
            .with_description("Snapshot triggers by outcome")
            .build();

        let boundaries = generate_boundaries((50, 250, 500, 2000, 10000));

        let snapshot_duration = meter
            .u64_histogram("snapshot_duration_ms")
            .with_boundaries(boundaries)
            .with_description("Duration of capture, inference and render cycles in milliseconds")
            .build();

        let faces_detected = meter
            .u64_counter("faces_detected_total")
            .with_description("Faces returned by the recognition backend")
            .build();

        Ok(Metrics {
            snapshot_counter,
            snapshot_duration,
            faces_detected,
            registry,
        })
    }

    pub fn record_snapshot(&self, outcome: &str) {
        let attributes = vec![KeyValue::new("outcome", outcome.to_string())];
        self.snapshot_counter.add(1, &attributes);
    }

    pub fn record_snapshot_duration(&self, duration_ms: u64) {
        self.snapshot_duration.record(duration_ms, &[]);
    }

    pub fn record_faces_detected(&self, count: u64) {
        self.faces_detected.add(count, &[]);
    }
}

fn generate_boundaries(parts: (i32, i32, i32, i32, i32)) -> Vec<f64> {
    let first_step: usize = 50;
    let middle_step: usize = 50;
    let end_step: usize = 250;
    let tail_step: usize = 2000;
    let first_part = (parts.0..=parts.1).step_by(first_step);
    let middle_part = (parts.1..=parts.2).step_by(middle_step);
    let end_part = (parts.2..=parts.3).step_by(end_step);
    let tail_part = (parts.3..=parts.4).step_by(tail_step);

    let mut seen = HashSet::new();
    first_part
        .chain(middle_part)
        .chain(end_part)
        .chain(tail_part)
        .filter(|&x| seen.insert(x))
        .map(|x| x as f64)
        .collect()
}
