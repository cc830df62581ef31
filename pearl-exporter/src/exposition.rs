//! Text exposition of a metric snapshot.
//!
//! Each call builds a fresh `prometheus_client` registry that lives only as
//! long as the encoding, so nothing carries over between scrapes.

use std::sync::atomic::AtomicU64;

use prometheus_client::encoding::text::encode as encode_registry;
use prometheus_client::metrics::family::Family;
use prometheus_client::metrics::gauge::Gauge;
use prometheus_client::registry::Registry;
use thiserror::Error;

use crate::mapping::{MetricFamily, MetricSnapshot};

/// Content type of [`encode`] output.
pub const CONTENT_TYPE: &str = "application/openmetrics-text; version=1.0.0; charset=utf-8";

type FloatGauge = Gauge<f64, AtomicU64>;
type LabeledGauges = Family<Vec<(String, String)>, FloatGauge>;

#[derive(Debug, Error)]
pub enum ExpositionError {
    #[error("Failed to encode metrics: {0}")]
    Encode(#[from] std::fmt::Error),
}

/// Encode a snapshot, prefixing every family name with `namespace`.
pub fn encode(snapshot: &MetricSnapshot, namespace: &str) -> Result<String, ExpositionError> {
    let mut registry = if namespace.is_empty() {
        Registry::default()
    } else {
        Registry::with_prefix(namespace)
    };

    for family in snapshot.families() {
        register_family(&mut registry, family);
    }

    let mut body = String::new();
    encode_registry(&mut body, &registry)?;
    Ok(body)
}

fn register_family(registry: &mut Registry, family: &MetricFamily) {
    let def = family.def;

    if def.labels.is_empty() {
        // Unlabeled families are plain gauges so they render without `{}`.
        let gauge = FloatGauge::default();
        if let Some(sample) = family.samples.last() {
            gauge.set(sample.value);
        }
        registry.register(def.name, def.help, gauge);
    } else {
        let gauges = LabeledGauges::default();
        for sample in &family.samples {
            gauges.get_or_create(&sample.labels).set(sample.value);
        }
        registry.register(def.name, def.help, gauges);
    }
}
