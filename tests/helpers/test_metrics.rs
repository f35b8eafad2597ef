#![allow(dead_code)]
//! A simple in-memory metrics recorder for testing.

use metrics::{Counter, Gauge, Histogram, Key, KeyName, Metadata, Recorder, SharedString, Unit};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, Default)]
pub struct TestMetrics {
    counters: Arc<Mutex<HashMap<String, u64>>>,
    histograms: Arc<Mutex<HashMap<String, Vec<f64>>>>,
}

/// Renders a key as `name{label=value,...}` with labels sorted by name.
fn render(key: &Key) -> String {
    let mut labels: Vec<String> = key
        .labels()
        .map(|label| format!("{}={}", label.key(), label.value()))
        .collect();
    if labels.is_empty() {
        return key.name().to_string();
    }
    labels.sort();
    format!("{}{{{}}}", key.name(), labels.join(","))
}

impl TestMetrics {
    pub fn new() -> Self {
        Default::default()
    }

    /// Sum of a counter across every label set.
    pub fn get_counter(&self, name: &str) -> u64 {
        let prefix = format!("{name}{{");
        self.counters
            .lock()
            .unwrap()
            .iter()
            .filter(|(key, _)| *key == name || key.starts_with(&prefix))
            .map(|(_, value)| *value)
            .sum()
    }

    /// Value of a counter for one label set, given in any order.
    pub fn get_labeled_counter(&self, name: &str, labels: &[(&str, &str)]) -> u64 {
        let key = Key::from_parts(
            name.to_string(),
            labels
                .iter()
                .map(|(k, v)| metrics::Label::new(k.to_string(), v.to_string()))
                .collect::<Vec<_>>(),
        );
        self.counters
            .lock()
            .unwrap()
            .get(&render(&key))
            .cloned()
            .unwrap_or(0)
    }

    /// Number of samples recorded for a histogram across every label set.
    pub fn histogram_samples(&self, name: &str) -> usize {
        let prefix = format!("{name}{{");
        self.histograms
            .lock()
            .unwrap()
            .iter()
            .filter(|(key, _)| *key == name || key.starts_with(&prefix))
            .map(|(_, samples)| samples.len())
            .sum()
    }
}

impl Recorder for TestMetrics {
    fn describe_counter(&self, _key: KeyName, _unit: Option<Unit>, _description: SharedString) {}
    fn describe_gauge(&self, _key: KeyName, _unit: Option<Unit>, _description: SharedString) {}
    fn describe_histogram(&self, _key: KeyName, _unit: Option<Unit>, _description: SharedString) {}

    fn register_counter(&self, key: &Key, _metadata: &Metadata<'_>) -> Counter {
        Counter::from_arc(Arc::new(MetricCounter {
            key: render(key),
            counters: self.counters.clone(),
        }))
    }

    fn register_gauge(&self, _key: &Key, _metadata: &Metadata<'_>) -> Gauge {
        // Not implemented for this test helper
        Gauge::noop()
    }

    fn register_histogram(&self, key: &Key, _metadata: &Metadata<'_>) -> Histogram {
        Histogram::from_arc(Arc::new(MetricHistogram {
            key: render(key),
            histograms: self.histograms.clone(),
        }))
    }
}

#[derive(Debug)]
struct MetricCounter {
    key: String,
    counters: Arc<Mutex<HashMap<String, u64>>>,
}

impl metrics::CounterFn for MetricCounter {
    fn increment(&self, value: u64) {
        let mut counters = self.counters.lock().unwrap();
        *counters.entry(self.key.clone()).or_insert(0) += value;
    }

    fn absolute(&self, value: u64) {
        self.counters.lock().unwrap().insert(self.key.clone(), value);
    }
}

#[derive(Debug)]
struct MetricHistogram {
    key: String,
    histograms: Arc<Mutex<HashMap<String, Vec<f64>>>>,
}

impl metrics::HistogramFn for MetricHistogram {
    fn record(&self, value: f64) {
        self.histograms
            .lock()
            .unwrap()
            .entry(self.key.clone())
            .or_default()
            .push(value);
    }
}
