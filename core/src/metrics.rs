//! Lock-free counters and their Prometheus text rendering.

use dashmap::DashMap;
use serde::Serialize;
use std::{
    fmt::Write,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

pub const THROUGHPUT_COUNTER: &str = "uuid_variants_throughput";
pub const THROUGHPUT_HELP: &str = "Operation Throughput";

/// Handle to one counter series. Clones share the same value.
#[derive(Clone, Debug, Default)]
pub struct Counter(Arc<AtomicU64>);

impl Counter {
    pub fn increment(&self) { self.0.fetch_add(1, Ordering::Relaxed); }

    pub fn get(&self) -> u64 { self.0.load(Ordering::Relaxed) }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
struct SeriesKey {
    name: String,
    labels: Vec<(String, String)>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CounterSample {
    pub name: String,
    pub labels: Vec<(String, String)>,
    pub value: u64,
}

/// Registry shared by every pipeline of a run. Cloning is cheap.
#[derive(Clone, Default)]
pub struct MetricsRegistry {
    series: Arc<DashMap<SeriesKey, Counter>>,
    help: Arc<DashMap<String, String>>,
}

impl MetricsRegistry {
    pub fn new() -> Self {
        let registry = Self::default();
        registry.describe(THROUGHPUT_COUNTER, THROUGHPUT_HELP);
        registry
    }

    pub fn describe(&self, name: &str, help: &str) { self.help.insert(name.to_string(), help.to_string()); }

    /// Returns the counter for `name` and `labels`, creating it at zero. Label order does not matter.
    pub fn counter(&self, name: &str, labels: &[(&str, &str)]) -> Counter {
        let mut labels: Vec<(String, String)> = labels.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        labels.sort();
        self.series.entry(SeriesKey { name: name.to_string(), labels }).or_default().clone()
    }

    /// Current values, ordered by name then labels.
    pub fn snapshot(&self) -> Vec<CounterSample> {
        let mut samples: Vec<CounterSample> = self
            .series
            .iter()
            .map(|entry| CounterSample { name: entry.key().name.clone(), labels: entry.key().labels.clone(), value: entry.value().get() })
            .collect();
        samples.sort_by(|a, b| (&a.name, &a.labels).cmp(&(&b.name, &b.labels)));
        samples
    }

    /// Prometheus text exposition format, version 0.0.4.
    pub fn render(&self) -> String {
        let mut out = String::new();
        let mut current: Option<String> = None;
        for sample in self.snapshot() {
            if current.as_deref() != Some(sample.name.as_str()) {
                if let Some(help) = self.help.get(&sample.name) {
                    let _ = writeln!(out, "# HELP {} {}", sample.name, escape_help(help.value()));
                }
                let _ = writeln!(out, "# TYPE {} counter", sample.name);
                current = Some(sample.name.clone());
            }
            out.push_str(&sample.name);
            if !sample.labels.is_empty() {
                out.push('{');
                for (i, (key, value)) in sample.labels.iter().enumerate() {
                    if i > 0 {
                        out.push(',');
                    }
                    let _ = write!(out, "{}=\"{}\"", key, escape_label(value));
                }
                out.push('}');
            }
            let _ = writeln!(out, " {}", sample.value);
        }
        out
    }
}

fn escape_help(text: &str) -> String { text.replace('\\', "\\\\").replace('\n', "\\n") }

fn escape_label(text: &str) -> String { text.replace('\\', "\\\\").replace('"', "\\\"").replace('\n', "\\n") }
