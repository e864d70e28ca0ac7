//! Flat metric reports and their persistence.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Mapping from metric name to value, ordered by name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MetricReport(BTreeMap<String, f64>);

impl MetricReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: f64) {
        self.0.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.0.get(name).copied()
    }

    /// Add every metric of `other`, overwriting equal names.
    pub fn merge(&mut self, other: MetricReport) {
        self.0.extend(other.0);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.0.iter().map(|(name, &value)| (name.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Write a report to `path`.
///
/// A `.csv` extension produces `metric,value` rows; anything else produces a
/// pretty-printed JSON object.
pub fn write_metrics<P: AsRef<Path>>(path: P, report: &MetricReport) -> Result<()> {
    let path = path.as_ref();
    let is_csv = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));

    if is_csv {
        let mut writer = csv::Writer::from_path(path)?;
        writer.write_record(["metric", "value"])?;
        for (name, value) in report.iter() {
            writer.write_record([name, value.to_string().as_str()])?;
        }
        writer.flush()?;
    } else {
        let mut writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(&mut writer, report)?;
        writer.write_all(b"\n")?;
        writer.flush()?;
    }
    Ok(())
}
