// Reporting for partitioned cache simulations

use crate::models::{CsvResultRow, Report};
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::fs::File;
use std::io::{self, BufWriter};
use std::path::Path;

/// Presents a completed [`Report`], optionally with cache-wide metrics.
pub struct SimulationStats<'a> {
    report: &'a Report,
    metrics: Option<BTreeMap<String, f64>>,
}

impl<'a> SimulationStats<'a> {
    pub fn new(report: &'a Report) -> Self {
        Self {
            report,
            metrics: None,
        }
    }

    /// Attach metrics from [`CacheMetrics::metrics`](partitioned_cache::CacheMetrics::metrics).
    pub fn with_metrics(mut self, metrics: BTreeMap<String, f64>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Per-core lines followed by the totals line.
    pub fn summary(&self) -> String {
        let mut out = String::new();
        for core in &self.report.cores {
            let _ = writeln!(
                out,
                "Core {}: Hits = {}, Misses = {}, Hit Rate = {:.2}%",
                core.core_id,
                core.hits,
                core.misses,
                core.hit_rate * 100.0
            );
        }
        let _ = writeln!(
            out,
            "Total: Hits = {}, Misses = {}, Overall Hit Rate = {:.2}%",
            self.report.total_hits,
            self.report.total_misses,
            self.report.overall_hit_rate * 100.0
        );
        out
    }

    /// Print the summary and, when attached, the cache metrics.
    pub fn print_summary(&self) {
        print!("{}", self.summary());

        if let Some(metrics) = &self.metrics {
            println!("\nCache Metrics");
            println!("=============");
            for (name, value) in metrics {
                println!("{:<12} {:>14.4}", name, value);
            }
        }
    }

    /// Rows as exported to CSV: one per core, then a `total` row.
    pub fn csv_rows(&self) -> Vec<CsvResultRow> {
        let mut rows: Vec<CsvResultRow> = self
            .report
            .cores
            .iter()
            .map(|core| CsvResultRow {
                core: core.core_id.to_string(),
                ways: core.ways().to_string(),
                hits: core.hits,
                misses: core.misses,
                hit_rate: core.hit_rate * 100.0,
            })
            .collect();
        rows.push(CsvResultRow {
            core: "total".to_string(),
            ways: String::new(),
            hits: self.report.total_hits,
            misses: self.report.total_misses,
            hit_rate: self.report.overall_hit_rate * 100.0,
        });
        rows
    }

    /// Export results to a CSV file
    pub fn export_csv<P: AsRef<Path>>(&self, path: P) -> io::Result<()> {
        let mut writer = csv::Writer::from_path(path)?;
        for row in self.csv_rows() {
            writer.serialize(row)?;
        }
        writer.flush()?;
        Ok(())
    }

    /// The report as pretty-printed JSON.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self.report)
    }

    /// Write [`to_json`](Self::to_json) output to a file.
    pub fn export_json<P: AsRef<Path>>(&self, path: P) -> io::Result<()> {
        let writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(writer, self.report)?;
        Ok(())
    }
}
