//! Result rendering: fixed-width table lines and the JSON report.

use std::path::Path;

use serde::Serialize;

use pagelat_core::{ExperimentResult, Unit};

#[derive(Serialize)]
struct JsonReport<'a> {
    device: &'a str,
    size_bytes: u64,
    scenarios: Vec<JsonScenario<'a>>,
    sink: u8,
}

#[derive(Serialize)]
struct JsonScenario<'a> {
    label: &'a str,
    unit: &'a str,
    median_ns: f64,
    mean_ns: f64,
    samples: usize,
}

/// Collected output of one run.
pub struct Report {
    device: String,
    size_bytes: u64,
    results: Vec<ExperimentResult>,
    sink: u8,
}

impl Report {
    pub fn new(device: &Path, size_bytes: u64) -> Self {
        Self {
            device: device.display().to_string(),
            size_bytes,
            results: Vec::new(),
            sink: 0,
        }
    }

    /// `device: <path>  (<size> GB)` summary line.
    pub fn header(&self) -> String {
        format!(
            "device: {}  ({:.1} GB)",
            self.device,
            self.size_bytes as f64 / 1e9
        )
    }

    pub fn push(&mut self, result: ExperimentResult) {
        self.results.push(result);
    }

    pub fn set_sink(&mut self, sink: u8) {
        self.sink = sink;
    }

    /// Serialize the whole run as pretty JSON. Figures stay in nanoseconds
    /// regardless of the display unit.
    pub fn to_json(&self) -> anyhow::Result<String> {
        let report = JsonReport {
            device: &self.device,
            size_bytes: self.size_bytes,
            scenarios: self
                .results
                .iter()
                .map(|r| JsonScenario {
                    label: r.label,
                    unit: r.unit.suffix(),
                    median_ns: r.summary.median,
                    mean_ns: r.summary.mean,
                    samples: r.samples.len(),
                })
                .collect(),
            sink: self.sink,
        };
        Ok(serde_json::to_string_pretty(&report)?)
    }
}

/// One fixed-width result line: nanoseconds for the warm scenario,
/// microseconds for the rest.
pub fn render_line(result: &ExperimentResult) -> String {
    let s = &result.summary;
    match result.unit {
        Unit::Nanos => format!(
            "  {:<44} median={:>7.1} ns   mean={:>7.1} ns",
            result.label, s.median, s.mean
        ),
        Unit::Micros => format!(
            "  {:<44} median={:>7.2} us   mean={:>7.2} us",
            result.label,
            s.median / 1e3,
            s.mean / 1e3
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pagelat_core::Summary;

    fn fake_result(unit: Unit, median: f64, mean: f64) -> ExperimentResult {
        ExperimentResult {
            label: "2. minor fault (cached, no PTE)",
            unit,
            samples: vec![median; 4],
            summary: Summary { median, mean },
        }
    }

    #[test]
    fn test_render_line_nanos() {
        let line = render_line(&fake_result(Unit::Nanos, 38.25, 40.08));
        assert!(line.starts_with("  2. minor fault"));
        assert!(line.contains("median=   38.2 ns"), "line was: {line}");
        assert!(line.contains("mean=   40.1 ns"), "line was: {line}");
    }

    #[test]
    fn test_render_line_micros_divides_by_1000() {
        let line = render_line(&fake_result(Unit::Micros, 1920.0, 2100.0));
        assert!(line.contains("median=   1.92 us"));
        assert!(line.contains("mean=   2.10 us"));
    }

    #[test]
    fn test_render_line_label_column_is_44_wide() {
        let line = render_line(&fake_result(Unit::Micros, 1.0, 1.0));
        assert_eq!(line.find("median="), Some(2 + 44));
    }

    #[test]
    fn test_header_reports_gigabytes() {
        let report = Report::new(Path::new("/dev/sda"), 512_100_000_000);
        assert_eq!(report.header(), "device: /dev/sda  (512.1 GB)");
    }

    #[test]
    fn test_json_report_shape() {
        let mut report = Report::new(Path::new("/dev/sda"), 1_000_000_000);
        report.push(fake_result(Unit::Micros, 1500.0, 1600.0));
        report.set_sink(173);

        let json = report.to_json().unwrap();
        assert!(json.contains("\"device\": \"/dev/sda\""));
        assert!(json.contains("\"unit\": \"us\""));
        assert!(json.contains("\"median_ns\": 1500.0"));
        assert!(json.contains("\"sink\": 173"));
    }
}
