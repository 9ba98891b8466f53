//! CSV Exporter
//!
//! Flattens collected pulses into one `;`-delimited row per unique
//! indicator value. The first pulse carrying a value wins.
//!
//! Each row is encoded on its own and handed to the output in one piece,
//! so a failed write is attributed to exactly one indicator.

use std::collections::HashSet;
use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

use harvest_core::HarvestConfig;

use crate::CollectedPulse;

/// Column header of every export
pub const CSV_HEADER: [&str; 9] = [
    "Pulse Name",
    "Pulse ID",
    "Indicator Type",
    "Indicator",
    "Roles",
    "Title",
    "Date Added",
    "Active",
    "Related Pulses",
];

pub const CSV_DELIMITER: u8 = b';';

/// Errors that stop an export
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Failed to create {path}: {source}")]
    Create {
        path: PathBuf,
        source: io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Part of a row reached the output before the write failed
    #[error("Row for indicator {indicator} was only partially written: {source}")]
    PartialRow {
        indicator: String,
        source: io::Error,
    },
}

/// A row write that failed, with how many of its bytes reached the output
struct RowWriteError {
    written: usize,
    error: io::Error,
}

/// Writes collected pulses to CSV
#[derive(Debug, Clone)]
pub struct CsvExporter {
    max_indicators: usize,
}

impl CsvExporter {
    pub fn new(config: &HarvestConfig) -> Self {
        Self {
            max_indicators: config.max_indicators,
        }
    }

    /// Export to `path`, replacing any existing file.
    ///
    /// Returns the number of unique indicators written.
    pub fn export(&self, collected: &[CollectedPulse], path: &Path) -> Result<usize, ExportError> {
        let file = File::create(path).map_err(|source| ExportError::Create {
            path: path.to_path_buf(),
            source,
        })?;

        let written = self.export_to_writer(collected, file)?;
        debug!("Wrote {} rows to {}", written, path.display());
        Ok(written)
    }

    /// Export to any writer.
    ///
    /// A row that cannot be encoded, or whose write fails before any of its
    /// bytes reach `writer`, is logged and skipped. A write failing midway
    /// through a row is fatal. A value is marked as seen before its row is
    /// written, so a skipped row is not retried for a later pulse.
    pub fn export_to_writer<W: Write>(
        &self,
        collected: &[CollectedPulse],
        mut writer: W,
    ) -> Result<usize, ExportError> {
        let mut builder = csv::WriterBuilder::new();
        builder.delimiter(CSV_DELIMITER);

        let header = encode_row(&builder, CSV_HEADER)?;
        write_row(&mut writer, &header).map_err(|e| e.error)?;

        let mut seen: HashSet<&str> = HashSet::new();
        let mut written = 0usize;

        'pulses: for entry in collected {
            let pulse = &entry.pulse;
            let related = pulse.related_names().join(", ");

            for indicator in &entry.indicators {
                let value = indicator.value();
                if !seen.insert(value) {
                    continue;
                }

                let roles = indicator.roles();
                let active = indicator.active();
                let row = [
                    pulse.name(),
                    pulse.id(),
                    indicator.kind(),
                    value,
                    roles.as_str(),
                    indicator.title(),
                    indicator.created(),
                    active.as_str(),
                    related.as_str(),
                ];

                let encoded = match encode_row(&builder, row) {
                    Ok(encoded) => encoded,
                    Err(e) => {
                        warn!("Skipped problematic row (indicator: {}) due to error: {}", value, e);
                        continue;
                    }
                };

                match write_row(&mut writer, &encoded) {
                    Ok(()) => {}
                    Err(RowWriteError { written: 0, error }) => {
                        warn!("Skipped problematic row (indicator: {}) due to error: {}", value, error);
                        continue;
                    }
                    Err(RowWriteError { error, .. }) => {
                        return Err(ExportError::PartialRow {
                            indicator: value.to_string(),
                            source: error,
                        });
                    }
                }
                written += 1;

                if written >= self.max_indicators {
                    info!("Export reached {} unique indicators", self.max_indicators);
                    break 'pulses;
                }
            }
        }

        writer.flush()?;
        Ok(written)
    }
}

/// Encode a single record, terminator included
fn encode_row<'a>(
    builder: &csv::WriterBuilder,
    fields: impl IntoIterator<Item = &'a str>,
) -> Result<Vec<u8>, csv::Error> {
    let mut row = builder.from_writer(Vec::new());
    row.write_record(fields)?;
    row.into_inner().map_err(|e| csv::Error::from(e.into_error()))
}

/// Write an encoded row, reporting how far it got on failure
fn write_row<W: Write>(writer: &mut W, row: &[u8]) -> Result<(), RowWriteError> {
    let mut written = 0;
    while written < row.len() {
        match writer.write(&row[written..]) {
            Ok(0) => {
                return Err(RowWriteError {
                    written,
                    error: io::ErrorKind::WriteZero.into(),
                })
            }
            Ok(n) => written += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(error) => return Err(RowWriteError { written, error }),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::indicators;
    use harvest_core::{ActiveFlag, Indicator, Pulse, Role};

    fn export_string(exporter: &CsvExporter, collected: &[CollectedPulse]) -> (usize, String) {
        let mut buf = Vec::new();
        let count = exporter.export_to_writer(collected, &mut buf).unwrap();
        (count, String::from_utf8(buf).unwrap())
    }

    fn entry(pulse: Pulse, indicators: Vec<Indicator>) -> CollectedPulse {
        CollectedPulse { pulse, indicators }
    }

    /// Writer that fails one `write` call, optionally after accepting a few bytes
    struct FlakyWriter {
        out: Vec<u8>,
        calls: usize,
        fail_call: usize,
        accept_before_failing: usize,
    }

    impl FlakyWriter {
        fn failing_on(fail_call: usize) -> Self {
            Self {
                out: Vec::new(),
                calls: 0,
                fail_call,
                accept_before_failing: 0,
            }
        }

        fn short_on(fail_call: usize, accept: usize) -> Self {
            Self {
                accept_before_failing: accept,
                ..Self::failing_on(fail_call)
            }
        }
    }

    impl Write for FlakyWriter {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            let call = self.calls;
            self.calls += 1;

            if call == self.fail_call && self.accept_before_failing > 0 {
                let n = self.accept_before_failing.min(buf.len());
                self.out.extend_from_slice(&buf[..n]);
                // The rest of this row fails on the next call
                self.fail_call += 1;
                self.accept_before_failing = 0;
                return Ok(n);
            }
            if call == self.fail_call {
                return Err(io::Error::new(io::ErrorKind::Other, "disk hiccup"));
            }

            self.out.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_header_and_row_layout() {
        let indicator = Indicator::new("IPv4", "198.51.100.7")
            .with_role(Role::Many(vec!["c2".to_string(), "scanning_host".to_string()]))
            .with_title("C2 node")
            .with_created("2024-01-02T03:04:05")
            .with_active(ActiveFlag::Number(1));
        let pulse = Pulse::new("p1", "Botnet").with_related(&["Alpha", "Beta"]);

        let exporter = CsvExporter::new(&HarvestConfig::default());
        let (count, output) = export_string(&exporter, &[entry(pulse, vec![indicator])]);

        assert_eq!(count, 1);
        let lines: Vec<_> = output.lines().collect();
        assert_eq!(
            lines[0],
            "Pulse Name;Pulse ID;Indicator Type;Indicator;Roles;Title;Date Added;Active;Related Pulses"
        );
        assert_eq!(
            lines[1],
            "Botnet;p1;IPv4;198.51.100.7;c2,scanning_host;C2 node;2024-01-02T03:04:05;1;Alpha, Beta"
        );
    }

    #[test]
    fn test_missing_fields_are_empty() {
        let exporter = CsvExporter::new(&HarvestConfig::default());
        let (_, output) = export_string(
            &exporter,
            &[entry(Pulse::default(), vec![Indicator::new("domain", "x.example")])],
        );

        assert_eq!(output.lines().nth(1), Some(";;domain;x.example;;;;;"));
    }

    #[test]
    fn test_first_pulse_wins_duplicates() {
        let collected = vec![
            entry(Pulse::new("p1", "First"), indicators(&["a", "b", "a"])),
            entry(Pulse::new("p2", "Second"), indicators(&["b", "c"])),
        ];

        let exporter = CsvExporter::new(&HarvestConfig::default());
        let (count, output) = export_string(&exporter, &collected);

        assert_eq!(count, 3);
        let rows: Vec<Vec<&str>> = output.lines().skip(1).map(|l| l.split(';').collect()).collect();
        assert_eq!(rows.len(), 3);
        assert_eq!((rows[1][3], rows[1][1]), ("b", "p1"));
        assert_eq!((rows[2][3], rows[2][1]), ("c", "p2"));
    }

    #[test]
    fn test_export_cap() {
        let collected = vec![
            entry(Pulse::new("p1", "First"), indicators(&["a", "b"])),
            entry(Pulse::new("p2", "Second"), indicators(&["c", "d"])),
        ];

        let config = HarvestConfig::default().with_max_indicators(3);
        let (count, output) = export_string(&CsvExporter::new(&config), &collected);

        assert_eq!(count, 3);
        assert_eq!(output.lines().count(), 4);
        assert!(!output.contains(";d;"));
    }

    #[test]
    fn test_fields_with_delimiter_are_quoted() {
        let indicator = Indicator::new("URL", "http://x.example/a;b");
        let exporter = CsvExporter::new(&HarvestConfig::default());
        let (_, output) = export_string(&exporter, &[entry(Pulse::new("p1", "P"), vec![indicator])]);

        assert!(output.contains("\"http://x.example/a;b\""));
    }

    #[test]
    fn test_export_overwrites_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test_indicators.csv");
        std::fs::write(&path, "stale content that is much longer than the export\n".repeat(10)).unwrap();

        let exporter = CsvExporter::new(&HarvestConfig::default());
        let count = exporter
            .export(&[entry(Pulse::new("p1", "P"), indicators(&["a"]))], &path)
            .unwrap();

        assert_eq!(count, 1);
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(!content.contains("stale"));
        assert_eq!(content.lines().count(), 2);
    }

    #[test]
    fn test_export_to_missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("no-such-dir").join("out.csv");

        let exporter = CsvExporter::new(&HarvestConfig::default());
        let err = exporter.export(&[], &path).unwrap_err();
        assert!(matches!(err, ExportError::Create { .. }));
    }

    #[test]
    fn test_failed_row_is_skipped_alone() {
        let values: Vec<String> = (0..200).map(|i| format!("{:0>100}", i)).collect();
        let refs: Vec<&str> = values.iter().map(String::as_str).collect();
        let collected = vec![entry(Pulse::new("p1", "P"), indicators(&refs))];

        // Call 0 is the header, call 1 the first data row
        let mut writer = FlakyWriter::failing_on(1);
        let exporter = CsvExporter::new(&HarvestConfig::default());
        let count = exporter.export_to_writer(&collected, &mut writer).unwrap();

        assert_eq!(count, 199);
        let output = String::from_utf8(writer.out).unwrap();
        let rows: Vec<Vec<&str>> = output.lines().skip(1).map(|l| l.split(';').collect()).collect();
        assert_eq!(rows.len(), 199);
        assert!(rows.iter().all(|r| r.len() == 9));
        assert_eq!(rows[0][3], values[1]);
        assert!(!output.contains(&values[0]));
    }

    #[test]
    fn test_partially_written_row_is_fatal() {
        let collected = vec![entry(Pulse::new("p1", "P"), indicators(&["a", "b", "c"]))];

        let mut writer = FlakyWriter::short_on(2, 3);
        let exporter = CsvExporter::new(&HarvestConfig::default());
        let err = exporter.export_to_writer(&collected, &mut writer).unwrap_err();

        match err {
            ExportError::PartialRow { indicator, .. } => assert_eq!(indicator, "b"),
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_header_write_failure_is_fatal() {
        let mut writer = FlakyWriter::failing_on(0);
        let exporter = CsvExporter::new(&HarvestConfig::default());
        let err = exporter.export_to_writer(&[], &mut writer).unwrap_err();
        assert!(matches!(err, ExportError::Io(_)));
    }
}
