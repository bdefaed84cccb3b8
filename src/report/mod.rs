pub mod svg;

use std::io::{self, Write};
use std::path::Path;

use anyhow::Result;

use crate::aggregate::entry::AggregateEntry;
use crate::summary::{SeriesPoint, Summary};
use crate::trace::record::BucketKey;
use crate::trace::Schema;

/// Rows selected for the text report, already rendered as cells.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportTable {
    pub title: String,
    pub headers: Vec<&'static str>,
    pub rows: Vec<Vec<String>>,
}

impl ReportTable {
    /// Head and tail `highlights` entries of `summary`.
    pub fn from_summary<K: BucketKey>(summary: &Summary<K>, highlights: usize) -> Self {
        let schema = summary.schema();
        Self {
            title: format!("{} trace data points", schema.name()),
            headers: schema.report_headers().to_vec(),
            rows: summary
                .highlights(highlights)
                .into_iter()
                .map(entry_cells)
                .collect(),
        }
    }

    /// Per-column width: the longest of the header and every cell.
    pub fn column_widths(&self) -> Vec<usize> {
        let mut widths: Vec<usize> = self.headers.iter().map(|h| h.len()).collect();
        for row in &self.rows {
            for (width, cell) in widths.iter_mut().zip(row) {
                *width = (*width).max(cell.len());
            }
        }
        widths
    }

    /// Right-aligned cells joined by ` | `, with a dashed rule under the header.
    pub fn format(&self) -> String {
        let widths = self.column_widths();
        let header = join_cells(self.headers.iter().copied(), &widths);

        let mut out = String::new();
        out.push_str(&header);
        out.push('\n');
        out.push_str(&"-".repeat(header.len()));
        out.push('\n');
        for row in &self.rows {
            out.push_str(&join_cells(row.iter().map(String::as_str), &widths));
            out.push('\n');
        }
        out
    }
}

fn join_cells<'a>(cells: impl Iterator<Item = &'a str>, widths: &[usize]) -> String {
    cells
        .zip(widths)
        .map(|(cell, &width)| format!("{cell:>width$}"))
        .collect::<Vec<_>>()
        .join(" | ")
}

fn entry_cells<K: BucketKey>(entry: &AggregateEntry<K>) -> Vec<String> {
    let mut cells = Vec::new();
    entry.key.push_cells(&mut cells);
    cells.push(entry.count.to_string());
    if let Some(fallbacks) = entry.fallbacks {
        cells.push(fallbacks.to_string());
    }
    cells.push(entry.raw_bytes.to_string());
    if let Some(stride) = entry.stride_bytes {
        cells.push(stride.to_string());
    }
    cells.push(entry.peak.to_string());
    cells
}

/// Full-resolution series handed to a [`Renderer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChartData {
    pub schema: Schema,
    pub points: Vec<SeriesPoint>,
}

impl ChartData {
    pub fn from_summary<K: BucketKey>(summary: &Summary<K>) -> Self {
        Self {
            schema: summary.schema(),
            points: summary.series(),
        }
    }
}

/// Reporter turns the bounded summary subset into text.
pub trait Reporter {
    fn report(&mut self, table: &ReportTable) -> Result<()>;
}

/// Renderer turns the full series into an image artifact at `out`.
pub trait Renderer {
    /// Returns the renderer's name for logging.
    fn name(&self) -> &str;

    fn render(&self, chart: &ChartData, out: &Path) -> Result<()>;
}

/// Writes the report table to any byte sink, stdout by default.
pub struct TableReporter<W = io::Stdout> {
    out: W,
}

impl TableReporter {
    pub fn stdout() -> Self {
        Self { out: io::stdout() }
    }
}

impl<W: Write> TableReporter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> Reporter for TableReporter<W> {
    fn report(&mut self, table: &ReportTable) -> Result<()> {
        writeln!(self.out, "\n{}:\n", table.title)?;
        self.out.write_all(table.format().as_bytes())?;
        self.out.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trace::record::{ProxyKey, StrideKey};

    fn stride_summary() -> Summary<StrideKey> {
        Summary::from_entries(
            Schema::Stride,
            vec![
                AggregateEntry {
                    key: StrideKey { bucket: 16 },
                    count: 5,
                    raw_bytes: 88,
                    stride_bytes: None,
                    fallbacks: None,
                    peak: 48,
                },
                AggregateEntry {
                    key: StrideKey { bucket: 4096 },
                    count: 1,
                    raw_bytes: 4000,
                    stride_bytes: None,
                    fallbacks: None,
                    peak: 4000,
                },
            ],
        )
    }

    #[test]
    fn test_stride_table_cells() {
        let table = ReportTable::from_summary(&stride_summary(), 5);
        assert_eq!(table.headers, vec!["bucket", "count", "raw_bytes", "peak"]);
        assert_eq!(
            table.rows,
            vec![
                vec!["16", "5", "88", "48"],
                vec!["4096", "1", "4000", "4000"],
            ]
        );
    }

    #[test]
    fn test_column_widths() {
        let table = ReportTable::from_summary(&stride_summary(), 5);
        // "bucket" (6) beats "4096", "raw_bytes" (9) beats "4000".
        assert_eq!(table.column_widths(), vec![6, 5, 9, 4]);
    }

    #[test]
    fn test_format_alignment() {
        let table = ReportTable::from_summary(&stride_summary(), 5);
        let text = table.format();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "bucket | count | raw_bytes | peak");
        assert_eq!(lines[1], "-".repeat(lines[0].len()));
        assert_eq!(lines[2], "    16 |     5 |        88 |   48");
        assert_eq!(lines[3], "  4096 |     1 |      4000 | 4000");
    }

    #[test]
    fn test_proxy_table_cells() {
        let summary = Summary::from_entries(
            Schema::Proxy,
            vec![AggregateEntry {
                key: ProxyKey {
                    raw_size: 24,
                    proxy_index: 2,
                },
                count: 10,
                raw_bytes: 240,
                stride_bytes: Some(320),
                fallbacks: Some(1),
                peak: 160,
            }],
        );
        let table = ReportTable::from_summary(&summary, 5);
        assert_eq!(table.headers.len(), 7);
        assert_eq!(table.rows, vec![vec!["24", "2", "10", "1", "240", "320", "160"]]);
    }

    #[test]
    fn test_reporter_writes_title_and_table() {
        let table = ReportTable::from_summary(&stride_summary(), 5);
        let mut reporter = TableReporter::new(Vec::new());
        reporter.report(&table).expect("report");

        let out = String::from_utf8(reporter.into_inner()).expect("utf8");
        assert!(out.contains("stride trace data points:"));
        assert!(out.ends_with(&table.format()));
    }

    #[test]
    fn test_empty_table_formats_header_only() {
        let summary: Summary<StrideKey> = Summary::from_entries(Schema::Stride, Vec::new());
        let table = ReportTable::from_summary(&summary, 5);
        assert_eq!(table.format().lines().count(), 2);
    }
}
