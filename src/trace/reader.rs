use std::fs::File;
use std::io::Read;
use std::marker::PhantomData;
use std::path::Path;

use csv::{ReaderBuilder, StringRecord, StringRecordsIntoIter, Trim};

use super::parse::{ColumnIndex, ParseError, RowFields};
use super::record::TraceRecord;

/// Row accounting for one phase file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PhaseStats {
    /// Data rows seen, valid or not.
    pub rows: usize,
    /// Rows dropped because a required field was missing or not an integer.
    pub skipped: usize,
}

impl PhaseStats {
    pub fn records(&self) -> usize {
        self.rows - self.skipped
    }
}

/// Lazy sequence of valid records from one phase file.
///
/// Malformed rows are dropped as they are encountered and only show up in
/// [`PhaseRecords::stats`]. Each call to [`open_phase`] starts a fresh pass.
pub struct PhaseRecords<R, Rd = File> {
    rows: StringRecordsIntoIter<Rd>,
    index: ColumnIndex,
    stats: PhaseStats,
    _record: PhantomData<fn() -> R>,
}

/// Open `path` for reading as a phase file of record type `R`.
pub fn open_phase<R: TraceRecord>(path: &Path) -> std::io::Result<PhaseRecords<R>> {
    let file = File::open(path)?;
    Ok(PhaseRecords::from_reader(file))
}

impl<R: TraceRecord, Rd: Read> PhaseRecords<R, Rd> {
    /// Wrap any byte source holding a header row followed by data rows.
    pub fn from_reader(source: Rd) -> Self {
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(Trim::All)
            .from_reader(source);

        // An unreadable header leaves every column unresolved, so all rows skip.
        let headers = match reader.headers() {
            Ok(headers) => headers.clone(),
            Err(e) => {
                tracing::debug!(error = %e, "unreadable phase header");
                StringRecord::new()
            }
        };
        let index = ColumnIndex::new(&headers, R::COLUMNS);
        if !index.is_complete() {
            tracing::debug!(
                schema = R::SCHEMA.name(),
                "phase header lacks required columns"
            );
        }

        Self {
            rows: reader.into_records(),
            index,
            stats: PhaseStats::default(),
            _record: PhantomData,
        }
    }

    /// Rows consumed so far.
    pub fn stats(&self) -> PhaseStats {
        self.stats
    }

    fn decode(&self, row: csv::Result<StringRecord>) -> Result<R, ParseError> {
        let record = row.map_err(|e| ParseError::Unreadable {
            reason: e.to_string(),
        })?;
        R::from_row(&RowFields::new(&record, &self.index))
    }
}

impl<R: TraceRecord, Rd: Read> Iterator for PhaseRecords<R, Rd> {
    type Item = R;

    fn next(&mut self) -> Option<R> {
        loop {
            let row = self.rows.next()?;
            if let Err(e) = &row {
                // I/O failures repeat on every read; end the phase instead.
                if e.is_io_error() {
                    tracing::warn!(error = %e, "phase read aborted");
                    return None;
                }
            }
            self.stats.rows += 1;
            match self.decode(row) {
                Ok(record) => return Some(record),
                Err(e) => {
                    self.stats.skipped += 1;
                    tracing::trace!(row = self.stats.rows, error = %e, "skipping row");
                }
            }
        }
    }
}
