//! Row parsing for phase trace files.
//!
//! Phase files are comma-separated with a header row. Columns are located by
//! name once per file, then each row is decoded into a typed record through
//! [`RowFields`]. Every failure is a [`ParseError`]; callers decide whether a
//! failed row is fatal (it never is for the phase reader).

use csv::StringRecord;
use thiserror::Error;

/// Errors that can occur while decoding one trace row.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("header has no {column} column")]
    MissingColumn { column: &'static str },

    #[error("row has no value for {column}")]
    MissingField { column: &'static str },

    #[error("{column}: not an integer: {value:?}")]
    InvalidInteger { column: &'static str, value: String },

    #[error("unreadable row: {reason}")]
    Unreadable { reason: String },
}

/// Positions of the required columns within one file's header row.
#[derive(Debug, Clone)]
pub struct ColumnIndex {
    columns: Vec<(&'static str, Option<usize>)>,
}

impl ColumnIndex {
    /// Locate each required column in `headers`. Absent columns are kept as
    /// `None` so every row of the file reports them as missing.
    pub fn new(headers: &StringRecord, required: &[&'static str]) -> Self {
        let columns = required
            .iter()
            .map(|&name| {
                let pos = headers.iter().position(|h| h.trim() == name);
                (name, pos)
            })
            .collect();
        Self { columns }
    }

    /// Returns true when every required column is present.
    pub fn is_complete(&self) -> bool {
        self.columns.iter().all(|(_, pos)| pos.is_some())
    }

    fn position(&self, column: &'static str) -> Result<usize, ParseError> {
        self.columns
            .iter()
            .find(|(name, _)| *name == column)
            .and_then(|(_, pos)| *pos)
            .ok_or(ParseError::MissingColumn { column })
    }
}

/// A single data row viewed through its file's [`ColumnIndex`].
pub struct RowFields<'a> {
    record: &'a StringRecord,
    index: &'a ColumnIndex,
}

impl<'a> RowFields<'a> {
    pub fn new(record: &'a StringRecord, index: &'a ColumnIndex) -> Self {
        Self { record, index }
    }

    /// Read a required integer column.
    pub fn int(&self, column: &'static str) -> Result<i64, ParseError> {
        let pos = self.index.position(column)?;
        let raw = self
            .record
            .get(pos)
            .ok_or(ParseError::MissingField { column })?;
        parse_int(column, raw)
    }
}

/// Parse one cell as a signed integer. Surrounding whitespace and a leading
/// sign are accepted; fractions, placeholders such as `?` and values outside
/// the `i64` range are rejected.
pub fn parse_int(column: &'static str, raw: &str) -> Result<i64, ParseError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ParseError::MissingField { column });
    }
    trimmed
        .parse::<i64>()
        .map_err(|_| ParseError::InvalidInteger {
            column,
            value: trimmed.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(fields: &[&str]) -> StringRecord {
        StringRecord::from(fields.to_vec())
    }

    #[test]
    fn test_parse_int_plain() {
        assert_eq!(parse_int("count", "42"), Ok(42));
    }

    #[test]
    fn test_parse_int_trims_whitespace() {
        assert_eq!(parse_int("count", "  7 "), Ok(7));
    }

    #[test]
    fn test_parse_int_empty_is_missing() {
        assert_eq!(
            parse_int("count", "   "),
            Err(ParseError::MissingField { column: "count" })
        );
    }

    #[test]
    fn test_parse_int_rejects_text() {
        assert_eq!(
            parse_int("bucket", "abc"),
            Err(ParseError::InvalidInteger {
                column: "bucket",
                value: "abc".to_string(),
            })
        );
    }

    #[test]
    fn test_parse_int_rejects_overflow_placeholder() {
        assert!(matches!(
            parse_int("raw_size", "?"),
            Err(ParseError::InvalidInteger { .. })
        ));
    }

    #[test]
    fn test_parse_int_accepts_signed() {
        assert_eq!(parse_int("count", "-1"), Ok(-1));
        assert_eq!(parse_int("count", " +12 "), Ok(12));
    }

    #[test]
    fn test_parse_int_rejects_fraction_and_out_of_range() {
        assert!(parse_int("count", "1.5").is_err());
        assert!(parse_int("raw_bytes", "9223372036854775808").is_err());
        assert_eq!(
            parse_int("raw_bytes", "9223372036854775807"),
            Ok(i64::MAX)
        );
    }

    #[test]
    fn test_column_index_resolves_any_order() {
        let index = ColumnIndex::new(
            &headers(&["raw_bytes", "bucket", "count"]),
            &["bucket", "count", "raw_bytes"],
        );
        assert!(index.is_complete());

        let row = StringRecord::from(vec!["48", "16", "3"]);
        let fields = RowFields::new(&row, &index);
        assert_eq!(fields.int("bucket"), Ok(16));
        assert_eq!(fields.int("count"), Ok(3));
        assert_eq!(fields.int("raw_bytes"), Ok(48));
    }

    #[test]
    fn test_column_index_missing_column() {
        let index = ColumnIndex::new(&headers(&["bucket", "count"]), &["bucket", "raw_bytes"]);
        assert!(!index.is_complete());

        let row = StringRecord::from(vec!["16", "3"]);
        let fields = RowFields::new(&row, &index);
        assert_eq!(
            fields.int("raw_bytes"),
            Err(ParseError::MissingColumn {
                column: "raw_bytes"
            })
        );
    }

    #[test]
    fn test_short_row_reports_missing_field() {
        let index = ColumnIndex::new(
            &headers(&["bucket", "count", "raw_bytes"]),
            &["bucket", "count", "raw_bytes"],
        );
        let row = StringRecord::from(vec!["16", "3"]);
        let fields = RowFields::new(&row, &index);
        assert_eq!(
            fields.int("raw_bytes"),
            Err(ParseError::MissingField {
                column: "raw_bytes"
            })
        );
    }

    #[test]
    fn test_header_names_are_trimmed() {
        let index = ColumnIndex::new(&headers(&[" bucket ", "count"]), &["bucket"]);
        assert!(index.is_complete());
    }
}
