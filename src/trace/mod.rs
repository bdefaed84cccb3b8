pub mod parse;
pub mod reader;
pub mod record;

use std::fs;
use std::path::{Path, PathBuf};

use crate::pipeline::IngestError;

/// Which record layout a set of phase files uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Schema {
    /// `bucket,count,raw_bytes`, keyed by stride bucket.
    Stride,
    /// Metapool tracer output, keyed by (raw size, proxy index).
    Proxy,
}

impl Schema {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Stride => "stride",
            Self::Proxy => "proxy",
        }
    }

    pub fn has_stride_bytes(&self) -> bool {
        matches!(self, Self::Proxy)
    }

    pub fn has_fallbacks(&self) -> bool {
        matches!(self, Self::Proxy)
    }

    /// Column headers of the text report, key columns first.
    pub fn report_headers(&self) -> &'static [&'static str] {
        match self {
            Self::Stride => &["bucket", "count", "raw_bytes", "peak"],
            Self::Proxy => &[
                "raw_size",
                "proxy",
                "count",
                "fallbacks",
                "raw_total",
                "stride_total",
                "peak",
            ],
        }
    }

    /// Pick the schema from a phase file's header row. A `proxy_index`
    /// column means metapool tracer output; anything else reads as stride.
    pub fn from_headers<'a>(headers: impl IntoIterator<Item = &'a str>) -> Self {
        if headers.into_iter().any(|h| h.trim() == "proxy_index") {
            Self::Proxy
        } else {
            Self::Stride
        }
    }

    /// Detect the schema from the header of `path`. Unreadable files fall
    /// back to the stride layout; the read itself reports the failure later.
    pub fn detect(path: &Path) -> Self {
        let mut reader = match csv::ReaderBuilder::new().flexible(true).from_path(path) {
            Ok(reader) => reader,
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "schema detection failed");
                return Self::Stride;
            }
        };
        match reader.headers() {
            Ok(headers) => Self::from_headers(headers.iter()),
            Err(_) => Self::Stride,
        }
    }
}

/// List phase files in `dir` with the given extension, in lexical order.
pub fn discover_phases(dir: &Path, extension: &str) -> Result<Vec<PathBuf>, IngestError> {
    if !dir.exists() {
        return Err(IngestError::NotFound(dir.to_path_buf()));
    }
    if !dir.is_dir() {
        return Err(IngestError::NotADirectory(dir.to_path_buf()));
    }

    let entries = fs::read_dir(dir).map_err(|source| IngestError::ListDir {
        dir: dir.to_path_buf(),
        source,
    })?;

    let mut phases: Vec<PathBuf> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_file() && p.extension().is_some_and(|x| x == extension))
        .collect();
    phases.sort();

    if phases.is_empty() {
        return Err(IngestError::NoPhaseFiles {
            dir: dir.to_path_buf(),
            extension: extension.to_string(),
        });
    }

    Ok(phases)
}
