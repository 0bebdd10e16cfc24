//! Roster file loading.

use std::path::Path;

use anyhow::{Context, Result};
use polars::prelude::*;
use tracing::debug;
use workforce::{RawEmployeeRow, Roster};

/// Read roster rows from `path`.
///
/// `.json` files hold an array of records keyed by the source column names;
/// anything else is read as CSV with every column kept as text.
pub(crate) fn read_roster(path: &Path) -> Result<Vec<RawEmployeeRow>> {
    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

    let rows = if is_json {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("failed to parse roster JSON {}", path.display()))?
    } else {
        let frame = CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(Some(0))
            .try_into_reader_with_file_path(Some(path.to_path_buf()))
            .and_then(|reader| reader.finish())
            .with_context(|| format!("failed to read roster CSV {}", path.display()))?;
        Roster::from_frame(&frame)
            .with_context(|| format!("unexpected roster layout in {}", path.display()))?
    };

    debug!(path = %path.display(), rows = rows.len(), "read roster");
    Ok(rows)
}
