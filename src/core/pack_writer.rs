//! Pack Writer
//!
//! One self-contained JSON object per line, in collection order, with the
//! envelope fields in fixed order (`_id, name, type, img, system, effects,
//! flags`). Payload keys serialize in sorted order, so identical input
//! collections produce byte-identical packs.

use std::path::Path;

use tracing::info;

use super::errors::{PipelineError, Result};
use super::file_utils::write_atomic;
use super::model::EntityRecord;

/// Render a collection as pack text. Empty collections render as "".
pub fn render_pack(records: &[EntityRecord]) -> Result<String> {
    let mut out = String::new();
    for record in records {
        let line = serde_json::to_string(record).map_err(PipelineError::Serialize)?;
        out.push_str(&line);
        out.push('\n');
    }
    Ok(out)
}

/// Write a pack file, replacing any previous content. Returns the record count.
pub fn write_pack(path: &Path, records: &[EntityRecord]) -> Result<usize> {
    let text = render_pack(records)?;
    write_atomic(path, text.as_bytes())?;
    info!(path = %path.display(), count = records.len(), "Wrote pack");
    Ok(records.len())
}
