//! File helpers shared by the stage store and the pack writer.
//!
//! Every write is a full-file replacement: content goes to a temporary file
//! in the destination directory which is then renamed over the target.

use std::fs;
use std::io::Write;
use std::path::Path;

use serde::Serialize;
use serde_json::Value;
use tempfile::NamedTempFile;

use super::errors::{PipelineError, Result};

/// Replace `path` with `bytes`, creating parent directories as needed.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir).map_err(|e| PipelineError::write(dir, e))?;

    let mut tmp = NamedTempFile::new_in(dir).map_err(|e| PipelineError::write(path, e))?;
    tmp.write_all(bytes).map_err(|e| PipelineError::write(path, e))?;
    tmp.as_file().sync_all().map_err(|e| PipelineError::write(path, e))?;
    tmp.persist(path).map_err(|e| PipelineError::write(path, e.error))?;
    Ok(())
}

/// Pretty JSON with a trailing newline, the staging format.
pub fn write_json_pretty<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let mut text = serde_json::to_string_pretty(value).map_err(PipelineError::Serialize)?;
    text.push('\n');
    write_atomic(path, text.as_bytes())
}

pub fn read_bytes(path: &Path) -> Result<Vec<u8>> {
    fs::read(path).map_err(|e| PipelineError::read(path, e))
}

/// Read a JSON array of records. Anything other than an array is an error.
pub fn read_json_array(path: &Path) -> Result<Vec<Value>> {
    let bytes = read_bytes(path)?;
    parse_json_array(path, &bytes)
}

pub fn parse_json_array(path: &Path, bytes: &[u8]) -> Result<Vec<Value>> {
    match serde_json::from_slice::<Value>(bytes).map_err(|e| PipelineError::json(path, e))? {
        Value::Array(items) => Ok(items),
        _ => Err(PipelineError::NotACollection {
            path: path.to_path_buf(),
        }),
    }
}

/// Copy a file through [`write_atomic`] so the target is never half-written.
pub fn copy_file(from: &Path, to: &Path) -> Result<()> {
    let bytes = read_bytes(from)?;
    write_atomic(to, &bytes)
}
