use crate::error::SaveError;
use camino::{Utf8Path, Utf8PathBuf};
use flowpatch_types::{Record, RecordCollection};
use fs_err as fs;
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use std::io::Write;
use tempfile::NamedTempFile;
use tracing::debug;

/// Serialize the collection in its source layout.
///
/// A collection parsed from text renders to that text with only the modified body literals
/// swapped out; every other byte is copied through. Collections without a usable source are
/// pretty-printed with the detected layout.
pub fn render_records(collection: &RecordCollection) -> Result<String, SaveError> {
    if let Some(source) = collection.source()
        && let Some(text) = splice_bodies(collection, source)?
    {
        return Ok(text);
    }
    render_with_layout(collection)
}

/// Copy `source`, replacing the body literal of each modified record.
///
/// Returns `None` when a modified record has no recorded span.
fn splice_bodies(collection: &RecordCollection, source: &str) -> Result<Option<String>, SaveError> {
    let mut out = String::with_capacity(source.len());
    let mut cursor = 0;

    for index in collection.modified_indices() {
        let (Some(span), Some(body)) = (collection.body_span(index), collection.body(index)) else {
            debug!(index, "no body span, re-serializing document");
            return Ok(None);
        };
        let Some(before) = source.get(cursor..span.start) else {
            return Ok(None);
        };
        out.push_str(before);
        out.push_str(&serde_json::to_string(body).map_err(serialization)?);
        cursor = span.end;
    }

    let Some(rest) = source.get(cursor..) else {
        return Ok(None);
    };
    out.push_str(rest);
    Ok(Some(out))
}

fn render_with_layout(collection: &RecordCollection) -> Result<String, SaveError> {
    let records: Vec<_> = collection.iter().map(Record::fields).collect();
    let layout = collection.layout();

    let mut buf = Vec::new();
    match &layout.indent {
        Some(indent) => {
            let formatter = PrettyFormatter::with_indent(indent.as_bytes());
            let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
            records.serialize(&mut ser).map_err(serialization)?;
        }
        None => serde_json::to_writer(&mut buf, &records).map_err(serialization)?,
    }

    let mut text = String::from_utf8(buf).map_err(|e| SaveError::Serialization {
        message: e.to_string(),
    })?;
    if layout.crlf {
        text = text.replace('\n', "\r\n");
    }
    if layout.trailing_newline {
        text.push_str(if layout.crlf { "\r\n" } else { "\n" });
    }
    Ok(text)
}

/// Render and atomically persist the collection to `destination`.
pub fn save_records(
    collection: &RecordCollection,
    destination: &Utf8Path,
) -> Result<(), SaveError> {
    let text = render_records(collection)?;
    write_atomic(destination, text.as_bytes())
}

/// Replace `destination` with `contents` via a synced temp file in the same directory.
///
/// The destination's permissions are carried over when it already exists.
pub fn write_atomic(destination: &Utf8Path, contents: &[u8]) -> Result<(), SaveError> {
    let io = |source: std::io::Error| SaveError::Io {
        path: destination.to_string(),
        source,
    };

    let parent = match destination.parent() {
        Some(p) if !p.as_str().is_empty() => p,
        _ => Utf8Path::new("."),
    };

    let mut tmp = NamedTempFile::new_in(parent).map_err(io)?;
    tmp.write_all(contents).map_err(io)?;
    tmp.flush().map_err(io)?;

    if let Ok(meta) = fs::metadata(destination) {
        tmp.as_file().set_permissions(meta.permissions()).map_err(io)?;
    }
    tmp.as_file().sync_all().map_err(io)?;
    tmp.persist(destination).map_err(|e| io(e.error))?;

    debug!(path = %destination, bytes = contents.len(), "wrote file");
    Ok(())
}

/// Copy an existing `path` to `<path><suffix>`. Returns `None` when there is nothing to back up.
pub fn backup_file(path: &Utf8Path, suffix: &str) -> Result<Option<Utf8PathBuf>, SaveError> {
    if !path.exists() {
        return Ok(None);
    }
    let backup = Utf8PathBuf::from(format!("{path}{suffix}"));
    fs::copy(path, &backup).map_err(|source| SaveError::Io {
        path: backup.to_string(),
        source,
    })?;
    debug!(path = %path, backup = %backup, "backed up destination");
    Ok(Some(backup))
}

fn serialization(e: serde_json::Error) -> SaveError {
    SaveError::Serialization {
        message: e.to_string(),
    }
}
