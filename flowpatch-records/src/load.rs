use crate::error::{LoadError, MalformedInputError};
use camino::Utf8Path;
use flowpatch_types::{FieldNames, Record, RecordCollection};
use fs_err as fs;
use serde_json::Value;
use serde_json::value::RawValue;
use std::collections::HashMap;
use std::ops::Range;
use tracing::debug;

/// Read and parse the collection stored at `path`.
pub fn load_records(
    path: &Utf8Path,
    field_names: &FieldNames,
) -> Result<RecordCollection, LoadError> {
    debug!(path = %path, "loading records");
    let text = fs::read_to_string(path)?;
    let collection = parse_records(&text, field_names)?;
    debug!(path = %path, records = collection.len(), "loaded records");
    Ok(collection)
}

/// Parse a collection from JSON text. The text is kept for byte-exact no-op saves.
pub fn parse_records(
    text: &str,
    field_names: &FieldNames,
) -> Result<RecordCollection, MalformedInputError> {
    let value: Value = serde_json::from_str(text).map_err(|e| MalformedInputError::Json {
        line: e.line(),
        column: e.column(),
        message: e.to_string(),
    })?;

    let Value::Array(items) = value else {
        return Err(MalformedInputError::NotAnArray {
            found: kind(&value),
        });
    };

    let mut records = Vec::with_capacity(items.len());
    for (index, item) in items.into_iter().enumerate() {
        let Value::Object(fields) = item else {
            return Err(MalformedInputError::NotAnObject {
                index,
                found: kind(&item),
            });
        };

        match fields.get(&field_names.identifier) {
            None => {
                return Err(MalformedInputError::MissingIdentifier {
                    index,
                    field: field_names.identifier.clone(),
                });
            }
            Some(Value::String(_)) => {}
            Some(_) => {
                return Err(MalformedInputError::IdentifierNotString {
                    index,
                    field: field_names.identifier.clone(),
                });
            }
        }

        let record = Record::from_fields(fields, &field_names.identifier).ok_or_else(|| {
            MalformedInputError::MissingIdentifier {
                index,
                field: field_names.identifier.clone(),
            }
        })?;
        records.push(record);
    }

    let spans = body_spans(text, &field_names.body);
    let collection = RecordCollection::with_source(records, field_names.clone(), text.to_string());
    Ok(collection.with_body_spans(spans))
}

/// Locate each record's body literal in `text` so a save can splice new bodies in place.
///
/// Runs on text that already parsed as an array of objects. Any record whose body cannot be
/// located gets `None`, and the writer then falls back to re-serializing the document.
fn body_spans(text: &str, body_field: &str) -> Vec<Option<Range<usize>>> {
    let Ok(items) = serde_json::from_str::<Vec<&RawValue>>(text) else {
        return Vec::new();
    };

    items
        .into_iter()
        .map(|raw| {
            // Duplicate keys resolve to the last one, as in the parsed record.
            let fields: HashMap<String, &RawValue> = serde_json::from_str(raw.get()).ok()?;
            let body = fields.get(body_field)?.get();
            let start = (body.as_ptr() as usize).checked_sub(text.as_ptr() as usize)?;
            let end = start + body.len();
            (end <= text.len()).then_some(start..end)
        })
        .collect()
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
