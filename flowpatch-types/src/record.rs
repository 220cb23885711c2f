use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use std::ops::Range;

/// Key of the identifier field on a Node-RED node.
pub const DEFAULT_IDENTIFIER_FIELD: &str = "id";
/// Key of the script body on a Node-RED function node.
pub const DEFAULT_BODY_FIELD: &str = "func";
/// Indent unit used when no source layout is known.
pub const DEFAULT_INDENT: &str = "    ";

/// Which JSON keys carry the identifier and the script body of a record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldNames {
    pub identifier: String,
    pub body: String,
}

impl Default for FieldNames {
    fn default() -> Self {
        Self {
            identifier: DEFAULT_IDENTIFIER_FIELD.to_string(),
            body: DEFAULT_BODY_FIELD.to_string(),
        }
    }
}

/// One node of the collection.
///
/// The full JSON object is kept in its original key order; only the identifier is cached.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    identifier: String,
    fields: Map<String, Value>,
}

impl Record {
    /// Wrap a JSON object. Returns `None` when `identifier_field` is missing or not a string.
    pub fn from_fields(fields: Map<String, Value>, identifier_field: &str) -> Option<Self> {
        let identifier = fields.get(identifier_field)?.as_str()?.to_string();
        Some(Self { identifier, fields })
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    pub fn into_fields(self) -> Map<String, Value> {
        self.fields
    }

    /// String value of `field`, if present and a string.
    pub fn text(&self, field: &str) -> Option<&str> {
        self.fields.get(field).and_then(Value::as_str)
    }

    fn set_text(&mut self, field: &str, text: String) {
        match self.fields.get_mut(field) {
            Some(slot) => *slot = Value::String(text),
            None => {
                self.fields.insert(field.to_string(), Value::String(text));
            }
        }
    }
}

/// Whitespace shape of the serialized collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    /// Indent unit; `None` means a compact single-line document.
    pub indent: Option<String>,
    pub trailing_newline: bool,
    pub crlf: bool,
}

impl Default for Layout {
    fn default() -> Self {
        Self {
            indent: Some(DEFAULT_INDENT.to_string()),
            trailing_newline: false,
            crlf: false,
        }
    }
}

impl Layout {
    /// Infer the layout of a JSON document from its text.
    pub fn detect(text: &str) -> Self {
        let trailing_newline = text.ends_with('\n');
        let crlf = text.contains("\r\n");
        let body = text.trim();

        if !body.contains('\n') {
            return Self {
                indent: None,
                trailing_newline,
                crlf,
            };
        }

        let indent = body
            .lines()
            .skip(1)
            .find_map(|line| {
                let line = line.trim_end_matches('\r');
                let rest = line.trim_start_matches([' ', '\t']);
                let ws = &line[..line.len() - rest.len()];
                (!ws.is_empty() && !rest.is_empty()).then(|| ws.to_string())
            })
            .unwrap_or_default();

        Self {
            indent: Some(indent),
            trailing_newline,
            crlf,
        }
    }
}

/// Ordered sequence of records, exclusively owned by one load/patch/write run.
#[derive(Debug, Clone)]
pub struct RecordCollection {
    records: Vec<Record>,
    field_names: FieldNames,
    layout: Layout,
    source: Option<String>,
    body_spans: Vec<Option<Range<usize>>>,
    modified: BTreeSet<usize>,
}

impl RecordCollection {
    /// Build an in-memory collection with the default layout.
    pub fn new(records: Vec<Record>, field_names: FieldNames) -> Self {
        Self {
            records,
            field_names,
            layout: Layout::default(),
            source: None,
            body_spans: Vec::new(),
            modified: BTreeSet::new(),
        }
    }

    /// Build a collection that remembers the text it was parsed from.
    pub fn with_source(records: Vec<Record>, field_names: FieldNames, source: String) -> Self {
        Self {
            records,
            field_names,
            layout: Layout::detect(&source),
            source: Some(source),
            body_spans: Vec::new(),
            modified: BTreeSet::new(),
        }
    }

    /// Attach the byte range of each record's body literal (quotes included) in the source.
    ///
    /// `spans[i]` belongs to record `i`; `None` marks a record without a locatable body.
    pub fn with_body_spans(mut self, spans: Vec<Option<Range<usize>>>) -> Self {
        self.body_spans = spans;
        self
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Record> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Record> {
        self.records.get(index)
    }

    pub fn field_names(&self) -> &FieldNames {
        &self.field_names
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    /// Exact text the collection was loaded from, if any.
    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    /// Source byte range of the body literal of the record at `index`.
    pub fn body_span(&self, index: usize) -> Option<Range<usize>> {
        self.body_spans.get(index).cloned().flatten()
    }

    /// Indices of every record whose identifier equals `identifier`.
    pub fn positions(&self, identifier: &str) -> Vec<usize> {
        self.records
            .iter()
            .enumerate()
            .filter(|(_, r)| r.identifier() == identifier)
            .map(|(i, _)| i)
            .collect()
    }

    /// Body text of the record at `index`.
    pub fn body(&self, index: usize) -> Option<&str> {
        self.records.get(index)?.text(&self.field_names.body)
    }

    /// Replace the body of the record at `index`.
    ///
    /// Returns `true` when the stored text actually changed. Out-of-range indices are ignored.
    pub fn set_body(&mut self, index: usize, body: String) -> bool {
        let field = self.field_names.body.clone();
        let Some(record) = self.records.get_mut(index) else {
            return false;
        };
        if record.text(&field) == Some(body.as_str()) {
            return false;
        }
        record.set_text(&field, body);
        self.modified.insert(index);
        true
    }

    /// True once any body has been changed since load.
    pub fn is_modified(&self) -> bool {
        !self.modified.is_empty()
    }

    pub fn modified_indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.modified.iter().copied()
    }
}
