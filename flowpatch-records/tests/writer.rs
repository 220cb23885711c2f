//! Writer tests: layout fidelity and all-or-nothing persistence.

use camino::Utf8PathBuf;
use flowpatch_records::{
    SaveError, backup_file, load_records, parse_records, render_records, save_records,
    write_atomic,
};
use flowpatch_types::{FieldNames, Record, RecordCollection};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::fs;
use tempfile::TempDir;

const FLOWS: &str = r#"[
    {
        "id": "tab1",
        "type": "tab",
        "label": "Fahrzeug"
    },
    {
        "id": "func_controller",
        "type": "function",
        "func": "const cmd = msg.payload;\n// Tick - nur senden wenn aktiv\nreturn msg;",
        "outputs": 1,
        "x": 1.50,
        "wires": [
            []
        ]
    }
]"#;

fn temp_path(temp: &TempDir, name: &str) -> Utf8PathBuf {
    Utf8PathBuf::from_path_buf(temp.path().join(name)).unwrap()
}

#[test]
fn test_unmodified_collection_renders_source_verbatim() {
    let odd = "[ {\"id\":\"a\",  \"x\": 1e3} ]\n";
    let c = parse_records(odd, &FieldNames::default()).unwrap();
    assert_eq!(render_records(&c).unwrap(), odd);
}

#[test]
fn test_modified_collection_keeps_layout_and_untouched_fields() {
    let mut c = parse_records(FLOWS, &FieldNames::default()).unwrap();
    assert!(c.set_body(1, "return null;".to_string()));

    let out = render_records(&c).unwrap();
    let expected = FLOWS.replace(
        "const cmd = msg.payload;\\n// Tick - nur senden wenn aktiv\\nreturn msg;",
        "return null;",
    );
    assert_eq!(out, expected);
}

#[test]
fn test_untouched_records_keep_their_exact_bytes() {
    let record_a = r#"{"id": "A", "name": "caf\u00e9", "func": "a TAG"}"#;
    let record_b = r#"{"id": "B", "func": "b TAG", "path": "x\/y"}"#;
    let record_c = r#"{"id": "C", "n": 1.50, "func": "c TAG"}"#;
    let src = format!("[\n    {record_a},\n    {record_b},\n    {record_c}\n]\n");

    let mut c = parse_records(&src, &FieldNames::default()).unwrap();
    assert!(c.set_body(1, "b new TAG".to_string()));

    let out = render_records(&c).unwrap();
    assert_eq!(out, src.replace(r#""b TAG""#, r#""b new TAG""#));
    assert!(out.contains(record_a));
    assert!(out.contains(record_c));
    assert!(out.contains(r#""path": "x\/y""#));
}

#[test]
fn test_spliced_body_is_escaped() {
    let src = "[{\"id\": \"a\", \"func\": \"x\"}, {\"id\": \"b\", \"func\": \"y\"}]";
    let mut c = parse_records(src, &FieldNames::default()).unwrap();
    c.set_body(0, "say \"hi\"\n\tü".to_string());
    c.set_body(1, "z".to_string());
    assert_eq!(
        render_records(&c).unwrap(),
        "[{\"id\": \"a\", \"func\": \"say \\\"hi\\\"\\n\\tü\"}, {\"id\": \"b\", \"func\": \"z\"}]"
    );
}

#[test]
fn test_duplicate_body_key_splices_the_effective_value() {
    let src = r#"[{"id":"a","func":"old","func":"x"}]"#;
    let mut c = parse_records(src, &FieldNames::default()).unwrap();
    assert_eq!(c.body(0), Some("x"));
    c.set_body(0, "y".to_string());
    assert_eq!(
        render_records(&c).unwrap(),
        r#"[{"id":"a","func":"old","func":"y"}]"#
    );
}

#[test]
fn test_added_body_falls_back_to_layout_render() {
    let mut c = parse_records(r#"[{"id":"a"}]"#, &FieldNames::default()).unwrap();
    assert_eq!(c.body_span(0), None);
    c.set_body(0, "x".to_string());
    assert_eq!(render_records(&c).unwrap(), r#"[{"id":"a","func":"x"}]"#);
}

#[test]
fn test_trailing_newline_and_crlf_are_restored() {
    let src = "[\r\n  {\r\n    \"id\": \"a\",\r\n    \"func\": \"x\"\r\n  }\r\n]\r\n";
    let mut c = parse_records(src, &FieldNames::default()).unwrap();
    c.set_body(0, "y".to_string());
    assert_eq!(
        render_records(&c).unwrap(),
        "[\r\n  {\r\n    \"id\": \"a\",\r\n    \"func\": \"y\"\r\n  }\r\n]\r\n"
    );
}

#[test]
fn test_compact_source_stays_compact() {
    let mut c = parse_records(r#"[{"id":"a","func":"x"}]"#, &FieldNames::default()).unwrap();
    c.set_body(0, "ü".to_string());
    assert_eq!(render_records(&c).unwrap(), r#"[{"id":"a","func":"ü"}]"#);
}

#[test]
fn test_in_memory_collection_uses_four_space_indent() {
    let serde_json::Value::Object(map) = json!({"id": "a", "func": "x"}) else {
        unreachable!()
    };
    let c = RecordCollection::new(
        vec![Record::from_fields(map, "id").unwrap()],
        FieldNames::default(),
    );
    assert_eq!(
        render_records(&c).unwrap(),
        "[\n    {\n        \"id\": \"a\",\n        \"func\": \"x\"\n    }\n]"
    );
}

#[test]
fn test_save_then_load_roundtrip() {
    let temp = tempfile::tempdir().expect("tempdir");
    let path = temp_path(&temp, "flows.json");
    fs::write(&path, FLOWS).unwrap();

    let mut c = load_records(&path, &FieldNames::default()).unwrap();
    c.set_body(1, "patched".to_string());
    save_records(&c, &path).unwrap();

    let again = load_records(&path, &FieldNames::default()).unwrap();
    assert_eq!(again.body(1), Some("patched"));
    assert_eq!(again.records()[0], c.records()[0]);
    let x = &c.records()[1].fields()["x"];
    assert_eq!(&again.records()[1].fields()["x"], x);
}

#[test]
fn test_failed_persist_leaves_destination_untouched() {
    let temp = tempfile::tempdir().expect("tempdir");
    let dest = temp_path(&temp, "flows.json");
    fs::create_dir(&dest).unwrap();
    fs::write(dest.join("keep.txt"), "keep").unwrap();

    let err = write_atomic(&dest, b"[]").unwrap_err();
    assert!(matches!(err, SaveError::Io { .. }));
    assert!(dest.is_dir());
    assert_eq!(fs::read_to_string(dest.join("keep.txt")).unwrap(), "keep");

    let leftovers: Vec<_> = fs::read_dir(temp.path())
        .unwrap()
        .map(|e| e.unwrap().file_name())
        .collect();
    assert_eq!(leftovers.len(), 1, "temp file leaked: {leftovers:?}");
}

#[test]
fn test_missing_parent_directory_is_io_error() {
    let temp = tempfile::tempdir().expect("tempdir");
    let dest = temp_path(&temp, "missing/flows.json");
    let err = write_atomic(&dest, b"[]").unwrap_err();
    assert!(err.to_string().contains("flows.json"));
    assert!(!dest.exists());
}

#[cfg(unix)]
#[test]
fn test_permissions_are_preserved() {
    use std::os::unix::fs::PermissionsExt;

    let temp = tempfile::tempdir().expect("tempdir");
    let dest = temp_path(&temp, "flows.json");
    fs::write(&dest, "[]").unwrap();
    fs::set_permissions(&dest, fs::Permissions::from_mode(0o644)).unwrap();

    write_atomic(&dest, b"[ ]").unwrap();
    let mode = fs::metadata(&dest).unwrap().permissions().mode() & 0o777;
    assert_eq!(mode, 0o644);
}

#[test]
fn test_backup_copies_existing_file() {
    let temp = tempfile::tempdir().expect("tempdir");
    let dest = temp_path(&temp, "flows.json");
    assert_eq!(backup_file(&dest, ".bak").unwrap(), None);

    fs::write(&dest, FLOWS).unwrap();
    let backup = backup_file(&dest, ".flowpatch.bak").unwrap().unwrap();
    assert_eq!(backup.file_name(), Some("flows.json.flowpatch.bak"));
    assert_eq!(fs::read_to_string(&backup).unwrap(), FLOWS);
}
