//! Integration tests for loading variables files.

use std::fs;

use replace_vars::{LoadError, LoadOptions, VariableMap, load_variables, parse_variables};

fn parse(input: &str) -> VariableMap {
    parse_variables(input.as_bytes(), &LoadOptions::default()).unwrap()
}

#[test]
fn test_basic_entries() {
    let vars = parse("NAME=World\nVERSION=1.0\n");
    assert_eq!(vars.len(), 2);
    assert_eq!(vars.get("NAME"), Some("World"));
    assert_eq!(vars.get("VERSION"), Some("1.0"));
}

#[test]
fn test_keys_and_values_are_trimmed() {
    let vars = parse("  A = 1  \n\tB\t=\t two words \t\n");
    assert_eq!(vars.get("A"), Some("1"));
    assert_eq!(vars.get("B"), Some("two words"));
}

#[test]
fn test_split_at_first_equals() {
    let vars = parse("URL=https://example.com/?a=b&c=d\n");
    assert_eq!(vars.get("URL"), Some("https://example.com/?a=b&c=d"));
}

#[test]
fn test_blank_and_malformed_lines_are_skipped() {
    let vars = parse("\n   \nno equals here\nA=1\n\n");
    assert_eq!(vars.len(), 1);
    assert_eq!(vars.get("A"), Some("1"));
}

#[test]
fn test_empty_key_and_value() {
    let vars = parse("=orphan\nEMPTY=\nSPACES=   \n");
    assert_eq!(vars.get(""), Some("orphan"));
    assert_eq!(vars.get("EMPTY"), Some(""));
    assert_eq!(vars.get("SPACES"), Some(""));
}

#[test]
fn test_later_duplicates_win() {
    let vars = parse("A=first\nA=second\n");
    assert_eq!(vars.len(), 1);
    assert_eq!(vars.get("A"), Some("second"));
}

#[test]
fn test_line_endings() {
    let vars = parse("A=1\r\nB=2\rC=3\nD=4");
    assert_eq!(vars.get("A"), Some("1"));
    // A lone `\r` does not end a line.
    assert_eq!(vars.get("B"), Some("2\rC=3"));
    assert_eq!(vars.get("D"), Some("4"));
}

#[test]
fn test_hash_lines_without_comment_option() {
    let vars = parse("#A=1\n# note\n");
    assert_eq!(vars.get("#A"), Some("1"));
    assert_eq!(vars.len(), 1);
}

#[test]
fn test_comment_option() {
    let options = LoadOptions::builder().comments(true).build();
    let vars = parse_variables("#A=1\n  # B=2\nC=3\n".as_bytes(), &options).unwrap();
    assert_eq!(vars.len(), 1);
    assert_eq!(vars.get("C"), Some("3"));
}

#[test]
fn test_long_lines() {
    let value = "x".repeat(200_000);
    let vars = parse(&format!("BIG={value}\nSMALL=1\n"));
    assert_eq!(vars.get("BIG").map(str::len), Some(200_000));
    assert_eq!(vars.get("SMALL"), Some("1"));
}

#[test]
fn test_parsing_is_deterministic() {
    let input = "B=2\nA=1\r\nB=3\n  C = x=y \nbad line\n=empty\n";
    let first = parse(input);
    let second = parse(input);
    assert_eq!(first, second);
    assert_eq!(first.sorted(), second.sorted());
    assert_eq!(first.sorted(), vec![("", "empty"), ("A", "1"), ("B", "3"), ("C", "x=y")]);
}

#[test]
fn test_empty_input() {
    assert!(parse("").is_empty());
}

#[test]
fn test_load_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("vars.txt");
    fs::write(&path, "NAME=World\n").unwrap();

    let vars = load_variables(&path, &LoadOptions::default()).unwrap();
    assert_eq!(vars.get("NAME"), Some("World"));
}

#[test]
fn test_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent.txt");

    let err = load_variables(&path, &LoadOptions::default()).unwrap_err();
    assert!(matches!(&err, LoadError::Open { path: p, .. } if *p == path));
    assert!(err.to_string().contains("absent.txt"));
}

#[test]
fn test_invalid_utf8_reports_line() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("vars.txt");
    fs::write(&path, b"A=1\nB=\xff\xfe\n").unwrap();

    let err = load_variables(&path, &LoadOptions::default()).unwrap_err();
    match err {
        LoadError::Read { line, .. } => assert_eq!(line, 2),
        other => panic!("expected read error, got {other:?}"),
    }
}

#[test]
fn test_serializes_sorted() {
    let vars = parse("b=2\na=1\n");
    let json = serde_json::to_string(&vars).unwrap();
    assert_eq!(json, r#"{"a":"1","b":"2"}"#);
}
