use std::path::PathBuf;

use envfile::{EnvMap, Error, ParseErrorKind, parse_str, read};
use pretty_assertions::assert_eq;

fn fixture(relative: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(relative)
}

fn map(pairs: &[(&str, &str)]) -> EnvMap {
    pairs
        .iter()
        .map(|(key, value)| ((*key).to_owned(), (*value).to_owned()))
        .collect()
}

fn parse_kind(relative: &str) -> ParseErrorKind {
    let err = read([fixture(relative)]).expect_err("fixture should fail to parse");
    match err {
        Error::Parse(parse_err) => parse_err.kind,
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn parses_comments_fixture() {
    let parsed = read([fixture("valid/comments.env")]).expect("fixture should parse");
    assert_eq!(
        parsed,
        map(&[("foo", "bar"), ("baz", "foo"), ("bar", "foo")])
    );
}

#[test]
fn parses_quoted_fixture() {
    let parsed = read([fixture("valid/quoted.env")]).expect("fixture should parse");
    assert_eq!(
        parsed,
        map(&[
            ("OPTION_A", "1"),
            ("OPTION_B", "2"),
            ("OPTION_C", ""),
            ("OPTION_D", "\\n"),
            ("OPTION_E", "1"),
            ("OPTION_F", "2"),
            ("OPTION_G", ""),
            ("OPTION_H", "\n"),
            ("OPTION_I", "echo 'asd'"),
            ("OPTION_J", "line 1\nline 2"),
            ("OPTION_K", "    line one\nthis is 'quoted'\none more line"),
            ("OPTION_L", "line 1\nline 2"),
            ("OPTION_M", "line one\nthis is \"quoted\"\none more line"),
        ])
    );
}

#[test]
fn parses_multiline_fixture() {
    let parsed = read([fixture("valid/multiline.env")]).expect("fixture should parse");
    assert_eq!(parsed, map(&[("KEY", "Hi, my name is\nAda.")]));
}

#[test]
fn parses_exported_fixture() {
    let parsed = read([fixture("valid/exported.env")]).expect("fixture should parse");
    assert_eq!(parsed, map(&[("OPTION_A", "2"), ("OPTION_B", "exported")]));
}

#[test]
fn parses_substitutions_fixture() {
    let parsed = read([fixture("valid/substitutions.env")]).expect("fixture should parse");
    assert_eq!(
        parsed,
        map(&[
            ("OPTION_A", "1"),
            ("OPTION_B", "1"),
            ("OPTION_C", "1"),
            ("OPTION_D", "11"),
            ("OPTION_E", ""),
        ])
    );
}

#[test]
fn parse_str_matches_file_reader() {
    let text = include_str!("fixtures/valid/quoted.env");
    let from_str = parse_str(text).expect("fixture should parse");
    let from_file = read([fixture("valid/quoted.env")]).expect("fixture should parse");
    assert_eq!(from_str, from_file);
}

#[test]
fn reports_invalid_fixtures_by_kind() {
    assert_eq!(parse_kind("invalid/invalid.env"), ParseErrorKind::InvalidLine);
    assert_eq!(
        parse_kind("invalid/invalid_key.env"),
        ParseErrorKind::InvalidKey("1KEY".to_owned())
    );
    assert_eq!(
        parse_kind("invalid/unterminated_multiline.env"),
        ParseErrorKind::UnterminatedMultiLine
    );
    assert_eq!(
        parse_kind("invalid/unterminated_quote.env"),
        ParseErrorKind::UnterminatedQuote
    );
    assert_eq!(
        parse_kind("invalid/unexpected_characters.env"),
        ParseErrorKind::UnexpectedCharacters
    );
}

#[test]
fn parse_errors_point_at_the_failing_line() {
    let err = read([fixture("invalid/invalid.env")]).expect_err("fixture should fail");
    match err {
        Error::Parse(parse_err) => {
            assert_eq!(parse_err.line, 2);
            assert_eq!(parse_err.key, None);
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn rejects_files_without_env_extension() {
    let err = read([fixture("invalid/invalid_extension.json")]).expect_err("expected error");
    assert!(
        matches!(err, Error::InvalidFileExtension { .. }),
        "unexpected error: {err:?}"
    );
    assert_eq!(err.parse_kind(), None);
}
