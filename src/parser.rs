use std::collections::HashMap;
use std::io::{self, BufRead};
use std::path::Path;

use crate::error::{Error, ParseError, ParseErrorKind};
use crate::escape::{self, find_closing_quote, find_unescaped};
use crate::model::{EnvMap, Entry, into_map};
use crate::subst::{Scope, substitute};

const EXPORT_PREFIX: &str = "export ";
const DOUBLE_TRIPLE: &str = "\"\"\"";
const SINGLE_TRIPLE: &str = "'''";

/// Parse dotenv text into a variable map.
pub fn parse_str(input: &str) -> Result<EnvMap, Error> {
    parse_entries(str_lines(input), None).map(into_map)
}

/// Parse dotenv text, resolving references that are not defined in `input`
/// against `context`.
///
/// `context` is only read for substitution; its entries are not copied into
/// the result.
pub fn parse_str_with_context(input: &str, context: &EnvMap) -> Result<EnvMap, Error> {
    parse_entries(str_lines(input), Some(context)).map(into_map)
}

/// Parse dotenv entries from a buffered reader, one line at a time.
pub fn parse_reader<R: BufRead>(reader: R) -> Result<EnvMap, Error> {
    parse_entries(reader.lines(), None).map(into_map)
}

/// Parse dotenv entries from a buffered reader with a substitution context.
pub fn parse_reader_with_context<R: BufRead>(
    reader: R,
    context: &EnvMap,
) -> Result<EnvMap, Error> {
    parse_entries(reader.lines(), Some(context)).map(into_map)
}

/// Parse entries from any forward-only source of lines.
///
/// Lines must already have their terminators stripped. Entries come back in
/// first-seen key order; a repeated key replaces the earlier entry in place.
pub fn parse_entries<I, S>(lines: I, context: Option<&EnvMap>) -> Result<Vec<Entry>, Error>
where
    I: IntoIterator<Item = io::Result<S>>,
    S: AsRef<str>,
{
    parse_entries_with_source(lines, context, None)
}

pub(crate) fn parse_entries_with_source<I, S>(
    lines: I,
    context: Option<&EnvMap>,
    source: Option<&Path>,
) -> Result<Vec<Entry>, Error>
where
    I: IntoIterator<Item = io::Result<S>>,
    S: AsRef<str>,
{
    let mut lines = LineSource::new(lines.into_iter());
    let mut scope = Scope::new(context);
    let mut entries = Vec::new();
    let mut by_key = HashMap::<String, usize>::new();

    while let Some(line) = lines.next_line()? {
        let line_num = lines.line();
        let Some((key, raw_value)) = split_assignment(line.as_ref(), line_num)? else {
            continue;
        };

        let statement = Statement {
            key: &key,
            line: line_num,
        };
        let value = extract_value(&raw_value, &mut lines, &scope, &statement)?;
        scope.insert(&key, &value);

        let entry = Entry {
            key,
            value,
            source: source.map(Path::to_path_buf),
            line: line_num,
        };
        if let Some(existing_idx) = by_key.get(&entry.key).copied() {
            entries[existing_idx] = entry;
        } else {
            by_key.insert(entry.key.clone(), entries.len());
            entries.push(entry);
        }
    }

    Ok(entries)
}

fn str_lines(input: &str) -> impl Iterator<Item = io::Result<&str>> {
    input.lines().map(Ok)
}

/// Forward-only cursor over input lines that tracks the current line number.
struct LineSource<I> {
    lines: I,
    line: u32,
}

impl<I, S> LineSource<I>
where
    I: Iterator<Item = io::Result<S>>,
{
    fn new(lines: I) -> Self {
        Self { lines, line: 0 }
    }

    fn next_line(&mut self) -> Result<Option<S>, Error> {
        match self.lines.next() {
            Some(line) => {
                self.line += 1;
                Ok(Some(line?))
            }
            None => Ok(None),
        }
    }

    fn line(&self) -> u32 {
        self.line
    }
}

struct Statement<'a> {
    key: &'a str,
    line: u32,
}

impl Statement<'_> {
    fn error(&self, kind: ParseErrorKind) -> Error {
        ParseError::for_key(self.line, self.key, kind).into()
    }
}

/// Classify a line. Blank and comment lines yield `None`; assignments yield
/// the validated key and the raw text after `=`.
///
/// `#` and `export ` are only recognized in the first column.
fn split_assignment(line: &str, line_num: u32) -> Result<Option<(String, String)>, Error> {
    if line.trim().is_empty() || line.starts_with('#') {
        return Ok(None);
    }

    let working = line.strip_prefix(EXPORT_PREFIX).unwrap_or(line);
    let Some((key, raw_value)) = working.split_once('=') else {
        return Err(ParseError::new(line_num, ParseErrorKind::InvalidLine).into());
    };

    let key = key.trim();
    if !is_valid_key(key) {
        return Err(ParseError::new(line_num, ParseErrorKind::InvalidKey(key.to_owned())).into());
    }

    Ok(Some((key.to_owned(), raw_value.to_owned())))
}

fn is_valid_key(key: &str) -> bool {
    let mut chars = key.chars();
    let Some(first) = chars.next() else {
        return false;
    };

    (first.is_ascii_alphabetic() || first == '_')
        && chars.all(|ch| ch.is_ascii_alphanumeric() || ch == '_')
}

fn extract_value<I, S>(
    raw: &str,
    lines: &mut LineSource<I>,
    scope: &Scope<'_>,
    statement: &Statement<'_>,
) -> Result<String, Error>
where
    I: Iterator<Item = io::Result<S>>,
    S: AsRef<str>,
{
    if let Some(marker) = [DOUBLE_TRIPLE, SINGLE_TRIPLE]
        .into_iter()
        .find(|marker| raw.starts_with(*marker))
    {
        return parse_multiline(&raw[marker.len()..], marker, lines, scope, statement);
    }

    match raw.as_bytes().first().copied() {
        Some(quote @ (b'"' | b'\'')) => parse_quoted(raw, quote, scope, statement),
        _ => Ok(parse_unquoted(raw, scope)),
    }
}

fn parse_unquoted(raw: &str, scope: &Scope<'_>) -> String {
    let value = match find_unescaped(raw, b'#', 0) {
        Some(comment_idx) => &raw[..comment_idx],
        None => raw,
    };
    escape::decode(&substitute(value.trim(), scope))
}

fn parse_quoted(
    raw: &str,
    quote: u8,
    scope: &Scope<'_>,
    statement: &Statement<'_>,
) -> Result<String, Error> {
    let Some(end_idx) = find_closing_quote(raw, quote, 1) else {
        return Err(statement.error(ParseErrorKind::UnterminatedQuote));
    };

    let tail = raw[end_idx + 1..].trim();
    if !tail.is_empty() && !tail.starts_with('#') {
        return Err(statement.error(ParseErrorKind::UnexpectedCharacters));
    }

    let inner = &raw[1..end_idx];
    if quote == b'"' {
        Ok(escape::decode(&substitute(inner, scope)))
    } else {
        Ok(inner.replace("\\'", "'"))
    }
}

/// Collect a triple-quoted value. Text after the opening marker counts as the
/// first line of the value.
fn parse_multiline<I, S>(
    rest: &str,
    marker: &str,
    lines: &mut LineSource<I>,
    scope: &Scope<'_>,
    statement: &Statement<'_>,
) -> Result<String, Error>
where
    I: Iterator<Item = io::Result<S>>,
    S: AsRef<str>,
{
    let decode_line = |line: &str| {
        if marker == DOUBLE_TRIPLE {
            escape::decode(&substitute(line, scope))
        } else {
            escape::decode(line)
        }
    };

    let mut value = String::new();
    if !rest.is_empty() {
        if let Some(body) = rest.strip_suffix(marker) {
            return Ok(decode_line(body));
        }
        value.push_str(&decode_line(rest));
        value.push('\n');
    }

    while let Some(line) = lines.next_line()? {
        let line = line.as_ref();
        let Some(body) = line.strip_suffix(marker) else {
            value.push_str(&decode_line(line));
            value.push('\n');
            continue;
        };

        value.push_str(&decode_line(body));
        if value.ends_with('\n') {
            value.pop();
        }
        return Ok(value);
    }

    Err(statement.error(ParseErrorKind::UnterminatedMultiLine))
}
