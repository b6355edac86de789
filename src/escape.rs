/// Resolve backslash escapes in a value.
///
/// `\n`, `\r`, `\t`, `\f` and `\b` become their control characters. Any other
/// escaped character is kept without its backslash, so `\\` yields `\` and
/// `\$` yields `$`. A lone trailing backslash is kept as is.
pub(crate) fn decode(input: &str) -> String {
    if !input.contains('\\') {
        return input.to_owned();
    }

    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }

        match chars.next() {
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('t') => out.push('\t'),
            Some('f') => out.push('\u{0c}'),
            Some('b') => out.push('\u{08}'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }

    out
}

pub(crate) fn is_preceded_by_odd_backslashes(bytes: &[u8], idx: usize) -> bool {
    let mut cursor = idx;
    let mut backslash_count = 0usize;
    while cursor > 0 && bytes[cursor - 1] == b'\\' {
        cursor -= 1;
        backslash_count += 1;
    }

    backslash_count % 2 == 1
}

/// Byte index of the first `quote` at or after `from` whose previous byte is
/// not a backslash. Unlike [`find_unescaped`], `\\"` does not close.
pub(crate) fn find_closing_quote(input: &str, quote: u8, from: usize) -> Option<usize> {
    let bytes = input.as_bytes();
    (from.max(1)..bytes.len()).find(|&idx| bytes[idx] == quote && bytes[idx - 1] != b'\\')
}

/// Byte index of the first occurrence of `needle` that is not escaped.
pub(crate) fn find_unescaped(input: &str, needle: u8, from: usize) -> Option<usize> {
    let bytes = input.as_bytes();
    (from..bytes.len())
        .find(|&idx| bytes[idx] == needle && !is_preceded_by_odd_backslashes(bytes, idx))
}
