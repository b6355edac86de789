use crate::escape::is_preceded_by_odd_backslashes;
use crate::model::EnvMap;

/// Variables visible to substitution during one parse.
///
/// Lookups consult the entries parsed so far, then the optional caller-supplied
/// context.
#[derive(Debug)]
pub(crate) struct Scope<'a> {
    parsed: EnvMap,
    context: Option<&'a EnvMap>,
}

impl<'a> Scope<'a> {
    pub(crate) fn new(context: Option<&'a EnvMap>) -> Self {
        Self {
            parsed: EnvMap::new(),
            context,
        }
    }

    pub(crate) fn insert(&mut self, key: &str, value: &str) {
        self.parsed.insert(key.to_owned(), value.to_owned());
    }

    fn lookup(&self, name: &str) -> &str {
        self.parsed
            .get(name)
            .or_else(|| self.context.and_then(|context| context.get(name)))
            .map(String::as_str)
            .unwrap_or_default()
    }
}

/// Replace `$NAME`, `${NAME}` and `$(NAME)` references in one left-to-right pass.
///
/// Names must match `[A-Z0-9_]+`. Unknown names expand to an empty string.
/// A `$` preceded by an odd number of backslashes is left untouched.
pub(crate) fn substitute(input: &str, scope: &Scope<'_>) -> String {
    if !input.contains('$') {
        return input.to_owned();
    }

    let bytes = input.as_bytes();
    let mut out = String::with_capacity(input.len());
    let mut cursor = 0usize;
    let mut idx = 0usize;

    while idx < bytes.len() {
        if bytes[idx] != b'$' || is_preceded_by_odd_backslashes(bytes, idx) {
            idx += 1;
            continue;
        }

        let Some(token) = parse_reference(bytes, idx) else {
            idx += 1;
            continue;
        };

        out.push_str(&input[cursor..idx]);
        out.push_str(scope.lookup(&input[token.name_start..token.name_end]));
        cursor = token.end;
        idx = token.end;
    }

    out.push_str(&input[cursor..]);
    out
}

struct Reference {
    name_start: usize,
    name_end: usize,
    end: usize,
}

fn parse_reference(bytes: &[u8], dollar: usize) -> Option<Reference> {
    let mut name_start = dollar + 1;
    let closer = match bytes.get(name_start) {
        Some(b'{') => Some(b'}'),
        Some(b'(') => Some(b')'),
        _ => None,
    };
    if closer.is_some() {
        name_start += 1;
    }

    let mut name_end = name_start;
    while name_end < bytes.len() && is_name_byte(bytes[name_end]) {
        name_end += 1;
    }
    if name_end == name_start {
        return None;
    }

    let end = match closer {
        Some(closer) if bytes.get(name_end) == Some(&closer) => name_end + 1,
        _ => name_end,
    };

    Some(Reference {
        name_start,
        name_end,
        end,
    })
}

fn is_name_byte(byte: u8) -> bool {
    byte.is_ascii_uppercase() || byte.is_ascii_digit() || byte == b'_'
}
