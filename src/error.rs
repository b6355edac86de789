use std::fmt::{Display, Formatter};
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error("invalid file extension for file {}", .path.display())]
    InvalidFileExtension { path: PathBuf },
    #[error("failed to set environment variable `{key}`: {reason}")]
    Apply { key: String, reason: &'static str },
}

impl Error {
    /// The parser error kind, if this error came from the parser.
    pub fn parse_kind(&self) -> Option<&ParseErrorKind> {
        match self {
            Self::Parse(err) => Some(&err.kind),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    /// 1-based line where the failing assignment started.
    pub line: u32,
    /// Key whose value was being extracted, when the failure happened there.
    pub key: Option<String>,
    pub kind: ParseErrorKind,
}

impl ParseError {
    pub(crate) fn new(line: u32, kind: ParseErrorKind) -> Self {
        Self {
            line,
            key: None,
            kind,
        }
    }

    pub(crate) fn for_key(line: u32, key: &str, kind: ParseErrorKind) -> Self {
        Self {
            line,
            key: Some(key.to_owned()),
            kind,
        }
    }
}

impl Display for ParseError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.key {
            Some(key) => write!(
                f,
                "parse error at line {}: failed to parse value for key {key}: {}",
                self.line, self.kind
            ),
            None => write!(f, "parse error at line {}: {}", self.line, self.kind),
        }
    }
}

impl std::error::Error for ParseError {}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseErrorKind {
    #[error("invalid line")]
    InvalidLine,
    #[error("invalid key `{0}`")]
    InvalidKey(String),
    #[error("unterminated multiline value")]
    UnterminatedMultiLine,
    #[error("unterminated quoted value")]
    UnterminatedQuote,
    #[error("unexpected characters after value")]
    UnexpectedCharacters,
}
