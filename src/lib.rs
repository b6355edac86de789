//! Parse and load `.env` files.
//!
//! The parser understands `KEY=value` and `export KEY=value` assignments,
//! full-line and trailing `#` comments, single and double quotes, `"""` and
//! `'''` multi-line values, backslash escapes, and `$NAME`, `${NAME}` and
//! `$(NAME)` references to variables assigned earlier in the same input.
//!
//! [`read`] and [`EnvLoader::read`] return an in-memory map. [`load`] and
//! [`dotenv`] mutate the process environment and are `unsafe`, because callers
//! must guarantee no concurrent process-environment access.

mod env;
mod error;
mod escape;
mod loader;
mod model;
mod parser;
mod subst;

pub use env::TargetEnv;
pub use error::{Error, ParseError, ParseErrorKind};
pub use loader::{EnvLoader, dotenv, load, read};
pub use model::{EnvMap, Entry, LoadReport};
pub use parser::{
    parse_entries, parse_reader, parse_reader_with_context, parse_str, parse_str_with_context,
};
