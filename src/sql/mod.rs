//! DDL text to table and foreign-key metadata.

mod lexer;
mod parser;

pub use parser::{ParsedSchema, ParsedTable, SqlParseError, parse_ddl};
