//! SQL parser for CREATE TABLE / ALTER TABLE statements.

use std::collections::HashSet;

use thiserror::Error;
use tracing::warn;

use super::lexer::{Lexer, Token};
use crate::model::{ColumnSpec, RelationshipEdge, display_name};

#[derive(Debug, Error, PartialEq)]
pub enum SqlParseError {
    #[error("Expected {expected}, found {found:?}")]
    Expected {
        expected: &'static str,
        found: Token,
    },
    #[error("Unterminated column list for table {0}")]
    UnterminatedTable(String),
}

/// A table read from DDL.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedTable {
    pub schema: Option<String>,
    pub name: String,
    pub columns: Vec<ColumnSpec>,
}

impl ParsedTable {
    /// `schema.name`, or just `name` without a schema.
    pub fn id(&self) -> String {
        qualify(self.schema.as_deref(), &self.name)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedSchema {
    pub tables: Vec<ParsedTable>,
    /// One edge per column pair; composite keys expand to several edges.
    pub foreign_keys: Vec<RelationshipEdge>,
}

/// Parse DDL text into tables and resolved foreign keys.
pub fn parse_ddl(input: &str) -> Result<ParsedSchema, SqlParseError> {
    let tokens = Lexer::new(input).tokenize();
    Parser::new(tokens).parse()
}

fn qualify(schema: Option<&str>, name: &str) -> String {
    match schema {
        Some(s) => format!("{}.{}", s, name),
        None => name.to_string(),
    }
}

type QualifiedName = (Option<String>, String);

struct PendingFk {
    source: QualifiedName,
    columns: Vec<String>,
    target: QualifiedName,
    target_columns: Vec<String>,
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    tables: Vec<ParsedTable>,
    fks: Vec<PendingFk>,
}

/// Words that end a column's type and start its options.
const COLUMN_OPTION_WORDS: &[&str] = &[
    "AUTO_INCREMENT",
    "AUTOINCREMENT",
    "IDENTITY",
    "GENERATED",
    "COLLATE",
    "COMMENT",
];

/// Trailing words of a REFERENCES clause.
const REFERENCE_ACTION_WORDS: &[&str] = &[
    "DELETE",
    "UPDATE",
    "CASCADE",
    "RESTRICT",
    "SET",
    "NO",
    "ACTION",
    "MATCH",
    "FULL",
    "SIMPLE",
    "PARTIAL",
    "DEFERRABLE",
    "INITIALLY",
    "DEFERRED",
    "IMMEDIATE",
];

/// Words allowed between CREATE and TABLE.
const CREATE_TABLE_PREFIXES: &[&str] = &[
    "TEMP",
    "TEMPORARY",
    "UNLOGGED",
    "GLOBAL",
    "LOCAL",
    "OR",
    "REPLACE",
];

impl Parser {
    fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens,
            pos: 0,
            tables: Vec::new(),
            fks: Vec::new(),
        }
    }

    fn current(&self) -> &Token {
        self.tokens.get(self.pos).unwrap_or(&Token::Eof)
    }

    fn advance(&mut self) {
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.current() == token {
            self.advance();
            true
        } else {
            false
        }
    }

    fn parse(mut self) -> Result<ParsedSchema, SqlParseError> {
        while self.current() != &Token::Eof {
            match self.current() {
                Token::Create => self.parse_create_table()?,
                Token::Alter => self.parse_alter_table()?,
                _ => self.advance(),
            }
        }
        Ok(self.finish())
    }

    fn parse_name(&mut self) -> Option<String> {
        let name = self.current().name()?.to_string();
        self.advance();
        Some(name)
    }

    /// `name`, `schema.name` or `db.schema.name` (keeps the last two parts).
    fn parse_qualified_name(&mut self) -> Option<QualifiedName> {
        let mut parts = vec![self.parse_name()?];
        while self.current() == &Token::Dot {
            self.advance();
            parts.push(self.parse_name()?);
        }
        let name = parts.pop()?;
        Some((parts.pop(), name))
    }

    fn skip_if_exists(&mut self) {
        if self.eat(&Token::If) {
            self.eat(&Token::Not);
            self.eat(&Token::Exists);
        }
    }

    fn parse_create_table(&mut self) -> Result<(), SqlParseError> {
        self.advance(); // CREATE

        while CREATE_TABLE_PREFIXES.iter().any(|w| self.current().is_word(w)) {
            self.advance();
        }
        if !self.eat(&Token::Table) {
            self.skip_statement();
            return Ok(());
        }
        self.skip_if_exists();

        let Some(name) = self.parse_qualified_name() else {
            self.skip_statement();
            return Ok(());
        };
        if self.current() != &Token::LParen {
            // CREATE TABLE ... AS SELECT, LIKE, PARTITION OF
            self.skip_statement();
            return Ok(());
        }
        self.advance();

        let mut columns: Vec<ColumnSpec> = Vec::new();
        let mut pk_columns: Vec<String> = Vec::new();

        loop {
            match self.current() {
                Token::RParen => {
                    self.advance();
                    break;
                }
                Token::Eof => {
                    return Err(SqlParseError::UnterminatedTable(qualify(
                        name.0.as_deref(),
                        &name.1,
                    )));
                }
                Token::Comma | Token::Constraint => {
                    let named = self.current() == &Token::Constraint;
                    self.advance();
                    if named {
                        self.parse_name();
                    }
                }
                Token::Primary => {
                    self.advance();
                    self.eat(&Token::Key);
                    pk_columns.extend(self.parse_column_list());
                    self.skip_until(&[Token::Comma, Token::RParen]);
                }
                Token::Foreign => {
                    self.parse_foreign_key(name.clone())?;
                }
                Token::Unique | Token::Index | Token::Key | Token::Check => {
                    self.skip_until(&[Token::Comma, Token::RParen]);
                }
                Token::Ident(_) | Token::Quoted(_) => {
                    let (column, inline_fk) = self.parse_column()?;
                    if let Some((target, target_columns)) = inline_fk {
                        self.fks.push(PendingFk {
                            source: name.clone(),
                            columns: vec![column.name.clone()],
                            target,
                            target_columns,
                        });
                    }
                    columns.push(column);
                }
                _ => self.advance(),
            }
        }

        // table options (ENGINE=..., WITH (...), ...)
        self.skip_statement();

        for col in &mut columns {
            if pk_columns.contains(&col.name) {
                col.is_primary_key = true;
                col.is_nullable = false;
            }
        }

        let table = ParsedTable {
            schema: name.0,
            name: name.1,
            columns,
        };
        if self.tables.iter().any(|t| t.id() == table.id()) {
            warn!(table = %table.id(), "duplicate CREATE TABLE ignored");
        } else {
            self.tables.push(table);
        }
        Ok(())
    }

    fn parse_column_type(&mut self) -> String {
        let mut typ = String::new();
        let mut depth = 0usize;

        loop {
            let part = match self.current() {
                Token::Ident(w) if COLUMN_OPTION_WORDS.iter().any(|o| w.eq_ignore_ascii_case(o)) => {
                    break;
                }
                Token::Ident(w) | Token::Quoted(w) => {
                    if !typ.is_empty() && !typ.ends_with('(') && !typ.ends_with(',') {
                        typ.push(' ');
                    }
                    w.to_ascii_lowercase()
                }
                Token::Num(n) => n.clone(),
                Token::LParen => {
                    depth += 1;
                    "(".to_string()
                }
                Token::RParen if depth > 0 => {
                    depth -= 1;
                    ")".to_string()
                }
                Token::Comma if depth > 0 => ",".to_string(),
                Token::ArraySuffix => "[]".to_string(),
                Token::Dot => ".".to_string(),
                _ => break,
            };
            typ.push_str(&part);
            self.advance();
        }

        typ
    }

    fn parse_column(
        &mut self,
    ) -> Result<(ColumnSpec, Option<(QualifiedName, Vec<String>)>), SqlParseError> {
        let name = self.parse_name().unwrap_or_default();
        let mut column = ColumnSpec::new(name, self.parse_column_type());
        let mut inline_fk = None;

        loop {
            match self.current() {
                Token::Comma | Token::RParen | Token::Eof => break,
                Token::Primary => {
                    self.advance();
                    self.eat(&Token::Key);
                    column.is_primary_key = true;
                    column.is_nullable = false;
                }
                Token::Not => {
                    self.advance();
                    if self.eat(&Token::Null) {
                        column.is_nullable = false;
                    }
                }
                Token::References => {
                    self.advance();
                    inline_fk = Some(self.parse_reference()?);
                }
                Token::LParen => self.skip_parenthesized(),
                _ => self.advance(),
            }
        }

        Ok((column, inline_fk))
    }

    fn parse_reference(&mut self) -> Result<(QualifiedName, Vec<String>), SqlParseError> {
        let Some(target) = self.parse_qualified_name() else {
            return Err(SqlParseError::Expected {
                expected: "referenced table name",
                found: self.current().clone(),
            });
        };
        let columns = self.parse_column_list();
        self.skip_on_actions();
        Ok((target, columns))
    }

    fn parse_foreign_key(&mut self, source: QualifiedName) -> Result<(), SqlParseError> {
        self.advance(); // FOREIGN
        if !self.eat(&Token::Key) {
            return Err(SqlParseError::Expected {
                expected: "KEY after FOREIGN",
                found: self.current().clone(),
            });
        }
        let columns = self.parse_column_list();
        if !self.eat(&Token::References) {
            return Err(SqlParseError::Expected {
                expected: "REFERENCES",
                found: self.current().clone(),
            });
        }
        let (target, target_columns) = self.parse_reference()?;
        self.fks.push(PendingFk {
            source,
            columns,
            target,
            target_columns,
        });
        Ok(())
    }

    fn parse_column_list(&mut self) -> Vec<String> {
        let mut cols = Vec::new();
        if !self.eat(&Token::LParen) {
            return cols;
        }

        loop {
            match self.current() {
                Token::RParen => {
                    self.advance();
                    break;
                }
                Token::Eof => break,
                Token::Ident(n) | Token::Quoted(n) => {
                    cols.push(n.clone());
                    self.advance();
                }
                Token::LParen => self.skip_parenthesized(),
                _ => self.advance(),
            }
        }
        cols
    }

    /// `ON DELETE CASCADE`, `ON UPDATE SET NULL`, `NO ACTION`, `MATCH FULL`, ...
    fn skip_on_actions(&mut self) {
        loop {
            match self.current() {
                Token::On | Token::Null | Token::Default => self.advance(),
                t if REFERENCE_ACTION_WORDS.iter().any(|w| t.is_word(w)) => self.advance(),
                Token::Not
                    if self
                        .tokens
                        .get(self.pos + 1)
                        .is_some_and(|t| t.is_word("DEFERRABLE")) =>
                {
                    self.advance()
                }
                _ => break,
            }
        }
    }

    /// `ALTER TABLE [ONLY] t ADD [CONSTRAINT c] {FOREIGN KEY ... | PRIMARY KEY (...)}`
    fn parse_alter_table(&mut self) -> Result<(), SqlParseError> {
        self.advance(); // ALTER
        if !self.eat(&Token::Table) {
            self.skip_statement();
            return Ok(());
        }
        self.skip_if_exists();
        self.eat(&Token::Only);

        let Some(name) = self.parse_qualified_name() else {
            self.skip_statement();
            return Ok(());
        };
        if !self.eat(&Token::Add) {
            self.skip_statement();
            return Ok(());
        }
        if self.eat(&Token::Constraint) {
            self.parse_name();
        }

        match self.current() {
            Token::Foreign => self.parse_foreign_key(name)?,
            Token::Primary => {
                self.advance();
                self.eat(&Token::Key);
                let pk = self.parse_column_list();
                let id = qualify(name.0.as_deref(), &name.1);
                if let Some(table) = self.tables.iter_mut().find(|t| t.id() == id) {
                    for col in table.columns.iter_mut().filter(|c| pk.contains(&c.name)) {
                        col.is_primary_key = true;
                        col.is_nullable = false;
                    }
                }
            }
            _ => {}
        }
        self.skip_statement();
        Ok(())
    }

    fn skip_parenthesized(&mut self) {
        if !self.eat(&Token::LParen) {
            self.advance();
            return;
        }
        let mut depth = 1;
        while depth > 0 {
            match self.current() {
                Token::LParen => depth += 1,
                Token::RParen => depth -= 1,
                Token::Eof => break,
                _ => {}
            }
            self.advance();
        }
    }

    fn skip_statement(&mut self) {
        while !matches!(self.current(), Token::Semicolon | Token::Eof) {
            self.advance();
        }
        self.eat(&Token::Semicolon);
    }

    fn skip_until(&mut self, tokens: &[Token]) {
        while !tokens.contains(self.current()) && self.current() != &Token::Eof {
            if self.current() == &Token::LParen {
                self.skip_parenthesized();
            } else {
                self.advance();
            }
        }
    }

    /// Resolve foreign-key targets to table ids and expand column pairs.
    fn finish(self) -> ParsedSchema {
        let ids: HashSet<String> = self.tables.iter().map(|t| t.id()).collect();
        let mut foreign_keys = Vec::new();

        for fk in &self.fks {
            let source = qualify(fk.source.0.as_deref(), &fk.source.1);
            let target = self.resolve_target(&fk.source, &fk.target, &ids);

            let target_columns = if fk.target_columns.is_empty() {
                self.primary_key_of(&target)
            } else {
                fk.target_columns.clone()
            };

            for (i, column) in fk.columns.iter().enumerate() {
                let target_column = target_columns
                    .get(i)
                    .cloned()
                    .unwrap_or_else(|| "id".to_string());
                let edge = RelationshipEdge::new(&source, column, &target, target_column);
                if !foreign_keys.contains(&edge) {
                    foreign_keys.push(edge);
                }
            }
        }

        ParsedSchema {
            tables: self.tables,
            foreign_keys,
        }
    }

    /// Exact id, then the source's own schema, then a unique bare-name match.
    /// An unresolved target keeps its written name and dangles.
    fn resolve_target(
        &self,
        source: &QualifiedName,
        target: &QualifiedName,
        ids: &HashSet<String>,
    ) -> String {
        let written = qualify(target.0.as_deref(), &target.1);
        if ids.contains(&written) || target.0.is_some() {
            return written;
        }

        let same_schema = qualify(source.0.as_deref(), &target.1);
        if ids.contains(&same_schema) {
            return same_schema;
        }

        let mut by_name = ids.iter().filter(|id| display_name(id) == target.1);
        match (by_name.next(), by_name.next()) {
            (Some(only), None) => only.clone(),
            _ => written,
        }
    }

    fn primary_key_of(&self, id: &str) -> Vec<String> {
        self.tables
            .iter()
            .find(|t| t.id() == id)
            .map(|t| {
                t.columns
                    .iter()
                    .filter(|c| c.is_primary_key)
                    .map(|c| c.name.clone())
                    .collect()
            })
            .unwrap_or_default()
    }
}
