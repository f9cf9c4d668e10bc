//! SQL lexer for DDL statements.

use std::iter::Peekable;
use std::str::Chars;

/// SQL token types. Only the keywords DDL parsing branches on get their own
/// variant; every other word is an `Ident`.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Create,
    Alter,
    Add,
    Table,
    Only,
    Primary,
    Key,
    Foreign,
    References,
    Not,
    Null,
    Unique,
    Default,
    On,
    Constraint,
    Index,
    If,
    Exists,
    Check,

    Ident(String),
    /// `"name"`, `` `name` `` or `[name]`; never a keyword.
    Quoted(String),
    Str(String),
    Num(String),

    LParen,
    RParen,
    Comma,
    Semicolon,
    Dot,
    /// `[]` array suffix on a type name.
    ArraySuffix,

    Eof,
}

impl Token {
    /// Name carried by an identifier token, quoted or not.
    pub fn name(&self) -> Option<&str> {
        match self {
            Token::Ident(s) | Token::Quoted(s) => Some(s),
            _ => None,
        }
    }

    /// Case-insensitive match against an unquoted word.
    pub fn is_word(&self, word: &str) -> bool {
        matches!(self, Token::Ident(s) if s.eq_ignore_ascii_case(word))
    }
}

pub struct Lexer<'a> {
    chars: Peekable<Chars<'a>>,
    current_char: Option<char>,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        let mut chars = input.chars().peekable();
        let current_char = chars.next();
        Self {
            chars,
            current_char,
        }
    }

    fn advance(&mut self) {
        self.current_char = self.chars.next();
    }

    fn peek(&mut self) -> Option<&char> {
        self.chars.peek()
    }

    fn skip_line_comment(&mut self) {
        while let Some(c) = self.current_char {
            self.advance();
            if c == '\n' {
                break;
            }
        }
    }

    fn skip_block_comment(&mut self) {
        // current is '/', next is '*'
        self.advance();
        self.advance();
        while let Some(c) = self.current_char {
            self.advance();
            if c == '*' && self.current_char == Some('/') {
                self.advance();
                break;
            }
        }
    }

    fn read_while(&mut self, pred: impl Fn(char) -> bool) -> String {
        let mut out = String::new();
        while let Some(c) = self.current_char {
            if !pred(c) {
                break;
            }
            out.push(c);
            self.advance();
        }
        out
    }

    /// Reads up to `close`; a doubled `close` is an escaped literal.
    fn read_delimited(&mut self, close: char) -> String {
        self.advance();
        let mut out = String::new();
        while let Some(c) = self.current_char {
            self.advance();
            if c == close {
                if self.current_char == Some(close) {
                    out.push(c);
                    self.advance();
                } else {
                    break;
                }
            } else {
                out.push(c);
            }
        }
        out
    }

    fn keyword_or_ident(word: String) -> Token {
        match word.to_ascii_uppercase().as_str() {
            "CREATE" => Token::Create,
            "ALTER" => Token::Alter,
            "ADD" => Token::Add,
            "TABLE" => Token::Table,
            "ONLY" => Token::Only,
            "PRIMARY" => Token::Primary,
            "KEY" => Token::Key,
            "FOREIGN" => Token::Foreign,
            "REFERENCES" => Token::References,
            "NOT" => Token::Not,
            "NULL" => Token::Null,
            "UNIQUE" => Token::Unique,
            "DEFAULT" => Token::Default,
            "ON" => Token::On,
            "CONSTRAINT" => Token::Constraint,
            "INDEX" => Token::Index,
            "IF" => Token::If,
            "EXISTS" => Token::Exists,
            "CHECK" => Token::Check,
            _ => Token::Ident(word),
        }
    }

    pub fn next_token(&mut self) -> Token {
        loop {
            let Some(c) = self.current_char else {
                return Token::Eof;
            };

            match c {
                c if c.is_whitespace() => self.advance(),
                '-' if self.peek() == Some(&'-') => self.skip_line_comment(),
                '#' => self.skip_line_comment(),
                '/' if self.peek() == Some(&'*') => self.skip_block_comment(),
                '(' | ')' | ',' | ';' | '.' => {
                    self.advance();
                    return match c {
                        '(' => Token::LParen,
                        ')' => Token::RParen,
                        ',' => Token::Comma,
                        ';' => Token::Semicolon,
                        _ => Token::Dot,
                    };
                }
                '[' if self.peek() == Some(&']') => {
                    self.advance();
                    self.advance();
                    return Token::ArraySuffix;
                }
                '"' => return Token::Quoted(self.read_delimited('"')),
                '`' => return Token::Quoted(self.read_delimited('`')),
                '[' => return Token::Quoted(self.read_delimited(']')),
                '\'' => return Token::Str(self.read_delimited('\'')),
                c if c.is_ascii_digit() => {
                    return Token::Num(self.read_while(|c| c.is_ascii_digit() || c == '.'));
                }
                c if c.is_alphabetic() || c == '_' => {
                    let word = self.read_while(|c| c.is_alphanumeric() || c == '_' || c == '$');
                    return Self::keyword_or_ident(word);
                }
                // casts (`::`), operators and other punctuation carry no DDL structure
                _ => self.advance(),
            }
        }
    }

    pub fn tokenize(&mut self) -> Vec<Token> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token();
            let done = token == Token::Eof;
            tokens.push(token);
            if done {
                break;
            }
        }
        tokens
    }
}
