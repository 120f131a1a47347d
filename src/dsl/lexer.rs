//! Lexer (tokenizer) for the netlist language.

use crate::error::{DiscreteError, Result};

/// A token produced by the lexer.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    /// The kind of token
    pub kind: TokenKind,
    /// The token's text (without quotes for strings)
    pub text: String,
    /// Line number (1-indexed)
    pub line: usize,
    /// Column number (1-indexed)
    pub column: usize,
}

/// Token types in the netlist language.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    /// An identifier (kind keyword, node name, option key, ...)
    Identifier,
    /// A number (integer or floating point, possibly with suffix)
    Number,
    /// A directive (starts with '.')
    Directive,
    /// A double-quoted string
    Str,
    /// Port separator ':'
    Colon,
    /// List separator ','
    Comma,
    /// '['
    OpenBracket,
    /// ']'
    CloseBracket,
    /// Equals sign '='
    Equals,
    /// Newline
    Newline,
    /// End of file
    Eof,
}

/// Lexer for tokenizing netlist input.
pub struct Lexer<'a> {
    chars: std::iter::Peekable<std::str::CharIndices<'a>>,
    line: usize,
    column: usize,
}

impl<'a> Lexer<'a> {
    /// Create a new lexer for the given input.
    pub fn new(input: &'a str) -> Self {
        Self {
            chars: input.char_indices().peekable(),
            line: 1,
            column: 1,
        }
    }

    /// Get the next token.
    pub fn next_token(&mut self) -> Result<Token> {
        self.skip_whitespace_and_comments();

        let ch = match self.chars.peek() {
            Some(&(_, ch)) => ch,
            None => return Ok(self.token(TokenKind::Eof, String::new(), self.line, self.column)),
        };

        let start_column = self.column;
        let start_line = self.line;

        let single = |kind: TokenKind| (kind, ch.to_string());
        let (kind, text) = match ch {
            '\n' => single(TokenKind::Newline),
            ':' => single(TokenKind::Colon),
            ',' => single(TokenKind::Comma),
            '[' => single(TokenKind::OpenBracket),
            ']' => single(TokenKind::CloseBracket),
            '=' => single(TokenKind::Equals),
            '.' => {
                self.advance();
                let name = self.read_identifier();
                if name.is_empty() {
                    return Err(DiscreteError::lexer(start_line, start_column, "empty directive"));
                }
                return Ok(self.token(TokenKind::Directive, format!(".{}", name), start_line, start_column));
            }
            '"' => {
                self.advance();
                let text = self.read_string(start_line, start_column)?;
                return Ok(self.token(TokenKind::Str, text, start_line, start_column));
            }
            '-' | '+' | '0'..='9' => {
                let text = self.read_number();
                return Ok(self.token(TokenKind::Number, text, start_line, start_column));
            }
            _ if ch.is_alphabetic() || ch == '_' => {
                let text = self.read_identifier();
                return Ok(self.token(TokenKind::Identifier, text, start_line, start_column));
            }
            _ => {
                return Err(DiscreteError::lexer(
                    start_line,
                    start_column,
                    format!("unexpected character '{}'", ch),
                ));
            }
        };

        self.advance();
        Ok(self.token(kind, text, start_line, start_column))
    }

    fn token(&self, kind: TokenKind, text: String, line: usize, column: usize) -> Token {
        Token {
            kind,
            text,
            line,
            column,
        }
    }

    fn advance(&mut self) -> Option<char> {
        let (_, ch) = self.chars.next()?;
        if ch == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(ch)
    }

    fn skip_whitespace_and_comments(&mut self) {
        while let Some(&(_, ch)) = self.chars.peek() {
            if ch == ' ' || ch == '\t' || ch == '\r' {
                self.advance();
            } else if ch == '#' || ch == ';' {
                // Skip comment until end of line
                while let Some(&(_, c)) = self.chars.peek() {
                    if c == '\n' {
                        break;
                    }
                    self.advance();
                }
            } else {
                break;
            }
        }
    }

    fn read_identifier(&mut self) -> String {
        let mut text = String::new();
        while let Some(&(_, ch)) = self.chars.peek() {
            if ch.is_alphanumeric() || ch == '_' {
                text.push(ch);
                self.advance();
            } else {
                break;
            }
        }
        text
    }

    fn read_string(&mut self, line: usize, column: usize) -> Result<String> {
        let mut text = String::new();
        loop {
            match self.chars.peek() {
                Some(&(_, '"')) => {
                    self.advance();
                    return Ok(text);
                }
                Some(&(_, '\n')) | None => {
                    return Err(DiscreteError::lexer(line, column, "unterminated string"));
                }
                Some(&(_, ch)) => {
                    text.push(ch);
                    self.advance();
                }
            }
        }
    }

    fn read_digits(&mut self, text: &mut String) {
        while self.eat(text, |c| c.is_ascii_digit()) {}
    }

    /// Append the next character to `text` if it satisfies `accept`.
    fn eat(&mut self, text: &mut String, accept: impl Fn(char) -> bool) -> bool {
        match self.chars.peek() {
            Some(&(_, ch)) if accept(ch) => {
                text.push(ch);
                self.advance();
                true
            }
            _ => false,
        }
    }

    fn read_number(&mut self) -> String {
        let mut text = String::new();
        let sign = |c: char| c == '-' || c == '+';

        self.eat(&mut text, sign);
        self.read_digits(&mut text);
        if self.eat(&mut text, |c| c == '.') {
            self.read_digits(&mut text);
        }
        if self.eat(&mut text, |c| c == 'e' || c == 'E') {
            self.eat(&mut text, sign);
            self.read_digits(&mut text);
        }
        self.eat(&mut text, |c| SUFFIXES.contains(&c));

        text
    }
}

/// Engineering suffixes accepted after a number.
const SUFFIXES: [char; 9] = ['p', 'n', 'u', '\u{b5}', 'm', 'k', 'K', 'M', 'G'];

/// Parse a number string with optional unit suffix.
pub fn parse_value(text: &str) -> Option<f64> {
    let text = text.trim();
    let last = text.chars().last()?;

    let scale = match last {
        'p' => 1e-12,
        'n' => 1e-9,
        'u' | '\u{b5}' => 1e-6,
        'm' => 1e-3,
        'k' | 'K' => 1e3,
        'M' => 1e6,
        'G' => 1e9,
        _ => return text.parse().ok(),
    };

    text[..text.len() - last.len_utf8()]
        .parse::<f64>()
        .ok()
        .map(|v| v * scale)
}
