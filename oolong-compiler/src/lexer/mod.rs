use thiserror::Error;

/// A lexing failure inside guard text. Recoverable: the match compiler
/// reports it against the arm and drops the arm.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct LexError {
    pub message: String,
    pub line: usize,
    pub column: usize,
}

#[derive(Debug, Clone)]
pub struct Token {
    pub kind: TokenKind,
    pub lexeme: String,
    pub line: usize,
    pub column: usize,
}

impl Token {
    fn new(kind: TokenKind, lexeme: String, line: usize, column: usize) -> Self {
        Self {
            kind,
            lexeme,
            line,
            column,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Identifier,
    IntLiteral(i64),
    FloatLiteral(f64),
    StringLiteral(String),
    RuneLiteral(char),
    LParen,
    RParen,
    LBracket,
    RBracket,
    Comma,
    Dot,
    Bang,
    BangEqual,
    DoubleEqual,
    Greater,
    GreaterEqual,
    Shr,
    Less,
    LessEqual,
    Shl,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Ampersand,
    AmpersandAmpersand,
    Pipe,
    PipePipe,
    Caret,
    Eof,
}

/// Lexer for the Go expression subset guards are written in. Positions are
/// reported in unit coordinates: the builder seeds the guard's own source
/// location so diagnostics point into the original file.
pub struct Lexer<'a> {
    input: &'a str,
    position: usize,
    line: usize,
    column: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str, base_line: usize, base_column: usize) -> Self {
        Self {
            input,
            position: 0,
            line: base_line.max(1),
            column: base_column.max(1),
        }
    }

    pub fn tokenize(&mut self) -> Result<Vec<Token>, LexError> {
        let mut tokens = Vec::new();

        while let Some(ch) = self.peek_char() {
            match ch {
                ' ' | '\t' | '\r' | '\n' => {
                    self.advance_char();
                }
                '"' => {
                    tokens.push(self.lex_string()?);
                }
                '`' => {
                    tokens.push(self.lex_raw_string()?);
                }
                '\'' => {
                    tokens.push(self.lex_rune()?);
                }
                '0'..='9' => {
                    tokens.push(self.lex_number()?);
                }
                'a'..='z' | 'A'..='Z' | '_' => {
                    tokens.push(self.lex_identifier());
                }
                '(' => tokens.push(self.simple_token(TokenKind::LParen)),
                ')' => tokens.push(self.simple_token(TokenKind::RParen)),
                '[' => tokens.push(self.simple_token(TokenKind::LBracket)),
                ']' => tokens.push(self.simple_token(TokenKind::RBracket)),
                ',' => tokens.push(self.simple_token(TokenKind::Comma)),
                '.' => tokens.push(self.simple_token(TokenKind::Dot)),
                '+' => tokens.push(self.simple_token(TokenKind::Plus)),
                '-' => tokens.push(self.simple_token(TokenKind::Minus)),
                '*' => tokens.push(self.simple_token(TokenKind::Star)),
                '/' => tokens.push(self.simple_token(TokenKind::Slash)),
                '%' => tokens.push(self.simple_token(TokenKind::Percent)),
                '^' => tokens.push(self.simple_token(TokenKind::Caret)),
                '!' => {
                    let token = self.pair_token('=', TokenKind::BangEqual, TokenKind::Bang);
                    tokens.push(token);
                }
                '=' => {
                    let start_line = self.line;
                    let start_column = self.column;
                    self.advance_char();
                    if self.peek_char() == Some('=') {
                        self.advance_char();
                        tokens.push(Token::new(
                            TokenKind::DoubleEqual,
                            "==".to_string(),
                            start_line,
                            start_column,
                        ));
                    } else {
                        return Err(self.error_at(
                            "assignment is not allowed in a guard expression",
                            start_line,
                            start_column,
                        ));
                    }
                }
                '>' => {
                    let token = self.lex_angle(
                        '>',
                        TokenKind::Shr,
                        TokenKind::GreaterEqual,
                        TokenKind::Greater,
                    );
                    tokens.push(token);
                }
                '<' => {
                    let token = self.lex_angle(
                        '<',
                        TokenKind::Shl,
                        TokenKind::LessEqual,
                        TokenKind::Less,
                    );
                    tokens.push(token);
                }
                '&' => {
                    let token =
                        self.pair_token('&', TokenKind::AmpersandAmpersand, TokenKind::Ampersand);
                    tokens.push(token);
                }
                '|' => {
                    let token = self.pair_token('|', TokenKind::PipePipe, TokenKind::Pipe);
                    tokens.push(token);
                }
                other => {
                    return Err(self.error_here(format!(
                        "unexpected character '{other}' in guard expression"
                    )));
                }
            }
        }

        tokens.push(Token::new(
            TokenKind::Eof,
            String::new(),
            self.line,
            self.column,
        ));

        Ok(tokens)
    }

    fn lex_identifier(&mut self) -> Token {
        let start = self.position;
        let start_line = self.line;
        let start_column = self.column;
        while let Some(ch) = self.peek_char() {
            if ch.is_ascii_alphanumeric() || ch == '_' {
                self.advance_char();
            } else {
                break;
            }
        }
        let lexeme = self.slice(start, self.position).to_string();
        Token::new(TokenKind::Identifier, lexeme, start_line, start_column)
    }

    fn lex_number(&mut self) -> Result<Token, LexError> {
        let start = self.position;
        let start_line = self.line;
        let start_column = self.column;

        if self.peek_char() == Some('0')
            && matches!(self.peek_next_char(), Some('x') | Some('X'))
        {
            self.advance_char();
            self.advance_char();
            let digits_start = self.position;
            while let Some(ch) = self.peek_char() {
                if ch.is_ascii_hexdigit() || ch == '_' {
                    self.advance_char();
                } else {
                    break;
                }
            }
            let digits = self.slice(digits_start, self.position).replace('_', "");
            let value = i64::from_str_radix(&digits, 16).map_err(|_| {
                self.error_at(
                    format!("malformed hex literal '{}'", self.slice(start, self.position)),
                    start_line,
                    start_column,
                )
            })?;
            return Ok(Token::new(
                TokenKind::IntLiteral(value),
                self.slice(start, self.position).to_string(),
                start_line,
                start_column,
            ));
        }

        let mut is_float = false;
        self.advance_char();
        while let Some(ch) = self.peek_char() {
            match ch {
                '0'..='9' | '_' => {
                    self.advance_char();
                }
                '.' => {
                    if is_float {
                        break;
                    }
                    if !matches!(self.peek_next_char(), Some('0'..='9')) {
                        break;
                    }
                    is_float = true;
                    self.advance_char();
                }
                _ => break,
            }
        }

        let raw = self.slice(start, self.position).to_string();
        let cleaned = raw.replace('_', "");
        if is_float {
            let value = cleaned.parse::<f64>().map_err(|_| {
                self.error_at(
                    format!("malformed float literal '{raw}'"),
                    start_line,
                    start_column,
                )
            })?;
            Ok(Token::new(
                TokenKind::FloatLiteral(value),
                raw,
                start_line,
                start_column,
            ))
        } else {
            let value = cleaned.parse::<i64>().map_err(|_| {
                self.error_at(
                    format!("malformed integer literal '{raw}'"),
                    start_line,
                    start_column,
                )
            })?;
            Ok(Token::new(
                TokenKind::IntLiteral(value),
                raw,
                start_line,
                start_column,
            ))
        }
    }

    fn lex_string(&mut self) -> Result<Token, LexError> {
        let start = self.position;
        let start_line = self.line;
        let start_column = self.column;
        self.advance_char();

        let mut value = String::new();
        while let Some(ch) = self.peek_char() {
            match ch {
                '"' => {
                    self.advance_char();
                    return Ok(Token::new(
                        TokenKind::StringLiteral(value),
                        self.slice(start, self.position).to_string(),
                        start_line,
                        start_column,
                    ));
                }
                '\\' => {
                    self.advance_char();
                    let escaped = self.peek_char().ok_or_else(|| {
                        self.error_at(
                            "unterminated escape sequence in string literal",
                            start_line,
                            start_column,
                        )
                    })?;
                    let escaped_char = match escaped {
                        '"' => '"',
                        '\\' => '\\',
                        'n' => '\n',
                        'r' => '\r',
                        't' => '\t',
                        other => other,
                    };
                    value.push(escaped_char);
                    self.advance_char();
                }
                '\n' => {
                    return Err(self.error_at(
                        "unterminated string literal",
                        start_line,
                        start_column,
                    ));
                }
                _ => {
                    value.push(ch);
                    self.advance_char();
                }
            }
        }

        Err(self.error_at("unterminated string literal", start_line, start_column))
    }

    fn lex_raw_string(&mut self) -> Result<Token, LexError> {
        let start = self.position;
        let start_line = self.line;
        let start_column = self.column;
        self.advance_char();

        let mut value = String::new();
        while let Some(ch) = self.peek_char() {
            if ch == '`' {
                self.advance_char();
                return Ok(Token::new(
                    TokenKind::StringLiteral(value),
                    self.slice(start, self.position).to_string(),
                    start_line,
                    start_column,
                ));
            }
            value.push(ch);
            self.advance_char();
        }

        Err(self.error_at("unterminated raw string literal", start_line, start_column))
    }

    fn lex_rune(&mut self) -> Result<Token, LexError> {
        let start = self.position;
        let start_line = self.line;
        let start_column = self.column;
        self.advance_char();

        let ch = self.peek_char().ok_or_else(|| {
            self.error_at("unterminated rune literal", start_line, start_column)
        })?;
        let value = if ch == '\\' {
            self.advance_char();
            let escaped = self.peek_char().ok_or_else(|| {
                self.error_at("unterminated rune literal", start_line, start_column)
            })?;
            let resolved = match escaped {
                'n' => '\n',
                'r' => '\r',
                't' => '\t',
                '0' => '\0',
                '\'' => '\'',
                '\\' => '\\',
                other => other,
            };
            self.advance_char();
            resolved
        } else {
            self.advance_char();
            ch
        };

        if self.peek_char() != Some('\'') {
            return Err(self.error_at("unterminated rune literal", start_line, start_column));
        }
        self.advance_char();

        Ok(Token::new(
            TokenKind::RuneLiteral(value),
            self.slice(start, self.position).to_string(),
            start_line,
            start_column,
        ))
    }

    fn simple_token(&mut self, kind: TokenKind) -> Token {
        let line = self.line;
        let column = self.column;
        let start = self.position;
        self.advance_char();
        Token::new(
            kind,
            self.slice(start, self.position).to_string(),
            line,
            column,
        )
    }

    fn pair_token(&mut self, next: char, paired: TokenKind, single: TokenKind) -> Token {
        let line = self.line;
        let column = self.column;
        let start = self.position;
        self.advance_char();
        if self.peek_char() == Some(next) {
            self.advance_char();
            Token::new(paired, self.slice(start, self.position).to_string(), line, column)
        } else {
            Token::new(single, self.slice(start, self.position).to_string(), line, column)
        }
    }

    fn lex_angle(
        &mut self,
        repeat: char,
        shifted: TokenKind,
        with_equal: TokenKind,
        single: TokenKind,
    ) -> Token {
        let line = self.line;
        let column = self.column;
        let start = self.position;
        self.advance_char();
        let kind = if self.peek_char() == Some(repeat) {
            self.advance_char();
            shifted
        } else if self.peek_char() == Some('=') {
            self.advance_char();
            with_equal
        } else {
            single
        };
        Token::new(kind, self.slice(start, self.position).to_string(), line, column)
    }

    fn peek_char(&self) -> Option<char> {
        self.input[self.position..].chars().next()
    }

    fn peek_next_char(&self) -> Option<char> {
        let mut chars = self.input[self.position..].chars();
        chars.next();
        chars.next()
    }

    fn advance_char(&mut self) {
        if let Some(ch) = self.peek_char() {
            self.position += ch.len_utf8();
            if ch == '\n' {
                self.line += 1;
                self.column = 1;
            } else {
                self.column += 1;
            }
        }
    }

    fn slice(&self, start: usize, end: usize) -> &str {
        &self.input[start..end]
    }

    fn error_here(&self, message: impl Into<String>) -> LexError {
        self.error_at(message, self.line, self.column)
    }

    fn error_at(&self, message: impl Into<String>, line: usize, column: usize) -> LexError {
        LexError {
            message: message.into(),
            line,
            column,
        }
    }
}
