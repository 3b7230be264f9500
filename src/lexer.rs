use std::{iter::Peekable, str::CharIndices};

use crate::token::{Span, Token, TokenKind};

pub mod error;

pub use error::{LexError, LexResult};

pub struct Lexer<'a> {
    input: &'a str,
    chars: Peekable<CharIndices<'a>>,
    line: usize,
    column: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            input,
            chars: input.char_indices().peekable(),
            line: 1,
            column: 0,
        }
    }

    /// Returns the next token, or `Eof` forever once the input is exhausted.
    pub fn next_token(&mut self) -> LexResult<Token<'a>> {
        self.skip_whitespace();

        let (start, ch) = match self.chars.peek() {
            Some(&(idx, c)) => (idx, c),
            None => {
                let index = self.current_index();
                return Ok(Token::new(
                    TokenKind::Eof,
                    Span {
                        start: index,
                        end: index,
                        line: self.line,
                        column: self.column,
                    },
                ));
            }
        };

        let line = self.line;
        let column = self.column;
        match ch {
            c if c.is_alphabetic() || c == '_' => Ok(self.read_identifier(start, line, column)),
            c if c.is_ascii_digit() || c == '.' => self.read_number(start, line, column),
            '+' => Ok(self.read_single(TokenKind::Plus, start, line, column)),
            '-' => Ok(self.read_single(TokenKind::Minus, start, line, column)),
            '*' => Ok(self.read_single(TokenKind::Star, start, line, column)),
            '/' => Ok(self.read_single(TokenKind::Slash, start, line, column)),
            '%' => Ok(self.read_single(TokenKind::Percent, start, line, column)),
            '^' => Ok(self.read_single(TokenKind::Caret, start, line, column)),
            ';' => Ok(self.read_single(TokenKind::Semicolon, start, line, column)),
            ',' => Ok(self.read_single(TokenKind::Comma, start, line, column)),
            '(' => Ok(self.read_single(TokenKind::LParen, start, line, column)),
            ')' => Ok(self.read_single(TokenKind::RParen, start, line, column)),
            '{' => Ok(self.read_single(TokenKind::LBrace, start, line, column)),
            '}' => Ok(self.read_single(TokenKind::RBrace, start, line, column)),
            '=' => Ok(self.read_operator(
                TokenKind::Assign,
                TokenKind::EqualEqual,
                start,
                line,
                column,
            )),
            '<' => Ok(self.read_operator(
                TokenKind::Less,
                TokenKind::LessEqual,
                start,
                line,
                column,
            )),
            '>' => Ok(self.read_operator(
                TokenKind::Greater,
                TokenKind::GreaterEqual,
                start,
                line,
                column,
            )),
            '!' => {
                self.advance_char();
                if matches!(self.chars.peek(), Some(&(_, '='))) {
                    self.advance_char();
                    Ok(Token::new(
                        TokenKind::BangEqual,
                        Span {
                            start,
                            end: start + 2,
                            line,
                            column,
                        },
                    ))
                } else {
                    Err(LexError::IncompleteOperator { line, column })
                }
            }
            _ => Err(LexError::UnexpectedCharacter {
                character: ch,
                line,
                column,
            }),
        }
    }

    fn skip_whitespace(&mut self) {
        while let Some(&(_, c)) = self.chars.peek() {
            if c.is_whitespace() {
                self.advance_char();
            } else {
                break;
            }
        }
    }

    fn read_identifier(&mut self, start: usize, line: usize, column: usize) -> Token<'a> {
        self.advance_char(); // Consume first char
        while let Some(&(_, c)) = self.chars.peek() {
            if c.is_alphanumeric() || c == '_' {
                self.advance_char();
            } else {
                break;
            }
        }

        let end = self.current_index();
        let ident = &self.input[start..end];
        let kind = match ident {
            "class" => TokenKind::Class,
            "function" => TokenKind::Function,
            "return" => TokenKind::Return,
            "if" => TokenKind::If,
            "else" => TokenKind::Else,
            _ => TokenKind::Identifier(ident),
        };
        Token::new(
            kind,
            Span {
                start,
                end,
                line,
                column,
            },
        )
    }

    // A literal holds at most one '.'; a second one ends it. A literal may
    // also begin with '.', so ".89" lexes as a float.
    fn read_number(&mut self, start: usize, line: usize, column: usize) -> LexResult<Token<'a>> {
        let mut has_decimal_point = false;
        while let Some(&(_, c)) = self.chars.peek() {
            if c.is_ascii_digit() {
                self.advance_char();
            } else if c == '.' && !has_decimal_point {
                has_decimal_point = true;
                self.advance_char();
            } else {
                break;
            }
        }

        let end = self.current_index();
        let literal = &self.input[start..end];
        let kind = if has_decimal_point {
            let value = literal
                .parse::<f64>()
                .map_err(|_| LexError::InvalidNumberLiteral {
                    literal: literal.to_string(),
                    line,
                    column,
                })?;
            TokenKind::Float(value)
        } else {
            let value = literal
                .parse::<i64>()
                .map_err(|_| LexError::InvalidNumberLiteral {
                    literal: literal.to_string(),
                    line,
                    column,
                })?;
            TokenKind::Integer(value)
        };
        Ok(Token::new(
            kind,
            Span {
                start,
                end,
                line,
                column,
            },
        ))
    }

    fn read_single(
        &mut self,
        kind: TokenKind<'a>,
        start: usize,
        line: usize,
        column: usize,
    ) -> Token<'a> {
        self.advance_char();
        Token::new(
            kind,
            Span {
                start,
                end: start + 1,
                line,
                column,
            },
        )
    }

    // Greedy two-character match: '=' after the prefix upgrades it.
    fn read_operator(
        &mut self,
        single: TokenKind<'a>,
        double: TokenKind<'a>,
        start: usize,
        line: usize,
        column: usize,
    ) -> Token<'a> {
        self.advance_char();
        if matches!(self.chars.peek(), Some(&(_, '='))) {
            self.advance_char();
            Token::new(
                double,
                Span {
                    start,
                    end: start + 2,
                    line,
                    column,
                },
            )
        } else {
            Token::new(
                single,
                Span {
                    start,
                    end: start + 1,
                    line,
                    column,
                },
            )
        }
    }

    fn advance_char(&mut self) -> Option<(usize, char)> {
        let next = self.chars.next();
        if let Some((_, c)) = next {
            if c == '\n' {
                self.line += 1;
                self.column = 0;
            } else {
                self.column += 1;
            }
        }
        next
    }

    fn current_index(&mut self) -> usize {
        self.chars
            .peek()
            .map(|(idx, _)| *idx)
            .unwrap_or(self.input.len())
    }
}

impl<'a> Iterator for Lexer<'a> {
    type Item = LexResult<Token<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.next_token() {
            Ok(token) => Some(Ok(token)),
            Err(e) => Some(Err(e)),
        }
    }
}

/// Collects all tokens through the trailing `Eof`, for tests and benches.
/// The parser itself pulls tokens on demand.
pub fn tokenize(input: &str) -> LexResult<Vec<Token<'_>>> {
    let mut lexer = Lexer::new(input);
    let mut tokens = Vec::new();
    loop {
        let token = lexer.next_token()?;
        let is_eof = matches!(token.kind, TokenKind::Eof);
        tokens.push(token);
        if is_eof {
            break;
        }
    }
    Ok(tokens)
}
