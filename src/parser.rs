use std::mem;

use crate::ast::{
    BinaryOperator, ClassDef, Expression, FunctionDef, Program, Statement, UnaryOperator,
};
use crate::lexer::Lexer;
use crate::token::{Token, TokenKind};

pub mod error;

pub use error::ParseError;

/// Recursive-descent parser over a lazily scanned token stream. Holds the
/// current token plus one token of lookahead; both move together on every
/// `advance`.
pub struct Parser<'a> {
    lexer: Lexer<'a>,
    current: Token<'a>,
    lookahead: Token<'a>,
}

impl<'a> Parser<'a> {
    pub fn new(source: &'a str) -> Result<Self, ParseError> {
        let mut lexer = Lexer::new(source);
        let current = lexer.next_token()?;
        let lookahead = lexer.next_token()?;
        Ok(Self {
            lexer,
            current,
            lookahead,
        })
    }

    /// Consumes the whole token stream and returns the program, or fails on
    /// the first structural mismatch. No recovery, no partial output.
    pub fn parse(mut self) -> Result<Program, ParseError> {
        let mut statements = Vec::new();
        while !matches!(self.current.kind, TokenKind::Eof) {
            statements.push(self.parse_statement()?);
        }
        Ok(Program { statements })
    }

    fn parse_statement(&mut self) -> Result<Statement, ParseError> {
        let statement = match self.current.kind {
            TokenKind::If => self.parse_if()?,
            TokenKind::Class => self.parse_class()?,
            TokenKind::Function => Statement::FunctionDef(self.parse_function()?),
            TokenKind::Return => self.parse_return()?,
            TokenKind::Semicolon => Statement::NoOp,
            TokenKind::Identifier(_) if matches!(self.lookahead.kind, TokenKind::Assign) => {
                self.parse_assignment()?
            }
            _ => Statement::Expr(self.parse_expression()?),
        };
        if matches!(self.current.kind, TokenKind::Semicolon) {
            self.advance()?;
        }
        Ok(statement)
    }

    fn parse_assignment(&mut self) -> Result<Statement, ParseError> {
        let name = self.expect_identifier()?;
        self.expect_assign()?;
        let value = self.parse_expression()?;
        Ok(Statement::Assign { name, value })
    }

    fn parse_if(&mut self) -> Result<Statement, ParseError> {
        self.advance()?;
        self.expect_lparen()?;
        let condition = self.parse_condition()?;
        self.expect_rparen()?;
        let then_body = self.parse_block()?;
        let else_body = if matches!(self.current.kind, TokenKind::Else) {
            self.advance()?;
            Some(self.parse_block()?)
        } else {
            None
        };
        Ok(Statement::If {
            condition,
            then_body,
            else_body,
        })
    }

    fn parse_class(&mut self) -> Result<Statement, ParseError> {
        self.advance()?;
        let name = self.expect_identifier()?;
        self.expect_lbrace()?;
        let mut methods = Vec::new();
        while !matches!(self.current.kind, TokenKind::RBrace | TokenKind::Eof) {
            methods.push(self.parse_function()?);
        }
        self.expect_rbrace()?;
        Ok(Statement::ClassDef(ClassDef { name, methods }))
    }

    fn parse_function(&mut self) -> Result<FunctionDef, ParseError> {
        self.expect_function()?;
        let name = self.expect_identifier()?;
        self.expect_lparen()?;
        let mut params = Vec::new();
        if !matches!(self.current.kind, TokenKind::RParen) {
            params.push(self.expect_identifier()?);
            while matches!(self.current.kind, TokenKind::Comma) {
                self.advance()?;
                params.push(self.expect_identifier()?);
            }
        }
        self.expect_rparen()?;
        let body = self.parse_block()?;
        Ok(FunctionDef { name, params, body })
    }

    fn parse_return(&mut self) -> Result<Statement, ParseError> {
        self.advance()?;
        let value = self.parse_expression()?;
        Ok(Statement::Return(value))
    }

    fn parse_block(&mut self) -> Result<Vec<Statement>, ParseError> {
        self.expect_lbrace()?;
        let mut statements = Vec::new();
        while !matches!(self.current.kind, TokenKind::RBrace | TokenKind::Eof) {
            statements.push(self.parse_statement()?);
        }
        self.expect_rbrace()?;
        Ok(statements)
    }

    // Exactly one comparison; `1 < 2 < 3` fails at the second comparator.
    fn parse_condition(&mut self) -> Result<Expression, ParseError> {
        let left = self.parse_expression()?;
        let op = match self.current.kind {
            TokenKind::EqualEqual => BinaryOperator::Eq,
            TokenKind::BangEqual => BinaryOperator::NotEq,
            TokenKind::Less => BinaryOperator::Less,
            TokenKind::Greater => BinaryOperator::Greater,
            TokenKind::LessEqual => BinaryOperator::LessEq,
            TokenKind::GreaterEqual => BinaryOperator::GreaterEq,
            _ => return Err(self.error("a comparison operator")),
        };
        self.advance()?;
        let right = self.parse_expression()?;
        Ok(Expression::Binary {
            left: Box::new(left),
            op,
            right: Box::new(right),
        })
    }

    fn parse_expression(&mut self) -> Result<Expression, ParseError> {
        let mut expr = self.parse_term()?;
        loop {
            let op = match self.current.kind {
                TokenKind::Plus => BinaryOperator::Add,
                TokenKind::Minus => BinaryOperator::Sub,
                _ => break,
            };
            self.advance()?;
            let right = self.parse_term()?;
            expr = Expression::Binary {
                left: Box::new(expr),
                op,
                right: Box::new(right),
            };
        }
        Ok(expr)
    }

    fn parse_term(&mut self) -> Result<Expression, ParseError> {
        let mut expr = self.parse_factor()?;
        loop {
            let op = match self.current.kind {
                TokenKind::Star => BinaryOperator::Mul,
                TokenKind::Slash => BinaryOperator::Div,
                TokenKind::Percent => BinaryOperator::Rem,
                TokenKind::Caret => BinaryOperator::Pow,
                _ => break,
            };
            self.advance()?;
            let right = self.parse_factor()?;
            expr = Expression::Binary {
                left: Box::new(expr),
                op,
                right: Box::new(right),
            };
        }
        Ok(expr)
    }

    fn parse_factor(&mut self) -> Result<Expression, ParseError> {
        match self.current.kind {
            TokenKind::Plus => {
                self.advance()?;
                Ok(Expression::Unary {
                    op: UnaryOperator::Plus,
                    operand: Box::new(self.parse_factor()?),
                })
            }
            TokenKind::Minus => {
                self.advance()?;
                Ok(Expression::Unary {
                    op: UnaryOperator::Minus,
                    operand: Box::new(self.parse_factor()?),
                })
            }
            TokenKind::Integer(value) => {
                self.advance()?;
                Ok(Expression::Number(value as f64))
            }
            TokenKind::Float(value) => {
                self.advance()?;
                Ok(Expression::Number(value))
            }
            TokenKind::Identifier(name) => {
                let name = name.to_string();
                self.advance()?;
                if matches!(self.current.kind, TokenKind::LParen) {
                    self.advance()?;
                    let args = self.parse_args()?;
                    self.expect_rparen()?;
                    Ok(Expression::Call { name, args })
                } else {
                    Ok(Expression::Variable(name))
                }
            }
            TokenKind::LParen => {
                self.advance()?;
                let expr = self.parse_expression()?;
                self.expect_rparen()?;
                Ok(expr)
            }
            _ => Err(self.error("an expression")),
        }
    }

    fn parse_args(&mut self) -> Result<Vec<Expression>, ParseError> {
        let mut args = Vec::new();
        if !matches!(self.current.kind, TokenKind::RParen) {
            args.push(self.parse_expression()?);
            while matches!(self.current.kind, TokenKind::Comma) {
                self.advance()?;
                args.push(self.parse_expression()?);
            }
        }
        Ok(args)
    }

    fn expect_identifier(&mut self) -> Result<String, ParseError> {
        if let TokenKind::Identifier(name) = self.current.kind {
            let name = name.to_string();
            self.advance()?;
            Ok(name)
        } else {
            Err(self.error("an identifier"))
        }
    }

    fn expect_function(&mut self) -> Result<(), ParseError> {
        if matches!(self.current.kind, TokenKind::Function) {
            self.advance()?;
            Ok(())
        } else {
            Err(self.error("'function'"))
        }
    }

    fn expect_assign(&mut self) -> Result<(), ParseError> {
        if matches!(self.current.kind, TokenKind::Assign) {
            self.advance()?;
            Ok(())
        } else {
            Err(self.error("'='"))
        }
    }

    fn expect_lparen(&mut self) -> Result<(), ParseError> {
        if matches!(self.current.kind, TokenKind::LParen) {
            self.advance()?;
            Ok(())
        } else {
            Err(self.error("'('"))
        }
    }

    fn expect_rparen(&mut self) -> Result<(), ParseError> {
        if matches!(self.current.kind, TokenKind::RParen) {
            self.advance()?;
            Ok(())
        } else {
            Err(self.error("')'"))
        }
    }

    fn expect_lbrace(&mut self) -> Result<(), ParseError> {
        if matches!(self.current.kind, TokenKind::LBrace) {
            self.advance()?;
            Ok(())
        } else {
            Err(self.error("'{'"))
        }
    }

    fn expect_rbrace(&mut self) -> Result<(), ParseError> {
        if matches!(self.current.kind, TokenKind::RBrace) {
            self.advance()?;
            Ok(())
        } else {
            Err(self.error("'}'"))
        }
    }

    fn advance(&mut self) -> Result<Token<'a>, ParseError> {
        let next = self.lexer.next_token()?;
        let lookahead = mem::replace(&mut self.lookahead, next);
        Ok(mem::replace(&mut self.current, lookahead))
    }

    fn error(&self, expected: &str) -> ParseError {
        ParseError::UnexpectedToken {
            expected: expected.to_string(),
            found: self.current.kind.to_string(),
            line: self.current.span.line,
            column: self.current.span.column,
        }
    }
}

pub fn parse(source: &str) -> Result<Program, ParseError> {
    Parser::new(source)?.parse()
}
