use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LexError {
    #[error("Unexpected character '{character}' at line {line}, column {column}")]
    UnexpectedCharacter {
        character: char,
        line: usize,
        column: usize,
    },
    #[error("Incomplete operator '!' at line {line}, column {column}: expected '!='")]
    IncompleteOperator { line: usize, column: usize },
    #[error("Invalid numeric literal '{literal}' at line {line}, column {column}")]
    InvalidNumberLiteral {
        literal: String,
        line: usize,
        column: usize,
    },
}

pub type LexResult<T> = Result<T, LexError>;
