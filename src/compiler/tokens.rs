use logos::Logos;
use std::convert::Infallible;

#[derive(Debug, PartialEq, Clone, Default)]
pub enum LexingError {
    NumberParseError,
    #[default]
    Other,
}

impl From<std::num::ParseIntError> for LexingError {
    fn from(_: std::num::ParseIntError) -> Self {
        LexingError::NumberParseError
    }
}

impl From<std::num::ParseFloatError> for LexingError {
    fn from(_: std::num::ParseFloatError) -> Self {
        LexingError::NumberParseError
    }
}

impl From<Infallible> for LexingError {
    fn from(_: Infallible) -> Self {
        LexingError::Other
    }
}

#[derive(Logos, logos_display::Debug, logos_display::Display, PartialEq, Clone)]
#[logos(error = LexingError, skip r"[ \t\n\f\r]+", skip r"//[^\n]*", skip r"#[^\n]*")]
pub enum Token {
    #[token("kernel")]
    KeywordKernel,

    // Instruction and kernel names: `H`, `CNOT`, `swap-shortest-path`, ...
    #[regex(r"[\p{XID_Start}_][\p{XID_Continue}\-]*", |lex| lex.slice().to_string())]
    Identifier(String),

    // Symbolic variables are spelled `%name`.
    #[regex(r"%[\p{XID_Start}_]\p{XID_Continue}*", |lex| lex.slice()[1..].to_string())]
    Variable(String),

    #[regex(r"-?\d+", |lex| lex.slice().parse::<i64>(), priority = 2)]
    Integer(i64),
    #[regex(r"-?\d+\.\d+([eE][+-]?\d+)?", |lex| lex.slice().parse::<f64>(), priority = 1)]
    Float(f64),
    #[regex(r#""(?:[^"]|\\")*""#, |lex| {
        let slice = lex.slice();
        let len = slice.len();
        unescaper::unescape(&slice[1..(len-1)]).map_err(|_| LexingError::Other)
    })]
    String(String),

    #[token("(")]
    LeftParen,
    #[token(")")]
    RightParen,
    #[token("{")]
    LeftBrace,
    #[token("}")]
    RightBrace,
    #[token(",")]
    Comma,
    #[token(";")]
    Semicolon,
}
