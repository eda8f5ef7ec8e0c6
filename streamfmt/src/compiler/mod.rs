//! Lexing and parsing of templates.
pub mod ast;
pub mod lexer;
pub mod parser;
pub mod tokens;
