use std::fmt;

/// Represents a template level token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token<'a> {
    /// Raw template data.
    TemplateData(&'a str),
    /// The contents of an expression span, without the surrounding braces.
    Expression(&'a str),
}

impl fmt::Display for Token<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::TemplateData(_) => f.write_str("template-data"),
            Token::Expression(_) => f.write_str("expression"),
        }
    }
}

/// Represents a token within an expression span.
#[derive(Debug, Clone, PartialEq)]
pub enum ExprToken<'a> {
    /// A bare word.  Paths, keywords, modifier names and unquoted literals.
    Word(&'a str),
    /// A borrowed string.
    Str(&'a str),
    /// An allocated string (the source contained escapes).
    String(String),
    /// The pipe symbol.
    Pipe,
    /// Open Parenthesis
    ParenOpen,
    /// Close Parenthesis
    ParenClose,
    /// The comma operator (`,`)
    Comma,
    /// `=` or `==` operator
    Eq,
    /// `!=` operator
    Ne,
    /// `>` operator
    Gt,
    /// `>=` operator
    Gte,
    /// `<` operator
    Lt,
    /// `<=` operator
    Lte,
    /// The tilde operator (`~`)
    Tilde,
}

impl fmt::Display for ExprToken<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExprToken::Word(word) => write!(f, "`{word}`"),
            ExprToken::Str(_) | ExprToken::String(_) => f.write_str("string"),
            ExprToken::Pipe => f.write_str("`|`"),
            ExprToken::ParenOpen => f.write_str("`(`"),
            ExprToken::ParenClose => f.write_str("`)`"),
            ExprToken::Comma => f.write_str("`,`"),
            ExprToken::Eq => f.write_str("`=`"),
            ExprToken::Ne => f.write_str("`!=`"),
            ExprToken::Gt => f.write_str("`>`"),
            ExprToken::Gte => f.write_str("`>=`"),
            ExprToken::Lt => f.write_str("`<`"),
            ExprToken::Lte => f.write_str("`<=`"),
            ExprToken::Tilde => f.write_str("`~`"),
        }
    }
}

/// Token span information
#[derive(Clone, Copy, Default, PartialEq, Eq)]
pub struct Span {
    pub start_line: u32,
    pub start_col: u32,
    pub start_offset: u32,
    pub end_line: u32,
    pub end_col: u32,
    pub end_offset: u32,
}

impl fmt::Debug for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            " @ {}:{}-{}:{}",
            self.start_line, self.start_col, self.end_line, self.end_col
        )
    }
}
