use std::borrow::Cow;

use crate::compiler::ast::{self, Spanned};
use crate::compiler::lexer::{ExprTokenizer, Tokenizer};
use crate::compiler::tokens::{ExprToken, Span, Token};
use crate::error::{Error, ErrorKind};
use crate::modifiers::Modifier;
use crate::value::Value;

const PATH_CHARS: &str = "letters, digits, `_`, `-`, `$` or `@`";

fn syntax_error(msg: Cow<'static, str>) -> Error {
    Error::new(ErrorKind::SyntaxError, msg)
}

fn unexpected<D: std::fmt::Display>(unexpected: D, expected: &str) -> Error {
    syntax_error(Cow::Owned(format!(
        "unexpected {unexpected}, expected {expected}"
    )))
}

fn unexpected_eof(expected: &str) -> Error {
    unexpected("end of expression", expected)
}

macro_rules! syntax_error {
    ($msg:expr) => {{
        return Err(syntax_error(Cow::Borrowed($msg)));
    }};
    ($msg:expr, $($tt:tt)*) => {{
        return Err(syntax_error(Cow::Owned(format!($msg, $($tt)*))));
    }};
}

macro_rules! expect_token {
    ($parser:expr, $expectation:expr) => {{
        match ok!($parser.stream.next()) {
            Some(rv) => rv,
            None => return Err(unexpected_eof($expectation)),
        }
    }};
    ($parser:expr, $match:pat, $expectation:expr) => {{
        match ok!($parser.stream.next()) {
            Some((token @ $match, span)) => (token, span),
            Some((token, _)) => return Err(unexpected(token, $expectation)),
            None => return Err(unexpected_eof($expectation)),
        }
    }};
    ($parser:expr, $match:pat => $target:expr, $expectation:expr) => {{
        match ok!($parser.stream.next()) {
            Some(($match, span)) => ($target, span),
            Some((token, _)) => return Err(unexpected(token, $expectation)),
            None => return Err(unexpected_eof($expectation)),
        }
    }};
}

macro_rules! skip_token {
    ($p:expr, $match:pat) => {
        match $p.stream.current() {
            Err(err) => return Err(err),
            Ok(Some(($match, _))) => {
                let _ = $p.stream.next();
                true
            }
            _ => false,
        }
    };
}

macro_rules! with_recursion_guard {
    ($parser:expr, $expr:expr) => {{
        $parser.depth += 1;
        if $parser.depth > $parser.max_depth {
            return Err(Error::new(
                ErrorKind::NestingTooDeep,
                "expression exceeds maximum nesting depth",
            ));
        }
        let rv = $expr;
        $parser.depth -= 1;
        rv
    }};
}

macro_rules! binop {
    ($func:ident, $next:ident, $keyword:literal, $variant:ident) => {
        fn $func(&mut self) -> Result<ast::Expr, Error> {
            let span = self.stream.current_span();
            let mut left = ok!(self.$next());
            while skip_token!(self, ExprToken::Word($keyword)) {
                let right = ok!(self.$next());
                left = ast::Expr::$variant(Spanned::new(
                    ast::BinOp { left, right },
                    self.stream.expand_span(span),
                ));
            }
            Ok(left)
        }
    };
}

/// Token stream over the inside of a single expression span.
struct ExprStream<'a> {
    tokenizer: ExprTokenizer<'a>,
    current: Option<Result<(ExprToken<'a>, Span), Error>>,
    last_span: Span,
}

impl<'a> ExprStream<'a> {
    fn new(source: &'a str, span: Span) -> ExprStream<'a> {
        let mut tokenizer = ExprTokenizer::new(source, span);
        let current = tokenizer.next_token().transpose();
        ExprStream {
            tokenizer,
            current,
            last_span: span,
        }
    }

    /// Advance the stream.
    fn next(&mut self) -> Result<Option<(ExprToken<'a>, Span)>, Error> {
        let rv = self.current.take();
        self.current = self.tokenizer.next_token().transpose();
        if let Some(Ok((_, span))) = rv {
            self.last_span = span;
        }
        rv.transpose()
    }

    /// Look at the current token
    fn current(&mut self) -> Result<Option<(&ExprToken<'a>, Span)>, Error> {
        match self.current {
            Some(Ok(ref tok)) => Ok(Some((&tok.0, tok.1))),
            Some(Err(_)) => match self.current.take() {
                Some(Err(err)) => Err(err),
                _ => unreachable!(),
            },
            None => Ok(None),
        }
    }

    /// Expands the span
    fn expand_span(&self, mut span: Span) -> Span {
        span.end_line = self.last_span.end_line;
        span.end_col = self.last_span.end_col;
        span.end_offset = self.last_span.end_offset;
        span
    }

    /// Returns the current span.
    fn current_span(&self) -> Span {
        if let Some(Ok((_, span))) = self.current {
            span
        } else {
            self.tokenizer.end_span()
        }
    }
}

/// Parses the contents of one expression span.
struct ExprParser<'a> {
    stream: ExprStream<'a>,
    depth: usize,
    max_depth: usize,
}

impl<'a> ExprParser<'a> {
    fn new(source: &'a str, span: Span, max_depth: usize) -> ExprParser<'a> {
        ExprParser {
            stream: ExprStream::new(source, span),
            depth: 0,
            max_depth,
        }
    }

    fn parse_condition(&mut self) -> Result<ast::Expr, Error> {
        with_recursion_guard!(self, self.parse_or())
    }

    binop!(parse_or, parse_and, "or", Or);
    binop!(parse_and, parse_not, "and", And);

    fn parse_not(&mut self) -> Result<ast::Expr, Error> {
        let span = self.stream.current_span();
        if skip_token!(self, ExprToken::Word("not")) {
            let expr = with_recursion_guard!(self, ok!(self.parse_not()));
            return Ok(ast::Expr::Not(Spanned::new(
                ast::Not { expr },
                self.stream.expand_span(span),
            )));
        }
        self.parse_atom()
    }

    fn parse_atom(&mut self) -> Result<ast::Expr, Error> {
        let span = self.stream.current_span();
        let left = ok!(self.parse_operand());
        let op = match ok!(self.stream.current()) {
            Some((ExprToken::Eq, _)) => ast::CompareOp::Eq,
            Some((ExprToken::Ne, _)) => ast::CompareOp::Ne,
            Some((ExprToken::Gt, _)) => ast::CompareOp::Gt,
            Some((ExprToken::Gte, _)) => ast::CompareOp::Gte,
            Some((ExprToken::Lt, _)) => ast::CompareOp::Lt,
            Some((ExprToken::Lte, _)) => ast::CompareOp::Lte,
            Some((ExprToken::Tilde, _)) => ast::CompareOp::Contains,
            _ => {
                return Ok(ast::Expr::Truthy(Spanned::new(
                    left,
                    self.stream.expand_span(span),
                )))
            }
        };
        ok!(self.stream.next());
        let right = ok!(self.parse_literal("literal to compare against"));
        Ok(ast::Expr::Compare(Spanned::new(
            ast::Compare { left, op, right },
            self.stream.expand_span(span),
        )))
    }

    fn parse_operand(&mut self) -> Result<ast::Operand, Error> {
        let path = ok!(self.parse_path());
        let mut modifiers = Vec::new();
        while skip_token!(self, ExprToken::Pipe) {
            modifiers.push(ok!(self.parse_modifier()));
        }
        Ok(ast::Operand { path, modifiers })
    }

    fn parse_path(&mut self) -> Result<ast::Path, Error> {
        let (token, span) = expect_token!(self, "path");
        let raw = match token {
            ExprToken::Word(raw) => raw,
            other => return Err(unexpected(other, "path")),
        };
        let segments = raw.split('.').map(str::to_string).collect::<Vec<_>>();
        if segments.iter().any(|x| !is_valid_segment(x)) {
            let mut err = syntax_error(Cow::Owned(format!(
                "invalid path `{raw}`, segments may only contain {PATH_CHARS}"
            )));
            err.set_span(span);
            return Err(err);
        }
        Ok(ast::Path { segments })
    }

    fn parse_modifier(&mut self) -> Result<ast::ModifierCall, Error> {
        let (name, _) = expect_token!(self, ExprToken::Word(name) => name, "modifier name");
        let mut args = Vec::new();
        if skip_token!(self, ExprToken::ParenOpen) {
            while !skip_token!(self, ExprToken::ParenClose) {
                if !args.is_empty() {
                    expect_token!(self, ExprToken::Comma, "`,` or `)`");
                }
                args.push(ok!(self.parse_literal("modifier argument")));
            }
        }
        Ok(ast::ModifierCall {
            modifier: Modifier::from_name(name),
            args,
        })
    }

    fn parse_literal(&mut self, expected: &str) -> Result<Value, Error> {
        match ok!(self.stream.next()) {
            Some((ExprToken::Str(s), _)) => Ok(Value::from(s)),
            Some((ExprToken::String(s), _)) => Ok(Value::from(s)),
            Some((ExprToken::Word(word), _)) => Ok(literal_from_word(word)),
            Some((token, _)) => Err(unexpected(token, expected)),
            None => Err(unexpected_eof(expected)),
        }
    }

    /// Parses a complete output span.
    fn parse_var_ref(&mut self) -> Result<ast::Operand, Error> {
        let operand = ok!(self.parse_operand());
        ok!(self.expect_end());
        Ok(operand)
    }

    /// Parses the remainder of an `if` or `elif` span.
    fn parse_block_condition(&mut self) -> Result<ast::Expr, Error> {
        let expr = ok!(self.parse_condition());
        ok!(self.expect_end());
        Ok(expr)
    }

    fn expect_end(&mut self) -> Result<(), Error> {
        match ok!(self.stream.next()) {
            None => Ok(()),
            Some((token, _)) => Err(unexpected(token, "end of expression")),
        }
    }
}

pub(crate) fn is_valid_segment(segment: &str) -> bool {
    !segment.is_empty()
        && segment
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '$' | '@'))
}

/// Types a bare word: numbers first, then booleans, anything else is a string.
///
/// A word is only a number if the number prints back as the same word, so
/// `1.10` and `007` stay strings and still equal `"1.10"` and `"007"`.
/// Ordering comparisons parse such strings as numbers.
pub(crate) fn literal_from_word(word: &str) -> Value {
    let number = match word.parse::<i64>() {
        Ok(i) => Some(Value::from(i)),
        Err(_) => word
            .parse::<f64>()
            .ok()
            .filter(|x| x.is_finite())
            .map(Value::from),
    };
    if let Some(number) = number.filter(|x| x.to_string() == word) {
        number
    } else {
        match word {
            "true" => Value::from(true),
            "false" => Value::from(false),
            _ => Value::from(word),
        }
    }
}

/// An open `if` block.
struct Frame {
    span: Span,
    branches: Vec<ast::Branch>,
    else_body: Option<Vec<ast::Node>>,
}

impl Frame {
    fn body_mut(&mut self) -> &mut Vec<ast::Node> {
        match self.else_body {
            Some(ref mut body) => body,
            None => match self.branches.last_mut() {
                Some(branch) => &mut branch.body,
                None => unreachable!("frame without branch"),
            },
        }
    }
}

/// What an expression span means structurally.
enum Directive {
    If,
    Elif,
    Else,
    EndIf,
    Output,
}

fn classify(source: &str) -> Directive {
    let trimmed = source.trim_start();
    let keyword_end = trimmed.find(char::is_whitespace).unwrap_or(trimmed.len());
    let (keyword, rest) = trimmed.split_at(keyword_end);
    match keyword {
        "if" => Directive::If,
        "elif" => Directive::Elif,
        "else" if rest.trim().is_empty() => Directive::Else,
        "/if" if rest.trim().is_empty() => Directive::EndIf,
        _ => Directive::Output,
    }
}

struct Parser<'a> {
    tokenizer: Tokenizer<'a>,
    root: Vec<ast::Node>,
    frames: Vec<Frame>,
    max_depth: usize,
}

impl<'a> Parser<'a> {
    fn new(source: &'a str, max_depth: usize) -> Parser<'a> {
        Parser {
            tokenizer: Tokenizer::new(source),
            root: Vec::new(),
            frames: Vec::new(),
            max_depth,
        }
    }

    fn body_mut(&mut self) -> &mut Vec<ast::Node> {
        match self.frames.last_mut() {
            Some(frame) => frame.body_mut(),
            None => &mut self.root,
        }
    }

    fn push_text(&mut self, text: &str, span: Span) {
        let body = self.body_mut();
        if let Some(ast::Node::Literal(last)) = body.last_mut() {
            let (literal, last_span) = last.parts_mut();
            literal.text.push_str(text);
            last_span.end_line = span.end_line;
            last_span.end_col = span.end_col;
            last_span.end_offset = span.end_offset;
            return;
        }
        body.push(ast::Node::Literal(Spanned::new(
            ast::Literal {
                text: text.to_string(),
            },
            span,
        )));
    }

    fn parse(mut self) -> Result<Vec<ast::Node>, Error> {
        while let Some((token, span)) = self.tokenizer.next_token() {
            match token {
                Token::TemplateData(text) => self.push_text(text, span),
                Token::Expression(inner) => {
                    ok!(self
                        .parse_expression_span(inner, span)
                        .map_err(|err| attach_span(err, span)));
                }
            }
        }
        match self.frames.pop() {
            Some(frame) => {
                let mut err = syntax_error(Cow::Borrowed("unclosed if block"));
                err.set_span(frame.span);
                Err(err)
            }
            None => Ok(self.root),
        }
    }

    fn parse_expression_span(&mut self, inner: &'a str, span: Span) -> Result<(), Error> {
        if inner.trim().is_empty() {
            syntax_error!("empty expression");
        }
        match classify(inner) {
            Directive::If => {
                if self.frames.len() >= self.max_depth {
                    return Err(Error::new(
                        ErrorKind::NestingTooDeep,
                        format!("if blocks nested deeper than {} levels", self.max_depth),
                    ));
                }
                let expr = ok!(self.parse_keyword_condition(inner, span, "if"));
                self.frames.push(Frame {
                    span,
                    branches: vec![ast::Branch {
                        expr,
                        body: Vec::new(),
                    }],
                    else_body: None,
                });
            }
            Directive::Elif => {
                let expr = ok!(self.parse_keyword_condition(inner, span, "elif"));
                match self.frames.last_mut() {
                    None => syntax_error!("unexpected elif outside of if block"),
                    Some(frame) if frame.else_body.is_some() => {
                        syntax_error!("unexpected elif after else")
                    }
                    Some(frame) => frame.branches.push(ast::Branch {
                        expr,
                        body: Vec::new(),
                    }),
                }
            }
            Directive::Else => match self.frames.last_mut() {
                None => syntax_error!("unexpected else outside of if block"),
                Some(frame) if frame.else_body.is_some() => {
                    syntax_error!("duplicate else in if block")
                }
                Some(frame) => frame.else_body = Some(Vec::new()),
            },
            Directive::EndIf => {
                let frame = match self.frames.pop() {
                    Some(frame) => frame,
                    None => syntax_error!("unexpected /if outside of if block"),
                };
                let mut block_span = frame.span;
                block_span.end_line = span.end_line;
                block_span.end_col = span.end_col;
                block_span.end_offset = span.end_offset;
                let node = ast::Node::Conditional(Spanned::new(
                    ast::Conditional {
                        branches: frame.branches,
                        else_body: frame.else_body,
                    },
                    block_span,
                ));
                self.body_mut().push(node);
            }
            Directive::Output => {
                let mut parser = ExprParser::new(inner, span, self.max_depth);
                let operand = ok!(parser.parse_var_ref());
                self.body_mut().push(ast::Node::VarRef(Spanned::new(
                    ast::VarRef { operand },
                    span,
                )));
            }
        }
        Ok(())
    }

    fn parse_keyword_condition(
        &self,
        inner: &'a str,
        span: Span,
        keyword: &'static str,
    ) -> Result<ast::Expr, Error> {
        let mut parser = ExprParser::new(inner, span, self.max_depth);
        expect_token!(parser, ExprToken::Word(_), keyword);
        if ok!(parser.stream.current()).is_none() {
            syntax_error!("missing condition after {}", keyword);
        }
        parser.parse_block_condition()
    }
}

fn attach_span(mut err: Error, span: Span) -> Error {
    if err.span().is_none() {
        err.set_span(span);
    }
    err
}

/// Parses a template into its top-level nodes.
///
/// `max_depth` bounds both the nesting of `if` blocks and the recursion
/// of condition expressions.
pub fn parse(source: &str, max_depth: usize) -> Result<Vec<ast::Node>, Error> {
    Parser::new(source, max_depth).parse()
}
