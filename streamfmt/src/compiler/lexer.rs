use crate::compiler::tokens::{ExprToken, Span, Token};
use crate::error::{Error, ErrorKind};
use crate::utils::{memchr, unescape};

/// Characters that end a bare word inside an expression span.
const WORD_TERMINATORS: &[u8] = b"|(),=!<>~'\"";

/// Position tracking shared by both tokenizers.
struct Cursor<'s> {
    rest: &'s str,
    current_line: u32,
    current_col: u32,
    current_offset: u32,
}

impl<'s> Cursor<'s> {
    fn advance(&mut self, bytes: usize) -> &'s str {
        let (skipped, new_rest) = self.rest.split_at(bytes);
        for c in skipped.chars() {
            match c {
                '\n' => {
                    self.current_line += 1;
                    self.current_col = 0;
                }
                _ => self.current_col += 1,
            }
        }
        self.current_offset += bytes as u32;
        self.rest = new_rest;
        skipped
    }

    #[inline]
    fn rest_bytes(&self) -> &'s [u8] {
        self.rest.as_bytes()
    }

    #[inline]
    fn loc(&self) -> (u32, u32, u32) {
        (self.current_line, self.current_col, self.current_offset)
    }

    #[inline]
    fn span(&self, (start_line, start_col, start_offset): (u32, u32, u32)) -> Span {
        Span {
            start_line,
            start_col,
            start_offset,
            end_line: self.current_line,
            end_col: self.current_col,
            end_offset: self.current_offset,
        }
    }
}

/// Finds the first unescaped closing brace.  A backslash escapes the byte
/// following it; utf-8 continuation bytes can never be a brace or a backslash
/// so scanning bytes is fine.
fn find_span_end(s: &str) -> Option<usize> {
    let mut escaped = false;
    for (idx, &c) in s.as_bytes().iter().enumerate() {
        match (escaped, c) {
            (true, _) => escaped = false,
            (false, b'\\') => escaped = true,
            (false, b'}') => return Some(idx),
            _ => {}
        }
    }
    None
}

/// Splits a template into text runs and expression spans.
///
/// Lexing never fails: an opening brace without a closing one turns the rest
/// of the input into template data.
pub struct Tokenizer<'s> {
    cursor: Cursor<'s>,
}

impl<'s> Tokenizer<'s> {
    /// Creates a new tokenizer.
    pub fn new(input: &'s str) -> Tokenizer<'s> {
        Tokenizer {
            cursor: Cursor {
                rest: input,
                current_line: 1,
                current_col: 0,
                current_offset: 0,
            },
        }
    }

    /// Produces the next token from the tokenizer.
    pub fn next_token(&mut self) -> Option<(Token<'s>, Span)> {
        let bytes = self.cursor.rest_bytes();
        if bytes.is_empty() {
            return None;
        }
        let old_loc = self.cursor.loc();

        if bytes[0] != b'{' {
            let lead = self.cursor.advance(memchr(bytes, b'{').unwrap_or(bytes.len()));
            return Some((Token::TemplateData(lead), self.cursor.span(old_loc)));
        }

        // `{{` is the escape for a single literal brace
        if bytes.get(1) == Some(&b'{') {
            let raw = self.cursor.advance(2);
            return Some((Token::TemplateData(&raw[..1]), self.cursor.span(old_loc)));
        }

        let token = match find_span_end(&self.cursor.rest[1..]) {
            Some(end) => {
                let raw = self.cursor.advance(end + 2);
                Token::Expression(&raw[1..raw.len() - 1])
            }
            None => Token::TemplateData(self.cursor.advance(bytes.len())),
        };
        Some((token, self.cursor.span(old_loc)))
    }
}

/// Tokenizes the contents of a single expression span.
pub struct ExprTokenizer<'s> {
    cursor: Cursor<'s>,
}

impl<'s> ExprTokenizer<'s> {
    /// Creates a tokenizer for the inside of the expression token at `span`.
    ///
    /// The opening brace is skipped so that reported spans point into the
    /// original template source.
    pub fn new(input: &'s str, span: Span) -> ExprTokenizer<'s> {
        ExprTokenizer {
            cursor: Cursor {
                rest: input,
                current_line: span.start_line,
                current_col: span.start_col + 1,
                current_offset: span.start_offset + 1,
            },
        }
    }

    /// Returns the location right after the last consumed token.
    pub fn end_span(&self) -> Span {
        self.cursor.span(self.cursor.loc())
    }

    /// Produces the next token from the tokenizer.
    pub fn next_token(&mut self) -> Result<Option<(ExprToken<'s>, Span)>, Error> {
        self.skip_whitespace();
        if self.cursor.rest.is_empty() {
            return Ok(None);
        }
        let old_loc = self.cursor.loc();

        let op = match self.cursor.rest_bytes().get(..2) {
            Some(b"!=") => Some(ExprToken::Ne),
            Some(b">=") => Some(ExprToken::Gte),
            Some(b"<=") => Some(ExprToken::Lte),
            Some(b"==") => Some(ExprToken::Eq),
            _ => None,
        };
        if let Some(op) = op {
            self.cursor.advance(2);
            return Ok(Some((op, self.cursor.span(old_loc))));
        }

        let op = match self.cursor.rest_bytes()[0] {
            b'=' => ExprToken::Eq,
            b'>' => ExprToken::Gt,
            b'<' => ExprToken::Lt,
            b'~' => ExprToken::Tilde,
            b'|' => ExprToken::Pipe,
            b'(' => ExprToken::ParenOpen,
            b')' => ExprToken::ParenClose,
            b',' => ExprToken::Comma,
            b'\'' => return self.eat_string(b'\'').map(Some),
            b'"' => return self.eat_string(b'"').map(Some),
            b'!' => {
                self.cursor.advance(1);
                return Err(self.syntax_error("unexpected character `!`", old_loc));
            }
            _ => return self.eat_word().map(Some),
        };
        self.cursor.advance(1);
        Ok(Some((op, self.cursor.span(old_loc))))
    }

    fn syntax_error(&self, msg: &'static str, loc: (u32, u32, u32)) -> Error {
        let mut err = Error::new(ErrorKind::SyntaxError, msg);
        err.set_span(self.cursor.span(loc));
        err
    }

    fn skip_whitespace(&mut self) {
        let skipped = self
            .cursor
            .rest
            .chars()
            .map_while(|c| c.is_whitespace().then(|| c.len_utf8()))
            .sum();
        if skipped > 0 {
            self.cursor.advance(skipped);
        }
    }

    fn eat_word(&mut self) -> Result<(ExprToken<'s>, Span), Error> {
        let old_loc = self.cursor.loc();
        let mut escaped = false;
        let mut has_escapes = false;
        let word_len = self
            .cursor
            .rest
            .chars()
            .take_while(|&c| match (escaped, c) {
                (true, _) => {
                    escaped = false;
                    true
                }
                (_, '\\') => {
                    escaped = true;
                    has_escapes = true;
                    true
                }
                (_, c) if c.is_whitespace() => false,
                (_, c) => !c.is_ascii() || !WORD_TERMINATORS.contains(&(c as u8)),
            })
            .map(char::len_utf8)
            .sum::<usize>();
        let word = self.cursor.advance(word_len);
        if escaped {
            return Err(self.syntax_error("unexpected end of expression", old_loc));
        }
        let span = self.cursor.span(old_loc);
        if has_escapes {
            match unescape(word) {
                Ok(unescaped) => Ok((ExprToken::String(unescaped), span)),
                Err(mut err) => {
                    err.set_span(span);
                    Err(err)
                }
            }
        } else {
            Ok((ExprToken::Word(word), span))
        }
    }

    fn eat_string(&mut self, delim: u8) -> Result<(ExprToken<'s>, Span), Error> {
        let old_loc = self.cursor.loc();
        let mut escaped = false;
        let mut has_escapes = false;
        let str_len = self
            .cursor
            .rest_bytes()
            .iter()
            .skip(1)
            .take_while(|&&c| match (escaped, c) {
                (true, _) => {
                    escaped = false;
                    true
                }
                (_, b'\\') => {
                    escaped = true;
                    has_escapes = true;
                    true
                }
                (_, c) if c == delim => false,
                _ => true,
            })
            .count();
        if escaped || self.cursor.rest_bytes().get(str_len + 1) != Some(&delim) {
            self.cursor.advance(self.cursor.rest.len());
            return Err(self.syntax_error("unexpected end of string", old_loc));
        }
        let s = self.cursor.advance(str_len + 2);
        let span = self.cursor.span(old_loc);
        Ok(if has_escapes {
            match unescape(&s[1..s.len() - 1]) {
                Ok(unescaped) => (ExprToken::String(unescaped), span),
                Err(mut err) => {
                    err.set_span(span);
                    return Err(err);
                }
            }
        } else {
            (ExprToken::Str(&s[1..s.len() - 1]), span)
        })
    }
}

/// Utility function to quickly tokenize into an iterator.
#[cfg(any(test, feature = "unstable_machinery"))]
pub fn tokenize(input: &str) -> impl Iterator<Item = (Token<'_>, Span)> {
    let mut tokenizer = Tokenizer::new(input);
    std::iter::from_fn(move || tokenizer.next_token())
}

#[cfg(test)]
mod tests {
    use super::*;

    use similar_asserts::assert_eq;

    fn tokens(input: &str) -> Vec<Token<'_>> {
        tokenize(input).map(|x| x.0).collect()
    }

    fn expr_tokens(input: &str) -> Result<Vec<ExprToken<'_>>, Error> {
        let mut tokenizer = ExprTokenizer::new(input, Span::default());
        let mut rv = Vec::new();
        while let Some((token, _)) = tokenizer.next_token()? {
            rv.push(token);
        }
        Ok(rv)
    }

    #[test]
    fn test_find_span_end() {
        assert_eq!(find_span_end("foo}"), Some(3));
        assert_eq!(find_span_end("foo"), None);
        assert_eq!(find_span_end(r"a\}b}"), Some(4));
        assert_eq!(find_span_end(r"a\\}b}"), Some(3));
    }

    #[test]
    fn test_text_and_expressions() {
        assert_eq!(
            tokens("[{service.shortName}] {stream.name}"),
            vec![
                Token::TemplateData("["),
                Token::Expression("service.shortName"),
                Token::TemplateData("] "),
                Token::Expression("stream.name"),
            ]
        );
    }

    #[test]
    fn test_braces_do_not_nest() {
        assert_eq!(
            tokens("{a{b}c}"),
            vec![Token::Expression("a{b"), Token::TemplateData("c}")]
        );
    }

    #[test]
    fn test_escaped_brace() {
        assert_eq!(
            tokens("a{{b}"),
            vec![
                Token::TemplateData("a"),
                Token::TemplateData("{"),
                Token::TemplateData("b}"),
            ]
        );
    }

    #[test]
    fn test_unterminated_brace_is_text() {
        assert_eq!(
            tokens("size {stream.size|bytes"),
            vec![
                Token::TemplateData("size "),
                Token::TemplateData("{stream.size|bytes"),
            ]
        );
    }

    #[test]
    fn test_spans() {
        let spans = tokenize("ab\n{x}").map(|x| x.1).collect::<Vec<_>>();
        assert_eq!(spans[1].start_line, 2);
        assert_eq!(spans[1].start_col, 0);
        assert_eq!(spans[1].start_offset, 3);
        assert_eq!(spans[1].end_offset, 6);
    }

    #[test]
    fn test_expression_tokens() {
        assert_eq!(
            expr_tokens("if stream.size >= 1000 and not stream.cached").unwrap(),
            vec![
                ExprToken::Word("if"),
                ExprToken::Word("stream.size"),
                ExprToken::Gte,
                ExprToken::Word("1000"),
                ExprToken::Word("and"),
                ExprToken::Word("not"),
                ExprToken::Word("stream.cached"),
            ]
        );
        assert_eq!(
            expr_tokens("stream.languages|join(' | ')|upper").unwrap(),
            vec![
                ExprToken::Word("stream.languages"),
                ExprToken::Pipe,
                ExprToken::Word("join"),
                ExprToken::ParenOpen,
                ExprToken::Str(" | "),
                ExprToken::ParenClose,
                ExprToken::Pipe,
                ExprToken::Word("upper"),
            ]
        );
        assert_eq!(
            expr_tokens("a!=b==c~d<e").unwrap(),
            vec![
                ExprToken::Word("a"),
                ExprToken::Ne,
                ExprToken::Word("b"),
                ExprToken::Eq,
                ExprToken::Word("c"),
                ExprToken::Tilde,
                ExprToken::Word("d"),
                ExprToken::Lt,
                ExprToken::Word("e"),
            ]
        );
    }

    #[test]
    fn test_string_escapes() {
        assert_eq!(
            expr_tokens(r#""it\"s" 'a\}b'"#).unwrap(),
            vec![
                ExprToken::String("it\"s".into()),
                ExprToken::String("a}b".into()),
            ]
        );
        assert_eq!(
            expr_tokens(r"x\}y").unwrap(),
            vec![ExprToken::String("x}y".into())]
        );
    }

    #[test]
    fn test_expression_errors() {
        let err = expr_tokens("join('abc").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SyntaxError);
        assert_eq!(err.offset(), Some(6));
        assert!(expr_tokens("a ! b").is_err());
        assert_eq!(
            expr_tokens(r"'\q'").unwrap_err().kind(),
            ErrorKind::BadEscape
        );
    }
}
