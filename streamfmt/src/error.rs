use std::borrow::Cow;
use std::fmt;

use crate::compiler::tokens::Span;

/// Represents template errors.
///
/// Errors are only ever produced while parsing a template.  Rendering a parsed
/// template never fails: missing values, wrong-typed modifier inputs and unknown
/// modifiers all degrade to an empty or unmodified value instead.
///
/// Syntax errors carry the location of the offending span which is included
/// when the error is displayed:
///
/// ```rust
/// let err = streamfmt::parse("{if stream.cached}⚡").unwrap_err();
/// assert_eq!(err.kind(), streamfmt::ErrorKind::SyntaxError);
/// assert_eq!(err.offset(), Some(0));
/// println!("{}", err);
/// ```
pub struct Error {
    kind: ErrorKind,
    detail: Option<Cow<'static, str>>,
    span: Option<Span>,
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Error")
            .field("kind", &self.kind)
            .field("detail", &self.detail)
            .field("span", &self.span)
            .field("source", &self.source)
            .finish()
    }
}

impl PartialEq for Error {
    fn eq(&self, other: &Self) -> bool {
        self.kind() == other.kind()
    }
}

impl Eq for Error {}

/// An enum describing the error kind.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ErrorKind {
    /// The template or one of its expressions is malformed.
    SyntaxError,
    /// A string literal contains an unsupported escape sequence.
    BadEscape,
    /// Conditional blocks or expressions are nested deeper than allowed.
    NestingTooDeep,
}

impl ErrorKind {
    fn description(self) -> &'static str {
        match self {
            ErrorKind::SyntaxError => "syntax error",
            ErrorKind::BadEscape => "bad string escape",
            ErrorKind::NestingTooDeep => "nesting too deep",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(ref detail) = self.detail {
            ok!(write!(f, "{}: {}", self.kind, detail));
        } else {
            ok!(write!(f, "{}", self.kind));
        }
        if let Some(span) = self.span {
            ok!(write!(
                f,
                " (at line {}, column {}, offset {})",
                span.start_line, span.start_col, span.start_offset
            ));
        }
        Ok(())
    }
}

impl Error {
    /// Creates a new error with kind and detail.
    pub fn new<D: Into<Cow<'static, str>>>(kind: ErrorKind, detail: D) -> Error {
        Error {
            kind,
            detail: Some(detail.into()),
            span: None,
            source: None,
        }
    }

    pub(crate) fn set_span(&mut self, span: Span) {
        self.span = Some(span);
    }

    /// Attaches another error as source to this error.
    pub fn with_source<E: std::error::Error + Send + Sync + 'static>(mut self, source: E) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Returns the error kind
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Returns the error detail without location information.
    pub fn detail(&self) -> Option<&str> {
        self.detail.as_deref()
    }

    /// Returns the line (1-indexed) of the offending span.
    pub fn line(&self) -> Option<usize> {
        self.span.map(|x| x.start_line as usize)
    }

    /// Returns the byte offset of the offending span in the template source.
    pub fn offset(&self) -> Option<usize> {
        self.span.map(|x| x.start_offset as usize)
    }

    /// Returns the full span of the offending template region.
    pub fn span(&self) -> Option<Span> {
        self.span
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source.as_ref().map(|err| err.as_ref() as _)
    }
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Self {
        Error {
            kind,
            detail: None,
            span: None,
            source: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use similar_asserts::assert_eq;

    #[test]
    fn test_display_with_span() {
        let mut err = Error::new(ErrorKind::SyntaxError, "unclosed if block");
        err.set_span(Span {
            start_line: 2,
            start_col: 4,
            start_offset: 42,
            end_line: 2,
            end_col: 12,
            end_offset: 50,
        });
        assert_eq!(
            err.to_string(),
            "syntax error: unclosed if block (at line 2, column 4, offset 42)"
        );
        assert_eq!(err.offset(), Some(42));
        assert_eq!(err.line(), Some(2));
    }

    #[test]
    fn test_display_kind_only() {
        let err = Error::from(ErrorKind::BadEscape);
        assert_eq!(err.to_string(), "bad string escape");
        assert_eq!(err.offset(), None);
    }
}
