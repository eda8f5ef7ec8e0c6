//! streamfmt renders short titles and descriptions for media stream results.
//!
//! A template is plain text with expression spans in braces.  Spans output a
//! value looked up by dotted path from the context, optionally piped through
//! modifiers, or open and close conditional blocks:
//!
//! ```text
//! [{service.shortName}] {stream.name|truncate(40)}
//! {if stream.cached}⚡{elif stream.size > 1000000000}💾{else}⏳{/if} {stream.size|bytes}
//! {stream.languages|join(' / ')}
//! ```
//!
//! # Usage
//!
//! Parse a template once with [`parse`], then render it against contexts.
//! Anything implementing [`Serialize`](serde::Serialize) works as context and
//! the [`context!`] macro builds one in code:
//!
//! ```
//! use streamfmt::context;
//!
//! let tmpl = streamfmt::parse("{stream.name|upper} ({stream.size|bytes})").unwrap();
//! let ctx = context! {
//!     stream => context! {
//!         name => "Movie.2160p",
//!         size => 1610612736u64,
//!     },
//! };
//! assert_eq!(tmpl.render(ctx), "MOVIE.2160P (1.5 GB)");
//! ```
//!
//! Parsing is the only operation that fails.  Rendering is fail-soft:
//! missing paths render empty, modifiers that do not accept their input
//! render empty and unknown modifiers pass their input through.
//!
//! # Syntax
//!
//! * `{path}` outputs a value.  A path is a dot separated list of keys,
//!   numeric segments index into sequences (`stream.languages.0`).
//! * `{path|modifier|modifier(arg, ...)}` runs the value through
//!   [modifiers](crate::modifiers) from left to right.  Arguments are quoted
//!   strings, numbers or bare words.
//! * `{if cond}...{elif cond}...{else}...{/if}` renders the first branch
//!   with a true condition.
//! * `{{` outputs a literal `{`.  A `{` without a closing brace is kept as
//!   text.
//!
//! Conditions combine operands with `not`, `and` and `or` (binding in that
//! order, so `a or b and c` is `a or (b and c)`).  An operand is a path with
//! optional modifiers, compared against a literal or tested for truthiness:
//!
//! | operator | meaning |
//! |---|---|
//! | `=` / `==`, `!=` | equality on the type of the resolved value |
//! | `>`, `>=`, `<`, `<=` | numeric comparison, numeric strings included |
//! | `~` | substring containment, any element for sequences |
//!
//! Non-empty strings and sequences, non-zero numbers and `true` are true.
//!
//! # Legacy templates
//!
//! Templates written in the older ternary dialect can be migrated with
//! [`convert`].
//!
//! # Optional Features
//!
//! - `tracing`: emits debug events through [`tracing`](https://docs.rs/tracing)
//!   for silent degradations during rendering (unknown modifiers, rejected
//!   modifier input, truncated output).
//! - `unstable_machinery`: exposes the tokenizer and parser for tooling.
#![allow(clippy::get_first)]
#![allow(clippy::needless_borrowed_reference)]

#[macro_use]
mod macros;

mod compiler;
mod convert;
mod engine;
mod error;
mod eval;
mod output;
mod template;
mod utils;

pub mod modifiers;
pub mod value;

pub use self::convert::convert;
pub use self::engine::{Engine, Limits};
pub use self::error::{Error, ErrorKind};
pub use self::template::Template;
pub use self::value::Value;

#[doc(hidden)]
pub use self::macros::__context;

/// Parses a template with default [`Limits`].
///
/// ```
/// let tmpl = streamfmt::parse("{if stream.cached}⚡{/if}").unwrap();
/// assert!(streamfmt::parse("{if stream.cached}⚡").is_err());
/// ```
pub fn parse(source: &str) -> Result<Template, Error> {
    Engine::new().parse(source)
}

/// Renders a parsed template against a context value.
///
/// This is the same as [`Template::render_value`].
pub fn render(template: &Template, ctx: &Value) -> String {
    template.render_value(ctx)
}

/// This module gives access to the low level machinery.
///
/// This module is only provided by the `unstable_machinery` feature and does not
/// have a stable interface.  It mostly exists for debugging tools.
#[cfg(feature = "unstable_machinery")]
pub mod machinery {
    pub use crate::compiler::ast;
    pub use crate::compiler::lexer::{tokenize, ExprTokenizer, Tokenizer};
    pub use crate::compiler::tokens::{ExprToken, Span, Token};

    use crate::error::Error;

    /// Parses a template into its nodes without wrapping it in a template.
    pub fn parse_ast(source: &str, limits: &crate::Limits) -> Result<Vec<ast::Node>, Error> {
        crate::compiler::parser::parse(source, limits.max_nesting_depth)
    }
}
