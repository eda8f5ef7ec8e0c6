use serde::Serialize;

use crate::error::Error;
use crate::template::Template;
use crate::value::Value;

/// Resource limits applied when parsing and rendering templates.
///
/// Templates usually come from end users, so both the structure of a
/// template and the amount of output it may produce are bounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    /// Maximum nesting of `if` blocks, and of `not` chains inside a
    /// condition.  Deeper templates fail to parse.
    pub max_nesting_depth: usize,
    /// Maximum number of bytes a render produces.  Longer output is cut
    /// at a character boundary.
    pub max_output_len: usize,
}

impl Default for Limits {
    fn default() -> Limits {
        Limits {
            max_nesting_depth: 64,
            max_output_len: 64 * 1024,
        }
    }
}

/// Holds the engine configuration.
///
/// The free functions [`parse`](crate::parse) and [`render`](crate::render)
/// use a default engine.  Create one explicitly to change the [`Limits`]:
///
/// ```
/// # use streamfmt::{context, Engine};
/// let mut engine = Engine::new();
/// engine.set_max_output_len(5);
/// let tmpl = engine.parse("{stream.name}").unwrap();
/// assert_eq!(tmpl.render(context!(stream => context!(name => "hello world"))), "hello");
/// ```
#[derive(Debug, Clone, Default)]
pub struct Engine {
    limits: Limits,
}

impl Engine {
    /// Creates an engine with default limits.
    pub fn new() -> Engine {
        Engine::default()
    }

    /// Creates an engine with the given limits.
    pub fn with_limits(limits: Limits) -> Engine {
        Engine { limits }
    }

    /// Sets the maximum nesting depth of conditionals and conditions.
    pub fn set_max_nesting_depth(&mut self, depth: usize) {
        self.limits.max_nesting_depth = depth;
    }

    /// Sets the maximum output size in bytes.
    pub fn set_max_output_len(&mut self, len: usize) {
        self.limits.max_output_len = len;
    }

    /// Returns the current limits.
    pub fn limits(&self) -> &Limits {
        &self.limits
    }

    /// Parses a template.
    ///
    /// The returned template keeps the limits of the engine at the time of
    /// parsing.
    pub fn parse(&self, source: &str) -> Result<Template, Error> {
        Template::new(source, self.limits)
    }

    /// Parses and renders a template in one go.
    pub fn render_str<S: Serialize>(&self, source: &str, ctx: S) -> Result<String, Error> {
        let tmpl = ok!(self.parse(source));
        Ok(tmpl.render_value(&Value::from_serialize(&ctx)))
    }
}
