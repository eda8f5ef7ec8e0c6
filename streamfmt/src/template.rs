use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use crate::compiler::ast;
use crate::compiler::parser::parse;
use crate::engine::Limits;
use crate::error::Error;
use crate::eval::Evaluator;
use crate::output::Output;
use crate::value::Value;

struct TemplateInner {
    source: String,
    nodes: Vec<ast::Node>,
    limits: Limits,
}

/// A parsed template.
///
/// Templates are immutable and cheap to clone.  A single template can be
/// rendered from many threads at once.
#[derive(Clone)]
pub struct Template {
    inner: Arc<TemplateInner>,
}

impl fmt::Debug for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Template")
            .field("source", &self.inner.source)
            .field("limits", &self.inner.limits)
            .finish()
    }
}

impl Template {
    pub(crate) fn new(source: &str, limits: Limits) -> Result<Template, Error> {
        let nodes = ok!(parse(source, limits.max_nesting_depth));
        Ok(Template {
            inner: Arc::new(TemplateInner {
                source: source.to_string(),
                nodes,
                limits,
            }),
        })
    }

    /// Returns the source the template was parsed from.
    pub fn source(&self) -> &str {
        &self.inner.source
    }

    /// Returns the limits the template was parsed with.
    pub fn limits(&self) -> &Limits {
        &self.inner.limits
    }

    /// Renders the template against anything serializable.
    ///
    /// ```
    /// # use streamfmt::context;
    /// let tmpl = streamfmt::parse("[{service.shortName}] {stream.name}").unwrap();
    /// let ctx = context! {
    ///     service => context!(shortName => "RD"),
    ///     stream => context!(name => "Movie"),
    /// };
    /// assert_eq!(tmpl.render(ctx), "[RD] Movie");
    /// ```
    pub fn render<S: Serialize>(&self, ctx: S) -> String {
        self.render_value(&Value::from_serialize(&ctx))
    }

    /// Renders the template against a context value.
    ///
    /// Rendering never fails.  Missing paths render empty and the output is
    /// capped at [`Limits::max_output_len`] bytes.
    pub fn render_value(&self, ctx: &Value) -> String {
        let mut rv = String::with_capacity(self.inner.source.len());
        let mut out = Output::new(&mut rv, self.inner.limits.max_output_len);
        Evaluator::new(ctx, self.inner.limits.max_output_len).render(&self.inner.nodes, &mut out);
        rv
    }

    /// Returns the parsed nodes.
    #[cfg(feature = "unstable_machinery")]
    pub fn nodes(&self) -> &[ast::Node] {
        &self.inner.nodes
    }
}
