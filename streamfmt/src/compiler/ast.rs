use std::fmt;
use std::ops::Deref;

use crate::compiler::tokens::Span;
use crate::modifiers::Modifier;
use crate::value::Value;

/// Container for nodes with location info.
///
/// This container fulfills two purposes: it adds location information
/// to nodes, but it also ensures the nodes is heap allocated.  The
/// latter is useful to ensure that enum variants do not cause the enum
/// to become too large.
#[derive(Clone)]
pub struct Spanned<T> {
    inner: Box<(T, Span)>,
}

impl<T> Spanned<T> {
    /// Creates a new spanned node.
    pub fn new(node: T, span: Span) -> Spanned<T> {
        Spanned {
            inner: Box::new((node, span)),
        }
    }

    /// Accesses the span.
    pub fn span(&self) -> Span {
        self.inner.1
    }

    pub(crate) fn parts_mut(&mut self) -> (&mut T, &mut Span) {
        let (ref mut node, ref mut span) = *self.inner;
        (node, span)
    }
}

impl<T> Deref for Spanned<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.inner.0
    }
}

impl<T: fmt::Debug> fmt::Debug for Spanned<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        ok!(fmt::Debug::fmt(&self.inner.0, f));
        write!(f, "{:?}", self.inner.1)
    }
}

/// A template node.
#[derive(Debug, Clone)]
pub enum Node {
    Literal(Spanned<Literal>),
    VarRef(Spanned<VarRef>),
    Conditional(Spanned<Conditional>),
}

impl Node {
    /// Returns the source span of the node.
    pub fn span(&self) -> Span {
        match self {
            Node::Literal(s) => s.span(),
            Node::VarRef(s) => s.span(),
            Node::Conditional(s) => s.span(),
        }
    }
}

/// Text emitted verbatim.
#[derive(Debug, Clone)]
pub struct Literal {
    pub text: String,
}

/// Outputs the value a path resolves to after running it through modifiers.
#[derive(Debug, Clone)]
pub struct VarRef {
    pub operand: Operand,
}

/// A chain of `if`/`elif` branches with an optional `else` body.
#[derive(Debug, Clone)]
pub struct Conditional {
    pub branches: Vec<Branch>,
    pub else_body: Option<Vec<Node>>,
}

/// A single `if` or `elif` branch.
#[derive(Debug, Clone)]
pub struct Branch {
    pub expr: Expr,
    pub body: Vec<Node>,
}

/// A dotted path into the context.
#[derive(Clone, PartialEq, Eq)]
pub struct Path {
    pub segments: Vec<String>,
}

impl fmt::Debug for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Path({self})")
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, segment) in self.segments.iter().enumerate() {
            if idx > 0 {
                ok!(f.write_str("."));
            }
            ok!(f.write_str(segment));
        }
        Ok(())
    }
}

/// A path followed by an ordered chain of modifiers.
#[derive(Debug, Clone)]
pub struct Operand {
    pub path: Path,
    pub modifiers: Vec<ModifierCall>,
}

/// A modifier invocation with its literal arguments.
#[derive(Debug, Clone)]
pub struct ModifierCall {
    pub modifier: Modifier,
    pub args: Vec<Value>,
}

/// A condition expression.
#[derive(Debug, Clone)]
pub enum Expr {
    Truthy(Spanned<Operand>),
    Not(Spanned<Not>),
    Compare(Spanned<Compare>),
    And(Spanned<BinOp>),
    Or(Spanned<BinOp>),
}

impl Expr {
    /// Returns the source span of the expression.
    pub fn span(&self) -> Span {
        match self {
            Expr::Truthy(s) => s.span(),
            Expr::Not(s) => s.span(),
            Expr::Compare(s) => s.span(),
            Expr::And(s) => s.span(),
            Expr::Or(s) => s.span(),
        }
    }
}

/// Logical negation.
#[derive(Debug, Clone)]
pub struct Not {
    pub expr: Expr,
}

/// Both sides of `and` and `or`.
#[derive(Debug, Clone)]
pub struct BinOp {
    pub left: Expr,
    pub right: Expr,
}

/// Compares an operand against a literal.
#[derive(Debug, Clone)]
pub struct Compare {
    pub left: Operand,
    pub op: CompareOp,
    pub right: Value,
}

/// The comparison operators.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
    Contains,
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CompareOp::Eq => "=",
            CompareOp::Ne => "!=",
            CompareOp::Gt => ">",
            CompareOp::Gte => ">=",
            CompareOp::Lt => "<",
            CompareOp::Lte => "<=",
            CompareOp::Contains => "~",
        })
    }
}
