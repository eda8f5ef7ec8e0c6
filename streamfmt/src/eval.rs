use std::fmt::Write;

use crate::compiler::ast;
use crate::output::Output;
use crate::value::{Value, ValueKind};

/// Walks template nodes against a context.
///
/// Values produced by modifiers never grow past `max_len` bytes, the
/// same budget the rendered output is held to.
pub(crate) struct Evaluator<'ctx> {
    ctx: &'ctx Value,
    max_len: usize,
}

impl<'ctx> Evaluator<'ctx> {
    pub fn new(ctx: &'ctx Value, max_len: usize) -> Evaluator<'ctx> {
        Evaluator { ctx, max_len }
    }

    /// Renders nodes into the output until it is full.
    pub fn render(&self, nodes: &[ast::Node], out: &mut Output<'_>) {
        for node in nodes {
            if out.is_full() {
                return;
            }
            match node {
                ast::Node::Literal(lit) => {
                    out.write_str(&lit.text).ok();
                }
                ast::Node::VarRef(var) => {
                    let value = self.eval_operand(&var.operand);
                    write!(out, "{value}").ok();
                }
                ast::Node::Conditional(cond) => {
                    let body = cond
                        .branches
                        .iter()
                        .find(|branch| self.eval_expr(&branch.expr))
                        .map(|branch| &branch.body)
                        .or(cond.else_body.as_ref());
                    if let Some(body) = body {
                        self.render(body, out);
                    }
                }
            }
        }
    }

    /// Resolves the path of an operand and runs its modifiers.
    pub fn eval_operand(&self, operand: &ast::Operand) -> Value {
        let mut value = self.ctx.get_path(&operand.path.segments);
        for call in &operand.modifiers {
            value = call.modifier.apply(value, &call.args, self.max_len);
        }
        value
    }

    /// Evaluates a condition.
    pub fn eval_expr(&self, expr: &ast::Expr) -> bool {
        match expr {
            ast::Expr::Truthy(operand) => self.eval_operand(operand).is_true(),
            ast::Expr::Not(not) => !self.eval_expr(&not.expr),
            ast::Expr::Compare(cmp) => compare(&self.eval_operand(&cmp.left), cmp.op, &cmp.right),
            ast::Expr::And(op) => self.eval_expr(&op.left) && self.eval_expr(&op.right),
            ast::Expr::Or(op) => self.eval_expr(&op.left) || self.eval_expr(&op.right),
        }
    }
}

/// Compares a resolved value against a literal.
///
/// Comparisons never fail: operands that cannot be compared make the
/// comparison false (and `!=` true).
pub(crate) fn compare(left: &Value, op: ast::CompareOp, right: &Value) -> bool {
    match op {
        ast::CompareOp::Eq => loose_eq(left, right),
        ast::CompareOp::Ne => !loose_eq(left, right),
        ast::CompareOp::Contains => contains(left, right),
        ast::CompareOp::Gt | ast::CompareOp::Gte | ast::CompareOp::Lt | ast::CompareOp::Lte => {
            let (a, b) = match (left.as_number(), right.as_number()) {
                (Some(a), Some(b)) => (a, b),
                _ => return false,
            };
            match op {
                ast::CompareOp::Gt => a > b,
                ast::CompareOp::Gte => a >= b,
                ast::CompareOp::Lt => a < b,
                _ => a <= b,
            }
        }
    }
}

/// Equality on the type of the resolved value.
fn loose_eq(left: &Value, right: &Value) -> bool {
    match left.kind() {
        ValueKind::String => left.as_str() == Some(right.to_string().as_str()),
        ValueKind::Number => match (left.as_number(), right.as_number()) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        },
        ValueKind::Bool => {
            let expected = right.as_bool().or_else(|| match right.as_str() {
                Some("true") => Some(true),
                Some("false") => Some(false),
                _ => None,
            });
            left.as_bool() == expected
        }
        _ => false,
    }
}

/// Substring containment on the string form.  Sequences match if any
/// element does.
fn contains(left: &Value, right: &Value) -> bool {
    let needle = right.to_string();
    match left.as_slice() {
        Some(items) => items.iter().any(|item| {
            item.to_scalar_str()
                .map_or(false, |s| s.contains(needle.as_str()))
        }),
        None => left
            .to_scalar_str()
            .map_or(false, |s| s.contains(needle.as_str())),
    }
}
