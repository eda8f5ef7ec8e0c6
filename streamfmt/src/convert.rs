//! Conversion of the legacy ternary dialect.
//!
//! The legacy dialect writes conditionals as a bracketed ternary attached
//! to a path, with checks and modifiers separated by `::`:
//!
//! ```text
//! {stream.size::bytes}
//! {stream.cached::istrue["⚡"||""]}
//! {stream.size::>1000["big"||"small"]}
//! ```
//!
//! [`convert`] rewrites such templates into regular template syntax.  The
//! result always parses, whatever the input.  Regions that are not valid
//! legacy constructs are either kept (if they already are valid output
//! spans) or escaped so they render as literal text.
//!
//! Conversion runs in linear time.  Every scan for a construct or a kept
//! span stops at the next opening brace outside of quotes, and construct
//! results are remembered by offset.
use std::collections::HashMap;

use crate::compiler::ast::{CompareOp, Node};
use crate::compiler::parser::{is_valid_segment, literal_from_word, parse};
use crate::engine::Limits;
use crate::utils::quote_str;

/// Maximum nesting of legacy constructs inside branches.
///
/// Deeper constructs are emitted as literal text.  This stays well below
/// the default nesting limit of the parser so converted output parses.
const MAX_LEGACY_DEPTH: usize = 32;

/// A check attached to a legacy path.
enum Check {
    Truthy,
    Falsy,
    Compare(CompareOp, String),
}

struct Converter<'s> {
    source: &'s str,
    max_parse_depth: usize,
    // results of construct parses by start offset
    memo: HashMap<usize, Option<(usize, String)>>,
}

impl<'s> Converter<'s> {
    fn new(source: &'s str) -> Converter<'s> {
        Converter {
            source,
            max_parse_depth: Limits::default().max_nesting_depth,
            memo: HashMap::new(),
        }
    }

    fn rest(&self, pos: usize) -> &'s str {
        &self.source[pos..]
    }

    fn run(&mut self) -> String {
        let mut out = String::with_capacity(self.source.len());
        let mut pos = 0;
        while let Some(idx) = self.rest(pos).find('{') {
            let start = pos + idx;
            out.push_str(&self.source[pos..start]);
            if let Some((end, converted)) = self.construct(start, 0) {
                out.push_str(&converted);
                pos = end;
            } else if let Some(end) = self.output_span(start) {
                debug!(offset = start, "keeping span that is not a legacy construct");
                out.push_str(&self.source[start..end]);
                pos = end;
            } else {
                out.push_str("{{");
                pos = start + 1;
            }
        }
        out.push_str(self.rest(pos));
        out
    }

    /// Checks if the region at `start` already is a valid output span.
    ///
    /// Regions with an opening brace outside of quotes are never kept.
    fn output_span(&self, start: usize) -> Option<usize> {
        let bytes = self.source.as_bytes();
        let mut quote = None;
        let mut idx = start + 1;
        while let Some(&b) = bytes.get(idx) {
            match (b, quote) {
                (b'\\', _) => idx += 1,
                (b'}', _) => break,
                (b'{', None) => return None,
                (b'"' | b'\'', None) => quote = Some(b),
                (b, Some(q)) if b == q => quote = None,
                _ => {}
            }
            idx += 1;
        }
        if bytes.get(idx) != Some(&b'}') {
            return None;
        }
        let end = idx + 1;
        match parse(&self.source[start..end], self.max_parse_depth) {
            Ok(nodes) if matches!(nodes.as_slice(), [Node::VarRef(_)]) => Some(end),
            _ => None,
        }
    }

    /// Converts the legacy construct starting at the brace at `start`.
    fn construct(&mut self, start: usize, depth: usize) -> Option<(usize, String)> {
        if let Some(rv) = self.memo.get(&start) {
            return rv.clone();
        }
        if depth > MAX_LEGACY_DEPTH {
            debug!(offset = start, "legacy construct nested too deep");
            self.memo.insert(start, None);
            return None;
        }
        let rv = self
            .parse_construct(start, depth)
            .filter(|(_, converted)| parse(converted, self.max_parse_depth).is_ok());
        self.memo.insert(start, rv.clone());
        rv
    }

    fn parse_construct(&mut self, start: usize, depth: usize) -> Option<(usize, String)> {
        let mut pos = start + 1;
        let path_len = self
            .rest(pos)
            .find(|c: char| !(c == '.' || is_path_char(c)))
            .unwrap_or(self.rest(pos).len());
        let path = &self.source[pos..pos + path_len];
        if !path.split('.').all(is_valid_segment) {
            return None;
        }
        pos += path_len;

        let mut operand = path.to_string();
        let mut check = None;
        while self.rest(pos).starts_with("::") {
            pos += 2;
            if check.is_some() {
                return None;
            }
            if let Some((op, len)) = match_op(self.rest(pos)) {
                let (value, end) = some!(self.check_operand(pos + len));
                check = Some(Check::Compare(op, value));
                pos = end;
                continue;
            }
            let name_len = self
                .rest(pos)
                .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
                .unwrap_or(self.rest(pos).len());
            if name_len == 0 {
                return None;
            }
            let name = &self.source[pos..pos + name_len];
            pos += name_len;
            match name {
                "istrue" | "exists" => check = Some(Check::Truthy),
                "isfalse" => check = Some(Check::Falsy),
                _ => {
                    operand.push('|');
                    operand.push_str(name);
                    if self.rest(pos).starts_with('(') {
                        let (args, end) = some!(self.modifier_args(pos + 1));
                        operand.push('(');
                        operand.push_str(&args.join(", "));
                        operand.push(')');
                        pos = end;
                    }
                }
            }
        }

        let mut branches = None;
        if self.rest(pos).starts_with('[') {
            let (if_true, end) = some!(self.branch(pos + 1, depth));
            pos = end;
            let mut if_false = None;
            if self.rest(pos).starts_with("||") {
                let (branch, end) = some!(self.branch(pos + 2, depth));
                if_false = Some(branch);
                pos = end;
            }
            if !self.rest(pos).starts_with(']') {
                return None;
            }
            pos += 1;
            branches = Some((if_true, if_false));
        }
        if !self.rest(pos).starts_with('}') {
            return None;
        }
        pos += 1;

        let converted = match (branches, check) {
            (None, None) => format!("{{{operand}}}"),
            (None, Some(_)) => return None,
            (Some((if_true, if_false)), check) => {
                let cond = match check {
                    None | Some(Check::Truthy) => operand,
                    Some(Check::Falsy) => format!("not {operand}"),
                    Some(Check::Compare(op, value)) => {
                        format!("{operand} {op} {}", literal(&value))
                    }
                };
                let mut rv = format!("{{if {cond}}}{if_true}");
                if let Some(if_false) = if_false.filter(|x| !x.is_empty()) {
                    rv.push_str("{else}");
                    rv.push_str(&if_false);
                }
                rv.push_str("{/if}");
                rv
            }
        };
        Some((pos, converted))
    }

    /// Converts a quoted branch, recursing into nested constructs.
    fn branch(&mut self, start: usize, depth: usize) -> Option<(String, usize)> {
        let quote = some!(self
            .rest(start)
            .chars()
            .next()
            .filter(|&c| matches!(c, '"' | '\'')));
        let mut pos = start + 1;
        let mut out = String::new();
        loop {
            let c = some!(self.rest(pos).chars().next());
            match c {
                '\\' => match self.rest(pos + 1).chars().next() {
                    Some(next) if next == quote || next == '\\' => {
                        out.push(next);
                        pos += 1 + next.len_utf8();
                    }
                    _ => {
                        out.push('\\');
                        pos += 1;
                    }
                },
                '{' => match self.construct(pos, depth + 1) {
                    Some((end, converted)) => {
                        out.push_str(&converted);
                        pos = end;
                    }
                    None => {
                        out.push_str("{{");
                        pos += 1;
                    }
                },
                c if c == quote => return Some((out, pos + 1)),
                c => {
                    out.push(c);
                    pos += c.len_utf8();
                }
            }
        }
    }

    /// Reads the value a check compares against.
    fn check_operand(&self, start: usize) -> Option<(String, usize)> {
        let rest = self.rest(start);
        if rest.starts_with(['"', '\'']) {
            return self.quoted(start);
        }
        let len = rest.find(['[', '}', '{']).unwrap_or(rest.len());
        if rest[len..].starts_with('{') {
            return None;
        }
        let value = rest[..len].trim();
        if value.is_empty() {
            return None;
        }
        Some((value.to_string(), start + len))
    }

    /// Reads a comma separated argument list up to the closing paren.
    ///
    /// Arguments come back already written in template syntax.
    fn modifier_args(&self, start: usize) -> Option<(Vec<String>, usize)> {
        let mut args = Vec::new();
        let mut pos = start;
        loop {
            pos += whitespace_len(self.rest(pos));
            if args.is_empty() && self.rest(pos).starts_with(')') {
                return Some((args, pos + 1));
            }
            let rest = self.rest(pos);
            if rest.starts_with(['"', '\'']) {
                let (value, end) = some!(self.quoted(pos));
                args.push(quote_str(&value));
                pos = end;
            } else {
                let len = some!(rest.find([',', ')', '{']));
                if rest[len..].starts_with('{') {
                    return None;
                }
                let value = rest[..len].trim();
                if value.is_empty() {
                    return None;
                }
                args.push(literal(value));
                pos += len;
            }
            pos += whitespace_len(self.rest(pos));
            match self.rest(pos).chars().next() {
                Some(',') => pos += 1,
                Some(')') => return Some((args, pos + 1)),
                _ => return None,
            }
        }
    }

    /// Reads a string in single or double quotes with backslash escapes.
    fn quoted(&self, start: usize) -> Option<(String, usize)> {
        let mut chars = self.rest(start).char_indices();
        let (_, quote) = some!(chars.next());
        let mut value = String::new();
        while let Some((idx, c)) = chars.next() {
            match c {
                '\\' => value.push(some!(chars.next()).1),
                c if c == quote => return Some((value, start + idx + 1)),
                c => value.push(c),
            }
        }
        None
    }
}

fn is_path_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '-' | '$' | '@')
}

fn whitespace_len(s: &str) -> usize {
    s.len() - s.trim_start().len()
}

fn match_op(s: &str) -> Option<(CompareOp, usize)> {
    const OPS: [(&str, CompareOp); 8] = [
        ("!=", CompareOp::Ne),
        (">=", CompareOp::Gte),
        ("<=", CompareOp::Lte),
        ("==", CompareOp::Eq),
        ("=", CompareOp::Eq),
        (">", CompareOp::Gt),
        ("<", CompareOp::Lt),
        ("~", CompareOp::Contains),
    ];
    OPS.iter()
        .find(|(token, _)| s.starts_with(token))
        .map(|(token, op)| (*op, token.len()))
}

/// Writes a value as template literal.  Words that read back as the same
/// number stay bare, everything else is quoted.
fn literal(value: &str) -> String {
    if literal_from_word(value).is_number() {
        value.to_string()
    } else {
        quote_str(value)
    }
}

/// Converts a template from the legacy ternary dialect.
///
/// ```
/// assert_eq!(
///     streamfmt::convert(r#"{stream.size::>1000["big"||"small"]}"#),
///     "{if stream.size > 1000}big{else}small{/if}"
/// );
/// ```
///
/// The result is always accepted by [`parse`](crate::parse).
pub fn convert(legacy: &str) -> String {
    Converter::new(legacy).run()
}
