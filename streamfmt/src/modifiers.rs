//! The built-in modifiers.
//!
//! Modifiers transform a value inside an output span or a condition
//! operand.  They are chained with the pipe symbol and applied left to
//! right:
//!
//! ```text
//! {stream.languages|join(' / ')|upper}
//! ```
//!
//! The set of modifiers is fixed.  Names are resolved when a template is
//! parsed, so dispatch during rendering is a plain `match`.
//!
//! # Fail-soft behavior
//!
//! Modifiers never fail:
//!
//! * An unknown modifier name passes its input through unchanged.
//! * An input of the wrong type (for instance `bytes` on a non-numeric
//!   string, or `join` on a string) produces an undefined value which
//!   renders as empty string.
//! * Undefined input stays undefined.
//!
//! String modifiers accept any scalar through its string form, numeric
//! modifiers accept strings that parse as numbers.  Results that grow their
//! input (`replace`, `join`, `escape` and the case conversions) stop at the
//! byte budget passed to [`Modifier::apply`].
//!
//! # Reference
//!
//! | name | input | result |
//! |---|---|---|
//! | `bytes` | number | binary size, `1610612736` → `1.5 GB` |
//! | `bytes10` | number | decimal size, `1500000000` → `1.5 GB` |
//! | `time` | seconds | `HH:MM:SS` |
//! | `comma` | number | `1234567` → `1,234,567` |
//! | `join(sep)` | sequence | elements joined by `sep` (default `, `) |
//! | `first` / `last` | sequence | first or last element |
//! | `sort` | sequence | sorted ascending |
//! | `length` | string or sequence | number of characters or elements |
//! | `reverse` | string or sequence | reversed |
//! | `upper` / `lower` / `title` | string | case conversion |
//! | `truncate(n)` | string | first `n` characters |
//! | `trim` | string | surrounding whitespace removed |
//! | `replace(from, to)` | string | all occurrences replaced |
//! | `escape` | string | HTML escaped |
//! | `string` | scalar | the string form |
use std::borrow::Cow;
use std::fmt;
use std::fmt::Write;

use crate::output::Output;
use crate::utils::{truncate_at_char_boundary, HtmlEscape};
use crate::value::Value;

const SIZE_UNITS: [&str; 6] = ["B", "KB", "MB", "GB", "TB", "PB"];

/// A resolved modifier.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum Modifier {
    Bytes,
    Bytes10,
    Time,
    Comma,
    Join,
    First,
    Last,
    Sort,
    Length,
    Reverse,
    Upper,
    Lower,
    Title,
    Truncate,
    Trim,
    Replace,
    Escape,
    String,
    /// A name that is not a known modifier.
    Unknown(String),
}

impl Modifier {
    /// Looks up a modifier by name.
    pub fn from_name(name: &str) -> Modifier {
        match name {
            "bytes" => Modifier::Bytes,
            "bytes10" => Modifier::Bytes10,
            "time" => Modifier::Time,
            "comma" => Modifier::Comma,
            "join" => Modifier::Join,
            "first" => Modifier::First,
            "last" => Modifier::Last,
            "sort" => Modifier::Sort,
            "length" => Modifier::Length,
            "reverse" => Modifier::Reverse,
            "upper" => Modifier::Upper,
            "lower" => Modifier::Lower,
            "title" => Modifier::Title,
            "truncate" => Modifier::Truncate,
            "trim" => Modifier::Trim,
            "replace" => Modifier::Replace,
            "escape" => Modifier::Escape,
            "string" => Modifier::String,
            other => Modifier::Unknown(other.to_string()),
        }
    }

    /// Returns the name the modifier is spelled with in templates.
    pub fn name(&self) -> &str {
        match self {
            Modifier::Bytes => "bytes",
            Modifier::Bytes10 => "bytes10",
            Modifier::Time => "time",
            Modifier::Comma => "comma",
            Modifier::Join => "join",
            Modifier::First => "first",
            Modifier::Last => "last",
            Modifier::Sort => "sort",
            Modifier::Length => "length",
            Modifier::Reverse => "reverse",
            Modifier::Upper => "upper",
            Modifier::Lower => "lower",
            Modifier::Title => "title",
            Modifier::Truncate => "truncate",
            Modifier::Trim => "trim",
            Modifier::Replace => "replace",
            Modifier::Escape => "escape",
            Modifier::String => "string",
            Modifier::Unknown(name) => name,
        }
    }

    /// Applies the modifier to a value.
    ///
    /// String results are cut to at most `max_len` bytes at a character
    /// boundary.
    ///
    /// ```
    /// # use streamfmt::modifiers::Modifier;
    /// # use streamfmt::value::Value;
    /// let rv = Modifier::Bytes.apply(Value::from(1610612736u64), &[], usize::MAX);
    /// assert_eq!(rv.to_string(), "1.5 GB");
    /// let rv = Modifier::Upper.apply(Value::from("stream"), &[], 3);
    /// assert_eq!(rv.to_string(), "STR");
    /// ```
    pub fn apply(&self, value: Value, args: &[Value], max_len: usize) -> Value {
        if let Modifier::Unknown(ref _name) = *self {
            debug!(modifier = %_name, "unknown modifier, passing value through");
            return value;
        }
        if value.is_undefined() {
            return value;
        }
        match self.apply_known(&value, args, max_len) {
            Some(rv) => rv,
            None => {
                debug!(
                    modifier = self.name(),
                    kind = %value.kind(),
                    "modifier does not accept value, rendering empty"
                );
                Value::UNDEFINED
            }
        }
    }

    fn apply_known(&self, value: &Value, args: &[Value], max_len: usize) -> Option<Value> {
        let rv = match self {
            Modifier::Bytes => Value::from(some!(format_size(some!(value.as_number()), 1024.0))),
            Modifier::Bytes10 => Value::from(some!(format_size(some!(value.as_number()), 1000.0))),
            Modifier::Time => Value::from(some!(format_duration(some!(value.as_number())))),
            Modifier::Comma => Value::from(some!(format_thousands(value))),
            Modifier::Join => {
                let sep = args.first().map_or(Cow::Borrowed(", "), |x| Cow::Owned(x.to_string()));
                let mut rv = String::new();
                let mut out = Output::new(&mut rv, max_len);
                for (idx, item) in some!(value.as_slice()).iter().enumerate() {
                    if out.is_full() {
                        break;
                    }
                    if idx > 0 {
                        out.write_str(&sep).ok();
                    }
                    write!(out, "{item}").ok();
                }
                Value::from(rv)
            }
            Modifier::First => some!(value.as_slice()).first().cloned().unwrap_or_default(),
            Modifier::Last => some!(value.as_slice()).last().cloned().unwrap_or_default(),
            Modifier::Sort => {
                let mut items = some!(value.as_slice()).to_vec();
                items.sort_by(|a, b| a.sort_cmp(b));
                Value::from(items)
            }
            Modifier::Length => match value.len() {
                Some(len) => Value::from(len),
                None => Value::from(some!(value.to_scalar_str()).chars().count()),
            },
            Modifier::Reverse => match value.as_slice() {
                Some(items) => items.iter().rev().cloned().collect(),
                None => Value::from(some!(value.to_scalar_str()).chars().rev().collect::<String>()),
            },
            Modifier::Upper => bounded(some!(value.to_scalar_str()).to_uppercase(), max_len),
            Modifier::Lower => bounded(some!(value.to_scalar_str()).to_lowercase(), max_len),
            Modifier::Title => bounded(title(&some!(value.to_scalar_str())), max_len),
            Modifier::Truncate => {
                let s = some!(value.to_scalar_str());
                match args.first().and_then(Value::as_number) {
                    Some(n) if n >= 0.0 => Value::from(s.chars().take(n as usize).collect::<String>()),
                    _ => {
                        debug!("truncate without a valid length, passing value through");
                        Value::from(s)
                    }
                }
            }
            Modifier::Trim => Value::from(some!(value.to_scalar_str()).trim()),
            Modifier::Replace => {
                let s = some!(value.to_scalar_str());
                match args.first().map(|x| x.to_string()) {
                    Some(from) if !from.is_empty() => {
                        let to = args.get(1).map(|x| x.to_string()).unwrap_or_default();
                        let mut rv = String::new();
                        let mut out = Output::new(&mut rv, max_len);
                        for (idx, piece) in s.split(from.as_str()).enumerate() {
                            if out.is_full() {
                                break;
                            }
                            if idx > 0 {
                                out.write_str(&to).ok();
                            }
                            out.write_str(piece).ok();
                        }
                        Value::from(rv)
                    }
                    _ => Value::from(s),
                }
            }
            Modifier::Escape => {
                let mut rv = String::new();
                write!(
                    Output::new(&mut rv, max_len),
                    "{}",
                    HtmlEscape(&some!(value.to_scalar_str()))
                )
                .ok();
                Value::from(rv)
            }
            Modifier::String => Value::from(some!(value.to_scalar_str())),
            Modifier::Unknown(_) => value.clone(),
        };
        Some(rv)
    }
}

impl fmt::Display for Modifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

fn bounded(mut s: String, max_len: usize) -> Value {
    let end = truncate_at_char_boundary(&s, max_len).len();
    s.truncate(end);
    Value::from(s)
}

/// Formats a byte count with two decimals, dropping trailing zeros.
fn format_size(n: f64, base: f64) -> Option<String> {
    if !n.is_finite() {
        return None;
    }
    let mut size = n.abs();
    let mut unit = 0;
    while size >= base && unit < SIZE_UNITS.len() - 1 {
        size /= base;
        unit += 1;
    }
    let formatted = format!("{size:.2}");
    let digits = formatted.trim_end_matches('0').trim_end_matches('.');
    let sign = if n < 0.0 && digits != "0" { "-" } else { "" };
    Some(format!("{sign}{digits} {}", SIZE_UNITS[unit]))
}

fn format_duration(seconds: f64) -> Option<String> {
    if !seconds.is_finite() || seconds < 0.0 {
        return None;
    }
    let total = seconds.floor() as u64;
    Some(format!(
        "{:02}:{:02}:{:02}",
        total / 3600,
        (total % 3600) / 60,
        total % 60
    ))
}

fn format_thousands(value: &Value) -> Option<String> {
    let n = some!(value.as_number());
    if !n.is_finite() {
        return None;
    }
    let formatted = match value.as_i64() {
        Some(i) => i.to_string(),
        None => Value::from(n).to_string(),
    };
    let (sign, unsigned) = match formatted.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", formatted.as_str()),
    };
    let (int_part, frac_part) = match unsigned.find('.') {
        Some(idx) => unsigned.split_at(idx),
        None => (unsigned, ""),
    };
    let mut rv = String::from(sign);
    for (idx, c) in int_part.chars().enumerate() {
        if idx > 0 && (int_part.len() - idx) % 3 == 0 {
            rv.push(',');
        }
        rv.push(c);
    }
    rv.push_str(frac_part);
    Some(rv)
}

fn title(s: &str) -> String {
    let mut rv = String::new();
    let mut capitalize = true;
    for c in s.chars() {
        if c.is_whitespace() || (c.is_ascii_punctuation() && c != '\'') {
            rv.push(c);
            capitalize = true;
        } else if capitalize {
            rv.extend(c.to_uppercase());
            capitalize = false;
        } else {
            rv.extend(c.to_lowercase());
        }
    }
    rv
}

#[cfg(test)]
mod tests {
    use super::*;

    use similar_asserts::assert_eq;

    fn apply(modifier: &str, value: Value, args: &[Value]) -> String {
        Modifier::from_name(modifier).apply(value, args, usize::MAX).to_string()
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(0.0, 1024.0).as_deref(), Some("0 B"));
        assert_eq!(format_size(1023.0, 1024.0).as_deref(), Some("1023 B"));
        assert_eq!(format_size(1536.0, 1024.0).as_deref(), Some("1.5 KB"));
        assert_eq!(format_size(1610612736.0, 1024.0).as_deref(), Some("1.5 GB"));
        assert_eq!(format_size(5_000_000.0, 1000.0).as_deref(), Some("5 MB"));
        assert_eq!(format_size(1234.0, 1024.0).as_deref(), Some("1.21 KB"));
        assert_eq!(format_size(1e20, 1024.0).as_deref(), Some("88817.84 PB"));
        assert_eq!(format_size(f64::INFINITY, 1024.0), None);
        assert_eq!(format_size(f64::NAN, 1000.0), None);
    }

    #[test]
    fn test_time() {
        assert_eq!(apply("time", Value::from(3725), &[]), "01:02:05");
        assert_eq!(apply("time", Value::from(59.9), &[]), "00:00:59");
        assert_eq!(apply("time", Value::from(-1), &[]), "");
    }

    #[test]
    fn test_comma() {
        assert_eq!(apply("comma", Value::from(1234567), &[]), "1,234,567");
        assert_eq!(apply("comma", Value::from(-1000), &[]), "-1,000");
        assert_eq!(apply("comma", Value::from(999), &[]), "999");
        assert_eq!(apply("comma", Value::from(12345.5), &[]), "12,345.5");
    }

    #[test]
    fn test_join() {
        let langs = Value::from(vec!["English", "Hindi"]);
        assert_eq!(apply("join", langs.clone(), &[]), "English, Hindi");
        assert_eq!(apply("join", langs, &[Value::from(" | ")]), "English | Hindi");
        assert_eq!(apply("join", Value::from("English"), &[]), "");
    }

    #[test]
    fn test_first_last() {
        let seq = Value::from(vec![1, 2, 3]);
        assert_eq!(apply("first", seq.clone(), &[]), "1");
        assert_eq!(apply("last", seq, &[]), "3");
        assert_eq!(apply("first", Value::from(Vec::<i32>::new()), &[]), "");
    }

    #[test]
    fn test_string_modifiers() {
        assert_eq!(apply("upper", Value::from("hello"), &[]), "HELLO");
        assert_eq!(apply("lower", Value::from("HeLLo"), &[]), "hello");
        assert_eq!(apply("title", Value::from("the dark-knight's"), &[]), "The Dark-Knight's");
        assert_eq!(apply("upper", Value::from(true), &[]), "TRUE");
        assert_eq!(apply("upper", Value::from(vec!["a"]), &[]), "");
        assert_eq!(apply("trim", Value::from("  x "), &[]), "x");
        assert_eq!(apply("reverse", Value::from("abc"), &[]), "cba");
        assert_eq!(apply("string", Value::from(1.5), &[]), "1.5");
    }

    #[test]
    fn test_truncate() {
        assert_eq!(apply("truncate", Value::from("héllo world"), &[Value::from(4)]), "héll");
        assert_eq!(apply("truncate", Value::from("abc"), &[Value::from(10)]), "abc");
        assert_eq!(apply("truncate", Value::from("abc"), &[]), "abc");
    }

    #[test]
    fn test_replace_and_escape() {
        assert_eq!(
            apply("replace", Value::from("a.b.c"), &[Value::from("."), Value::from(" ")]),
            "a b c"
        );
        assert_eq!(apply("replace", Value::from("a.b"), &[Value::from(".")]), "ab");
        assert_eq!(apply("escape", Value::from("<a href='x'>&"), &[]), "&lt;a href=&#x27;x&#x27;&gt;&amp;");
    }

    #[test]
    fn test_length_and_sort() {
        assert_eq!(apply("length", Value::from("héllo"), &[]), "5");
        assert_eq!(apply("length", Value::from(vec![1, 2]), &[]), "2");
        let sorted = Modifier::Sort.apply(Value::from(vec!["b", "c", "a"]), &[], usize::MAX);
        assert_eq!(apply("join", sorted, &[]), "a, b, c");
        let sorted = Modifier::Sort.apply(Value::from(vec![10, 9, 100]), &[], usize::MAX);
        assert_eq!(apply("join", sorted, &[Value::from("-")]), "9-10-100");
    }

    #[test]
    fn test_fail_soft() {
        assert_eq!(apply("notareal", Value::from("x"), &[]), "x");
        assert_eq!(apply("bytes", Value::from("2160p"), &[]), "");
        assert_eq!(apply("bytes", Value::from("2048"), &[]), "2 KB");
        assert!(Modifier::Upper.apply(Value::UNDEFINED, &[], usize::MAX).is_undefined());
        assert_eq!(apply("bytes", Value::from("inf"), &[]), "");
        assert_eq!(apply("bytes10", Value::from("1e400"), &[]), "");
    }

    #[test]
    fn test_growing_results_stop_at_budget() {
        let rv = Modifier::Replace.apply(
            Value::from("abc".repeat(100)),
            &[Value::from("b"), Value::from("x".repeat(1000))],
            50,
        );
        assert_eq!(rv.to_string(), format!("a{}", "x".repeat(49)));
        let rv = Modifier::Join.apply(Value::from(vec!["long"; 100]), &[Value::from("--")], 10);
        assert_eq!(rv.to_string(), "long--long");
        let rv = Modifier::Escape.apply(Value::from("<<<<"), &[], 8);
        assert_eq!(rv.to_string(), "&lt;&lt;");
        let rv = Modifier::Upper.apply(Value::from("straße"), &[], 6);
        assert_eq!(rv.to_string(), "STRASS");
        let rv = Modifier::Lower.apply(Value::from("ÄÖÜ"), &[], 3);
        assert_eq!(rv.to_string(), "ä");
    }
}
