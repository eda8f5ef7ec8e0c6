use std::fmt;

use crate::utils::truncate_at_char_boundary;

/// A [`fmt::Write`] target for rendering with a byte budget.
///
/// Once the budget is used up further writes are dropped.  The final write
/// that crosses the budget is cut at a character boundary.
pub(crate) struct Output<'a> {
    w: &'a mut String,
    max_len: usize,
    truncated: bool,
}

impl<'a> Output<'a> {
    /// Creates a new output appending into a string.
    pub fn new(w: &'a mut String, max_len: usize) -> Self {
        Self {
            w,
            max_len,
            truncated: false,
        }
    }

    /// Returns `true` once writes are being dropped.
    pub fn is_full(&self) -> bool {
        self.truncated
    }
}

impl fmt::Write for Output<'_> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        if self.truncated {
            return Ok(());
        }
        let remaining = self.max_len.saturating_sub(self.w.len());
        if s.len() <= remaining {
            self.w.push_str(s);
        } else {
            self.w.push_str(truncate_at_char_boundary(s, remaining));
            self.truncated = true;
            debug!(max_len = self.max_len, "output limit reached, truncating");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::fmt::Write;

    use super::*;

    use similar_asserts::assert_eq;

    #[test]
    fn test_budget() {
        let mut buf = String::new();
        let mut out = Output::new(&mut buf, 5);
        write!(out, "abc").unwrap();
        assert!(!out.is_full());
        write!(out, "déf").unwrap();
        assert!(out.is_full());
        write!(out, "ghi").unwrap();
        assert_eq!(buf, "abcd");
    }
}
