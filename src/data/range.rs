//! Column ranges: `first-3,5,9-last`.
//!
//! The textual form is 1-based and inclusive. A range is parsed once, then
//! resolved against a concrete column count; indices past the end clamp to
//! the last column, and a span whose start exceeds its end selects nothing.

use crate::error::{Error, Result};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Bound {
    First,
    Last,
    /// 1-based.
    Index(usize),
}

impl Bound {
    fn parse(token: &str, range: &str) -> Result<Self> {
        match token.to_ascii_lowercase().as_str() {
            "first" => Ok(Bound::First),
            "last" => Ok(Bound::Last),
            t => match t.parse::<usize>() {
                Ok(0) => Err(invalid(range, "column indices start at 1")),
                Ok(i) => Ok(Bound::Index(i)),
                Err(_) => Err(invalid(range, format!("'{token}' is not a column index"))),
            },
        }
    }

    /// 0-based position among `width` columns (`width` > 0).
    fn resolve(self, width: usize) -> usize {
        let last = width - 1;
        match self {
            Bound::First => 0,
            Bound::Last => last,
            Bound::Index(i) => (i - 1).min(last),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Part {
    Single(Bound),
    Span(Bound, Bound),
}

fn invalid(range: &str, reason: impl Into<String>) -> Error {
    Error::InvalidRange {
        range: range.to_string(),
        reason: reason.into(),
    }
}

/// A set of columns named by a 1-based range string, optionally inverted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnRange {
    text: String,
    parts: Vec<Part>,
    invert: bool,
}

impl ColumnRange {
    /// Parse a comma-separated range list.
    pub fn parse(text: &str) -> Result<Self> {
        let mut parts = Vec::new();
        let mut tokens = Vec::new();
        for raw in text.split(',') {
            let token = raw.trim();
            if token.is_empty() {
                return Err(invalid(text, "empty range element"));
            }
            let part = match token.split_once('-') {
                Some((a, b)) => Part::Span(Bound::parse(a.trim(), text)?, Bound::parse(b.trim(), text)?),
                None => Part::Single(Bound::parse(token, text)?),
            };
            parts.push(part);
            tokens.push(token.replace(' ', ""));
        }
        Ok(Self {
            text: tokens.join(","),
            parts,
            invert: false,
        })
    }

    /// Build a range naming 0-based `indices`.
    pub fn from_indices(indices: &[usize]) -> Self {
        let text = indices
            .iter()
            .map(|i| (i + 1).to_string())
            .collect::<Vec<_>>()
            .join(",");
        Self {
            text,
            parts: indices.iter().map(|&i| Part::Single(Bound::Index(i + 1))).collect(),
            invert: false,
        }
    }

    /// Select the complement instead.
    pub fn inverted(mut self, invert: bool) -> Self {
        self.invert = invert;
        self
    }

    /// Whether the selection is inverted.
    pub fn is_inverted(&self) -> bool {
        self.invert
    }

    /// The normalised range text (without the invert flag).
    pub fn ranges(&self) -> &str {
        &self.text
    }

    /// Per-column membership for `width` columns.
    pub fn selection(&self, width: usize) -> Vec<bool> {
        let mut selected = vec![false; width];
        if width > 0 {
            for part in &self.parts {
                let (lo, hi) = match *part {
                    Part::Single(b) => (b.resolve(width), b.resolve(width)),
                    Part::Span(a, b) => (a.resolve(width), b.resolve(width)),
                };
                for s in selected.iter_mut().take(hi + 1).skip(lo) {
                    *s = true;
                }
            }
        }
        if self.invert {
            for s in &mut selected {
                *s = !*s;
            }
        }
        selected
    }

    /// Selected 0-based column indices, ascending.
    pub fn indices(&self, width: usize) -> Vec<usize> {
        self.selection(width)
            .into_iter()
            .enumerate()
            .filter_map(|(i, s)| s.then_some(i))
            .collect()
    }

    /// Whether 0-based column `index` is selected among `width` columns.
    pub fn contains(&self, index: usize, width: usize) -> bool {
        index < width && self.selection(width)[index]
    }
}

impl fmt::Display for ColumnRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.invert {
            write!(f, "!")?;
        }
        write!(f, "{}", self.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_parse_mixed() {
        let r = ColumnRange::parse("first-3,5,9-last").unwrap();
        assert_eq!(r.indices(10), vec![0, 1, 2, 4, 8, 9]);
        assert_eq!(r.ranges(), "first-3,5,9-last");
    }

    #[test]
    fn test_whitespace_normalised() {
        let r = ColumnRange::parse(" 1 , 3 - 4 ").unwrap();
        assert_eq!(r.ranges(), "1,3-4");
        assert_eq!(r.indices(5), vec![0, 2, 3]);
    }

    #[test]
    fn test_clamps_past_end() {
        let r = ColumnRange::parse("7").unwrap();
        assert_eq!(r.indices(3), vec![2]);
    }

    #[test]
    fn test_reversed_span_selects_nothing() {
        let r = ColumnRange::parse("4-2").unwrap();
        assert!(r.indices(5).is_empty());
    }

    #[test]
    fn test_invert() {
        let r = ColumnRange::parse("2").unwrap().inverted(true);
        assert_eq!(r.indices(3), vec![0, 2]);
        assert_eq!(r.to_string(), "!2");
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(ColumnRange::parse("").is_err());
        assert!(ColumnRange::parse("0").is_err());
        assert!(ColumnRange::parse("1,,2").is_err());
        assert!(ColumnRange::parse("a-3").is_err());
    }

    #[test]
    fn test_from_indices_is_one_based() {
        let r = ColumnRange::from_indices(&[0, 3]);
        assert_eq!(r.ranges(), "1,4");
        assert_eq!(ColumnRange::parse(r.ranges()).unwrap().indices(5), vec![0, 3]);
    }

    #[test]
    fn test_zero_width() {
        let r = ColumnRange::parse("first-last").unwrap();
        assert!(r.indices(0).is_empty());
        assert!(!r.contains(0, 0));
    }

    proptest! {
        #[test]
        fn prop_invert_is_complement(
            idx in proptest::collection::vec(0usize..20, 1..6),
            width in 1usize..25,
        ) {
            let r = ColumnRange::from_indices(&idx);
            let plain = r.selection(width);
            let inv = r.clone().inverted(true).selection(width);
            prop_assert_eq!(plain.len(), width);
            for (a, b) in plain.iter().zip(inv.iter()) {
                prop_assert_ne!(a, b);
            }
        }

        #[test]
        fn prop_indices_in_bounds(a in 1usize..30, b in 1usize..30, width in 1usize..20) {
            let r = ColumnRange::parse(&format!("{a}-{b},last")).unwrap();
            let idx = r.indices(width);
            prop_assert!(idx.iter().all(|&i| i < width));
            prop_assert!(idx.contains(&(width - 1)));
        }
    }
}
