//! Ordering of shard sequence numbers.
//!
//! Sequence numbers are opaque strings. In practice they are decimal digits
//! of varying width, so two all-digit tokens compare by numeric value; any
//! other pair falls back to plain string order.

use std::cmp::Ordering;

/// Compare two sequence numbers.
pub fn compare(a: &str, b: &str) -> Ordering {
    if is_numeric(a) && is_numeric(b) {
        let a = a.trim_start_matches('0');
        let b = b.trim_start_matches('0');
        a.len().cmp(&b.len()).then_with(|| a.cmp(b))
    } else {
        a.cmp(b)
    }
}

fn is_numeric(token: &str) -> bool {
    !token.is_empty() && token.bytes().all(|b| b.is_ascii_digit())
}

/// Where a sequence number lies relative to a range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Position {
    Before,
    Within,
    After,
}

/// Inclusive range of sequence numbers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequenceRange {
    start: String,
    end: String,
}

impl SequenceRange {
    pub fn new(start: impl Into<String>, end: impl Into<String>) -> Self {
        Self {
            start: start.into(),
            end: end.into(),
        }
    }

    pub fn start(&self) -> &str {
        &self.start
    }

    pub fn end(&self) -> &str {
        &self.end
    }

    pub fn position(&self, sequence_number: &str) -> Position {
        if compare(sequence_number, &self.start) == Ordering::Less {
            Position::Before
        } else if compare(sequence_number, &self.end) == Ordering::Greater {
            Position::After
        } else {
            Position::Within
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_tokens_compare_by_value() {
        assert_eq!(compare("99", "100"), Ordering::Less);
        assert_eq!(compare("100", "99"), Ordering::Greater);
        assert_eq!(compare("000100", "100"), Ordering::Equal);
        assert_eq!(
            compare("800000000003126276362", "800000000003126276363"),
            Ordering::Less
        );
    }

    #[test]
    fn test_non_numeric_tokens_compare_as_strings() {
        assert_eq!(compare("abc", "abd"), Ordering::Less);
        assert_eq!(compare("9a", "10a"), Ordering::Greater);
        assert_eq!(compare("", "1"), Ordering::Less);
    }

    #[test]
    fn test_range_position() {
        let range = SequenceRange::new("100", "200");

        assert_eq!(range.position("99"), Position::Before);
        assert_eq!(range.position("100"), Position::Within);
        assert_eq!(range.position("150"), Position::Within);
        assert_eq!(range.position("200"), Position::Within);
        assert_eq!(range.position("201"), Position::After);
        assert_eq!(range.position("1000"), Position::After);
    }

    #[test]
    fn test_single_point_range() {
        let range = SequenceRange::new("42", "42");
        assert_eq!(range.position("42"), Position::Within);
        assert_eq!(range.position("43"), Position::After);
    }
}
