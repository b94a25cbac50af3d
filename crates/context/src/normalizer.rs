//! Question normalization
//!
//! Keeps the original text for display and produces the folded,
//! diacritic-insensitive copy that every later stage matches against.

use hopgraph_graph::catalog::{fold_key, token_spans};
use std::ops::Range;
use unicode_normalization::UnicodeNormalization;

/// Characters stripped from the end of a question
const TRAILING_PUNCTUATION: &[char] = &['?', '!', '.', ',', ';', ':', '…', '？', '！', '。'];

/// A question prepared for extraction and classification
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedQuestion {
    /// Untouched input
    pub original: String,
    /// NFC, single-spaced, trailing punctuation removed
    pub display: String,
    /// `fold_key(display)`
    pub folded: String,
    /// Byte ranges of the tokens of `folded`
    pub tokens: Vec<Range<usize>>,
}

impl NormalizedQuestion {
    /// Text of token `index`
    pub fn token(&self, index: usize) -> &str {
        &self.folded[self.tokens[index].clone()]
    }

    /// Folded text covering tokens `range`
    pub fn token_text(&self, range: Range<usize>) -> &str {
        if range.is_empty() {
            return "";
        }
        let start = self.tokens[range.start].start;
        let end = self.tokens[range.end - 1].end;
        &self.folded[start..end]
    }

    pub fn token_count(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

/// Normalize a raw question
pub fn normalize(text: &str) -> NormalizedQuestion {
    let composed: String = text.nfc().collect();
    let collapsed = composed.split_whitespace().collect::<Vec<_>>().join(" ");
    let display = collapsed
        .trim_end_matches(|c: char| TRAILING_PUNCTUATION.contains(&c) || c.is_whitespace())
        .to_string();
    let folded = fold_key(&display);
    let tokens = token_spans(&folded);

    NormalizedQuestion {
        original: text.to_string(),
        display,
        folded,
        tokens,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_vietnamese_question() {
        let q = normalize("  Quang   Hải có   thi đấu cho Hà Nội FC không?? ");
        assert_eq!(q.original, "  Quang   Hải có   thi đấu cho Hà Nội FC không?? ");
        assert_eq!(q.display, "Quang Hải có thi đấu cho Hà Nội FC không");
        assert_eq!(q.folded, "quang hai co thi dau cho ha noi fc khong");
        assert_eq!(q.token_count(), 10);
        assert_eq!(q.token(4), "dau");
        assert_eq!(q.token_text(6..9), "ha noi fc");
    }

    #[test]
    fn test_decomposed_input_is_composed() {
        // "Hải" with a combining hook above
        let decomposed = "Ha\u{0309}i";
        let q = normalize(decomposed);
        assert_eq!(q.display, "Hải");
        assert_eq!(q.folded, "hai");
    }

    #[test]
    fn test_inner_punctuation_becomes_separator() {
        let q = normalize("Are P1 and P2 co-affiliated?");
        assert_eq!(q.display, "Are P1 and P2 co-affiliated");
        assert_eq!(q.folded, "are p1 and p2 co affiliated");
    }

    #[test]
    fn test_empty_question() {
        let q = normalize(" ?! ");
        assert!(q.display.is_empty());
        assert!(q.is_empty());
        assert_eq!(q.token_text(0..0), "");
    }
}
