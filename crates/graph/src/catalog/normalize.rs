//! Text folding shared by alias keys and question matching

use std::ops::Range;
use unicode_normalization::{char::is_combining_mark, UnicodeNormalization};

/// Fold text into a lookup key.
///
/// Decomposes (NFKD), lowercases each decomposed character, drops
/// combining marks, maps `đ` to `d` and turns every run of non-alphanumeric
/// characters into one space. Lowercasing after decomposition also catches
/// compatibility characters that decompose to capitals (`ℌ` to `H`).
/// `fold_key(fold_key(x)) == fold_key(x)`.
pub fn fold_key(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut pending_space = false;

    for c in text.nfkd().flat_map(char::to_lowercase) {
        if is_combining_mark(c) {
            continue;
        }
        let c = match c {
            'đ' | 'Đ' => 'd',
            _ => c,
        };
        if c.is_alphanumeric() {
            if pending_space && !out.is_empty() {
                out.push(' ');
            }
            pending_space = false;
            out.push(c);
        } else {
            pending_space = true;
        }
    }

    out
}

/// Byte ranges of the space-separated tokens of a folded string
pub fn token_spans(folded: &str) -> Vec<Range<usize>> {
    let mut spans = Vec::new();
    let mut start = None;

    for (i, c) in folded.char_indices() {
        match (c == ' ', start) {
            (true, Some(s)) => {
                spans.push(s..i);
                start = None;
            }
            (false, None) => start = Some(i),
            _ => {}
        }
    }
    if let Some(s) = start {
        spans.push(s..folded.len());
    }

    spans
}

/// Number of tokens in a folded key
pub fn token_count(folded: &str) -> usize {
    if folded.is_empty() {
        0
    } else {
        folded.matches(' ').count() + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diacritics_and_case() {
        assert_eq!(fold_key("Nguyễn Quang Hải"), "nguyen quang hai");
        assert_eq!(fold_key("Đà Nẵng"), "da nang");
        assert_eq!(fold_key("HÀ NỘI"), "ha noi");
    }

    #[test]
    fn test_punctuation_and_whitespace_collapse() {
        assert_eq!(fold_key("  Park   Hang-seo!! "), "park hang seo");
        assert_eq!(fold_key("S.H.B. Đà Nẵng"), "s h b da nang");
        assert_eq!(fold_key("?!..."), "");
    }

    #[test]
    fn test_fold_is_idempotent() {
        for text in ["Sông Lam Nghệ An", "İstanbul", "ﬁnal round", "Hoàng Anh Gia Lai (HAGL)"] {
            let once = fold_key(text);
            assert_eq!(fold_key(&once), once, "not idempotent for {text}");
        }
    }

    #[test]
    fn test_compatibility_capitals_are_lowercased() {
        assert_eq!(fold_key("ℌà Nội"), "ha noi");
        assert_eq!(fold_key("ＨÀ ＮỘＩ"), "ha noi");
        assert_eq!(fold_key("Ⅻ"), "xii");
        for text in ["ℌà Nội", "ℭông ℙhượng", "ＦＣ"] {
            let once = fold_key(text);
            assert_eq!(fold_key(&once), once, "not idempotent for {text}");
        }
    }

    #[test]
    fn test_token_spans() {
        let folded = fold_key("Are P1 and P2 co-affiliated?");
        let spans = token_spans(&folded);
        let tokens: Vec<&str> = spans.iter().map(|r| &folded[r.clone()]).collect();
        assert_eq!(tokens, vec!["are", "p1", "and", "p2", "co", "affiliated"]);
        assert_eq!(token_count(&folded), 6);
        assert_eq!(token_count(""), 0);
    }
}
