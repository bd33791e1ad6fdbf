//! Line tokenizer
//!
//! Splits the part of a protocol line after its keyword into space separated
//! tokens. Double quoted text is one token with the quotes removed:
//! ```text
//! 1 PSNM:"Studio A Mic" RTPE:1   ->   ["1", "PSNM:Studio A Mic", "RTPE:1"]
//! ```

/// Split a line remainder into tokens
///
/// Consecutive spaces produce empty tokens and a trailing space produces a
/// final empty token. An unterminated quote swallows the rest of the line
/// into the last token.
pub fn split_segments(text: &str) -> Vec<String> {
    let mut segments = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;

    // The trailing space flushes the last token
    for c in text.chars().chain(std::iter::once(' ')) {
        match c {
            ' ' if !in_quotes => segments.push(std::mem::take(&mut current)),
            '"' => in_quotes = !in_quotes,
            _ => current.push(c),
        }
    }

    if in_quotes {
        current.pop();
        segments.push(current);
    }

    segments
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_tokens() {
        assert_eq!(split_segments("1 ADDR:239.192.0.1"), vec!["1", "ADDR:239.192.0.1"]);
    }

    #[test]
    fn test_quoted_token() {
        assert_eq!(
            split_segments(r#"3 PSNM:"Studio A Mic" RTPE:1"#),
            vec!["3", "PSNM:Studio A Mic", "RTPE:1"]
        );
    }

    #[test]
    fn test_quoted_empty_value() {
        assert_eq!(split_segments(r#"NAME:"""#), vec!["NAME:"]);
    }

    #[test]
    fn test_empty_and_repeated_spaces() {
        assert_eq!(split_segments(""), vec![""]);
        assert_eq!(split_segments("a  b"), vec!["a", "", "b"]);
        assert_eq!(split_segments("a "), vec!["a", ""]);
    }

    #[test]
    fn test_unbalanced_quote_takes_rest_of_line() {
        assert_eq!(
            split_segments(r#"1 NAME:"Open ended ADDR:1"#),
            vec!["1", "NAME:Open ended ADDR:1"]
        );
    }
}
