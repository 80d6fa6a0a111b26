//! Word/punctuation tokenizer used for CoNLL output.

use std::sync::LazyLock;

use regex::Regex;

/// Runs of word characters, or single punctuation characters.
static TOKEN_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\w+|[^\w\s]").expect("token pattern should compile"));

/// A token with character offsets into the tokenized string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token<'a> {
    pub text: &'a str,
    pub start: usize,
    pub end: usize,
}

pub fn tokenize(text: &str) -> Vec<Token<'_>> {
    let mut tokens = Vec::new();
    let mut chars_seen = 0;
    let mut bytes_seen = 0;
    for m in TOKEN_PATTERN.find_iter(text) {
        chars_seen += text[bytes_seen..m.start()].chars().count();
        let len = m.as_str().chars().count();
        tokens.push(Token {
            text: m.as_str(),
            start: chars_seen,
            end: chars_seen + len,
        });
        chars_seen += len;
        bytes_seen = m.end();
    }
    tokens
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_words_and_punctuation() {
        let tokens = tokenize("Dr. Müller, CEO!");
        let texts: Vec<&str> = tokens.iter().map(|t| t.text).collect();
        assert_eq!(texts, vec!["Dr", ".", "Müller", ",", "CEO", "!"]);
        assert_eq!((tokens[2].start, tokens[2].end), (4, 10));
        assert_eq!((tokens[4].start, tokens[4].end), (12, 15));
    }
}
