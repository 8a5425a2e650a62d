//! Punctuation-aware joining of words into fragment text.

/// Characters treated as punctuation when joining and cleaning words.
pub const PUNCTUATION: &str = ",;.:?!";

/// Whether every character of `s` is punctuation.
///
/// The empty string counts as punctuation.
pub fn is_punctuation(s: &str) -> bool {
    s.chars().all(|c| PUNCTUATION.contains(c))
}

/// Join `words` into a readable string.
///
/// Words are separated by single spaces, except that punctuation tokens
/// attach to the preceding word.
pub fn text_from_words<S: AsRef<str>>(words: &[S]) -> String {
    let mut out = String::new();

    for (i, word) in words.iter().enumerate() {
        let word = word.as_ref();
        if i > 0 && !is_punctuation(word) {
            out.push(' ');
        }
        out.push_str(word);
    }

    out
}
