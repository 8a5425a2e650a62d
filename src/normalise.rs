//! Character-level word normalisation stages.
//!
//! Each stage maps a fragment's words to a new word list and is applied
//! with [`process_fragments`](transcript_relations_core::models::process_fragments).

use transcript_relations_core::models::{Term, Word};
use transcript_relations_core::text::PUNCTUATION;

/// Grave-accented letters and their acute counterparts.
const GRAVE_TO_ACUTE: [(char, char); 10] = [
    ('à', 'á'),
    ('è', 'é'),
    ('ì', 'í'),
    ('ò', 'ó'),
    ('ù', 'ú'),
    ('À', 'Á'),
    ('È', 'É'),
    ('Ì', 'Í'),
    ('Ò', 'Ó'),
    ('Ù', 'Ú'),
];

/// Combining grave and acute accents, for decomposed input.
const COMBINING_GRAVE: char = '\u{0300}';
const COMBINING_ACUTE: char = '\u{0301}';

fn acute(c: char) -> char {
    if c == COMBINING_GRAVE {
        return COMBINING_ACUTE;
    }
    GRAVE_TO_ACUTE
        .iter()
        .find(|(grave, _)| *grave == c)
        .map_or(c, |(_, acute)| *acute)
}

pub fn normalise_accents_in(s: &str) -> String {
    s.chars().map(acute).collect()
}

pub fn remove_punctuation(s: &str) -> String {
    s.chars().filter(|c| !PUNCTUATION.contains(*c)).collect()
}

/// Strip punctuation, keeping a word made only of punctuation as it is.
pub fn remove_punctuation_from_word(s: &str) -> String {
    let stripped = remove_punctuation(s);
    if stripped.is_empty() {
        s.to_string()
    } else {
        stripped
    }
}

/// Apply `f` to the surface form of `word`, keeping its annotations.
fn map_surface(word: Word, f: impl Fn(&str) -> String) -> Word {
    match word {
        Word::Plain(s) => Word::Plain(f(&s)),
        Word::Tagged(term) => Word::Tagged(Term {
            word: f(&term.word),
            ..term
        }),
    }
}

/// Replace grave accents with acute ones.
pub fn normalise_accents(words: Vec<Word>) -> Vec<Word> {
    words
        .into_iter()
        .map(|w| map_surface(w, normalise_accents_in))
        .collect()
}

/// Remove punctuation from within words.
pub fn remove_punctuation_from_words(words: Vec<Word>) -> Vec<Word> {
    words
        .into_iter()
        .map(|w| map_surface(w, remove_punctuation_from_word))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(items: &[&str]) -> Vec<Word> {
        items.iter().map(|s| Word::from(*s)).collect()
    }

    fn texts(words: &[Word]) -> Vec<&str> {
        words.iter().map(Word::text).collect()
    }

    #[test]
    fn grave_accents_become_acute() {
        assert_eq!(normalise_accents_in("està"), "está");
        assert_eq!(normalise_accents_in("PERÒ"), "PERÓ");
        assert_eq!(normalise_accents_in("e\u{0300}"), "e\u{0301}");
        assert_eq!(normalise_accents_in("niño"), "niño");

        let out = normalise_accents(words(&["aquì", "casa"]));
        assert_eq!(texts(&out), ["aquí", "casa"]);
    }

    #[test]
    fn punctuation_is_removed_from_words() {
        let out = remove_punctuation_from_words(words(&["pollo,", "¿qué?", "...", "arco-iris;"]));
        assert_eq!(texts(&out), ["pollo", "¿qué", "...", "arco-iris"]);
    }

    #[test]
    fn annotations_survive_surface_changes() {
        let term = Word::from(Term::tagged("està", "VERB").with_normalised("estar"));
        let out = normalise_accents(vec![term]);
        assert_eq!(out[0].text(), "está");
        assert_eq!(out[0].tag(), Some("VERB"));
        assert_eq!(out[0].normalised(), Some("estar"));
    }
}
