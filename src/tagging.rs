//! Tokenisation and part-of-speech tagging.
//!
//! A [`Tagger`] turns fragment text into [`Token`]s. The tagger is built once
//! by the command and passed to the build pipeline; [`tag_words`] then
//! applies lemma substitution and lower-casing to produce the fragment's new
//! words.

use anyhow::{bail, Context, Result};
use std::collections::HashMap;
use std::path::Path;
use tracing::debug;

use transcript_relations_core::models::{Term, Word};
use transcript_relations_core::text::{is_punctuation, text_from_words, PUNCTUATION};

/// Tag given to punctuation tokens.
pub const PUNCT: &str = "PUNCT";

/// Tags whose tokens are replaced by their lemma.
const LEMMATISED: [&str; 3] = ["ADJ", "NOUN", "VERB"];

/// Tags whose tokens keep their capitalisation.
const CASE_PRESERVING: [&str; 2] = ["DET", "PROPN"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub text: String,
    pub pos: Option<String>,
    pub lemma: Option<String>,
}

impl Token {
    fn untagged(text: &str) -> Self {
        Self {
            text: text.to_string(),
            pos: None,
            lemma: None,
        }
    }
}

pub trait Tagger {
    fn tokens(&self, text: &str) -> Vec<Token>;
}

/// Whitespace tokeniser that splits leading and trailing punctuation into
/// separate `PUNCT` tokens and leaves words untagged.
#[derive(Debug, Default, Clone, Copy)]
pub struct SimpleTagger;

impl Tagger for SimpleTagger {
    fn tokens(&self, text: &str) -> Vec<Token> {
        let mut tokens = Vec::new();

        for chunk in text.split_whitespace() {
            if is_punctuation(chunk) {
                tokens.push(punctuation_token(chunk));
                continue;
            }

            let body = chunk.trim_matches(|c| PUNCTUATION.contains(c));
            let leading = &chunk[..chunk.len() - chunk.trim_start_matches(|c| PUNCTUATION.contains(c)).len()];
            let trailing = &chunk[chunk.trim_end_matches(|c| PUNCTUATION.contains(c)).len()..];

            tokens.extend(leading.chars().map(|c| punctuation_token(&c.to_string())));
            tokens.push(Token::untagged(body));
            tokens.extend(trailing.chars().map(|c| punctuation_token(&c.to_string())));
        }

        tokens
    }
}

fn punctuation_token(text: &str) -> Token {
    Token {
        text: text.to_string(),
        pos: Some(PUNCT.to_string()),
        lemma: None,
    }
}

/// Tagger backed by a `word<TAB>tag<TAB>lemma` lexicon. Words are looked up
/// in lower case; unknown words stay untagged.
#[derive(Debug, Default, Clone)]
pub struct LexiconTagger {
    entries: HashMap<String, (String, String)>,
}

impl LexiconTagger {
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read lexicon: {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("Failed to parse lexicon: {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        let mut entries = HashMap::new();

        for (number, line) in content.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let fields: Vec<&str> = line.split('\t').map(str::trim).collect();
            match fields.as_slice() {
                [word, tag] => {
                    entries.insert(word.to_lowercase(), (tag.to_string(), word.to_string()));
                }
                [word, tag, lemma, ..] => {
                    entries.insert(word.to_lowercase(), (tag.to_string(), lemma.to_string()));
                }
                _ => bail!("line {}: expected word<TAB>tag<TAB>lemma", number + 1),
            }
        }

        debug!(entries = entries.len(), "loaded lexicon");
        Ok(Self { entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Tagger for LexiconTagger {
    fn tokens(&self, text: &str) -> Vec<Token> {
        SimpleTagger
            .tokens(text)
            .into_iter()
            .map(|mut token| {
                if token.pos.is_none() {
                    if let Some((tag, lemma)) = self.entries.get(&token.text.to_lowercase()) {
                        token.pos = Some(tag.clone());
                        token.lemma = Some(lemma.clone());
                    }
                }
                token
            })
            .collect()
    }
}

/// The normalised form of `token`: its lemma for content words, then lower
/// case unless a determiner or proper noun.
fn normalise_token(token: &Token) -> String {
    let pos = token.pos.as_deref();

    let mut result = match (&token.lemma, pos) {
        (Some(lemma), Some(p)) if LEMMATISED.contains(&p) => lemma.clone(),
        _ => token.text.clone(),
    };

    if !pos.is_some_and(|p| CASE_PRESERVING.contains(&p)) {
        result = result.to_lowercase();
    }
    result
}

/// Retokenise `words` with `tagger`. Tagged tokens become [`Term`]s carrying
/// their normalised form; untagged tokens become plain normalised words.
pub fn tag_words(words: &[Word], tagger: &dyn Tagger) -> Vec<Word> {
    let text = text_from_words(words);

    tagger
        .tokens(&text)
        .into_iter()
        .filter(|token| !token.text.is_empty())
        .map(|token| {
            let normalised = normalise_token(&token);
            match token.pos {
                Some(tag) => Word::from(Term {
                    word: token.text,
                    tag: Some(tag),
                    normalised: Some(normalised),
                }),
                None => Word::from(normalised),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(text: &str) -> Vec<Word> {
        text.split_whitespace().map(Word::from).collect()
    }

    #[test]
    fn punctuation_is_split_off() {
        let tokens = SimpleTagger.tokens("Un pollo, entra. ¿Sí?");
        let texts: Vec<&str> = tokens.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, ["Un", "pollo", ",", "entra", ".", "¿Sí", "?"]);
        assert_eq!(tokens[2].pos.as_deref(), Some(PUNCT));
        assert_eq!(tokens[0].pos, None);
    }

    #[test]
    fn untagged_words_are_lowered() {
        let out = tag_words(&words("Un Pollo ."), &SimpleTagger);
        assert_eq!(out.len(), 3);
        assert_eq!(out[0], Word::from("un"));
        assert_eq!(out[1].text(), "pollo");
        assert_eq!(out[2].tag(), Some(PUNCT));
    }

    #[test]
    fn lexicon_supplies_lemmas() {
        let lexicon = LexiconTagger::parse(
            "pollos\tNOUN\tpollo\nentran\tVERB\tentrar\nJuan\tPROPN\tJuan\nlos\tDET\tel\n",
        )
        .unwrap();
        assert_eq!(lexicon.len(), 4);

        let out = tag_words(&words("Los pollos entran con Juan"), &lexicon);
        let summary: Vec<(&str, Option<&str>, &str)> = out
            .iter()
            .map(|w| (w.text(), w.tag(), w.key()))
            .collect();
        assert_eq!(
            summary,
            [
                ("Los", Some("DET"), "Los"),
                ("pollos", Some("NOUN"), "pollo"),
                ("entran", Some("VERB"), "entrar"),
                ("con", None, "con"),
                ("Juan", Some("PROPN"), "Juan"),
            ]
        );
    }

    #[test]
    fn malformed_lexicon_is_rejected() {
        let err = LexiconTagger::parse("pollo\n").unwrap_err();
        assert!(err.to_string().contains("line 1"));
    }
}
