//! Core data models for transcript fragments.
//!
//! A [`Fragment`] is a time-bounded excerpt of a transcript identified by its
//! [`Source`], optionally labelled with a [`Category`], and holding the
//! [`Word`]s that survive each normalisation stage. Fragments are shared as
//! [`FragmentRef`]s once their term vectors have been fixed, so connection
//! and relation mappings can refer to the same fragment without copying it.
//!
//! # Identity
//!
//! | Type | Equality / ordering |
//! |------|---------------------|
//! | [`Source`] | `(filename, start, end)` |
//! | [`Category`] | `(parent, category)` |
//! | [`Word`] | normalised form when present, surface form otherwise |
//! | [`Fragment`] | its [`Source`] |

use std::borrow::Cow;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::path::Path;
use std::rc::Rc;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::text::text_from_words;
use crate::vectors::{self, TermVector};

/// Shared handle to a fragment whose words and vector are final.
pub type FragmentRef = Rc<Fragment>;

static PARTICIPANT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^A\d*").expect("participant pattern is valid"));

// ═══════════════════════════════════════════════════════════════════════
// Source
// ═══════════════════════════════════════════════════════════════════════

/// Provenance of a fragment: the transcript file and the time span.
#[derive(Debug, Clone, Serialize)]
pub struct Source {
    /// File basename (directories are stripped on construction).
    pub filename: String,
    pub start: f64,
    pub end: f64,
}

impl Source {
    pub fn new(filename: &str, start: f64, end: f64) -> Self {
        let filename = Path::new(filename)
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| filename.to_string());

        Self {
            filename,
            start,
            end,
        }
    }

    /// The participant code leading the filename (`A12_...` gives `A12`),
    /// or the whole filename when no such code exists.
    pub fn participant(&self) -> &str {
        PARTICIPANT
            .find(&self.filename)
            .map(|m| m.as_str())
            .unwrap_or(&self.filename)
    }
}

impl PartialEq for Source {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Source {}

impl PartialOrd for Source {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Source {
    fn cmp(&self, other: &Self) -> Ordering {
        self.filename
            .cmp(&other.filename)
            .then(self.start.total_cmp(&other.start))
            .then(self.end.total_cmp(&other.end))
    }
}

impl Hash for Source {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.filename.hash(state);
        self.start.to_bits().hash(state);
        self.end.to_bits().hash(state);
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{:?}-{:?}", self.filename, self.start, self.end)
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Category
// ═══════════════════════════════════════════════════════════════════════

/// A parent topic and its subcategory.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Category {
    pub parent: String,
    pub category: String,
}

impl Category {
    pub fn new(parent: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            parent: parent.into(),
            category: category.into(),
        }
    }

    /// Both the parent and the subcategory are present.
    pub fn complete(&self) -> bool {
        !self.parent.is_empty() && !self.category.is_empty()
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.parent, self.category)
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Terms and words
// ═══════════════════════════════════════════════════════════════════════

/// A word annotated by a tagger.
#[derive(Debug, Clone, Serialize)]
pub struct Term {
    /// Surface form as it appeared in the transcript.
    pub word: String,
    /// Part-of-speech label.
    pub tag: Option<String>,
    /// Lemma or other canonical form.
    pub normalised: Option<String>,
}

impl Term {
    pub fn new(word: impl Into<String>) -> Self {
        Self {
            word: word.into(),
            tag: None,
            normalised: None,
        }
    }

    pub fn tagged(word: impl Into<String>, tag: impl Into<String>) -> Self {
        Self {
            word: word.into(),
            tag: Some(tag.into()),
            normalised: None,
        }
    }

    pub fn with_normalised(mut self, normalised: impl Into<String>) -> Self {
        self.normalised = Some(normalised.into());
        self
    }
}

/// A lexical unit in a fragment: either a plain word or a tagged [`Term`].
///
/// Both cases share one identity: the normalised form when the unit has a
/// non-empty one, the surface form otherwise. `Eq`, `Ord` and `Hash` all use
/// that key, so a `Word` can be used in maps and an unnormalised term is
/// interchangeable with the plain word of the same spelling.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Word {
    Plain(String),
    Tagged(Term),
}

impl Word {
    /// Surface form.
    pub fn text(&self) -> &str {
        match self {
            Word::Plain(s) => s,
            Word::Tagged(term) => &term.word,
        }
    }

    pub fn tag(&self) -> Option<&str> {
        match self {
            Word::Plain(_) => None,
            Word::Tagged(term) => term.tag.as_deref().filter(|t| !t.is_empty()),
        }
    }

    pub fn normalised(&self) -> Option<&str> {
        match self {
            Word::Plain(_) => None,
            Word::Tagged(term) => term.normalised.as_deref().filter(|n| !n.is_empty()),
        }
    }

    /// Identity key used for equality, ordering and hashing.
    pub fn key(&self) -> &str {
        self.normalised().unwrap_or_else(|| self.text())
    }

    /// Loose match: normalised forms when both sides have one, surface forms
    /// otherwise.
    pub fn matches(&self, other: &Word) -> bool {
        match (self.normalised(), other.normalised()) {
            (Some(a), Some(b)) => a == b,
            _ => self.text() == other.text(),
        }
    }
}

impl PartialEq for Word {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for Word {}

impl PartialOrd for Word {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Word {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key().cmp(other.key())
    }
}

impl Hash for Word {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key().hash(state);
    }
}

impl PartialEq<str> for Word {
    fn eq(&self, other: &str) -> bool {
        self.key() == other
    }
}

impl PartialEq<&str> for Word {
    fn eq(&self, other: &&str) -> bool {
        self.key() == *other
    }
}

impl AsRef<str> for Word {
    fn as_ref(&self) -> &str {
        self.text()
    }
}

impl fmt::Display for Word {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.text())
    }
}

impl From<&str> for Word {
    fn from(s: &str) -> Self {
        Word::Plain(s.to_string())
    }
}

impl From<String> for Word {
    fn from(s: String) -> Self {
        Word::Plain(s)
    }
}

impl From<Term> for Word {
    fn from(term: Term) -> Self {
        Word::Tagged(term)
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Fragment
// ═══════════════════════════════════════════════════════════════════════

/// A contiguous transcript excerpt.
///
/// `words` is replaced wholesale by each processing stage. The term vector
/// is set once, after the last word transformation, and the fragment is then
/// frozen behind a [`FragmentRef`].
#[derive(Debug, Clone)]
pub struct Fragment {
    pub source: Source,
    pub category: Option<Category>,
    pub words: Vec<Word>,
    /// Committed text; `None` until [`commit_text`](Fragment::commit_text).
    pub text: Option<String>,
    vector: Option<TermVector>,
}

impl Fragment {
    pub fn new(source: Source, category: Option<Category>) -> Self {
        Self::with_words(source, category, Vec::new())
    }

    pub fn with_words(source: Source, category: Option<Category>, words: Vec<Word>) -> Self {
        Self {
            source,
            category,
            words,
            text: None,
            vector: None,
        }
    }

    /// A fragment without words carries no content.
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Whether the fragment has a complete category.
    pub fn is_categorised(&self) -> bool {
        self.category.as_ref().is_some_and(Category::complete)
    }

    /// Fix the current words as the fragment's text.
    pub fn commit_text(&mut self) {
        self.text = Some(self.get_text());
    }

    /// Text recomputed from the current words.
    pub fn get_text(&self) -> String {
        text_from_words(&self.words)
    }

    /// Committed text, falling back to the current words.
    pub fn display_text(&self) -> Cow<'_, str> {
        match &self.text {
            Some(text) => Cow::Borrowed(text),
            None => Cow::Owned(self.get_text()),
        }
    }

    /// Replace the words with the result of `stage`.
    pub fn map_words<F>(&mut self, stage: F)
    where
        F: FnOnce(Vec<Word>) -> Vec<Word>,
    {
        let words = std::mem::take(&mut self.words);
        self.words = stage(words);
    }

    pub fn contains(&self, word: &Word) -> bool {
        self.words.iter().any(|w| w == word)
    }

    /// Occurrences of each distinct word.
    pub fn word_frequencies(&self) -> BTreeMap<Word, usize> {
        let mut frequencies = BTreeMap::new();
        for word in &self.words {
            *frequencies.entry(word.clone()).or_insert(0) += 1;
        }
        frequencies
    }

    /// Build a term vector from the current words: term frequencies, or
    /// presence (every weight 1) when `frequencies` is false.
    pub fn get_term_vector(&self, frequencies: bool) -> TermVector {
        vectors::term_vector(&self.words, frequencies)
    }

    pub fn set_term_vector(&mut self, vector: TermVector) {
        self.vector = Some(vector);
    }

    pub fn vector(&self) -> Option<&TermVector> {
        self.vector.as_ref()
    }

    /// The stored term vector, or term frequencies when none was set.
    pub fn term_vector(&self) -> Cow<'_, TermVector> {
        match &self.vector {
            Some(vector) => Cow::Borrowed(vector),
            None => Cow::Owned(self.get_term_vector(true)),
        }
    }

    /// Freeze the fragment for sharing.
    pub fn into_ref(self) -> FragmentRef {
        Rc::new(self)
    }
}

impl PartialEq for Fragment {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

impl Eq for Fragment {}

impl PartialOrd for Fragment {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Fragment {
    fn cmp(&self, other: &Self) -> Ordering {
        self.source.cmp(&other.source)
    }
}

impl Hash for Fragment {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.source.hash(state);
    }
}

impl fmt::Display for Fragment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.source.fmt(f)
    }
}

/// Apply each word `stage` in order to every fragment.
pub fn process_fragments(fragments: &mut [Fragment], stages: &[&dyn Fn(Vec<Word>) -> Vec<Word>]) {
    for fragment in fragments.iter_mut() {
        for stage in stages {
            fragment.map_words(stage);
        }
    }
}

/// Commit the text of every fragment.
pub fn commit_text(fragments: &mut [Fragment]) {
    for fragment in fragments.iter_mut() {
        fragment.commit_text();
    }
}

/// Freeze fragments into shared handles, preserving order.
pub fn into_refs(fragments: Vec<Fragment>) -> Vec<FragmentRef> {
    fragments.into_iter().map(Fragment::into_ref).collect()
}
