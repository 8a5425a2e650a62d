//! Word filters and the plain-text lists that configure them.
//!
//! List files hold one entry per line; map files hold `key value` lines
//! split at the first run of whitespace. Blank lines are ignored in both.

use anyhow::{bail, Context, Result};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use transcript_relations_core::models::{Category, Fragment, Word};

use crate::serialised::parse_category;

/// Tags kept when no tag list is configured.
pub const DEFAULT_POS_TAGS: [&str; 3] = ["NOUN", "PROPN", "ADJ"];

fn read_to_string(path: &Path, what: &str) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("Failed to read {}: {}", what, path.display()))
}

pub fn read_list(path: &Path) -> Result<Vec<String>> {
    let content = read_to_string(path, "list")?;
    Ok(parse_list(&content))
}

pub fn parse_list(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(String::from)
        .collect()
}

pub fn read_map(path: &Path) -> Result<BTreeMap<String, String>> {
    let content = read_to_string(path, "map")?;
    parse_map(&content).with_context(|| format!("Failed to parse map: {}", path.display()))
}

pub fn parse_map(content: &str) -> Result<BTreeMap<String, String>> {
    let mut map = BTreeMap::new();

    for (number, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match line.split_once(char::is_whitespace) {
            Some((key, value)) => {
                map.insert(key.to_string(), value.trim_start().to_string());
            }
            None => bail!("line {}: expected a key and a value", number + 1),
        }
    }

    Ok(map)
}

/// Read `parent-category weight` lines, categories written as in fragment
/// records.
pub fn read_category_weights(path: &Path) -> Result<BTreeMap<Category, f64>> {
    let content = read_to_string(path, "category weights")?;
    parse_category_weights(&content)
        .with_context(|| format!("Failed to parse category weights: {}", path.display()))
}

pub fn parse_category_weights(content: &str) -> Result<BTreeMap<Category, f64>> {
    let mut weights = BTreeMap::new();

    for (key, value) in parse_map(content)? {
        let Some(category) = parse_category(&key)? else {
            bail!("category '{}' is not of the form parent-category", key);
        };
        let weight: f64 = value
            .parse()
            .with_context(|| format!("invalid weight '{}' for category '{}'", value, key))?;
        weights.insert(category, weight);
    }

    Ok(weights)
}

/// Rename category parents according to `category_map`.
pub fn fix_category_names(fragments: &mut [Fragment], category_map: &BTreeMap<String, String>) {
    for category in fragments.iter_mut().filter_map(|f| f.category.as_mut()) {
        if let Some(fix) = category_map.get(&category.parent).filter(|fix| !fix.is_empty()) {
            category.parent = fix.clone();
        }
    }
}

/// Keeps plain words and terms whose tag is allowed.
#[derive(Debug, Clone)]
pub struct PosFilter {
    tags: BTreeSet<String>,
}

impl Default for PosFilter {
    fn default() -> Self {
        Self::new(DEFAULT_POS_TAGS)
    }
}

impl PosFilter {
    pub fn new<I, S>(tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            tags: tags.into_iter().map(Into::into).collect(),
        }
    }

    /// Load the tag list from `path`, or use the default tags.
    pub fn from_file(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Ok(Self::new(read_list(path)?)),
            None => Ok(Self::default()),
        }
    }

    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.tags.iter().map(String::as_str)
    }

    pub fn filter_words(&self, words: Vec<Word>) -> Vec<Word> {
        words
            .into_iter()
            .filter(|word| match word {
                Word::Plain(_) => true,
                Word::Tagged(term) => term.tag.as_ref().is_some_and(|tag| self.tags.contains(tag)),
            })
            .collect()
    }
}

/// Keeps only words found in a list of root forms.
#[derive(Debug, Clone, Default)]
pub struct Wordlist {
    words: BTreeSet<String>,
}

impl Wordlist {
    pub fn new<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            words: words.into_iter().map(Into::into).collect(),
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        Ok(Self::new(read_list(path)?))
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn accepts(&self, word: &Word) -> bool {
        self.words.contains(word.text()) || word.normalised().is_some_and(|n| self.words.contains(n))
    }

    pub fn filter_words(&self, words: Vec<Word>) -> Vec<Word> {
        words.into_iter().filter(|w| self.accepts(w)).collect()
    }
}
