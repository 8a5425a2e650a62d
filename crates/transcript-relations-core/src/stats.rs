//! Corpus statistics and term catalogues.
//!
//! Functions here accept any slice of fragments, owned or shared, through
//! [`Borrow<Fragment>`]. Every mapping is a `BTreeMap` so reports built from
//! them come out in a stable order.

use std::borrow::Borrow;
use std::collections::{BTreeMap, BTreeSet};

use crate::models::{Category, Fragment, FragmentRef, Word};
use crate::vectors::{self, Weights};

/// Term to the fragments containing it.
pub type TermIndex = BTreeMap<Word, BTreeSet<FragmentRef>>;

/// Occurrences of each word across all fragments.
pub fn word_frequencies<F: Borrow<Fragment>>(fragments: &[F]) -> BTreeMap<Word, usize> {
    let mut frequencies = BTreeMap::new();
    for fragment in fragments {
        for word in &fragment.borrow().words {
            *frequencies.entry(word.clone()).or_insert(0) += 1;
        }
    }
    frequencies
}

/// Number of fragments containing each word.
pub fn word_document_frequencies<F: Borrow<Fragment>>(fragments: &[F]) -> BTreeMap<Word, usize> {
    let mut frequencies = BTreeMap::new();
    for fragment in fragments {
        let distinct: BTreeSet<&Word> = fragment.borrow().words.iter().collect();
        for word in distinct {
            *frequencies.entry(word.clone()).or_insert(0) += 1;
        }
    }
    frequencies
}

/// `log10(numdocs / (1 + df))` for each word.
pub fn inverse_document_frequencies(document_frequencies: &BTreeMap<Word, usize>, numdocs: usize) -> Weights {
    document_frequencies
        .iter()
        .map(|(word, &df)| {
            let idf = (numdocs as f64 / (1.0 + df as f64)).log10();
            (word.clone(), idf)
        })
        .collect()
}

/// Each fragment's words.
pub fn fragment_terms(fragments: &[FragmentRef]) -> BTreeMap<FragmentRef, Vec<Word>> {
    fragments
        .iter()
        .map(|f| (f.clone(), f.words.clone()))
        .collect()
}

/// Words of all fragments grouped by category parent.
pub fn category_terms<F: Borrow<Fragment>>(fragments: &[F]) -> BTreeMap<Option<String>, Vec<Word>> {
    let mut terms: BTreeMap<Option<String>, Vec<Word>> = BTreeMap::new();
    for fragment in fragments {
        let fragment = fragment.borrow();
        let parent = fragment.category.as_ref().map(|c| c.parent.clone());
        terms.entry(parent).or_default().extend(fragment.words.iter().cloned());
    }
    terms
}

/// Invert an entity→terms mapping into term→entities.
pub fn common_terms<K: Ord + Clone>(entity_terms: &BTreeMap<K, Vec<Word>>) -> BTreeMap<Word, BTreeSet<K>> {
    let mut common: BTreeMap<Word, BTreeSet<K>> = BTreeMap::new();
    for (entity, terms) in entity_terms {
        for term in terms {
            common.entry(term.clone()).or_default().insert(entity.clone());
        }
    }
    common
}

/// Complete term index for indexed comparison.
pub fn term_index(fragments: &[FragmentRef]) -> TermIndex {
    common_terms(&fragment_terms(fragments))
}

/// Fragments grouped by category.
pub fn category_fragments(fragments: &[FragmentRef]) -> BTreeMap<Option<Category>, Vec<FragmentRef>> {
    let mut grouped: BTreeMap<Option<Category>, Vec<FragmentRef>> = BTreeMap::new();
    for fragment in fragments {
        grouped.entry(fragment.category.clone()).or_default().push(fragment.clone());
    }
    grouped
}

/// All distinct words in sorted order.
pub fn all_words<F: Borrow<Fragment>>(fragments: &[F]) -> Vec<Word> {
    let words: BTreeSet<&Word> = fragments.iter().flat_map(|f| f.borrow().words.iter()).collect();
    words.into_iter().cloned().collect()
}

/// Set each fragment's term vector from its current words, scaled by
/// `weights`. Must run after the last word transformation.
pub fn process_term_vectors(fragments: &mut [Fragment], frequencies: bool, weights: Option<&Weights>) {
    for fragment in fragments.iter_mut() {
        let mut vector = fragment.get_term_vector(frequencies);
        vectors::scale_term_vector(&mut vector, weights);
        fragment.set_term_vector(vector);
    }
}
