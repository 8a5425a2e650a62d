//! Corpus statistics and their reports.
//!
//! Frequencies are gathered while fragments are still being prepared,
//! because the inverse document frequencies scale the term vectors. The
//! remaining catalogues are built once fragments are frozen.

use anyhow::Result;
use std::borrow::Borrow;
use std::collections::{BTreeMap, BTreeSet};

use transcript_relations_core::models::{Category, Fragment, FragmentRef, Word};
use transcript_relations_core::stats::{self, TermIndex};
use transcript_relations_core::vectors::Weights;

use crate::outputs::{self, entity_label, Output};
use crate::serialised::category_label;

/// Term frequencies over a fragment collection.
#[derive(Debug, Clone, Default)]
pub struct Frequencies {
    pub frequencies: BTreeMap<Word, usize>,
    pub document_frequencies: BTreeMap<Word, usize>,
    pub inverse_document_frequencies: Weights,
}

impl Frequencies {
    pub fn of<F: Borrow<Fragment>>(fragments: &[F]) -> Self {
        let frequencies = stats::word_frequencies(fragments);
        let document_frequencies = stats::word_document_frequencies(fragments);
        let inverse_document_frequencies =
            stats::inverse_document_frequencies(&document_frequencies, fragments.len());

        Self {
            frequencies,
            document_frequencies,
            inverse_document_frequencies,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Statistics {
    pub frequencies: Frequencies,
    pub category_fragments: BTreeMap<Option<Category>, Vec<FragmentRef>>,
    pub category_terms: BTreeMap<Option<String>, Vec<Word>>,
    /// Term to the category parents using it.
    pub common_category_terms: BTreeMap<Word, BTreeSet<Option<String>>>,
    /// Term to the fragments using it.
    pub common_fragment_terms: TermIndex,
}

pub fn process_statistics(fragments: &[FragmentRef], frequencies: Frequencies) -> Statistics {
    let category_terms = stats::category_terms(fragments);
    let common_category_terms = stats::common_terms(&category_terms);

    Statistics {
        frequencies,
        category_fragments: stats::category_fragments(fragments),
        category_terms,
        common_category_terms,
        common_fragment_terms: stats::term_index(fragments),
    }
}

/// Write the statistical reports into `out`.
pub fn emit_statistics_output(statistics: &Statistics, out: &Output) -> Result<()> {
    let category_fragments: BTreeMap<String, Vec<FragmentRef>> = statistics
        .category_fragments
        .iter()
        .map(|(category, fragments)| (category_label(category.as_ref()), fragments.clone()))
        .collect();
    let source_label = |f: &FragmentRef| f.source.to_string();

    outputs::show_common_terms(
        &category_fragments,
        &out.filename("category_fragments.txt"),
        "\t",
        false,
        source_label,
    )?;
    outputs::show_common_terms(
        &category_fragments,
        &out.filename("category_fragments_summary.txt"),
        "\t",
        true,
        source_label,
    )?;
    outputs::show_category_terms(&statistics.category_terms, &out.filename("terms.txt"))?;
    outputs::show_common_terms(
        &statistics.common_category_terms,
        &out.filename("term_categories.txt"),
        " ",
        false,
        entity_label::<String>,
    )?;
    outputs::show_common_terms(
        &statistics.common_fragment_terms,
        &out.filename("term_fragments.txt"),
        " ",
        false,
        source_label,
    )?;

    let frequencies = &statistics.frequencies;
    outputs::show_frequencies(&frequencies.frequencies, &out.filename("term_frequencies.txt"))?;
    outputs::show_frequencies(
        &frequencies.document_frequencies,
        &out.filename("term_doc_frequencies.txt"),
    )?;
    outputs::show_frequencies(
        &frequencies.inverse_document_frequencies,
        &out.filename("term_inv_doc_frequencies.txt"),
    )?;
    Ok(())
}
