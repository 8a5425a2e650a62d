//! The `trel build` pipeline.
//!
//! Reads transcripts, prepares their fragments' words and compares every
//! pair of fragments sharing a term. The results are written as record
//! files that `trel export` restores.
//!
//! Word preparation runs as an ordered list of stages over every fragment:
//!
//! 1. accent normalisation, after which the fragment text is committed
//! 2. punctuation removal
//! 3. tagging
//! 4. grouping of names and quantities
//! 5. part-of-speech filtering
//!
//! Term vectors are set only after the last stage.

use anyhow::Result;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use transcript_relations_core::connection::{compare_fragments, Connection};
use transcript_relations_core::models::{self, Fragment, FragmentRef, Word};
use transcript_relations_core::stats;

use crate::config::{Config, InputConfig};
use crate::filters::{fix_category_names, read_map, PosFilter};
use crate::grouping::group_words;
use crate::ingest::{discover_inputs, group_inputs, load_group};
use crate::normalise::{normalise_accents, remove_punctuation_from_words};
use crate::outputs::{self, Output};
use crate::progress::{Phase, ProgressEvent, ProgressReporter};
use crate::stats::Frequencies;
use crate::tagging::{tag_words, LexiconTagger, SimpleTagger, Tagger};

const COMMAND: &str = "build";

/// Fragments ready for comparison.
pub struct Prepared {
    pub fragments: Vec<Fragment>,
    /// Every distinct word seen before normalisation, sorted.
    pub all_words: Vec<Word>,
}

/// The tagger configured for `input`: a lexicon when one is given,
/// otherwise the built-in tokenizer.
pub fn tagger_for(input: &InputConfig) -> Result<Box<dyn Tagger>> {
    match &input.lexicon {
        Some(path) => {
            let lexicon = LexiconTagger::from_file(path)?;
            info!(lexicon = %path.display(), entries = lexicon.len(), "loaded lexicon");
            Ok(Box::new(lexicon))
        }
        None => Ok(Box::new(SimpleTagger)),
    }
}

/// Filter fragments and run the word stages over them.
pub fn prepare_fragments(
    fragments: Vec<Fragment>,
    all_fragments: bool,
    category_map: Option<&BTreeMap<String, String>>,
    tagger: &dyn Tagger,
    pos_filter: &PosFilter,
) -> Prepared {
    let before = fragments.len();
    let mut fragments: Vec<Fragment> = fragments
        .into_iter()
        .filter(|f| !f.is_empty() && (all_fragments || f.is_categorised()))
        .collect();
    debug!(kept = fragments.len(), dropped = before - fragments.len(), "filtered fragments");

    if let Some(category_map) = category_map {
        fix_category_names(&mut fragments, category_map);
    }

    let all_words = stats::all_words(&fragments);

    models::process_fragments(&mut fragments, &[&normalise_accents]);
    models::commit_text(&mut fragments);

    let tag = |words: Vec<Word>| tag_words(&words, tagger);
    let filter = |words: Vec<Word>| pos_filter.filter_words(words);
    models::process_fragments(
        &mut fragments,
        &[&remove_punctuation_from_words, &tag, &group_words, &filter],
    );

    Prepared { fragments, all_words }
}

/// Set frequency term vectors and compare fragments through a term index.
/// Shared terms are weighted by their inverse document frequency.
pub fn compare(mut fragments: Vec<Fragment>) -> (Vec<FragmentRef>, Vec<Connection>) {
    let idf = Frequencies::of(&fragments[..]).inverse_document_frequencies;
    stats::process_term_vectors(&mut fragments, true, None);
    let fragments = models::into_refs(fragments);
    let index = stats::term_index(&fragments);
    let connections = compare_fragments(&fragments, Some(&idf), Some(&index));
    (fragments, connections)
}

/// Run the build pipeline over `inputs`, writing records into `outdir`.
pub fn run_build(
    config: &Config,
    outdir: &Path,
    inputs: &[PathBuf],
    verbose: bool,
    progress: &dyn ProgressReporter,
) -> Result<()> {
    let input = &config.input;

    progress.report(ProgressEvent::Started {
        command: COMMAND,
        phase: Phase::Reading,
    });
    let paths = discover_inputs(inputs, &input.include_globs)?;
    let groups = group_inputs(&paths);
    if groups.is_empty() {
        anyhow::bail!("No complete transcripts (Text and Tiers files) found in the inputs");
    }

    let mut fragments = Vec::new();
    for (i, group) in groups.iter().enumerate() {
        fragments.extend(load_group(group)?);
        progress.report(ProgressEvent::Advanced {
            command: COMMAND,
            phase: Phase::Reading,
            n: (i + 1) as u64,
            total: groups.len() as u64,
            unit: "transcripts",
        });
    }
    let loaded = fragments.len();

    progress.report(ProgressEvent::Started {
        command: COMMAND,
        phase: Phase::Processing,
    });
    let category_map = input.category_map.as_deref().map(read_map).transpose()?;
    let pos_filter = PosFilter::from_file(input.pos_tags.as_deref())?;
    let tagger = tagger_for(input)?;

    let prepared = prepare_fragments(
        fragments,
        input.all_fragments,
        category_map.as_ref(),
        tagger.as_ref(),
        &pos_filter,
    );

    progress.report(ProgressEvent::Started {
        command: COMMAND,
        phase: Phase::Comparing,
    });
    let (fragments, connections) = compare(prepared.fragments);
    info!(
        fragments = fragments.len(),
        connections = connections.len(),
        "compared fragments"
    );

    progress.report(ProgressEvent::Started {
        command: COMMAND,
        phase: Phase::Writing,
    });
    let out = Output::new(outdir)?;
    outputs::show_all_words(&prepared.all_words, &out.filename("words.txt"))?;
    outputs::show_fragments(&fragments, &out.filename("fragments.txt"))?;
    outputs::show_connections(&connections, &out.filename("connections.txt"), true)?;
    if verbose {
        outputs::show_connections(&connections, &out.filename("connections_verbose.txt"), false)?;
    }

    println!("build {}", out.path().display());
    println!("  transcripts: {}", groups.len());
    println!("  fragments loaded: {}", loaded);
    println!("  fragments kept: {}", fragments.len());
    println!("  distinct words: {}", prepared.all_words.len());
    println!("  connections: {}", connections.len());
    println!("ok");

    Ok(())
}
