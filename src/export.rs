//! The `trel export` pipeline.
//!
//! Restores the fragments and connections written by `trel build`, weights
//! them, selects related fragments for every requested selector and writes
//! the relation reports next to the restored records.

use anyhow::{Context, Result};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use tracing::{debug, info};

use transcript_relations_core::access::{
    combine_related_fragments, find_accessibility, get_accessing_fragments, unreachable_fragments,
};
use transcript_relations_core::connection::{self, recompute_connections, scale_connections, ConnectionRef};
use transcript_relations_core::models::{self, Category, Fragment, FragmentRef, Word};
use transcript_relations_core::related::{
    get_related_fragments, resolve_selections, select_related_fragments, sort_related_fragments,
};
use transcript_relations_core::stats::process_term_vectors;

use crate::config::{Config, RelationsConfig};
use crate::filters::{read_category_weights, Wordlist};
use crate::graph::{write_graph, GraphOptions};
use crate::outputs::{self, Dataset, Output};
use crate::progress::{Phase, ProgressEvent, ProgressReporter};
use crate::serialised::{ensure_nonempty, read_connections, read_fragments};
use crate::stats::{emit_statistics_output, process_statistics, Frequencies};

const COMMAND: &str = "export";

/// Export switches that only exist on the command line.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExportOptions {
    /// Write the statistical reports.
    pub stats: bool,
    /// Run the pipeline without writing anything.
    pub no_output: bool,
}

/// Everything derived from the restored records.
pub struct Relations {
    pub fragments: Vec<FragmentRef>,
    pub connections: Vec<ConnectionRef>,
    pub datasets: Vec<Dataset>,
    /// Fragments reachable from each fragment through any dataset.
    pub accessibility: BTreeMap<FragmentRef, BTreeSet<FragmentRef>>,
    /// Fragments no relation leads into.
    pub unreachable: BTreeSet<FragmentRef>,
    pub frequencies: Frequencies,
    /// Restored fragments after word-list filtering, when a list is set.
    pub filtered: Option<Vec<Fragment>>,
}

/// Restore fragments, keeping only the words in `word_list` when given.
pub fn restore_fragments(path: &Path, word_list: Option<&Wordlist>) -> Result<Vec<Fragment>> {
    let mut fragments = read_fragments(path)?;
    ensure_nonempty(&fragments, "fragments", path)?;

    if let Some(word_list) = word_list {
        let filter = |words: Vec<Word>| word_list.filter_words(words);
        models::process_fragments(&mut fragments, &[&filter]);
    }
    Ok(fragments)
}

/// Set each fragment's term vector as configured, returning the corpus
/// frequencies used for weighting.
pub fn weight_fragments(fragments: &mut [Fragment], relations: &RelationsConfig) -> Frequencies {
    let frequencies = Frequencies::of(&*fragments);
    let idf = relations.idf.then_some(&frequencies.inverse_document_frequencies);
    process_term_vectors(fragments, !relations.term_presence_only, idf);
    frequencies
}

/// Restore connections against `fragments` and recompute their similarity
/// from the current term vectors.
pub fn restore_connections(
    path: &Path,
    fragments: &[FragmentRef],
    category_weights: Option<&BTreeMap<Category, f64>>,
) -> Result<Vec<ConnectionRef>> {
    let restored = read_connections(path, fragments)?;
    let count = restored.len();

    let mut connections = recompute_connections(restored, None);
    debug!(
        restored = count,
        dropped = count - connections.len(),
        "recomputed connections"
    );

    if let Some(weights) = category_weights {
        scale_connections(&mut connections, weights);
    }
    Ok(connection::into_refs(connections))
}

/// Select related fragments for each requested selection.
pub fn select_datasets<S: AsRef<str>>(
    connections: &[ConnectionRef],
    selections: &[S],
    num_related: usize,
) -> Result<Vec<Dataset>> {
    let mut related = get_related_fragments(connections);
    sort_related_fragments(&mut related);

    let mut datasets = Vec::new();
    for (name, criteria) in resolve_selections(selections)? {
        let selected = select_related_fragments(&related, num_related, &criteria)?;
        debug!(dataset = %name, fragments = selected.len(), "selected related fragments");
        datasets.push(Dataset { name, related: selected });
    }
    Ok(datasets)
}

/// Restore, weight and relate the records in `out`.
pub fn relate(
    out: &Output,
    relations: &RelationsConfig,
    progress: &dyn ProgressReporter,
) -> Result<Relations> {
    progress.report(ProgressEvent::Started {
        command: COMMAND,
        phase: Phase::Reading,
    });
    let word_list = relations.word_list.as_deref().map(Wordlist::from_file).transpose()?;
    let category_weights = relations
        .category_weights
        .as_deref()
        .map(read_category_weights)
        .transpose()?;

    let mut fragments = restore_fragments(&out.filename("fragments.txt"), word_list.as_ref())?;
    let filtered = word_list.is_some().then(|| fragments.clone());

    progress.report(ProgressEvent::Started {
        command: COMMAND,
        phase: Phase::Processing,
    });
    let frequencies = weight_fragments(&mut fragments, relations);
    let fragments = models::into_refs(fragments);
    let connections = restore_connections(
        &out.filename("connections.txt"),
        &fragments,
        category_weights.as_ref(),
    )?;
    info!(
        fragments = fragments.len(),
        connections = connections.len(),
        "restored records"
    );

    progress.report(ProgressEvent::Started {
        command: COMMAND,
        phase: Phase::Selecting,
    });
    let datasets = select_datasets(&connections, &relations.select, relations.num_related)?;

    let all_related: Vec<_> = datasets.iter().map(|d| &d.related).collect();
    let combined = combine_related_fragments(&all_related)?;
    let accessibility = find_accessibility(&fragments, &combined);
    let accessing = get_accessing_fragments(&combined);
    let unreachable = unreachable_fragments(&fragments, &accessing);

    Ok(Relations {
        fragments,
        connections,
        datasets,
        accessibility,
        unreachable,
        frequencies,
        filtered,
    })
}

/// Run the export pipeline over the records in `outdir`.
pub fn run_export(
    config: &Config,
    outdir: &Path,
    options: ExportOptions,
    progress: &dyn ProgressReporter,
) -> Result<()> {
    if !outdir.is_dir() {
        anyhow::bail!(
            "Output directory does not exist: {} (run `trel build` first)",
            outdir.display()
        );
    }
    let out = Output::new(outdir)?;
    let relations = relate(&out, &config.relations, progress)?;

    println!("export {}", out.path().display());
    println!("  fragments: {}", relations.fragments.len());
    println!("  connections: {}", relations.connections.len());
    for dataset in &relations.datasets {
        println!("  {}: {} fragments related", dataset.name, dataset.related.len());
    }
    println!("  unreachable: {}", relations.unreachable.len());

    if options.no_output {
        println!("ok (no output)");
        return Ok(());
    }

    progress.report(ProgressEvent::Started {
        command: COMMAND,
        phase: Phase::Writing,
    });

    if let Some(filtered) = &relations.filtered {
        outputs::show_fragments(filtered, &out.filename("fragments_filtered.txt"))?;
    }

    let shown_relations = config.output.shown_relations;
    for (i, dataset) in relations.datasets.iter().enumerate() {
        outputs::show_related_fragments(&dataset.related, &out.filename(&dataset.name), shown_relations)?;

        if config.output.graph {
            let graph_options = GraphOptions {
                directed: true,
                labels: true,
            };
            let path = out.filename(&format!("{}.dot", dataset.name));
            write_graph(&dataset.related, &path, graph_options)?;
        }

        progress.report(ProgressEvent::Advanced {
            command: COMMAND,
            phase: Phase::Writing,
            n: (i + 1) as u64,
            total: relations.datasets.len() as u64,
            unit: "datasets",
        });
    }

    if !relations.datasets.is_empty() {
        outputs::write_fragment_data(&relations.datasets, &out.subdir("data")?)
            .context("Failed to write fragment data")?;
    }

    outputs::show_fragment_accessibility(&relations.accessibility, &out.filename("accessibility"))?;
    outputs::show_all_words(&relations.unreachable, &out.filename("unreachable"))?;

    if config.output.json {
        outputs::write_relations_json(
            &relations.datasets,
            &relations.unreachable,
            &out.filename("relations.json"),
        )?;
    }

    if options.stats {
        let statistics = process_statistics(&relations.fragments, relations.frequencies.clone());
        emit_statistics_output(&statistics, &out)?;
    }

    println!("ok");
    Ok(())
}
