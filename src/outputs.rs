//! Report and data file production.
//!
//! Every report is written below an [`Output`] directory. Record files
//! (`fragments.txt`, `connections.txt`) use the format of
//! [`serialised`](crate::serialised) so later runs can restore them; the
//! remaining reports are for reading.

use anyhow::{Context, Result};
use serde::Serialize;
use std::borrow::Borrow;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Display;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use transcript_relations_core::connection::Connection;
use transcript_relations_core::models::{Fragment, FragmentRef, Word};
use transcript_relations_core::related::RelatedFragments;

use crate::serialised::{self, category_label, quoted, rjust};

/// A named selection of related fragments.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub name: String,
    pub related: RelatedFragments,
}

/// An output directory, created on construction.
#[derive(Debug, Clone)]
pub struct Output {
    dir: PathBuf,
}

impl Output {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create output directory: {}", dir.display()))?;
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        &self.dir
    }

    pub fn filename(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }

    pub fn exists(&self, name: &str) -> bool {
        self.filename(name).exists()
    }

    pub fn subdir(&self, name: &str) -> Result<Output> {
        Output::new(self.filename(name))
    }

    /// Remove everything inside the directory.
    pub fn clean(&self) -> Result<()> {
        let entries = std::fs::read_dir(&self.dir)
            .with_context(|| format!("Failed to list directory: {}", self.dir.display()))?;
        for entry in entries {
            let path = entry?.path();
            if path.is_dir() {
                std::fs::remove_dir_all(&path)
            } else {
                std::fs::remove_file(&path)
            }
            .with_context(|| format!("Failed to remove {}", path.display()))?;
        }
        Ok(())
    }
}

fn create(path: &Path) -> Result<BufWriter<File>> {
    let file = File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
    Ok(BufWriter::new(file))
}

/// Write a report through `body`, naming `path` in any error.
fn write_report<F>(path: &Path, body: F) -> Result<()>
where
    F: FnOnce(&mut BufWriter<File>) -> std::io::Result<()>,
{
    let mut out = create(path)?;
    body(&mut out)
        .and_then(|()| out.flush())
        .with_context(|| format!("Failed to write {}", path.display()))
}

pub fn write_file(path: &Path, text: &str) -> Result<()> {
    std::fs::write(path, text).with_context(|| format!("Failed to write {}", path.display()))
}

// ═══════════════════════════════════════════════════════════════════════
// Record files
// ═══════════════════════════════════════════════════════════════════════

pub fn show_fragments<F: Borrow<Fragment>>(fragments: &[F], path: &Path) -> Result<()> {
    write_report(path, |out| {
        for fragment in fragments {
            serialised::write_fragment_record(out, fragment.borrow())?;
        }
        Ok(())
    })
}

/// Connection report in ascending measure order. The brief form is the
/// restorable record format; the full form shows similarity details and
/// both fragments.
pub fn show_connections<C: Borrow<Connection>>(connections: &[C], path: &Path, brief: bool) -> Result<()> {
    let mut sorted: Vec<&Connection> = connections.iter().map(Borrow::borrow).collect();
    sorted.sort_by(|a, b| a.cmp_by_measure(b));

    write_report(path, |out| {
        for connection in sorted {
            if brief {
                serialised::write_connection_record(out, connection)?;
                continue;
            }
            show_similarity(out, connection)?;
            writeln!(out)?;
            for fragment in connection.fragments() {
                show_fragment(out, fragment)?;
            }
            writeln!(out)?;
        }
        Ok(())
    })
}

// ═══════════════════════════════════════════════════════════════════════
// Readable reports
// ═══════════════════════════════════════════════════════════════════════

fn show_fragment(out: &mut impl Write, fragment: &Fragment) -> std::io::Result<()> {
    writeln!(out, "{} {}", rjust("Source:"), fragment.source)?;
    writeln!(out, "{} {}", rjust("Category:"), category_label(fragment.category.as_ref()))?;
    writeln!(out, "{} {}", rjust("Text:"), fragment.display_text())
}

/// `term (0.50) ...` with two decimals.
pub fn similarity_details(connection: &Connection) -> String {
    connection
        .similarity()
        .iter()
        .map(|(term, score)| format!("{} ({:.2})", quoted(term.text()), score))
        .collect::<Vec<_>>()
        .join(" ")
}

fn show_similarity(out: &mut impl Write, connection: &Connection) -> std::io::Result<()> {
    writeln!(
        out,
        "{} {:.2} {}",
        rjust("Sim:"),
        connection.measure(),
        similarity_details(connection)
    )
}

/// One item per line.
pub fn show_all_words<I>(words: I, path: &Path) -> Result<()>
where
    I: IntoIterator,
    I::Item: Display,
{
    write_report(path, |out| {
        for word in words {
            writeln!(out, "{}", word)?;
        }
        Ok(())
    })
}

/// Each fragment followed by up to `shown_relations` related fragments.
pub fn show_related_fragments(related: &RelatedFragments, path: &Path, shown_relations: usize) -> Result<()> {
    write_report(path, |out| {
        for (fragment, connections) in related {
            show_fragment(out, fragment)?;
            writeln!(out)?;

            for connection in connections.iter().take(shown_relations) {
                let Ok(relation) = connection.relation(fragment) else {
                    continue;
                };
                show_similarity(out, connection)?;
                writeln!(out)?;
                show_fragment(out, relation)?;
                writeln!(out)?;
            }

            if connections.len() > shown_relations {
                writeln!(out, "{} related fragments not shown.", connections.len() - shown_relations)?;
            }

            writeln!(out, "----")?;
            writeln!(out)?;
        }
        Ok(())
    })
}

/// `source count` for each fragment.
pub fn show_fragment_accessibility(
    accessibility: &BTreeMap<FragmentRef, BTreeSet<FragmentRef>>,
    path: &Path,
) -> Result<()> {
    write_report(path, |out| {
        for (fragment, reachable) in accessibility {
            writeln!(out, "{} {}", fragment.source, reachable.len())?;
        }
        Ok(())
    })
}

/// `term value` lines in ascending value order.
pub fn show_frequencies<V>(frequencies: &BTreeMap<Word, V>, path: &Path) -> Result<()>
where
    V: PartialOrd + Display,
{
    let mut entries: Vec<(&Word, &V)> = frequencies.iter().collect();
    entries.sort_by(|a, b| {
        a.1.partial_cmp(b.1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.0.cmp(b.0))
    });

    write_report(path, |out| {
        for (term, value) in entries {
            writeln!(out, "{} {}", term, value)?;
        }
        Ok(())
    })
}

/// Each key with the entities it appears in, fewest entities first. With
/// `summary`, only the number of entities is shown.
pub fn show_common_terms<K, C, E, F>(
    common: &BTreeMap<K, C>,
    path: &Path,
    delimiter: &str,
    summary: bool,
    label: F,
) -> Result<()>
where
    K: Display,
    for<'a> &'a C: IntoIterator<Item = &'a E>,
    E: 'static,
    F: Fn(&E) -> String,
{
    let mut rows: Vec<(String, Vec<String>)> = common
        .iter()
        .map(|(key, entities)| (key.to_string(), entities.into_iter().map(&label).collect()))
        .collect();
    // Stable: keys stay in map order within each entity count.
    rows.sort_by_key(|(_, entities)| entities.len());

    write_report(path, |out| {
        for (key, entities) in rows {
            if summary {
                writeln!(out, "{}{}{}", key, delimiter, entities.len())?;
            } else {
                writeln!(out, "{}{}{}", key, delimiter, entities.join(","))?;
            }
        }
        Ok(())
    })
}

/// Label for an optional entity, `null` when absent.
pub fn entity_label<T: Display>(entity: &Option<T>) -> String {
    entity.as_ref().map_or_else(|| "null".to_string(), T::to_string)
}

/// A heading per category parent followed by its distinct terms.
pub fn show_category_terms(category_terms: &BTreeMap<Option<String>, Vec<Word>>, path: &Path) -> Result<()> {
    write_report(path, |out| {
        for (parent, terms) in category_terms {
            let heading = parent.as_deref().unwrap_or("None");
            writeln!(out, "{}", heading)?;
            writeln!(out, "{}", "-".repeat(heading.chars().count()))?;

            let distinct: BTreeSet<&Word> = terms.iter().collect();
            for term in distinct {
                writeln!(out, "{}", term)?;
            }
            writeln!(out)?;
        }
        Ok(())
    })
}

// ═══════════════════════════════════════════════════════════════════════
// Structured output
// ═══════════════════════════════════════════════════════════════════════

/// Per-fragment data directories:
/// `<source>/text`, `<source>/category` and
/// `<source>/<dataset>/<i>/{fragment,measure,similarity}`.
pub fn write_fragment_data(datasets: &[Dataset], output: &Output) -> Result<()> {
    for dataset in datasets {
        for (fragment, connections) in &dataset.related {
            let fragment_out = output.subdir(&fragment.source.to_string())?;

            if !fragment_out.exists("text") {
                write_file(&fragment_out.filename("text"), &fragment.display_text())?;
                write_file(
                    &fragment_out.filename("category"),
                    &category_label(fragment.category.as_ref()),
                )?;
            }

            let dataset_out = fragment_out.subdir(&dataset.name)?;
            dataset_out.clean()?;

            for (i, connection) in connections.iter().enumerate() {
                let relation = connection.relation(fragment)?;
                let relation_out = dataset_out.subdir(&i.to_string())?;

                write_file(&relation_out.filename("fragment"), &relation.source.to_string())?;
                write_file(&relation_out.filename("measure"), &connection.measure().to_string())?;
                write_file(&relation_out.filename("similarity"), &similarity_details(connection))?;
            }
        }
    }
    Ok(())
}

#[derive(Serialize)]
struct RelationsExport {
    datasets: Vec<DatasetExport>,
    unreachable: Vec<String>,
}

#[derive(Serialize)]
struct DatasetExport {
    name: String,
    fragments: Vec<FragmentExport>,
}

#[derive(Serialize)]
struct FragmentExport {
    source: String,
    category: Option<String>,
    text: String,
    related: Vec<RelationExport>,
}

#[derive(Serialize)]
struct RelationExport {
    source: String,
    measure: f64,
    similarity: BTreeMap<String, f64>,
}

/// Write every dataset and the unreachable fragments as pretty JSON.
pub fn write_relations_json(datasets: &[Dataset], unreachable: &BTreeSet<FragmentRef>, path: &Path) -> Result<()> {
    let mut export = RelationsExport {
        datasets: Vec::with_capacity(datasets.len()),
        unreachable: unreachable.iter().map(|f| f.source.to_string()).collect(),
    };

    for dataset in datasets {
        let mut fragments = Vec::with_capacity(dataset.related.len());
        for (fragment, connections) in &dataset.related {
            let mut related = Vec::with_capacity(connections.len());
            for connection in connections {
                related.push(RelationExport {
                    source: connection.relation(fragment)?.source.to_string(),
                    measure: connection.measure(),
                    similarity: connection
                        .similarity()
                        .iter()
                        .map(|(term, weight)| (serialised::term_summary(term), *weight))
                        .collect(),
                });
            }
            fragments.push(FragmentExport {
                source: fragment.source.to_string(),
                category: fragment.category.as_ref().map(ToString::to_string),
                text: fragment.display_text().into_owned(),
                related,
            });
        }
        export.datasets.push(DatasetExport {
            name: dataset.name.clone(),
            fragments,
        });
    }

    let json = serde_json::to_string_pretty(&export)?;
    write_file(path, &json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::rc::Rc;
    use tempfile::TempDir;
    use transcript_relations_core::connection::ConnectionRef;
    use transcript_relations_core::models::{into_refs, Category, Source, Term};
    use transcript_relations_core::vectors::TermVector;

    fn fragments() -> Vec<FragmentRef> {
        let mut all = vec![
            Fragment::with_words(
                Source::new("A1", 0.0, 1.0),
                Some(Category::new("Casa", "Cocina")),
                vec![Word::from("pollo"), Word::from("casa")],
            ),
            Fragment::with_words(
                Source::new("A2", 0.0, 1.0),
                Some(Category::new("Casa", "Patio")),
                vec![Word::from("pollo")],
            ),
            Fragment::with_words(Source::new("A3", 0.0, 1.0), None, vec![Word::from("casa")]),
        ];
        for f in &mut all {
            f.commit_text();
        }
        into_refs(all)
    }

    fn connect(a: &FragmentRef, b: &FragmentRef, term: &str) -> ConnectionRef {
        let similarity: TermVector = [(Word::from(term), 1.0)].into_iter().collect();
        Rc::new(Connection::new(similarity, [a.clone(), b.clone()]).unwrap())
    }

    #[test]
    fn related_report_limits_shown_relations() {
        let dir = TempDir::new().unwrap();
        let f = fragments();
        let mut related = RelatedFragments::new();
        related.insert(f[0].clone(), vec![connect(&f[0], &f[1], "pollo"), connect(&f[0], &f[2], "casa")]);

        let path = dir.path().join("translation");
        show_related_fragments(&related, &path, 1).unwrap();
        let text = fs::read_to_string(&path).unwrap();

        assert!(text.starts_with("  Source: A1:0.0-1.0\nCategory: Casa-Cocina\n    Text: pollo casa\n\n"));
        assert!(text.contains("     Sim: 0.71 pollo (1.00)\n"));
        assert!(text.contains("1 related fragments not shown.\n----\n"));
        assert!(!text.contains("A3"));
    }

    #[test]
    fn frequencies_sort_by_value_then_term() {
        let dir = TempDir::new().unwrap();
        let frequencies: BTreeMap<Word, usize> =
            [(Word::from("b"), 1), (Word::from("a"), 2), (Word::from("c"), 1)].into_iter().collect();
        let path = dir.path().join("freq.txt");
        show_frequencies(&frequencies, &path).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "b 1\nc 1\na 2\n");
    }

    #[test]
    fn common_terms_sort_by_entity_count() {
        let dir = TempDir::new().unwrap();
        let common: BTreeMap<Word, BTreeSet<Option<String>>> = [
            (Word::from("casa"), BTreeSet::from([Some("Casa".to_string()), None])),
            (Word::from("pollo"), BTreeSet::from([Some("Casa".to_string())])),
        ]
        .into_iter()
        .collect();

        let path = dir.path().join("term_categories.txt");
        show_common_terms(&common, &path, " ", false, entity_label::<String>).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "pollo Casa\ncasa null,Casa\n");

        show_common_terms(&common, &path, "\t", true, entity_label::<String>).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "pollo\t1\ncasa\t2\n");
    }

    #[test]
    fn category_terms_have_headings() {
        let dir = TempDir::new().unwrap();
        let terms: BTreeMap<Option<String>, Vec<Word>> = [(
            Some("Casa".to_string()),
            vec![Word::from("pollo"), Word::from("casa"), Word::from("pollo")],
        )]
        .into_iter()
        .collect();
        let path = dir.path().join("terms.txt");
        show_category_terms(&terms, &path).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "Casa\n----\ncasa\npollo\n\n");
    }

    #[test]
    fn fragment_data_directories() {
        let dir = TempDir::new().unwrap();
        let f = fragments();
        let mut related = RelatedFragments::new();
        related.insert(f[0].clone(), vec![connect(&f[0], &f[1], "pollo")]);
        let datasets = vec![Dataset {
            name: "translation".to_string(),
            related,
        }];

        let output = Output::new(dir.path().join("data")).unwrap();
        write_fragment_data(&datasets, &output).unwrap();

        let base = dir.path().join("data").join("A1:0.0-1.0");
        assert_eq!(fs::read_to_string(base.join("text")).unwrap(), "pollo casa");
        assert_eq!(fs::read_to_string(base.join("category")).unwrap(), "Casa-Cocina");
        let relation = base.join("translation").join("0");
        assert_eq!(fs::read_to_string(relation.join("fragment")).unwrap(), "A2:0.0-1.0");
        assert_eq!(fs::read_to_string(relation.join("similarity")).unwrap(), "pollo (1.00)");
    }

    #[test]
    fn relations_json_lists_datasets() {
        let dir = TempDir::new().unwrap();
        let f = fragments();
        let mut related = RelatedFragments::new();
        related.insert(f[0].clone(), vec![connect(&f[0], &f[1], "pollo")]);
        let datasets = vec![Dataset {
            name: "rotation".to_string(),
            related,
        }];
        let unreachable = BTreeSet::from([f[2].clone()]);

        let path = dir.path().join("relations.json");
        write_relations_json(&datasets, &unreachable, &path).unwrap();
        let value: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();

        assert_eq!(value["datasets"][0]["name"], "rotation");
        assert_eq!(value["datasets"][0]["fragments"][0]["related"][0]["source"], "A2:0.0-1.0");
        assert_eq!(value["unreachable"][0], "A3:0.0-1.0");
    }

    #[test]
    fn relations_json_keeps_terms_sharing_a_surface_form() {
        let dir = TempDir::new().unwrap();
        let f = fragments();
        let similarity: TermVector = [
            (Word::from("casa"), 1.0),
            (Word::from(Term::tagged("casa", "VERB").with_normalised("casar")), 2.0),
        ]
        .into_iter()
        .collect();
        let connection = Rc::new(Connection::new(similarity, [f[0].clone(), f[1].clone()]).unwrap());

        let mut related = RelatedFragments::new();
        related.insert(f[0].clone(), vec![connection]);
        let datasets = vec![Dataset {
            name: "any".to_string(),
            related,
        }];

        let path = dir.path().join("relations.json");
        write_relations_json(&datasets, &BTreeSet::new(), &path).unwrap();
        let value: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();

        let similarity = &value["datasets"][0]["fragments"][0]["related"][0]["similarity"];
        assert_eq!(similarity["casa"], 1.0);
        assert_eq!(similarity["casa:VERB:casar"], 2.0);
    }
}
