//! Transcript ingestion.
//!
//! A transcript is described by two XML files sharing a prefix: a `Tiers`
//! document whose spans define categorised fragments, and a `Text` document
//! whose spans time individual words. Both use the same span layout:
//!
//! ```xml
//! <TIER columns="Parent">
//!   <span start="0.0" end="12.5"><v>Category</v></span>
//! </TIER>
//! ```
//!
//! Fragments are read from the tiers, gaps between them are filled with
//! uncategorised fragments, and the timed words are then assigned to the
//! fragment they overlap.

use anyhow::{bail, Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;

use transcript_relations_core::models::{Category, Fragment, Source, Word};

/// File name markers of the two documents making up a transcript.
pub const DATATYPES: [&str; 2] = ["Text", "Tiers"];

/// The pair of files describing one transcript.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputGroup {
    /// Path prefix up to the last `_`; its basename names the fragments' source.
    pub name: String,
    pub text: PathBuf,
    pub tiers: PathBuf,
}

/// One `<span>` element.
#[derive(Debug, Clone, PartialEq)]
pub struct Span {
    /// `columns` attribute of the enclosing `<TIER>`.
    pub tier: Option<String>,
    pub start: f64,
    pub end: f64,
    /// Text of the span's first `<v>` child.
    pub value: Option<String>,
}

/// Expand directory arguments into the files matching `include_globs`.
/// File arguments are kept as given.
pub fn discover_inputs(inputs: &[PathBuf], include_globs: &[String]) -> Result<Vec<PathBuf>> {
    let include_set = build_globset(include_globs)?;
    let mut files = Vec::new();

    for input in inputs {
        if !input.exists() {
            bail!("Input does not exist: {}", input.display());
        }
        if !input.is_dir() {
            files.push(input.clone());
            continue;
        }

        let mut found = Vec::new();
        for entry in WalkDir::new(input) {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path();
            let relative = path.strip_prefix(input).unwrap_or(path);
            if include_set.is_match(relative) {
                found.push(path.to_path_buf());
            }
        }
        found.sort();
        debug!(dir = %input.display(), files = found.len(), "scanned input directory");
        files.extend(found);
    }

    Ok(files)
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern)?);
    }
    Ok(builder.build()?)
}

/// The data type and group prefix of `path`, if its name marks one.
fn input_details(path: &Path) -> Option<(&'static str, String)> {
    let name = path.to_string_lossy();
    let datatype = *DATATYPES.iter().find(|d| name.contains(**d))?;
    let prefix = match name.rsplit_once('_') {
        Some((prefix, _)) => prefix.to_string(),
        None => name.to_string(),
    };
    Some((datatype, prefix))
}

/// Group files into transcripts. Groups lacking either document are
/// dropped; the result is ordered by group name.
pub fn group_inputs(paths: &[PathBuf]) -> Vec<InputGroup> {
    let mut grouped: BTreeMap<String, BTreeMap<&'static str, PathBuf>> = BTreeMap::new();

    for path in paths {
        match input_details(path) {
            Some((datatype, prefix)) => {
                grouped.entry(prefix).or_default().insert(datatype, path.clone());
            }
            None => debug!(path = %path.display(), "ignoring file without Text/Tiers marker"),
        }
    }

    grouped
        .into_iter()
        .filter_map(|(name, mut files)| {
            let text = files.remove("Text")?;
            let tiers = files.remove("Tiers")?;
            Some(InputGroup { name, text, tiers })
        })
        .collect()
}

/// Upper-case a lower-case letter following a space or underscore.
pub fn normalise_label(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut after_separator = false;
    for c in s.chars() {
        if after_separator && c.is_ascii_lowercase() {
            out.push(c.to_ascii_uppercase());
        } else {
            out.push(c);
        }
        after_separator = c == ' ' || c == '_';
    }
    out
}

/// Read every `<span>` of an XML document.
pub fn read_spans(xml: &str) -> Result<Vec<Span>> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut spans = Vec::new();
    let mut tier: Option<String> = None;
    let mut current: Option<Span> = None;
    let mut in_value = false;

    loop {
        match reader.read_event()? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"TIER" => tier = attribute(&e, "columns")?,
                b"span" => current = Some(new_span(&e, &tier)?),
                b"v" => {
                    if let Some(span) = current.as_mut() {
                        if span.value.is_none() {
                            span.value = Some(String::new());
                            in_value = true;
                        }
                    }
                }
                _ => {}
            },
            Event::Empty(e) => match e.local_name().as_ref() {
                b"span" => spans.push(new_span(&e, &tier)?),
                b"v" => {
                    if let Some(span) = current.as_mut() {
                        span.value.get_or_insert_with(String::new);
                    }
                }
                _ => {}
            },
            Event::Text(t) if in_value => {
                if let Some(value) = current.as_mut().and_then(|s| s.value.as_mut()) {
                    value.push_str(&t.unescape()?);
                }
            }
            Event::End(e) => match e.local_name().as_ref() {
                b"v" => in_value = false,
                b"span" => spans.extend(current.take()),
                b"TIER" => tier = None,
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(spans)
}

fn new_span(e: &BytesStart<'_>, tier: &Option<String>) -> Result<Span> {
    Ok(Span {
        tier: tier.clone(),
        start: time_attribute(e, "start")?,
        end: time_attribute(e, "end")?,
        value: None,
    })
}

fn attribute(e: &BytesStart<'_>, name: &str) -> Result<Option<String>> {
    match e.try_get_attribute(name)? {
        Some(attr) => Ok(Some(attr.unescape_value()?.into_owned())),
        None => Ok(None),
    }
}

fn time_attribute(e: &BytesStart<'_>, name: &str) -> Result<f64> {
    let Some(value) = attribute(e, name)? else {
        bail!("span without '{}' attribute", name);
    };
    value
        .trim()
        .parse()
        .with_context(|| format!("invalid span {} time '{}'", name, value))
}

/// Categorised fragments of a tiers document, sorted by source.
pub fn categorised_fragments(xml: &str, source: &str) -> Result<Vec<Fragment>> {
    let mut fragments: Vec<Fragment> = read_spans(xml)?
        .into_iter()
        .filter_map(|span| {
            let category = span.value?;
            let parent = span.tier.unwrap_or_default();
            Some(Fragment::new(
                Source::new(source, span.start, span.end),
                Some(Category::new(normalise_label(&parent), normalise_label(&category))),
            ))
        })
        .collect();

    fragments.sort();
    Ok(fragments)
}

/// Insert uncategorised fragments wherever sorted `fragments` leave a gap,
/// starting from time zero.
pub fn fill_gaps(fragments: Vec<Fragment>) -> Vec<Fragment> {
    let mut filled = Vec::with_capacity(fragments.len());
    let mut last = 0.0;

    for fragment in fragments {
        let start = fragment.source.start;
        if start > last {
            filled.push(Fragment::new(
                Source::new(&fragment.source.filename, last, start),
                None,
            ));
        }
        last = fragment.source.end;
        filled.push(fragment);
    }

    filled
}

/// Assign timed words to the sorted `fragments` they overlap. Words after
/// the last fragment are dropped.
pub fn populate_fragments(fragments: &mut [Fragment], words: &[Span]) {
    let mut current: Option<usize> = None;

    for word in words {
        let Some(text) = word.value.as_deref().filter(|t| !t.is_empty()) else {
            continue;
        };

        let index = loop {
            match current {
                Some(i) if word.start < fragments[i].source.end => break i,
                _ => {
                    let next = current.map_or(0, |i| i + 1);
                    if next >= fragments.len() {
                        return;
                    }
                    current = Some(next);
                }
            }
        };

        let fragment = &mut fragments[index];
        if word.end > fragment.source.start && word.start < fragment.source.end {
            fragment.words.push(Word::from(text));
        }
    }
}

/// Read the fragments of one transcript.
pub fn load_group(group: &InputGroup) -> Result<Vec<Fragment>> {
    let tiers = std::fs::read_to_string(&group.tiers)
        .with_context(|| format!("Failed to read {}", group.tiers.display()))?;
    let text = std::fs::read_to_string(&group.text)
        .with_context(|| format!("Failed to read {}", group.text.display()))?;

    let fragments = categorised_fragments(&tiers, &group.name)
        .with_context(|| format!("Failed to parse {}", group.tiers.display()))?;
    let mut fragments = fill_gaps(fragments);

    let words = read_spans(&text).with_context(|| format!("Failed to parse {}", group.text.display()))?;
    populate_fragments(&mut fragments, &words);

    info!(
        transcript = %group.name,
        fragments = fragments.len(),
        words = words.len(),
        "loaded transcript"
    );
    Ok(fragments)
}

/// Read the fragments of every transcript in `groups`, in group order.
pub fn load_fragments(groups: &[InputGroup]) -> Result<Vec<Fragment>> {
    let mut fragments = Vec::new();
    for group in groups {
        fragments.extend(load_group(group)?);
    }
    Ok(fragments)
}
