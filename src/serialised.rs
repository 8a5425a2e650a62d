//! Plain-text record format for fragments and connections.
//!
//! Records are blocks of `Key: value` lines separated by blank lines. Keys
//! are right-justified to a common width when written and may carry leading
//! spaces when read.
//!
//! ```text
//!   Source: A1:0.0-4.5
//! Category: Casa-Cocina
//!     Text: Un pollo entra.
//!    Terms: pollo:NOUN:pollo "Juan de la Cruz" entrar
//!
//!      Sim: 0.2886751345948129 pollo:NOUN:pollo (1)
//!   Source: A1:0.0-4.5
//!   Source: A2:3.0-9.0
//! ```
//!
//! A term is written as `word[:tag][:normalised]`, with `word::normalised`
//! when only a normalised form exists. Words and normalised forms containing
//! spaces, colons or quotes are quoted with `"`, escaping `"` and `\` inside
//! with a backslash. A category parent containing `-` or `"` is quoted the
//! same way.

use anyhow::{anyhow, bail, Context, Result};
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;
use std::rc::Rc;
use tracing::{debug, warn};

use transcript_relations_core::connection::Connection;
use transcript_relations_core::error::RelationError;
use transcript_relations_core::models::{Category, Fragment, FragmentRef, Source, Term, Word};
use transcript_relations_core::vectors::TermVector;

/// Width of right-justified record keys.
pub const KEY_WIDTH: usize = 9;

const NO_CATEGORY: &str = "None";

// ═══════════════════════════════════════════════════════════════════════
// Formatting
// ═══════════════════════════════════════════════════════════════════════

pub fn rjust(key: &str) -> String {
    format!("{:>width$}", key, width = KEY_WIDTH)
}

fn quoted_if(s: &str, special: impl Fn(char) -> bool) -> Cow<'_, str> {
    if !s.chars().any(special) {
        return Cow::Borrowed(s);
    }

    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        if c == '"' || c == '\\' {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('"');
    Cow::Owned(out)
}

pub fn quoted(s: &str) -> Cow<'_, str> {
    quoted_if(s, |c| matches!(c, ' ' | ':' | '"'))
}

pub fn term_summary(word: &Word) -> String {
    let mut summary = quoted(word.text()).into_owned();

    match (word.tag(), word.normalised()) {
        (Some(tag), Some(normalised)) => {
            summary.push(':');
            summary.push_str(tag);
            summary.push(':');
            summary.push_str(&quoted(normalised));
        }
        (Some(tag), None) => {
            summary.push(':');
            summary.push_str(tag);
        }
        (None, Some(normalised)) => {
            summary.push_str("::");
            summary.push_str(&quoted(normalised));
        }
        (None, None) => {}
    }

    summary
}

pub fn category_label(category: Option<&Category>) -> String {
    match category {
        Some(category) => format!(
            "{}-{}",
            quoted_if(&category.parent, |c| matches!(c, '-' | '"')),
            category.category
        ),
        None => NO_CATEGORY.to_string(),
    }
}

/// `term (weight)` pairs in term order, weights in shortest round-trip form.
pub fn similarity_record(similarity: &TermVector) -> String {
    similarity
        .iter()
        .map(|(term, weight)| format!("{} ({})", term_summary(term), weight))
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn write_fragment_record(out: &mut impl Write, fragment: &Fragment) -> std::io::Result<()> {
    writeln!(out, "{} {}", rjust("Source:"), fragment.source)?;
    writeln!(out, "{} {}", rjust("Category:"), category_label(fragment.category.as_ref()))?;
    writeln!(out, "{} {}", rjust("Text:"), fragment.display_text())?;
    let terms: Vec<String> = fragment.words.iter().map(term_summary).collect();
    writeln!(out, "{} {}", rjust("Terms:"), terms.join(" "))?;
    writeln!(out)
}

pub fn write_connection_record(out: &mut impl Write, connection: &Connection) -> std::io::Result<()> {
    writeln!(
        out,
        "{} {} {}",
        rjust("Sim:"),
        connection.measure(),
        similarity_record(connection.similarity())
    )?;
    for fragment in connection.fragments() {
        writeln!(out, "{} {}", rjust("Source:"), fragment.source)?;
    }
    writeln!(out)
}

// ═══════════════════════════════════════════════════════════════════════
// Parsing
// ═══════════════════════════════════════════════════════════════════════

/// Split `content` into records of `(key, value)` pairs.
fn records(content: &str) -> Result<Vec<Vec<(&str, &str)>>> {
    let mut all = Vec::new();
    let mut current = Vec::new();

    for (number, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            if !current.is_empty() {
                all.push(std::mem::take(&mut current));
            }
            continue;
        }

        let (key, value) = line
            .split_once(": ")
            .or_else(|| line.strip_suffix(':').map(|key| (key, "")))
            .ok_or_else(|| anyhow!("line {}: expected 'Key: value'", number + 1))?;
        current.push((key.trim_start(), value));
    }

    if !current.is_empty() {
        all.push(current);
    }
    Ok(all)
}

pub fn parse_source(value: &str) -> Result<Source> {
    let (filename, period) = value
        .rsplit_once(':')
        .ok_or_else(|| anyhow!("source '{}' has no period", value))?;
    let (start, end) = period
        .split_once('-')
        .ok_or_else(|| anyhow!("source period '{}' is not start-end", period))?;
    let start: f64 = start
        .trim()
        .parse()
        .with_context(|| format!("invalid start time in source '{}'", value))?;
    let end: f64 = end
        .trim()
        .parse()
        .with_context(|| format!("invalid end time in source '{}'", value))?;
    Ok(Source::new(filename, start, end))
}

pub fn parse_category(value: &str) -> Result<Option<Category>> {
    if value == NO_CATEGORY {
        return Ok(None);
    }
    let malformed = || anyhow!("category '{}' is not of the form parent-category", value);

    if value.starts_with('"') {
        let (parent, next) = quoted_text(value, 0);
        let category = next
            .and_then(|p| value[p..].strip_prefix('-'))
            .ok_or_else(malformed)?;
        return Ok(Some(Category::new(parent, category)));
    }

    let (parent, category) = value.split_once('-').ok_or_else(malformed)?;
    Ok(Some(Category::new(parent, category)))
}

/// Text at `i`, quoted or not, and the position of the separator after it.
fn quoted_text(value: &str, i: usize) -> (Cow<'_, str>, Option<usize>) {
    let Some(rest) = value[i..].strip_prefix('"') else {
        let (text, next) = unquoted_text(value, i);
        return (Cow::Borrowed(text), next);
    };

    let mut text = String::new();
    let mut chars = rest.char_indices();
    while let Some((offset, c)) = chars.next() {
        match c {
            '\\' => {
                if let Some((_, escaped)) = chars.next() {
                    text.push(escaped);
                }
            }
            '"' => {
                let next = i + 1 + offset + 1;
                return (Cow::Owned(text), (next < value.len()).then_some(next));
            }
            _ => text.push(c),
        }
    }
    (Cow::Owned(text), None)
}

/// Text at `i` up to the next space or colon.
fn unquoted_text(value: &str, i: usize) -> (&str, Option<usize>) {
    match value[i..].find(&[' ', ':'][..]) {
        Some(offset) => (&value[i..i + offset], Some(i + offset)),
        None => (&value[i..], None),
    }
}

fn at_space(value: &str, pos: Option<usize>) -> bool {
    pos.map_or(true, |p| value[p..].starts_with(' '))
}

/// Parse one term starting at `pos`, returning it with the position of the
/// separator that ended it.
fn term_at(value: &str, pos: usize) -> (Word, Option<usize>) {
    let (text, next) = quoted_text(value, pos);
    let mut term = Term::new(text);

    let next = match next {
        Some(p) if !at_space(value, Some(p)) => {
            let (tag, after_tag) = unquoted_text(value, p + 1);
            term.tag = (!tag.is_empty()).then(|| tag.to_string());

            match after_tag {
                Some(q) if !at_space(value, Some(q)) => {
                    let (normalised, after) = quoted_text(value, q + 1);
                    term.normalised = (!normalised.is_empty()).then(|| normalised.to_string());
                    after
                }
                other => other,
            }
        }
        other => other,
    };

    let word = if term.tag.is_none() && term.normalised.is_none() {
        Word::Plain(term.word)
    } else {
        Word::Tagged(term)
    };
    (word, next)
}

pub fn parse_terms(value: &str) -> Vec<Word> {
    let mut words = Vec::new();
    let mut i = 0;

    while i < value.len() {
        let (word, next) = term_at(value, i);
        if !word.text().is_empty() {
            words.push(word);
        }
        match next {
            Some(n) => i = n + 1,
            None => break,
        }
    }

    words
}

/// Parse `measure term (weight) ...`; the measure is recomputed on load.
pub fn parse_similarity(value: &str) -> TermVector {
    let mut similarity = TermVector::new();
    let Some((_, details)) = value.trim().split_once(char::is_whitespace) else {
        return similarity;
    };
    let details = details.trim_start();

    let mut i = 0;
    while i < details.len() {
        let (term, next) = term_at(details, i);
        let Some(next) = next else { break };

        let (Some(open), Some(close)) = (details[next..].find('('), details[next..].find(')')) else {
            break;
        };
        if open >= close {
            break;
        }
        let Ok(weight) = details[next + open + 1..next + close].parse::<f64>() else {
            break;
        };

        similarity.insert(term, weight);
        i = next + close + 2;
    }

    similarity
}

/// Restore fragments from fragment records.
pub fn parse_fragments(content: &str) -> Result<Vec<Fragment>> {
    let mut fragments = Vec::new();

    for (index, record) in records(content)?.into_iter().enumerate() {
        let mut source = None;
        let mut category = None;
        let mut text = None;
        let mut words = Vec::new();

        for (key, value) in record {
            match key {
                "Source" => source = Some(parse_source(value)?),
                "Category" => category = parse_category(value)?,
                "Text" => text = Some(value.to_string()),
                "Terms" => words = parse_terms(value),
                other => debug!(key = other, "ignoring unknown fragment key"),
            }
        }

        let source = source.ok_or_else(|| anyhow!("fragment record {} has no Source", index + 1))?;
        let mut fragment = Fragment::with_words(source, category, words);
        fragment.text = text;
        fragments.push(fragment);
    }

    Ok(fragments)
}

/// Restore connections from connection records, linking their endpoints to
/// `fragments` by source. Records that cannot be linked are skipped.
pub fn parse_connections(content: &str, fragments: &[FragmentRef]) -> Result<Vec<Connection>> {
    let by_source: BTreeMap<&Source, &FragmentRef> = fragments.iter().map(|f| (&f.source, f)).collect();
    let mut connections = Vec::new();

    for (index, record) in records(content)?.into_iter().enumerate() {
        let mut similarity = TermVector::new();
        let mut endpoints = Vec::with_capacity(2);
        let mut unresolved = false;

        for (key, value) in record {
            match key {
                "Sim" => similarity = parse_similarity(value),
                "Source" => {
                    let source = parse_source(value)?;
                    match by_source.get(&source) {
                        Some(fragment) => endpoints.push(Rc::clone(fragment)),
                        None => {
                            warn!(record = index + 1, source = %source, "connection endpoint not found");
                            unresolved = true;
                        }
                    }
                }
                other => debug!(key = other, "ignoring unknown connection key"),
            }
        }

        if unresolved {
            continue;
        }

        match Connection::from_fragments(similarity, endpoints) {
            Ok(connection) => connections.push(connection),
            Err(err @ RelationError::InvalidArity(_)) => {
                warn!(record = index + 1, "skipping connection: {}", err);
            }
            Err(err) => {
                debug!(record = index + 1, "skipping connection: {}", err);
            }
        }
    }

    Ok(connections)
}

pub fn read_fragments(path: &Path) -> Result<Vec<Fragment>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read fragments: {}", path.display()))?;
    parse_fragments(&content).with_context(|| format!("Failed to parse fragments: {}", path.display()))
}

pub fn read_connections(path: &Path, fragments: &[FragmentRef]) -> Result<Vec<Connection>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read connections: {}", path.display()))?;
    parse_connections(&content, fragments)
        .with_context(|| format!("Failed to parse connections: {}", path.display()))
}

/// Reject a record file that parsed to nothing.
pub fn ensure_nonempty<T>(items: &[T], what: &str, path: &Path) -> Result<()> {
    if items.is_empty() {
        bail!("no {} found in {}", what, path.display());
    }
    Ok(())
}
