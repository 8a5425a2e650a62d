//! Graphviz descriptions of related-fragment datasets.
//!
//! Fragments that no relation in the dataset leads into are drawn filled in
//! red, and the fragments they lead to in a lighter shade, so the natural
//! starting points stand out.

use anyhow::Result;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write as _;
use std::path::Path;

use transcript_relations_core::models::FragmentRef;
use transcript_relations_core::related::RelatedFragments;

use crate::outputs::write_file;

const EDGE_COLOUR: &str = "#00000011";
const START_EDGE_COLOUR: &str = "#00000077";

#[derive(Debug, Clone, Copy, Default)]
pub struct GraphOptions {
    /// Draw relations as arrows from each fragment to those it leads to.
    pub directed: bool,
    /// Label starting fragments with their source.
    pub labels: bool,
}

struct NodeStyle {
    colour: &'static str,
    fill: &'static str,
}

const START: NodeStyle = NodeStyle {
    colour: "#000000ff",
    fill: "#ff0000ff",
};
const NEAR_START: NodeStyle = NodeStyle {
    colour: "#00000077",
    fill: "#ff000033",
};
const PLAIN: NodeStyle = NodeStyle {
    colour: "#00000077",
    fill: "none",
};

/// Render `related` as a Graphviz document.
pub fn render_graph(related: &RelatedFragments, options: GraphOptions) -> Result<String> {
    let mut targets: BTreeMap<&FragmentRef, Vec<(&FragmentRef, f64)>> = BTreeMap::new();
    let mut reachable: BTreeSet<&FragmentRef> = BTreeSet::new();

    for (fragment, connections) in related {
        let entry = targets.entry(fragment).or_default();
        for connection in connections {
            let other = connection.relation(fragment)?;
            entry.push((other, connection.measure()));
            reachable.insert(other);
        }
    }

    let starts: BTreeSet<&FragmentRef> = related.keys().filter(|f| !reachable.contains(f)).collect();
    let near_starts: BTreeSet<&FragmentRef> = starts
        .iter()
        .flat_map(|f| targets.get(f).into_iter().flatten().map(|(other, _)| *other))
        .collect();

    let nodes: BTreeSet<&FragmentRef> = related.keys().chain(reachable.iter().copied()).collect();
    let ids: BTreeMap<&FragmentRef, String> = nodes
        .iter()
        .enumerate()
        .map(|(n, fragment)| (*fragment, format!("f{}", n)))
        .collect();

    let mut dot = String::new();
    let kind = if options.directed { "digraph" } else { "graph" };
    writeln!(dot, "{} fragments {{", kind)?;
    writeln!(dot, "    node [shape=ellipse];")?;

    for fragment in &nodes {
        let (style, label) = if starts.contains(fragment) {
            let label = if options.labels {
                fragment.source.to_string().replace(':', "\\n")
            } else {
                String::new()
            };
            (&START, label)
        } else if near_starts.contains(fragment) {
            (&NEAR_START, String::new())
        } else {
            (&PLAIN, String::new())
        };
        writeln!(
            dot,
            "    {} [label=\"{}\",color=\"{}\",style=filled,fillcolor=\"{}\"];",
            ids[fragment], label, style.colour, style.fill
        )?;
    }

    let mut drawn: BTreeSet<(&FragmentRef, &FragmentRef)> = BTreeSet::new();
    for (fragment, edges) in &targets {
        let colour = if starts.contains(fragment) {
            START_EDGE_COLOUR
        } else {
            EDGE_COLOUR
        };
        for (other, measure) in edges {
            if options.directed {
                writeln!(
                    dot,
                    "    {} -> {} [len=\"{:.3}\",color=\"{}\"];",
                    ids[fragment], ids[other], measure, colour
                )?;
                continue;
            }
            let pair = if fragment <= other {
                (*fragment, *other)
            } else {
                (*other, *fragment)
            };
            if drawn.insert(pair) {
                writeln!(
                    dot,
                    "    {} -- {} [len=\"{:.3}\",color=\"{}\"];",
                    ids[pair.0], ids[pair.1], measure, colour
                )?;
            }
        }
    }

    writeln!(dot, "}}")?;
    Ok(dot)
}

pub fn write_graph(related: &RelatedFragments, path: &Path, options: GraphOptions) -> Result<()> {
    let dot = render_graph(related, options)?;
    write_file(path, &dot)
}
