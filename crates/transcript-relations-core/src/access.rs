//! Reachability over curated relations.
//!
//! Selected relation datasets are merged into one directed [`Adjacency`]
//! (fragment to the fragments it leads to). From it we derive the set of
//! fragments reachable from each fragment, the inverse "accessed from"
//! mapping, and the fragments nothing leads into.

use std::collections::{BTreeMap, BTreeSet};

use crate::error::RelationError;
use crate::models::FragmentRef;
use crate::related::RelatedFragments;

/// Fragment to the fragments it leads to.
pub type Adjacency = BTreeMap<FragmentRef, BTreeSet<FragmentRef>>;

/// Outgoing edges of one relation dataset.
pub fn related_adjacency(related: &RelatedFragments) -> Result<Adjacency, RelationError> {
    combine_related_fragments(&[related])
}

/// Union several relation datasets into one adjacency.
pub fn combine_related_fragments(all_related: &[&RelatedFragments]) -> Result<Adjacency, RelationError> {
    let mut combined = Adjacency::new();
    for related in all_related {
        for (fragment, connections) in related.iter() {
            let targets = combined.entry(fragment.clone()).or_default();
            for connection in connections {
                targets.insert(connection.relation(fragment)?.clone());
            }
        }
    }
    Ok(combined)
}

/// Invert `adjacency`: each fragment to the fragments leading into it.
pub fn get_accessing_fragments(adjacency: &Adjacency) -> Adjacency {
    let mut accessing = Adjacency::new();
    for (fragment, targets) in adjacency {
        for target in targets {
            accessing.entry(target.clone()).or_default().insert(fragment.clone());
        }
    }
    accessing
}

/// Every fragment reachable from `fragment`.
///
/// The start fragment is included only when a cycle leads back to it.
pub fn find_all_fragments(fragment: &FragmentRef, adjacency: &Adjacency) -> BTreeSet<FragmentRef> {
    let mut visited = BTreeSet::new();
    let mut stack = vec![fragment.clone()];

    while let Some(current) = stack.pop() {
        let Some(targets) = adjacency.get(&current) else {
            continue;
        };
        for target in targets {
            if visited.insert(target.clone()) {
                stack.push(target.clone());
            }
        }
    }

    visited
}

/// Reachable set for each of `fragments`.
pub fn find_accessibility(
    fragments: &[FragmentRef],
    adjacency: &Adjacency,
) -> BTreeMap<FragmentRef, BTreeSet<FragmentRef>> {
    fragments
        .iter()
        .map(|f| (f.clone(), find_all_fragments(f, adjacency)))
        .collect()
}

/// Fragments that no relation leads into.
pub fn unreachable_fragments(fragments: &[FragmentRef], accessing: &Adjacency) -> BTreeSet<FragmentRef> {
    fragments
        .iter()
        .filter(|f| !accessing.contains_key(*f))
        .cloned()
        .collect()
}
