//! Connections between fragments and the pairwise comparator.
//!
//! A [`Connection`] links exactly two fragments that share at least one
//! term. Its `similarity` is the combined term vector of the pair, and its
//! [`measure`](Connection::measure) is computed lazily from the endpoints'
//! vectors and cached until the similarity is replaced.
//!
//! [`compare_fragments`] enumerates candidate pairs, either every unordered
//! pair or only pairs sharing a term according to a [`TermIndex`], and
//! returns the qualifying connections in ascending measure order.

use std::cell::OnceCell;
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::hash::{Hash, Hasher};
use std::rc::Rc;

use crate::error::RelationError;
use crate::models::{Category, Fragment, FragmentRef};
use crate::stats::TermIndex;
use crate::vectors::{self, TermVector, Weights};

/// Shared handle to a connection held by several relation lists.
pub type ConnectionRef = Rc<Connection>;

#[derive(Debug, Clone)]
pub struct Connection {
    similarity: TermVector,
    fragments: [FragmentRef; 2],
    measure: OnceCell<f64>,
}

impl Connection {
    /// Link two fragments.
    ///
    /// Fails when `similarity` is empty or when either endpoint has a
    /// zero-magnitude term vector, so that [`measure`](Self::measure) is
    /// always defined.
    pub fn new(similarity: TermVector, fragments: [FragmentRef; 2]) -> Result<Self, RelationError> {
        if similarity.is_empty() {
            return Err(RelationError::EmptySimilarity);
        }
        for fragment in &fragments {
            if vectors::magnitude(&fragment.term_vector()) == 0.0 {
                return Err(RelationError::DegenerateVector {
                    fragment: fragment.source.to_string(),
                });
            }
        }

        Ok(Self {
            similarity,
            fragments,
            measure: OnceCell::new(),
        })
    }

    /// Link the fragments of a collection that must hold exactly two.
    pub fn from_fragments(similarity: TermVector, fragments: Vec<FragmentRef>) -> Result<Self, RelationError> {
        let fragments: [FragmentRef; 2] = fragments
            .try_into()
            .map_err(|rejected: Vec<FragmentRef>| RelationError::InvalidArity(rejected.len()))?;
        Self::new(similarity, fragments)
    }

    pub fn similarity(&self) -> &TermVector {
        &self.similarity
    }

    pub fn fragments(&self) -> &[FragmentRef; 2] {
        &self.fragments
    }

    /// Connection strength, computed on first use.
    pub fn measure(&self) -> f64 {
        *self.measure.get_or_init(|| self.compute_measure())
    }

    fn compute_measure(&self) -> f64 {
        let a = self.fragments[0].term_vector();
        let b = self.fragments[1].term_vector();
        // Construction rejects zero-magnitude endpoints.
        vectors::measure(&[&a, &b], Some(&self.similarity)).unwrap_or(0.0)
    }

    /// Replace the similarity detail and drop the cached measure.
    pub fn set_similarity(&mut self, similarity: TermVector) -> Result<(), RelationError> {
        if similarity.is_empty() {
            return Err(RelationError::EmptySimilarity);
        }
        self.similarity = similarity;
        self.measure = OnceCell::new();
        Ok(())
    }

    /// Multiply the current measure by `factor`.
    pub fn scale_measure(&mut self, factor: f64) {
        let scaled = self.measure() * factor;
        self.measure = OnceCell::from(scaled);
    }

    /// The endpoint other than `fragment`.
    pub fn relation(&self, fragment: &Fragment) -> Result<&FragmentRef, RelationError> {
        let [a, b] = &self.fragments;
        if **a == *fragment {
            Ok(b)
        } else if **b == *fragment {
            Ok(a)
        } else {
            Err(RelationError::NotInConnection {
                fragment: fragment.source.to_string(),
            })
        }
    }

    pub fn contains(&self, fragment: &Fragment) -> bool {
        self.fragments.iter().any(|f| **f == *fragment)
    }

    fn endpoints(&self) -> (&Fragment, &Fragment) {
        let [a, b] = &self.fragments;
        if a <= b {
            (&**a, &**b)
        } else {
            (&**b, &**a)
        }
    }

    /// Ordering by measure, then similarity detail, then endpoints.
    pub fn cmp_by_measure(&self, other: &Self) -> Ordering {
        self.measure()
            .total_cmp(&other.measure())
            .then_with(|| cmp_vectors(&self.similarity, &other.similarity))
            .then_with(|| self.endpoints().cmp(&other.endpoints()))
    }
}

fn cmp_vectors(a: &TermVector, b: &TermVector) -> Ordering {
    for ((wa, va), (wb, vb)) in a.iter().zip(b.iter()) {
        let ordering = wa.cmp(wb).then(va.total_cmp(vb));
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    a.len().cmp(&b.len())
}

impl PartialEq for Connection {
    fn eq(&self, other: &Self) -> bool {
        self.endpoints() == other.endpoints()
    }
}

impl Eq for Connection {}

impl Hash for Connection {
    fn hash<H: Hasher>(&self, state: &mut H) {
        let (a, b) = self.endpoints();
        a.hash(state);
        b.hash(state);
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Comparator
// ═══════════════════════════════════════════════════════════════════════

/// Combined similarity of a fragment pair.
pub fn get_fragment_similarity(f1: &Fragment, f2: &Fragment, idf: Option<&Weights>) -> TermVector {
    vectors::combine_term_vectors(&f1.term_vector(), &f2.term_vector(), idf)
}

/// Candidate pairs for comparison.
///
/// Without an index every unordered pair is returned. With a non-empty index
/// each fragment is paired with the fragments sharing one of its terms whose
/// source sorts strictly after its own.
pub fn get_fragment_pairs(
    fragments: &[FragmentRef],
    terms_to_fragments: Option<&TermIndex>,
) -> Vec<(FragmentRef, FragmentRef)> {
    let mut pairs = Vec::new();

    match terms_to_fragments {
        Some(index) if !index.is_empty() => {
            for f1 in fragments {
                let mut others = BTreeSet::new();
                for term in f1.words.iter().collect::<BTreeSet<_>>() {
                    let Some(candidates) = index.get(term) else {
                        continue;
                    };
                    for f2 in candidates {
                        if f1.source < f2.source {
                            others.insert(f2.clone());
                        }
                    }
                }
                pairs.extend(others.into_iter().map(|f2| (f1.clone(), f2)));
            }
        }
        _ => {
            for (i, f1) in fragments.iter().enumerate() {
                for f2 in &fragments[i + 1..] {
                    pairs.push((f1.clone(), f2.clone()));
                }
            }
        }
    }

    pairs
}

/// Compare fragments pairwise, returning connections in ascending order.
///
/// Pairs without a shared term produce no connection.
pub fn compare_fragments(
    fragments: &[FragmentRef],
    idf: Option<&Weights>,
    terms_to_fragments: Option<&TermIndex>,
) -> Vec<Connection> {
    let mut connections: Vec<Connection> = get_fragment_pairs(fragments, terms_to_fragments)
        .into_iter()
        .filter_map(|(f1, f2)| {
            let similarity = get_fragment_similarity(&f1, &f2, idf);
            if similarity.is_empty() {
                return None;
            }
            Connection::new(similarity, [f1, f2]).ok()
        })
        .collect();

    connections.sort_by(Connection::cmp_by_measure);
    connections
}

/// Recompute each connection's similarity from its endpoints' current
/// vectors, dropping connections with nothing left in common.
pub fn recompute_connections(connections: Vec<Connection>, idf: Option<&Weights>) -> Vec<Connection> {
    connections
        .into_iter()
        .filter_map(|mut connection| {
            let [a, b] = connection.fragments();
            let similarity = get_fragment_similarity(a, b, idf);
            connection.set_similarity(similarity).ok()?;
            (connection.measure() != 0.0).then_some(connection)
        })
        .collect()
}

/// Scale each connection's measure by the weights of its endpoints'
/// categories. Uncategorised endpoints and absent or zero weights are
/// neutral.
pub fn scale_connections(connections: &mut [Connection], category_weights: &BTreeMap<Category, f64>) {
    for connection in connections.iter_mut() {
        let factor: f64 = connection
            .fragments()
            .iter()
            .map(|f| {
                f.category
                    .as_ref()
                    .and_then(|c| category_weights.get(c))
                    .copied()
                    .filter(|w| *w != 0.0)
                    .unwrap_or(1.0)
            })
            .product();
        connection.scale_measure(factor);
    }
}

/// Freeze connections for sharing.
pub fn into_refs(connections: Vec<Connection>) -> Vec<ConnectionRef> {
    connections.into_iter().map(Rc::new).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{into_refs as fragment_refs, Source, Word};
    use crate::stats;
    use std::collections::HashSet;

    fn fragment(name: &str, start: f64, category: Option<Category>, words: &[&str]) -> Fragment {
        Fragment::with_words(
            Source::new(name, start, start + 10.0),
            category,
            words.iter().map(|w| Word::from(*w)).collect(),
        )
    }

    fn sim(entries: &[(&str, f64)]) -> TermVector {
        entries.iter().map(|(w, v)| (Word::from(*w), *v)).collect()
    }

    fn sentences() -> Vec<FragmentRef> {
        let c1 = Some(Category::new("Topic", "C1"));
        let c2 = Some(Category::new("Topic", "C2"));
        fragment_refs(vec![
            fragment("A1", 0.0, c1.clone(), &["un", "pollo", "entra"]),
            fragment("A1", 10.0, c2.clone(), &["en", "una", "casa"]),
            fragment("A2", 0.0, c1.clone(), &["el", "pobre", "pollo", "cree"]),
            fragment("A2", 10.0, c2, &["la", "casa", "es", "grande"]),
            fragment("A3", 0.0, c1, &["nada", "en", "común"]),
            fragment("A3", 10.0, None, &[]),
        ])
    }

    #[test]
    fn example_pair_connection() {
        let fragments = sentences();
        let connection = Connection::new(sim(&[("pollo", 1.0)]), [fragments[0].clone(), fragments[2].clone()]).unwrap();
        let expected = 1.0 / (3f64.sqrt() * 4f64.sqrt());
        assert!((connection.measure() - expected).abs() < 1e-12);
        assert_eq!(get_fragment_similarity(&fragments[0], &fragments[2], None), sim(&[("pollo", 1.0)]));
    }

    #[test]
    fn similarity_is_symmetric() {
        let fragments = sentences();
        for a in &fragments {
            for b in &fragments {
                assert_eq!(get_fragment_similarity(a, b, None), get_fragment_similarity(b, a, None));
            }
        }
    }

    #[test]
    fn arity_is_checked() {
        let fragments = sentences();
        let err = Connection::from_fragments(sim(&[("pollo", 1.0)]), vec![fragments[0].clone()]).unwrap_err();
        assert_eq!(err, RelationError::InvalidArity(1));

        let err = Connection::from_fragments(sim(&[("pollo", 1.0)]), fragments[..3].to_vec()).unwrap_err();
        assert_eq!(err, RelationError::InvalidArity(3));

        assert!(Connection::from_fragments(sim(&[("pollo", 1.0)]), fragments[..2].to_vec()).is_ok());
    }

    #[test]
    fn empty_similarity_and_empty_fragments_are_rejected() {
        let fragments = sentences();
        let err = Connection::new(TermVector::new(), [fragments[0].clone(), fragments[2].clone()]).unwrap_err();
        assert_eq!(err, RelationError::EmptySimilarity);

        let err = Connection::new(sim(&[("x", 1.0)]), [fragments[0].clone(), fragments[5].clone()]).unwrap_err();
        assert!(matches!(err, RelationError::DegenerateVector { .. }));
    }

    #[test]
    fn relation_returns_other_endpoint() {
        let fragments = sentences();
        let connection = Connection::new(sim(&[("pollo", 1.0)]), [fragments[0].clone(), fragments[2].clone()]).unwrap();
        assert_eq!(connection.relation(&fragments[0]).unwrap(), &fragments[2]);
        assert_eq!(connection.relation(&fragments[2]).unwrap(), &fragments[0]);
        assert!(matches!(
            connection.relation(&fragments[1]),
            Err(RelationError::NotInConnection { .. })
        ));
    }

    #[test]
    fn equality_ignores_endpoint_order() {
        let fragments = sentences();
        let a = Connection::new(sim(&[("pollo", 1.0)]), [fragments[0].clone(), fragments[2].clone()]).unwrap();
        let b = Connection::new(sim(&[("pollo", 2.0)]), [fragments[2].clone(), fragments[0].clone()]).unwrap();
        assert_eq!(a, b);

        let set: HashSet<_> = [a, b].into_iter().collect();
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn unrelated_fragments_produce_no_connection() {
        let fragments = sentences();
        let connections = compare_fragments(&fragments, None, None);
        assert!(connections.iter().all(|c| !c.similarity().is_empty()));
        assert!(!connections.iter().any(|c| c.contains(&fragments[5])));
        assert!(!connections
            .iter()
            .any(|c| c.contains(&fragments[0]) && c.contains(&fragments[1])));
    }

    #[test]
    fn connections_are_sorted_ascending() {
        let fragments = sentences();
        let connections = compare_fragments(&fragments, None, None);
        assert_eq!(connections.len(), 3);
        for pair in connections.windows(2) {
            assert!(pair[0].measure() <= pair[1].measure());
        }
        for c in &connections {
            assert!(c.measure().is_finite() && c.measure() > 0.0);
        }
    }

    #[test]
    fn indexed_pairs_match_unindexed_pairs() {
        let fragments = sentences();
        let index = stats::term_index(&fragments);

        let unindexed: HashSet<Connection> = compare_fragments(&fragments, None, None).into_iter().collect();
        let indexed: HashSet<Connection> = compare_fragments(&fragments, None, Some(&index)).into_iter().collect();
        assert_eq!(unindexed, indexed);

        let pairs = get_fragment_pairs(&fragments, Some(&index));
        assert!(pairs.iter().all(|(a, b)| a.source < b.source));
    }

    #[test]
    fn recompute_drops_connections_without_shared_terms() {
        let fragments = sentences();
        let connections = compare_fragments(&fragments, None, None);

        let mut filtered: Vec<Fragment> = fragments.iter().map(|f| (**f).clone()).collect();
        for f in &mut filtered {
            f.words.retain(|w| w != "pollo");
        }
        let filtered = fragment_refs(filtered);

        let relinked: Vec<Connection> = connections
            .iter()
            .map(|c| {
                let [a, b] = c.fragments();
                let a = filtered.iter().find(|f| f.source == a.source).unwrap().clone();
                let b = filtered.iter().find(|f| f.source == b.source).unwrap().clone();
                Connection::new(c.similarity().clone(), [a, b]).unwrap()
            })
            .collect();

        let recomputed = recompute_connections(relinked, None);
        assert_eq!(recomputed.len(), 2);
        assert!(recomputed.iter().all(|c| !c.similarity().contains_key(&Word::from("pollo"))));
    }

    #[test]
    fn category_weights_scale_measures() {
        let fragments = sentences();
        let mut connections = compare_fragments(&fragments, None, None);
        let before: Vec<f64> = connections.iter().map(Connection::measure).collect();

        let mut weights = BTreeMap::new();
        weights.insert(Category::new("Topic", "C1"), 2.0);
        scale_connections(&mut connections, &weights);

        for (c, m) in connections.iter().zip(before) {
            let factor: f64 = c
                .fragments()
                .iter()
                .map(|f| if f.category == Some(Category::new("Topic", "C1")) { 2.0 } else { 1.0 })
                .product();
            assert!((c.measure() - m * factor).abs() < 1e-12);
        }
    }
}
