//! Related-fragment index and selection.
//!
//! The index maps every fragment to the connections touching it. After
//! [`sort_related_fragments`] each list runs from the strongest connection
//! to the weakest, and [`select_related_fragments`] walks those lists
//! keeping only candidates accepted by every [`Criterion`] in a chain.
//!
//! Criteria chains are requested by name through [`Selector`]s:
//!
//! | Selector | Criteria |
//! |----------|----------|
//! | `translation` | distinct participant |
//! | `rotation` | distinct subcategory of the same parent |
//! | `monologue` | same participant, distinct category |
//! | `any` | unconditional |
//!
//! A comma-joined name such as `translation,rotation` concatenates the
//! chains; the name `all` requests one dataset per registered selector.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::connection::ConnectionRef;
use crate::error::RelationError;
use crate::models::{Fragment, FragmentRef};

/// Fragment to the connections touching it.
pub type RelatedFragments = BTreeMap<FragmentRef, Vec<ConnectionRef>>;

/// Register every connection under both of its endpoints, keeping the
/// order of `connections`.
pub fn get_related_fragments(connections: &[ConnectionRef]) -> RelatedFragments {
    let mut related = RelatedFragments::new();
    for connection in connections {
        for fragment in connection.fragments() {
            related.entry(fragment.clone()).or_default().push(connection.clone());
        }
    }
    related
}

/// Order each fragment's connections by descending measure.
pub fn sort_related_fragments(related: &mut RelatedFragments) {
    for connections in related.values_mut() {
        connections.sort_by(|a, b| b.measure().total_cmp(&a.measure()));
    }
}

/// A predicate on a candidate fragment given the fragments already
/// represented for a seed (the seed first).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Criterion {
    DistinctParticipant,
    SameParticipant,
    DistinctSubcategory,
    DistinctCategory,
    Any,
}

impl Criterion {
    pub fn accepts(self, candidate: &Fragment, represented: &[FragmentRef]) -> bool {
        match self {
            Criterion::DistinctParticipant => {
                let participant = candidate.source.participant();
                !represented.iter().any(|f| f.source.participant() == participant)
            }
            Criterion::SameParticipant => represented
                .first()
                .map_or(true, |seed| seed.source.participant() == candidate.source.participant()),
            Criterion::DistinctSubcategory => {
                let seed_parent = represented
                    .first()
                    .and_then(|seed| seed.category.as_ref())
                    .map(|c| c.parent.as_str())
                    .filter(|p| !p.is_empty());
                // A seed without a parent places no constraint.
                match seed_parent {
                    Some(parent) => {
                        candidate.category.as_ref().is_some_and(|c| c.parent == parent)
                            && !category_represented(candidate, represented)
                    }
                    None => true,
                }
            }
            Criterion::DistinctCategory => !category_represented(candidate, represented),
            Criterion::Any => true,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Criterion::DistinctParticipant => "distinct-participant",
            Criterion::SameParticipant => "same-participant",
            Criterion::DistinctSubcategory => "distinct-subcategory",
            Criterion::DistinctCategory => "distinct-category",
            Criterion::Any => "any",
        }
    }
}

fn category_represented(candidate: &Fragment, represented: &[FragmentRef]) -> bool {
    represented.iter().any(|f| f.category == candidate.category)
}

/// Named criteria chains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Selector {
    Translation,
    Rotation,
    Monologue,
    Any,
}

impl Selector {
    /// Every registered selector, in the order `all` expands to.
    pub const ALL: [Selector; 4] = [
        Selector::Translation,
        Selector::Rotation,
        Selector::Monologue,
        Selector::Any,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Selector::Translation => "translation",
            Selector::Rotation => "rotation",
            Selector::Monologue => "monologue",
            Selector::Any => "any",
        }
    }

    pub fn criteria(self) -> &'static [Criterion] {
        match self {
            Selector::Translation => &[Criterion::DistinctParticipant],
            Selector::Rotation => &[Criterion::DistinctSubcategory],
            Selector::Monologue => &[Criterion::SameParticipant, Criterion::DistinctCategory],
            Selector::Any => &[Criterion::Any],
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Selector::Translation => "the same material told by other participants",
            Selector::Rotation => "other subcategories of the same topic",
            Selector::Monologue => "the same participant on other categories",
            Selector::Any => "the most similar fragments, unconstrained",
        }
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Selector {
    type Err = RelationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Selector::ALL
            .into_iter()
            .find(|selector| selector.name() == s)
            .ok_or_else(|| RelationError::UnknownSelector(s.to_string()))
    }
}

/// Resolve a comma-separated list of selector names into one criteria chain.
pub fn resolve_criteria(names: &str) -> Result<Vec<Criterion>, RelationError> {
    let mut criteria = Vec::new();
    for name in names.split(',').map(str::trim) {
        let selector: Selector = name.parse()?;
        criteria.extend_from_slice(selector.criteria());
    }
    Ok(criteria)
}

/// Resolve requested selections into labelled criteria chains, expanding
/// `all` into every registered selector.
pub fn resolve_selections<S: AsRef<str>>(requests: &[S]) -> Result<Vec<(String, Vec<Criterion>)>, RelationError> {
    let mut resolved = Vec::new();
    for request in requests {
        let request = request.as_ref().trim();
        if request == "all" {
            for selector in Selector::ALL {
                resolved.push((selector.name().to_string(), selector.criteria().to_vec()));
            }
        } else {
            resolved.push((request.to_string(), resolve_criteria(request)?));
        }
    }
    Ok(resolved)
}

/// Select up to `num - 1` related connections per fragment.
///
/// Each fragment's connections are walked in order. A connection is kept
/// when its other endpoint is not yet represented and every criterion
/// accepts it; selection stops once `num` fragments, the seed included, are
/// represented. Fragments for which nothing is selected are left out.
pub fn select_related_fragments(
    related: &RelatedFragments,
    num: usize,
    criteria: &[Criterion],
) -> Result<RelatedFragments, RelationError> {
    let mut selected_related = RelatedFragments::new();

    for (fragment, connections) in related {
        let mut represented: Vec<FragmentRef> = vec![fragment.clone()];
        let mut selected = Vec::new();

        for connection in connections {
            if represented.len() >= num {
                break;
            }
            let candidate = connection.relation(fragment)?;
            if represented.contains(candidate) {
                continue;
            }
            if criteria.iter().all(|c| c.accepts(candidate, &represented)) {
                represented.push(candidate.clone());
                selected.push(connection.clone());
            }
        }

        if !selected.is_empty() {
            selected_related.insert(fragment.clone(), selected);
        }
    }

    Ok(selected_related)
}

/// Related fragments from distinct participants.
pub fn select_related_fragments_by_participant(
    related: &RelatedFragments,
    num: usize,
) -> Result<RelatedFragments, RelationError> {
    select_related_fragments(related, num, Selector::Translation.criteria())
}

/// Related fragments from distinct subcategories of the same parent.
pub fn select_related_fragments_by_category(
    related: &RelatedFragments,
    num: usize,
) -> Result<RelatedFragments, RelationError> {
    select_related_fragments(related, num, Selector::Rotation.criteria())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::{compare_fragments, into_refs as connection_refs};
    use crate::models::{into_refs, Category, Source, Word};
    use std::collections::BTreeSet;

    fn fragment(name: &str, start: f64, category: (&str, &str), words: &str) -> Fragment {
        Fragment::with_words(
            Source::new(name, start, start + 5.0),
            Some(Category::new(category.0, category.1)),
            words.split_whitespace().map(Word::from).collect(),
        )
    }

    fn corpus() -> Vec<FragmentRef> {
        into_refs(vec![
            fragment("A1_story", 0.0, ("Chicken", "Enters"), "pollo entra casa"),
            fragment("A1_story", 5.0, ("Chicken", "Falls"), "pollo cae casa suelo"),
            fragment("A1_story", 10.0, ("Fox", "Arrives"), "zorro pollo"),
            fragment("A2_story", 0.0, ("Chicken", "Enters"), "pollo entra casa grande"),
            fragment("A2_story", 5.0, ("Chicken", "Falls"), "pollo cae"),
            fragment("A3_story", 0.0, ("Chicken", "Enters"), "pollo entra"),
            fragment("A3_story", 5.0, ("Fox", "Arrives"), "zorro llega casa"),
        ])
    }

    fn related() -> RelatedFragments {
        let connections = connection_refs(compare_fragments(&corpus(), None, None));
        let mut related = get_related_fragments(&connections);
        sort_related_fragments(&mut related);
        related
    }

    #[test]
    fn index_registers_both_endpoints() {
        let connections = connection_refs(compare_fragments(&corpus(), None, None));
        let related = get_related_fragments(&connections);
        let total: usize = related.values().map(Vec::len).sum();
        assert_eq!(total, connections.len() * 2);
        for (fragment, list) in &related {
            assert!(list.iter().all(|c| c.contains(fragment)));
        }
    }

    #[test]
    fn sorted_descending() {
        for list in related().values() {
            for pair in list.windows(2) {
                assert!(pair[0].measure() >= pair[1].measure());
            }
        }
    }

    #[test]
    fn distinct_participants_are_selected() {
        let selected = select_related_fragments_by_participant(&related(), 3).unwrap();
        assert!(!selected.is_empty());
        for (fragment, connections) in &selected {
            assert!(connections.len() <= 2);
            let mut participants = BTreeSet::new();
            participants.insert(fragment.source.participant().to_string());
            for c in connections {
                let other = c.relation(fragment).unwrap();
                assert!(participants.insert(other.source.participant().to_string()));
            }
            assert!(participants.len() <= 3);
        }
    }

    #[test]
    fn rotation_stays_within_parent() {
        let selected = select_related_fragments_by_category(&related(), 4).unwrap();
        for (fragment, connections) in &selected {
            let parent = &fragment.category.as_ref().unwrap().parent;
            let mut categories = vec![fragment.category.clone()];
            for c in connections {
                let other = c.relation(fragment).unwrap();
                assert_eq!(&other.category.as_ref().unwrap().parent, parent);
                assert!(!categories.contains(&other.category));
                categories.push(other.category.clone());
            }
        }
    }

    #[test]
    fn subcategory_without_seed_parent_accepts_anything() {
        let seed = into_refs(vec![Fragment::new(Source::new("A1", 0.0, 5.0), None)]);
        let repeat = Fragment::new(Source::new("A2", 0.0, 5.0), None);
        assert!(Criterion::DistinctSubcategory.accepts(&repeat, &seed));

        let seed = into_refs(vec![fragment("A1", 0.0, ("Chicken", "Enters"), "pollo")]);
        let same = fragment("A2", 0.0, ("Chicken", "Enters"), "pollo");
        let sibling = fragment("A2", 5.0, ("Chicken", "Falls"), "pollo");
        let other = fragment("A3", 0.0, ("Fox", "Falls"), "pollo");
        assert!(!Criterion::DistinctSubcategory.accepts(&same, &seed));
        assert!(Criterion::DistinctSubcategory.accepts(&sibling, &seed));
        assert!(!Criterion::DistinctSubcategory.accepts(&other, &seed));
    }

    #[test]
    fn monologue_keeps_the_speaker() {
        let selected = select_related_fragments(&related(), 4, Selector::Monologue.criteria()).unwrap();
        for (fragment, connections) in &selected {
            for c in connections {
                let other = c.relation(fragment).unwrap();
                assert_eq!(other.source.participant(), fragment.source.participant());
                assert_ne!(other.category, fragment.category);
            }
        }
    }

    #[test]
    fn selection_respects_num() {
        let related = related();
        let selected = select_related_fragments(&related, 2, &[Criterion::Any]).unwrap();
        for (fragment, connections) in &selected {
            assert_eq!(connections.len(), 1);
            assert!(std::rc::Rc::ptr_eq(&connections[0], &related[fragment][0]));
        }

        let none = select_related_fragments(&related, 1, &[Criterion::Any]).unwrap();
        assert!(none.is_empty());
    }

    #[test]
    fn selection_is_deterministic() {
        let related = related();
        let criteria = resolve_criteria("translation,rotation").unwrap();
        let first = select_related_fragments(&related, 4, &criteria).unwrap();
        let second = select_related_fragments(&related, 4, &criteria).unwrap();
        assert_eq!(first.len(), second.len());
        for ((fa, ca), (fb, cb)) in first.iter().zip(second.iter()) {
            assert_eq!(fa, fb);
            assert_eq!(ca, cb);
        }
    }

    #[test]
    fn names_resolve_to_chains() {
        assert_eq!(
            resolve_criteria("translation, rotation").unwrap(),
            vec![Criterion::DistinctParticipant, Criterion::DistinctSubcategory]
        );
        assert_eq!(
            resolve_criteria("bogus"),
            Err(RelationError::UnknownSelector("bogus".into()))
        );

        let all = resolve_selections(&["all"]).unwrap();
        let labels: Vec<&str> = all.iter().map(|(label, _)| label.as_str()).collect();
        assert_eq!(labels, ["translation", "rotation", "monologue", "any"]);

        let mixed = resolve_selections(&["translation,any", "rotation"]).unwrap();
        assert_eq!(mixed[0].0, "translation,any");
        assert_eq!(mixed[0].1, vec![Criterion::DistinctParticipant, Criterion::Any]);
    }
}
