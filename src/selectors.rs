//! The `trel selectors` listing.

use transcript_relations_core::related::{Criterion, Selector};

fn criteria_names(criteria: &[Criterion]) -> String {
    criteria.iter().map(|c| c.name()).collect::<Vec<_>>().join(",")
}

/// Table rows: name, criteria chain, description.
pub fn selector_rows() -> Vec<(&'static str, String, &'static str)> {
    let mut rows: Vec<_> = Selector::ALL
        .iter()
        .map(|s| (s.name(), criteria_names(s.criteria()), s.description()))
        .collect();
    rows.push(("all", "(every selector above)".to_string(), "one dataset per selector"));
    rows
}

pub fn list_selectors() {
    println!("{:<14} {:<40} DESCRIPTION", "SELECTOR", "CRITERIA");
    for (name, criteria, description) in selector_rows() {
        println!("{:<14} {:<40} {}", name, criteria, description);
    }
    println!();
    println!("Selectors can be combined with commas, e.g. --select translation,rotation");
}
