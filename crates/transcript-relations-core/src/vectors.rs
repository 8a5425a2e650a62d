//! Term vector engine.
//!
//! A term vector maps each distinct [`Word`] of a fragment to a weight:
//! its occurrence count in frequency mode, or `1` in presence mode. Vectors
//! may then be scaled by a weight map (usually inverse document
//! frequencies) and combined pairwise into a similarity mapping.
//!
//! Combination is multiplicative over the *intersection* of the vectors'
//! terms, so a term present in only one fragment contributes nothing. The
//! strength of a combination is a cosine-like [`measure`]:
//!
//! ```text
//! measure = Σ combined / Π |v|        |v| = sqrt(Σ x²)
//! ```
//!
//! Presence mode combined with no IDF reduces the numerator to the number
//! of shared terms, which is the plain intersection-count variant.

use std::collections::BTreeMap;

use crate::error::VectorError;
use crate::models::Word;

/// Term weights of one fragment.
pub type TermVector = BTreeMap<Word, f64>;

/// Per-term weighting (IDF or similar).
pub type Weights = BTreeMap<Word, f64>;

/// Build a vector from `words`: counts when `frequencies` is true,
/// presence (each distinct word weighted 1) otherwise.
pub fn term_vector(words: &[Word], frequencies: bool) -> TermVector {
    let mut vector = TermVector::new();
    for word in words {
        let weight = vector.entry(word.clone()).or_insert(0.0);
        if frequencies {
            *weight += 1.0;
        } else {
            *weight = 1.0;
        }
    }
    vector
}

/// Weight of `word` in `weights`, where a missing or zero weight is neutral.
pub fn weight_for(weights: Option<&Weights>, word: &Word) -> f64 {
    match weights.and_then(|w| w.get(word)) {
        Some(&weight) if weight != 0.0 => weight,
        _ => 1.0,
    }
}

/// Multiply each entry of `vector` by its weight in `weights`.
pub fn scale_term_vector(vector: &mut TermVector, weights: Option<&Weights>) {
    if weights.is_none() {
        return;
    }
    for (word, value) in vector.iter_mut() {
        *value *= weight_for(weights, word);
    }
}

/// Combine two vectors: shared terms only, weights multiplied, then scaled
/// by `idf`.
pub fn combine_term_vectors(a: &TermVector, b: &TermVector, idf: Option<&Weights>) -> TermVector {
    combine_all(&[a, b], idf)
}

/// Combine any number of vectors the same way as [`combine_term_vectors`].
pub fn combine_all(vectors: &[&TermVector], idf: Option<&Weights>) -> TermVector {
    let Some((first, rest)) = vectors.split_first() else {
        return TermVector::new();
    };

    let mut combined = TermVector::new();
    'terms: for (word, &value) in first.iter() {
        let mut weight = value;
        for other in rest {
            match other.get(word) {
                Some(&v) => weight *= v,
                None => continue 'terms,
            }
        }
        combined.insert(word.clone(), weight * weight_for(idf, word));
    }
    combined
}

pub fn magnitude(vector: &TermVector) -> f64 {
    vector.values().map(|x| x * x).sum::<f64>().sqrt()
}

/// Cosine-like strength of `vectors`, using `combined` as the numerator
/// detail when supplied.
pub fn measure(vectors: &[&TermVector], combined: Option<&TermVector>) -> Result<f64, VectorError> {
    if vectors.is_empty() {
        return Err(VectorError::NoVectors);
    }

    let numerator: f64 = match combined {
        Some(combined) => combined.values().sum(),
        None => combine_all(vectors, None).values().sum(),
    };
    let denominator: f64 = vectors.iter().map(|v| magnitude(v)).product();

    if denominator == 0.0 {
        return Err(VectorError::ZeroMagnitude);
    }
    Ok(numerator / denominator)
}
