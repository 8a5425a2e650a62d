//! # Transcript Relations Core
//!
//! Pure, I/O-free logic for Transcript Relations: the fragment data model,
//! term vectors, pairwise fragment comparison, related-fragment selection,
//! and accessibility analysis over the resulting relation graph.
//!
//! This crate contains no file access, configuration, or CLI code. The
//! calling application supplies fully materialized [`Fragment`](models::Fragment)
//! collections and receives connections and relation mappings back.
//!
//! ## Data flow
//!
//! ```text
//! fragments ──▶ vectors ──▶ connection::compare_fragments ──▶ related ──▶ access
//!                 ▲                                              │
//!                 └── stats (frequencies, IDF, term index) ──────┘
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`models`] | Source, Category, Term/Word, Fragment |
//! | [`text`] | Punctuation-aware text joining |
//! | [`vectors`] | Term vector construction, scaling, combination, measure |
//! | [`connection`] | Connections and the fragment comparator |
//! | [`related`] | Related-fragment index, ordering, and selection criteria |
//! | [`access`] | Reachability over curated relations |
//! | [`stats`] | Frequencies, IDF, and term catalogues |
//! | [`error`] | Typed errors |

pub mod access;
pub mod connection;
pub mod error;
pub mod models;
pub mod related;
pub mod stats;
pub mod text;
pub mod vectors;
