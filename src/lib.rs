//! # Transcript Relations
//!
//! Lexical similarity and curated relations between time-aligned transcript
//! fragments.
//!
//! A transcript is divided into categorised fragments. Fragments are compared
//! pairwise by the terms they share, and each fragment's most similar
//! neighbours are then selected under named criteria (other participants,
//! other subcategories of a topic, ...). The result is a navigable set of
//! relations, together with the fragments no relation leads into.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐   ┌──────────────┐   ┌──────────────┐
//! │  XML tiers  │──▶│ Normalise,   │──▶│  fragments/  │
//! │  + words    │   │ tag, compare │   │  connections │
//! └─────────────┘   └──────────────┘   └──────┬───────┘
//!        trel build                           │
//!                      ┌──────────────────────┘
//!                      ▼
//!               ┌──────────────┐   ┌──────────────┐
//!               │  Weight and  │──▶│ Reports, data│
//!               │   select     │   │ JSON, dot    │
//!               └──────────────┘   └──────────────┘
//!                  trel export
//! ```
//!
//! The comparison and selection core lives in
//! [`transcript_relations_core`], re-exported here. It performs no I/O.
//!
//! ## Quick Start
//!
//! ```bash
//! trel build out ./corpus              # compare fragments
//! trel export out --select all --stats # relate and report
//! trel selectors                       # list selectors
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`ingest`] | Transcript XML reading |
//! | [`normalise`] | Accent and punctuation normalisation |
//! | [`tagging`] | Tokenising and part-of-speech tagging |
//! | [`grouping`] | Multi-word names and quantities |
//! | [`filters`] | Word lists, tag lists and category files |
//! | [`build_cmd`] | The build pipeline |
//! | [`serialised`] | Record format |
//! | [`stats`] | Corpus statistics |
//! | [`export`] | The export pipeline |
//! | [`outputs`] | Reports and data files |
//! | [`graph`] | Graphviz output |
//! | [`selectors`] | Selector listing |
//! | [`progress`] | Progress reporting |
//! | [`logging`] | Tracing setup |

pub use transcript_relations_core;

pub mod build_cmd;
pub mod config;
pub mod export;
pub mod filters;
pub mod graph;
pub mod grouping;
pub mod ingest;
pub mod logging;
pub mod normalise;
pub mod outputs;
pub mod progress;
pub mod selectors;
pub mod serialised;
pub mod stats;
pub mod tagging;
