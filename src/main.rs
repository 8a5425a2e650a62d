//! # Transcript Relations CLI (`trel`)
//!
//! The `trel` binary builds lexical connections between transcript fragments
//! and exports curated relations from them.
//!
//! ## Usage
//!
//! ```bash
//! trel --config ./trel.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `trel build <outdir> <inputs>...` | Read transcripts, compare fragments, write records |
//! | `trel export <outdir>` | Restore records, select related fragments, write reports |
//! | `trel selectors` | List the selectors accepted by `--select` |
//!
//! ## Examples
//!
//! ```bash
//! # Compare every fragment of the transcripts under ./corpus
//! trel build out ./corpus
//!
//! # Relate fragments told by other participants, keeping the 3 closest
//! trel export out --select translation --num-related 3
//!
//! # Every selector, with statistics and Graphviz output
//! trel export out --select all --stats --graph
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use transcript_relations::build_cmd;
use transcript_relations::config::{self, Config};
use transcript_relations::export::{self, ExportOptions};
use transcript_relations::logging::init_tracing;
use transcript_relations::progress::ProgressMode;
use transcript_relations::selectors;

/// Transcript Relations: lexical similarity and curated relations between
/// time-aligned transcript fragments.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. When the file does not exist, built-in defaults are used.
#[derive(Parser)]
#[command(
    name = "trel",
    about = "Lexical similarity and curated relations between transcript fragments",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./trel.toml")]
    config: PathBuf,

    /// Progress reporting: `auto`, `human`, `json` or `off`.
    #[arg(long, global = true)]
    progress: Option<String>,

    /// Log at info level and write verbose reports.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Read transcripts and compare their fragments.
    ///
    /// Each transcript is a pair of XML files named `<prefix>_Text...` and
    /// `<prefix>_Tiers...`. Directories are searched using the configured
    /// include globs. Fragments, connections and the list of words are
    /// written to the output directory.
    Build {
        /// Directory receiving the records.
        outdir: PathBuf,

        /// Transcript files or directories.
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Keep uncategorised and partially categorised fragments.
        #[arg(long)]
        all_fragments: bool,

        /// File of `old new` lines renaming category parents.
        #[arg(long)]
        category_map: Option<PathBuf>,

        /// File of part-of-speech tags to preserve, one per line.
        #[arg(long)]
        pos_tags: Option<PathBuf>,

        /// Tagging lexicon of `word<TAB>tag<TAB>lemma` lines.
        #[arg(long)]
        lexicon: Option<PathBuf>,
    },

    /// Select related fragments from the records of a build.
    ///
    /// Reports are written next to the records: one file per selection, a
    /// `data` directory, the accessibility summary and the unreachable
    /// fragments.
    Export {
        /// Directory holding the records written by `build`.
        outdir: PathBuf,

        /// Keep only the words in this file (root forms, one per line).
        #[arg(long)]
        word_list: Option<PathBuf>,

        /// Fragments per selection, the selected fragment included.
        #[arg(long)]
        num_related: Option<usize>,

        /// Selector names, comma-separated to combine them, or `all`.
        /// May be repeated.
        #[arg(long = "select")]
        select: Vec<String>,

        /// Weight terms by presence instead of frequency.
        #[arg(long)]
        term_presence_only: bool,

        /// Do not scale term vectors by inverse document frequency.
        #[arg(long)]
        no_idf: bool,

        /// File of `parent-category weight` lines scaling connection measures.
        #[arg(long)]
        category_weights: Option<PathBuf>,

        /// Also write the statistical reports.
        #[arg(long)]
        stats: bool,

        /// Also write a Graphviz file per selection.
        #[arg(long)]
        graph: bool,

        /// Also write `relations.json`.
        #[arg(long)]
        json: bool,

        /// Run without writing any output.
        #[arg(long)]
        no_output: bool,
    },

    /// List the selectors accepted by `export --select`.
    Selectors,
}

/// Fold command-line overrides into the loaded configuration.
fn apply_overrides(cfg: &mut Config, command: &Commands) {
    match command {
        Commands::Build {
            all_fragments,
            category_map,
            pos_tags,
            lexicon,
            ..
        } => {
            cfg.input.all_fragments |= *all_fragments;
            if category_map.is_some() {
                cfg.input.category_map = category_map.clone();
            }
            if pos_tags.is_some() {
                cfg.input.pos_tags = pos_tags.clone();
            }
            if lexicon.is_some() {
                cfg.input.lexicon = lexicon.clone();
            }
        }
        Commands::Export {
            word_list,
            num_related,
            select,
            term_presence_only,
            no_idf,
            category_weights,
            graph,
            json,
            ..
        } => {
            if word_list.is_some() {
                cfg.relations.word_list = word_list.clone();
            }
            if let Some(n) = num_related {
                cfg.relations.num_related = *n;
            }
            if !select.is_empty() {
                cfg.relations.select = select.clone();
            }
            cfg.relations.term_presence_only |= *term_presence_only;
            if *no_idf {
                cfg.relations.idf = false;
            }
            if category_weights.is_some() {
                cfg.relations.category_weights = category_weights.clone();
            }
            cfg.output.graph |= *graph;
            cfg.output.json |= *json;
        }
        Commands::Selectors => {}
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Commands::Selectors = cli.command {
        selectors::list_selectors();
        return Ok(());
    }

    let mut cfg = config::load_or_default(&cli.config)?;
    if let Some(progress) = &cli.progress {
        cfg.output.progress = progress.clone();
    }
    apply_overrides(&mut cfg, &cli.command);
    config::validate(&cfg)?;

    let progress = ProgressMode::from_setting(&cfg.output.progress)?.reporter();

    match cli.command {
        Commands::Build { outdir, inputs, .. } => {
            build_cmd::run_build(&cfg, &outdir, &inputs, cli.verbose, progress.as_ref())?;
        }
        Commands::Export {
            outdir,
            stats,
            no_output,
            ..
        } => {
            let options = ExportOptions { stats, no_output };
            export::run_export(&cfg, &outdir, options, progress.as_ref())?;
        }
        Commands::Selectors => {}
    }

    Ok(())
}
