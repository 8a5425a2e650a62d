//! TOML configuration.
//!
//! Every key has a built-in default, so a missing configuration file is not
//! an error for [`load_or_default`]. Command-line flags are applied on top of
//! the loaded values by `main`, after which [`validate`] runs again.
//!
//! ```toml
//! [input]
//! all_fragments = false
//! category_map = "categories.txt"
//! pos_tags = "tags.txt"
//! lexicon = "lexicon.tsv"
//! include_globs = ["**/*.xml"]
//!
//! [relations]
//! num_related = 4
//! select = ["translation", "rotation"]
//! idf = true
//! term_presence_only = false
//! word_list = "words.txt"
//! category_weights = "weights.txt"
//!
//! [output]
//! shown_relations = 5
//! graph = false
//! json = false
//! progress = "auto"
//! ```

use anyhow::{bail, Context, Result};
use globset::Glob;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::debug;

use transcript_relations_core::related::resolve_selections;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub input: InputConfig,
    #[serde(default)]
    pub relations: RelationsConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct InputConfig {
    /// Keep uncategorised and partially categorised fragments.
    #[serde(default)]
    pub all_fragments: bool,
    /// `old new` lines renaming category parents.
    #[serde(default)]
    pub category_map: Option<PathBuf>,
    /// Part-of-speech tags to preserve, one per line.
    #[serde(default)]
    pub pos_tags: Option<PathBuf>,
    /// `word<TAB>tag<TAB>lemma` lexicon for tagging.
    #[serde(default)]
    pub lexicon: Option<PathBuf>,
    /// Globs selecting input files inside directory arguments.
    #[serde(default = "default_include_globs")]
    pub include_globs: Vec<String>,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            all_fragments: false,
            category_map: None,
            pos_tags: None,
            lexicon: None,
            include_globs: default_include_globs(),
        }
    }
}

fn default_include_globs() -> Vec<String> {
    vec!["**/*.xml".to_string()]
}

#[derive(Debug, Deserialize, Clone)]
pub struct RelationsConfig {
    #[serde(default = "default_num_related")]
    pub num_related: usize,
    #[serde(default = "default_select")]
    pub select: Vec<String>,
    #[serde(default = "default_idf")]
    pub idf: bool,
    #[serde(default)]
    pub term_presence_only: bool,
    #[serde(default)]
    pub word_list: Option<PathBuf>,
    #[serde(default)]
    pub category_weights: Option<PathBuf>,
}

impl Default for RelationsConfig {
    fn default() -> Self {
        Self {
            num_related: default_num_related(),
            select: default_select(),
            idf: default_idf(),
            term_presence_only: false,
            word_list: None,
            category_weights: None,
        }
    }
}

fn default_num_related() -> usize {
    4
}
fn default_select() -> Vec<String> {
    vec!["translation".to_string(), "rotation".to_string()]
}
fn default_idf() -> bool {
    true
}

#[derive(Debug, Deserialize, Clone)]
pub struct OutputConfig {
    #[serde(default = "default_shown_relations")]
    pub shown_relations: usize,
    #[serde(default)]
    pub graph: bool,
    #[serde(default)]
    pub json: bool,
    #[serde(default = "default_progress")]
    pub progress: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            shown_relations: default_shown_relations(),
            graph: false,
            json: false,
            progress: default_progress(),
        }
    }
}

fn default_shown_relations() -> usize {
    5
}
fn default_progress() -> String {
    "auto".to_string()
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    validate(&config)?;
    Ok(config)
}

/// Load `path` when it exists, otherwise use the built-in defaults.
pub fn load_or_default(path: &Path) -> Result<Config> {
    if path.exists() {
        load_config(path)
    } else {
        debug!(path = %path.display(), "no config file, using defaults");
        Ok(Config::default())
    }
}

pub fn validate(config: &Config) -> Result<()> {
    if config.relations.num_related == 0 {
        bail!("relations.num_related must be >= 1");
    }

    if config.relations.select.is_empty() {
        bail!("relations.select must name at least one selector");
    }

    if let Err(e) = resolve_selections(&config.relations.select) {
        bail!("relations.select: {}", e);
    }

    if config.output.shown_relations == 0 {
        bail!("output.shown_relations must be >= 1");
    }

    match config.output.progress.as_str() {
        "auto" | "human" | "json" | "off" => {}
        other => bail!(
            "Unknown progress mode: '{}'. Must be auto, human, json, or off.",
            other
        ),
    }

    for pattern in &config.input.include_globs {
        Glob::new(pattern).with_context(|| format!("Invalid include glob: '{}'", pattern))?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn defaults_apply_to_empty_file() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.relations.num_related, 4);
        assert_eq!(config.relations.select, ["translation", "rotation"]);
        assert!(config.relations.idf);
        assert_eq!(config.output.shown_relations, 5);
        assert_eq!(config.input.include_globs, ["**/*.xml"]);
        validate(&config).unwrap();
    }

    #[test]
    fn missing_file_uses_defaults() {
        let tmp = TempDir::new().unwrap();
        let config = load_or_default(&tmp.path().join("absent.toml")).unwrap();
        assert_eq!(config.relations.num_related, 4);
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config: Config = toml::from_str(
            r#"
[relations]
num_related = 3
select = ["all"]
"#,
        )
        .unwrap();
        assert_eq!(config.relations.num_related, 3);
        assert!(config.relations.idf);
        assert_eq!(config.output.progress, "auto");
        validate(&config).unwrap();
    }

    #[test]
    fn invalid_values_are_rejected() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("trel.toml");

        std::fs::write(&path, "[relations]\nnum_related = 0\n").unwrap();
        assert!(load_config(&path).is_err());

        std::fs::write(&path, "[relations]\nselect = [\"bogus\"]\n").unwrap();
        let err = load_config(&path).unwrap_err().to_string();
        assert!(err.contains("bogus"), "{}", err);

        std::fs::write(&path, "[output]\nprogress = \"loud\"\n").unwrap();
        assert!(load_config(&path).is_err());
    }
}
