use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn trel_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("trel");
    path
}

fn tiers(tiers: &[(&str, Vec<(f64, f64, &str)>)]) -> String {
    let mut xml = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<ANNOTATION>\n");
    for (parent, spans) in tiers {
        xml.push_str(&format!("  <TIER columns=\"{}\">\n", parent));
        for (start, end, value) in spans.iter() {
            xml.push_str(&format!(
                "    <span start=\"{}\" end=\"{}\"><v>{}</v></span>\n",
                start, end, value
            ));
        }
        xml.push_str("  </TIER>\n");
    }
    xml.push_str("</ANNOTATION>\n");
    xml
}

/// One word per second from `start`.
fn words(start: f64, text: &str) -> Vec<(f64, f64, String)> {
    text.split_whitespace()
        .enumerate()
        .map(|(i, w)| (start + i as f64, start + i as f64 + 0.5, w.to_string()))
        .collect()
}

fn text(words: &[(f64, f64, String)]) -> String {
    let spans: Vec<(f64, f64, &str)> = words.iter().map(|(s, e, w)| (*s, *e, w.as_str())).collect();
    tiers(&[("words", spans)])
}

fn setup_test_env() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let corpus = root.join("corpus");
    fs::create_dir_all(&corpus).unwrap();

    fs::write(
        corpus.join("A1_Tiers.xml"),
        tiers(&[("Casa", vec![(0.0, 10.0, "cocina"), (10.0, 20.0, "patio")])]),
    )
    .unwrap();
    let mut a1 = words(1.0, "Un pollo entra en la cocina.");
    a1.extend(words(11.0, "El pollo sale al patio"));
    fs::write(corpus.join("A1_Text.xml"), text(&a1)).unwrap();

    fs::write(
        corpus.join("A2_Tiers.xml"),
        tiers(&[
            ("Casa", vec![(0.0, 10.0, "cocina")]),
            ("Viaje", vec![(10.0, 20.0, "tren")]),
        ]),
    )
    .unwrap();
    let mut a2 = words(1.0, "El pobre pollo cree");
    a2.extend(words(11.0, "Un tren llega"));
    fs::write(corpus.join("A2_Text.xml"), text(&a2)).unwrap();

    // A transcript missing its tiers is ignored.
    fs::write(corpus.join("A3_Text.xml"), text(&words(1.0, "nada"))).unwrap();

    let config_path = root.join("trel.toml");
    fs::write(&config_path, "[output]\nprogress = \"off\"\n").unwrap();

    (tmp, config_path)
}

fn run_trel(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = trel_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("Failed to run trel binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let success = output.status.success();
    (stdout, stderr, success)
}

fn build(tmp: &TempDir, config_path: &Path, extra: &[&str]) -> (PathBuf, String) {
    let out = tmp.path().join("out");
    let corpus = tmp.path().join("corpus");
    let mut args = vec!["build", out.to_str().unwrap(), corpus.to_str().unwrap()];
    args.extend_from_slice(extra);

    let (stdout, stderr, success) = run_trel(config_path, &args);
    assert!(success, "build failed: stdout={}, stderr={}", stdout, stderr);
    (out, stdout)
}

#[test]
fn test_build_writes_records() {
    let (tmp, config_path) = setup_test_env();
    let (out, stdout) = build(&tmp, &config_path, &[]);

    assert!(stdout.contains("transcripts: 2"), "{}", stdout);
    assert!(stdout.contains("fragments kept: 4"), "{}", stdout);
    assert!(stdout.contains("connections: 4"), "{}", stdout);
    assert!(stdout.contains("ok"));

    let fragments = fs::read_to_string(out.join("fragments.txt")).unwrap();
    assert!(fragments.contains("  Source: A1:0.0-10.0\n"));
    assert!(fragments.contains("Category: Casa-cocina\n"));
    assert!(fragments.contains("    Text: Un pollo entra en la cocina.\n"));

    let words = fs::read_to_string(out.join("words.txt")).unwrap();
    assert!(words.lines().any(|w| w == "cocina."));

    assert!(out.join("connections.txt").exists());
    assert!(!out.join("connections_verbose.txt").exists());
}

#[test]
fn test_build_verbose_report() {
    let (tmp, config_path) = setup_test_env();
    let (out, _) = build(&tmp, &config_path, &["--verbose"]);

    let verbose = fs::read_to_string(out.join("connections_verbose.txt")).unwrap();
    assert!(verbose.contains("pollo ("));
    assert!(verbose.contains("    Text: El pobre pollo cree\n"));
}

#[test]
fn test_build_without_transcripts_fails() {
    let (tmp, config_path) = setup_test_env();
    let empty = tmp.path().join("empty");
    fs::create_dir_all(&empty).unwrap();
    let out = tmp.path().join("out");

    let (_, stderr, success) = run_trel(
        &config_path,
        &["build", out.to_str().unwrap(), empty.to_str().unwrap()],
    );
    assert!(!success);
    assert!(stderr.contains("No complete transcripts"), "{}", stderr);
}

#[test]
fn test_export_writes_reports() {
    let (tmp, config_path) = setup_test_env();
    let (out, _) = build(&tmp, &config_path, &[]);

    let (stdout, stderr, success) = run_trel(
        &config_path,
        &["export", out.to_str().unwrap(), "--stats", "--json", "--graph"],
    );
    assert!(success, "export failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("connections: 4"), "{}", stdout);
    assert!(stdout.contains("translation:"));
    assert!(stdout.contains("rotation:"));

    for name in [
        "translation",
        "rotation",
        "translation.dot",
        "rotation.dot",
        "accessibility",
        "unreachable",
        "relations.json",
        "term_frequencies.txt",
        "category_fragments.txt",
    ] {
        assert!(out.join(name).exists(), "missing {}", name);
    }

    let translation = fs::read_to_string(out.join("translation")).unwrap();
    assert!(translation.contains("----\n"));

    let accessibility = fs::read_to_string(out.join("accessibility")).unwrap();
    assert_eq!(accessibility.lines().count(), 4);

    let json: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(out.join("relations.json")).unwrap()).unwrap();
    assert_eq!(json["datasets"][0]["name"], "translation");

    let data = out.join("data").join("A1:0.0-10.0");
    assert_eq!(
        fs::read_to_string(data.join("text")).unwrap(),
        "Un pollo entra en la cocina."
    );
    assert!(data.join("translation").join("0").join("measure").exists());
}

#[test]
fn test_export_selects_with_cli_overrides() {
    let (tmp, config_path) = setup_test_env();
    let (out, _) = build(&tmp, &config_path, &[]);

    let (stdout, stderr, success) = run_trel(
        &config_path,
        &[
            "export",
            out.to_str().unwrap(),
            "--select",
            "all",
            "--num-related",
            "2",
            "--term-presence-only",
            "--no-idf",
        ],
    );
    assert!(success, "export failed: stdout={}, stderr={}", stdout, stderr);
    for name in ["translation", "rotation", "monologue", "any"] {
        assert!(out.join(name).exists(), "missing {}", name);
    }
    assert!(!out.join("relations.json").exists());
}

#[test]
fn test_export_word_list_filters_fragments() {
    let (tmp, config_path) = setup_test_env();
    let (out, _) = build(&tmp, &config_path, &[]);
    let word_list = tmp.path().join("words.txt");
    fs::write(&word_list, "pollo\n").unwrap();

    let (stdout, stderr, success) = run_trel(
        &config_path,
        &["export", out.to_str().unwrap(), "--word-list", word_list.to_str().unwrap()],
    );
    assert!(success, "export failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("connections: 3"), "{}", stdout);

    let filtered = fs::read_to_string(out.join("fragments_filtered.txt")).unwrap();
    assert!(filtered.contains("   Terms: pollo\n"));
}

#[test]
fn test_export_no_output() {
    let (tmp, config_path) = setup_test_env();
    let (out, _) = build(&tmp, &config_path, &[]);

    let (stdout, _, success) = run_trel(&config_path, &["export", out.to_str().unwrap(), "--no-output"]);
    assert!(success);
    assert!(stdout.contains("no output"));
    assert!(!out.join("accessibility").exists());
}

#[test]
fn test_export_rejects_unknown_selector() {
    let (tmp, config_path) = setup_test_env();
    let (out, _) = build(&tmp, &config_path, &[]);

    let (_, stderr, success) = run_trel(&config_path, &["export", out.to_str().unwrap(), "--select", "sideways"]);
    assert!(!success);
    assert!(stderr.contains("sideways"), "{}", stderr);
}

#[test]
fn test_export_before_build_fails() {
    let (tmp, config_path) = setup_test_env();
    let missing = tmp.path().join("missing");

    let (_, stderr, success) = run_trel(&config_path, &["export", missing.to_str().unwrap()]);
    assert!(!success);
    assert!(stderr.contains("trel build"), "{}", stderr);
}

#[test]
fn test_selectors_listing() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, _, success) = run_trel(&config_path, &["selectors"]);
    assert!(success);
    assert!(stdout.contains("translation"));
    assert!(stdout.contains("distinct-participant"));
}

#[test]
fn test_invalid_config_is_reported() {
    let (tmp, config_path) = setup_test_env();
    fs::write(&config_path, "[relations]\nnum_related = 0\n").unwrap();
    let out = tmp.path().join("out");

    let (_, stderr, success) = run_trel(&config_path, &["export", out.to_str().unwrap()]);
    assert!(!success);
    assert!(stderr.contains("num_related"), "{}", stderr);
}
