//! Command-line tests: run the `persona` binary against a temp workspace.
//!
//! Every test uses the `hash` embedder so no model download or network
//! access is needed.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use tempfile::TempDir;

const ENV_VARS: &[&str] = &[
    "CHUNKS_DIR",
    "DB_PATH",
    "COLLECTION_NAME",
    "CHARACTER_NAME",
    "SERVER_NAME",
    "EMBEDDING_PROVIDER",
];

/// Temp workspace with a config file and one character's documents.
fn setup_test_env() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path();

    let hiro = root.join("chunks").join("hiro");
    fs::create_dir_all(&hiro).unwrap();
    fs::write(
        hiro.join("speech.md"),
        "---\ntags: [dialogue, speech]\n---\nHiro speaks softly and chooses each word with care.",
    )
    .unwrap();
    fs::write(
        hiro.join("traits.md"),
        "---\ncreatedAt: 2024-01-01\ntags: [traits]\n---\nHiro is calm under pressure and quietly stubborn.",
    )
    .unwrap();
    fs::write(
        hiro.join("broken.md"),
        "---\ntags: [oops\n---\nNever stored.",
    )
    .unwrap();
    fs::write(hiro.join("notes.txt"), "Not a personality document.").unwrap();

    let rui = root.join("chunks").join("rui");
    fs::create_dir_all(&rui).unwrap();
    fs::write(
        rui.join("speech.md"),
        "Rui talks fast, laughs often, and interrupts everyone.",
    )
    .unwrap();

    let config_path = root.join("config").join("persona.toml");
    fs::create_dir_all(config_path.parent().unwrap()).unwrap();
    fs::write(
        &config_path,
        format!(
            r#"[db]
path = "{db}"
collection = "personality"

[embedding]
provider = "hash"
"#,
            db = root.join("db").display()
        ),
    )
    .unwrap();

    (tmp, config_path)
}

fn run_persona(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_persona"));
    cmd.arg("--config").arg(config_path).args(args);
    for var in ENV_VARS {
        cmd.env_remove(var);
    }
    let output = cmd.output().expect("failed to run persona binary");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    (stdout, stderr, output.status.success())
}

fn chunks(tmp: &TempDir, character: &str) -> String {
    tmp.path()
        .join("chunks")
        .join(character)
        .display()
        .to_string()
}

fn load(tmp: &TempDir, config: &Path, dir: &str, character: &str, extra: &[&str]) -> String {
    let dir = chunks(tmp, dir);
    let mut args = vec!["load", "--chunks-dir", &dir, "--character", character];
    args.extend_from_slice(extra);
    let (stdout, stderr, success) = run_persona(config, &args);
    assert!(success, "load failed: {}", stderr);
    stdout
}

#[test]
fn test_load_reports_skipped_files() {
    let (tmp, config) = setup_test_env();

    let stdout = load(&tmp, &config, "hiro", "Hiro", &[]);
    assert!(stdout.contains("Ingest Hiro:"));
    assert!(stdout.contains("loaded:     2"));
    assert!(stdout.contains("skipped:    1"));
    assert!(stdout.contains("broken.md"));
    assert!(stdout.contains("saved:      2"));
    assert!(stdout.contains("personality (2 records)"));
}

#[test]
fn test_load_twice_rebuilds_collection() {
    let (tmp, config) = setup_test_env();

    load(&tmp, &config, "hiro", "Hiro", &[]);
    let stdout = load(&tmp, &config, "hiro", "Hiro", &[]);
    assert!(stdout.contains("personality (2 records)"));
}

#[test]
fn test_load_append_adds_second_character() {
    let (tmp, config) = setup_test_env();

    load(&tmp, &config, "hiro", "Hiro", &[]);
    let stdout = load(&tmp, &config, "rui", "Rui", &["--append"]);
    assert!(stdout.contains("personality (3 records)"));

    let (stdout, _, success) = run_persona(&config, &["info"]);
    assert!(success);
    assert!(stdout.contains("Records:     3"));
    assert!(stdout.contains("feature-hash-256"));
}

#[test]
fn test_search_with_character_is_scoped() {
    let (tmp, config) = setup_test_env();

    load(&tmp, &config, "hiro", "Hiro", &[]);
    load(&tmp, &config, "rui", "Rui", &["--append"]);

    let (stdout, stderr, success) = run_persona(
        &config,
        &["search", "how does he talk", "--character", "Rui"],
    );
    assert!(success, "search failed: {}", stderr);
    assert!(stdout.starts_with("**Personality data for Rui:**"));
    assert!(stdout.contains("interrupts everyone"));
    assert!(!stdout.contains("Hiro speaks softly"));
}

#[test]
fn test_search_unknown_character_finds_nothing() {
    let (tmp, config) = setup_test_env();

    load(&tmp, &config, "hiro", "Hiro", &[]);

    let (stdout, _, success) =
        run_persona(&config, &["search", "greeting", "--character", "Mika"]);
    assert!(success);
    assert!(stdout.contains("No personality data found for Mika with query: greeting"));
}

#[test]
fn test_search_without_character_lists_matches() {
    let (tmp, config) = setup_test_env();

    load(&tmp, &config, "hiro", "Hiro", &[]);

    let (stdout, _, success) = run_persona(&config, &["search", "calm", "--limit", "1"]);
    assert!(success);
    assert!(stdout.starts_with("1. ["));
    assert!(!stdout.contains("2. ["));
    assert!(stdout.contains("(Hiro)"));
}

#[test]
fn test_load_missing_directory_fails() {
    let (tmp, config) = setup_test_env();

    let (_, stderr, success) = run_persona(
        &config,
        &[
            "load",
            "--chunks-dir",
            &chunks(&tmp, "nobody"),
            "--character",
            "Nobody",
        ],
    );
    assert!(!success);
    assert!(stderr.contains("corpus directory not found"));
}

#[test]
fn test_load_missing_directory_keeps_existing_collection() {
    let (tmp, config) = setup_test_env();

    load(&tmp, &config, "hiro", "Hiro", &[]);
    let (_, _, success) = run_persona(
        &config,
        &["load", "--chunks-dir", &chunks(&tmp, "nobody")],
    );
    assert!(!success);

    let (stdout, _, _) = run_persona(&config, &["info"]);
    assert!(stdout.contains("Records:     2"));
}

#[test]
fn test_vectorize_then_load_vectors() {
    let (tmp, config) = setup_test_env();

    let vectors = tmp.path().join("out").join("hiro.json");
    let vectors_arg = vectors.display().to_string();
    let dir = chunks(&tmp, "hiro");

    let (stdout, stderr, success) = run_persona(
        &config,
        &[
            "vectorize",
            "--chunks-dir",
            &dir,
            "--character",
            "Hiro",
            "--output",
            &vectors_arg,
        ],
    );
    assert!(success, "vectorize failed: {}", stderr);
    assert!(stdout.contains("Wrote 2 vectors"));
    assert!(vectors.exists());

    // Vectorizing never creates the index.
    assert!(!tmp.path().join("db").join("index.sqlite3").exists());

    let (stdout, stderr, success) = run_persona(&config, &["load-vectors", &vectors_arg]);
    assert!(success, "load-vectors failed: {}", stderr);
    assert!(stdout.contains("personality (2 records)"));

    let (stdout, _, success) =
        run_persona(&config, &["search", "calm", "--character", "Hiro"]);
    assert!(success);
    assert!(stdout.contains("**Source:** traits.md"));
}

#[test]
fn test_collection_override() {
    let (tmp, config) = setup_test_env();

    let dir = chunks(&tmp, "hiro");
    let (stdout, _, success) = run_persona(
        &config,
        &[
            "--collection",
            "hiro_only",
            "load",
            "--chunks-dir",
            &dir,
            "--character",
            "Hiro",
        ],
    );
    assert!(success);
    assert!(stdout.contains("hiro_only (2 records)"));

    let (stdout, _, _) = run_persona(&config, &["info", "--collection", "hiro_only"]);
    assert!(stdout.contains("Collection:  hiro_only"));
}
