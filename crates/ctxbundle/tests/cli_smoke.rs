use std::fs;

use assert_cmd::Command;
use predicates::prelude::*;

fn ctxbundle() -> Command {
    let mut cmd = Command::cargo_bin("ctxbundle").expect("binary exists");
    cmd.env_remove("CTXBUNDLE_FORMAT")
        .env_remove("CTXBUNDLE_TEMPLATE")
        .env_remove("CTXBUNDLE_LOG");
    cmd
}

fn sample_project() -> tempfile::TempDir {
    let temp = tempfile::tempdir().expect("tempdir");
    let root = temp.path();
    fs::create_dir_all(root.join("src")).unwrap();
    fs::create_dir_all(root.join("node_modules/dep")).unwrap();
    fs::write(root.join("src/main.rs"), "fn main() {}\n").unwrap();
    fs::write(root.join("node_modules/dep/index.js"), "module.exports = 1;").unwrap();
    fs::write(root.join("package-lock.json"), "{}").unwrap();
    fs::write(root.join("logo.png"), [0x89, b'P', b'N', b'G']).unwrap();
    temp
}

#[test]
fn help_displays_usage() {
    ctxbundle()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage"));
}

#[test]
fn bundle_prints_only_eligible_files() {
    let project = sample_project();
    ctxbundle()
        .arg("bundle")
        .arg(project.path())
        .args(["--name", "demo"])
        .assert()
        .success()
        .stdout(predicate::str::contains("FILE: src/main.rs"))
        .stdout(predicate::str::contains("node_modules").not())
        .stdout(predicate::str::contains("package-lock.json").not())
        .stdout(predicate::str::contains("logo.png").not());
}

#[test]
fn tree_lists_selected_files() {
    let project = sample_project();
    ctxbundle()
        .arg("tree")
        .arg(project.path())
        .assert()
        .success()
        .stdout("└── src\n    └── main.rs\n");
}

#[test]
fn bundle_then_reverse_restores_files() {
    let project = sample_project();
    let work = tempfile::tempdir().unwrap();
    let bundle_path = work.path().join("bundle.md");

    ctxbundle()
        .arg("bundle")
        .arg(project.path())
        .args(["--format", "markdown", "--template", "claude", "--output"])
        .arg(&bundle_path)
        .assert()
        .success();

    let out_dir = work.path().join("restored");
    ctxbundle()
        .arg("reverse")
        .arg(&bundle_path)
        .arg("--out-dir")
        .arg(&out_dir)
        .assert()
        .success()
        .stderr(predicate::str::contains("Recovered 1 file(s) from markdown bundle"));

    assert_eq!(
        fs::read_to_string(out_dir.join("src/main.rs")).unwrap(),
        "fn main() {}"
    );
}

#[test]
fn reverse_reads_stdin_in_dry_run() {
    ctxbundle()
        .args(["reverse", "--dry-run"])
        .write_stdin(r#"{"files":[{"p":"a.txt","c":"hello"}]}"#)
        .assert()
        .success()
        .stdout("format: json\na.txt (5 bytes)\n");
}

#[test]
fn reverse_rejects_unstructured_input() {
    ctxbundle()
        .args(["reverse", "--dry-run"])
        .write_stdin("nothing to see here")
        .assert()
        .failure()
        .stderr(predicate::str::contains("no files found in the input"));
}
