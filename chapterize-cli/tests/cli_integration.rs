//! Integration tests for the chapterize binary.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::io::Write;

fn chapterize() -> Command {
    Command::cargo_bin("chapterize").expect("binary builds")
}

fn write_novel(dir: &std::path::Path, name: &str, chapters: usize) -> std::path::PathBuf {
    let path = dir.join(name);
    let mut file = fs::File::create(&path).unwrap();
    writeln!(file, "소설 전체 제목").unwrap();
    writeln!(file).unwrap();
    for i in 1..=chapters {
        writeln!(file, "제 {i} 화").unwrap();
        for _ in 0..20 {
            writeln!(file, "본문이 길게 이어집니다. 오늘도 평화로운 하루였습니다.").unwrap();
        }
        writeln!(file).unwrap();
    }
    path
}

#[test]
fn help_lists_subcommands() {
    chapterize()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("process"))
        .stdout(predicate::str::contains("verify"))
        .stdout(predicate::str::contains("generate-config"));
}

#[test]
fn generate_config_emits_toml() {
    chapterize()
        .arg("generate-config")
        .assert()
        .success()
        .stdout(predicate::str::contains("[oracle]"))
        .stdout(predicate::str::contains("[sampling]"));
}

#[test]
fn offline_process_discovers_chapters() {
    let dir = tempfile::tempdir().unwrap();
    let novel = write_novel(dir.path(), "소설 4.txt", 4);

    chapterize()
        .arg("process")
        .arg("--offline")
        .arg("--quiet")
        .arg("-i")
        .arg(&novel)
        .assert()
        .success()
        .stdout(predicate::str::contains("4 chapters"));
}

#[test]
fn json_output_contains_chapter_bodies() {
    let dir = tempfile::tempdir().unwrap();
    let novel = write_novel(dir.path(), "소설 3.txt", 3);
    let out = dir.path().join("result.json");

    chapterize()
        .arg("process")
        .arg("--offline")
        .arg("--quiet")
        .arg("--format")
        .arg("json")
        .arg("-i")
        .arg(&novel)
        .arg("-o")
        .arg(&out)
        .assert()
        .success();

    let value: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&out).unwrap()).unwrap();
    assert_eq!(value[0]["chapters"].as_array().unwrap().len(), 3);
    assert!(value[0]["chapters"][0]["body"]
        .as_str()
        .unwrap()
        .contains("본문"));
}

#[test]
fn verify_reports_pattern_coverage() {
    let dir = tempfile::tempdir().unwrap();
    let novel = write_novel(dir.path(), "소설 2.txt", 2);

    chapterize()
        .arg("verify")
        .arg("--pattern")
        .arg(r"제\s*\d+\s*화")
        .arg(&novel)
        .assert()
        .success()
        .stdout(predicate::str::contains("matches:        2"));
}

#[test]
fn missing_input_fails() {
    chapterize()
        .arg("process")
        .arg("--offline")
        .arg("-i")
        .arg("no-such-file-anywhere.txt")
        .assert()
        .failure()
        .stderr(predicate::str::contains("No files found"));
}
