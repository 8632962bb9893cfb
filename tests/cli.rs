use assert_cmd::Command;
use serde_json::Value;
use std::fs;
use tempfile::TempDir;

const LINE: &str = "hello world world hello bar hello foo world foo foo world bar\n";

fn temp_workspace() -> TempDir {
    tempfile::tempdir().expect("create tempdir")
}

fn wordwin() -> Command {
    let mut cmd = Command::cargo_bin("wordwin").expect("binary exists");
    cmd.arg("--quiet");
    cmd
}

fn build_vocabulary(workspace: &TempDir) {
    fs::write(workspace.path().join("corpus.txt"), LINE.repeat(2)).expect("write corpus");
    wordwin()
        .current_dir(workspace.path())
        .args([
            "vocab",
            "corpus.txt",
            "-o",
            "vocab.json",
            "--workers",
            "3",
            "--listing",
            "vocab.txt",
            "--no-progress",
        ])
        .assert()
        .success();
}

fn window_lines(stdout: &[u8]) -> Vec<Vec<u64>> {
    String::from_utf8(stdout.to_vec())
        .expect("utf8 output")
        .lines()
        .map(|line| {
            let value: Value = serde_json::from_str(line).expect("window is valid JSON");
            value
                .as_array()
                .expect("window array")
                .iter()
                .map(|id| id.as_u64().expect("u64 id"))
                .collect()
        })
        .collect()
}

#[test]
fn vocab_info_round_trip() {
    let workspace = temp_workspace();
    build_vocabulary(&workspace);

    let listing = fs::read_to_string(workspace.path().join("vocab.txt")).expect("listing");
    assert_eq!(
        listing.lines().collect::<Vec<_>>(),
        vec!["world 0", "foo 1", "hello 2", "bar 3", "</s> 4", "<num> 5"]
    );

    let output = wordwin()
        .current_dir(workspace.path())
        .args(["info", "-m", "vocab.json", "--json", "--top", "2"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let summary: Value = serde_json::from_slice(&output).expect("info output is JSON");
    assert_eq!(summary["words"], 6);
    assert_eq!(summary["total_count"], 26);
    assert_eq!(summary["eos_token"], 4);
    assert_eq!(summary["top"][0]["token"], "world");
    assert_eq!(summary["top"][0]["count"], 8);
    assert_eq!(summary["top"].as_array().map(Vec::len), Some(2));
}

#[test]
fn windows_reset_at_line_ends() {
    let workspace = temp_workspace();
    build_vocabulary(&workspace);

    let output = wordwin()
        .current_dir(workspace.path())
        .args(["windows", "-m", "vocab.json", "corpus.txt", "--json"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let windows = window_lines(&output);
    assert_eq!(windows.len(), 20);
    assert_eq!(windows[0], vec![2, 0, 0]);
    assert_eq!(windows[9], vec![1, 0, 3]);
    assert_eq!(windows[10], vec![2, 0, 0]);

    let output = wordwin()
        .current_dir(workspace.path())
        .args([
            "windows",
            "-m",
            "vocab.json",
            "corpus.txt",
            "--json",
            "--subsample",
            "1.0",
            "--seed",
            "7",
        ])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    assert_eq!(window_lines(&output), windows);
}

#[test]
fn windows_write_plain_output_file() {
    let workspace = temp_workspace();
    build_vocabulary(&workspace);

    wordwin()
        .current_dir(workspace.path())
        .args([
            "windows",
            "-m",
            "vocab.json",
            "corpus.txt",
            "--window-size",
            "2",
            "--stride",
            "2",
            "-o",
            "windows.txt",
        ])
        .assert()
        .success();
    let written = fs::read_to_string(workspace.path().join("windows.txt")).expect("windows");
    let first: Vec<&str> = written.lines().take(3).collect();
    assert_eq!(first, vec!["2 0", "0 2", "3 2"]);
}

#[test]
fn windows_reject_unknown_padding() {
    let workspace = temp_workspace();
    build_vocabulary(&workspace);

    wordwin()
        .current_dir(workspace.path())
        .args([
            "windows",
            "-m",
            "vocab.json",
            "corpus.txt",
            "--padding",
            "<pad>",
        ])
        .assert()
        .failure();
}

#[test]
fn tokenize_prints_normalised_tokens() {
    let output = wordwin()
        .args(["tokenize", "Ｈｅｌｌｏ,", "Wörld!", "<doc>"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    assert_eq!(
        String::from_utf8(output).expect("utf8").trim_end(),
        "hello wörld <doc>"
    );
}

#[test]
fn windows_accept_raw_normalization_order() {
    let workspace = temp_workspace();
    fs::write(workspace.path().join("corpus.txt"), LINE.repeat(2)).expect("write corpus");
    wordwin()
        .current_dir(workspace.path())
        .args([
            "vocab",
            "corpus.txt",
            "-o",
            "vocab.json",
            "--raw-normalization",
            "--no-progress",
        ])
        .assert()
        .success();

    let output = wordwin()
        .current_dir(workspace.path())
        .args([
            "windows",
            "-m",
            "vocab.json",
            "corpus.txt",
            "--json",
            "--raw-normalization",
        ])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let windows = window_lines(&output);
    assert_eq!(windows.len(), 20);
    assert_eq!(windows[0], vec![2, 0, 0]);
}
