use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use predicates::prelude::predicate;
use regex::Regex;
use serde_json::json;
use tempfile::TempDir;
use test_case::test_case;

struct Workspace {
    dir: TempDir,
}

impl Workspace {
    fn new(user_id: Option<&str>) -> Self {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let config = json!({
            "userId": user_id,
            "backend": "file",
            "dataFile": dir.path().join("data.json"),
        });
        fs::write(dir.path().join("config.json"), config.to_string()).expect("Failed to write config");

        Self { dir }
    }

    fn config(&self) -> PathBuf {
        self.dir.path().join("config.json")
    }

    fn data(&self) -> PathBuf {
        self.dir.path().join("data.json")
    }

    fn command(&self) -> Command {
        command(&self.config())
    }

    /// Runs a successful command and returns its stdout without colors.
    fn run(&self, args: &[&str]) -> String {
        let assert = self.command().args(args).assert().success().code(0);
        plain(&assert.get_output().stdout)
    }

    /// Creates a record and returns the id printed in the confirmation.
    fn create(&self, args: &[&str]) -> String {
        let output = self.run(&[&["new"][..], args].concat());
        let id = Regex::new(r"\(([0-9A-Za-z]{17})\) saved!").expect("Regex");

        id.captures(&output)
            .and_then(|captures| captures.get(1))
            .map(|id| id.as_str().to_owned())
            .unwrap_or_else(|| panic!("No id in {output}"))
    }
}

fn command(config: &Path) -> Command {
    let mut cmd = Command::cargo_bin("crm-cli").unwrap();
    cmd.env("NO_COLOR", "1")
        .args(["-c", config.to_str().expect("Path")]);
    cmd
}

fn plain(output: &[u8]) -> String {
    String::from_utf8(strip_ansi_escapes::strip(output)).expect("Utf8")
}

#[test]
fn run_help() {
    let mut cmd = Command::cargo_bin("crm-cli").unwrap();
    let assert = cmd.args(["--help"]).assert();

    assert.success().code(0);
}

#[test]
fn run_help_without_arguments() {
    let mut cmd = Command::cargo_bin("crm-cli").unwrap();
    let assert = cmd.assert();

    assert.failure().code(2);
}

#[test_case(&["new"] ; "new without kind")]
#[test_case(&["list", "account"] ; "unknown kind")]
#[test_case(&["new", "stage", "--probability", "101"] ; "probability out of range")]
#[test_case(&["new", "deal", "--close-date", "tomorrow"] ; "bad date")]
fn run_with_bad_arguments(args: &[&str]) {
    let workspace = Workspace::new(Some("u1"));

    workspace.command().args(args).assert().failure().code(2);
}

#[test]
fn run_with_missing_config() {
    command(Path::new("/nonexistent/crm/config.json"))
        .args(["list", "board"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Unable to read config file"));
}

#[test]
fn run_create_board_and_pipeline() {
    let workspace = Workspace::new(Some("u1"));

    let board = workspace.create(&["board", "-n", "Sales"]);
    let other = workspace.create(&["board", "-n", "Support"]);
    workspace.create(&["pipeline", "-n", "Leads", "-b", &board]);
    workspace.create(&["pipeline", "-n", "Tickets", "-b", &other]);

    let output = workspace.run(&["list", "pipeline", "--board", &board]);
    assert!(output.contains("Leads"));
    assert!(!output.contains("Tickets"));

    let output = workspace.run(&["list", "board"]);
    assert!(output.contains("2 board(s)"));
}

#[test]
fn run_create_with_missing_parent() {
    let workspace = Workspace::new(Some("u1"));

    workspace
        .command()
        .args(["new", "pipeline", "-n", "Leads", "-b", "nonexistent"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Board not found with id nonexistent"));
}

#[test]
fn run_edit_keeps_other_fields() {
    let workspace = Workspace::new(Some("u1"));
    let board = workspace.create(&["board", "-n", "Sales"]);
    let pipeline = workspace.create(&["pipeline", "-n", "Leads", "-b", &board]);

    let output = workspace.run(&["edit", "pipeline", "-i", &pipeline, "-n", "Qualified"]);
    assert!(output.contains("Pipeline Qualified"));

    workspace
        .command()
        .args(["edit", "pipeline", "-i", &pipeline, "-n", "Lost", "-b", "nonexistent"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Board not found"));

    let output = workspace.run(&["list", "pipeline", "--board", &board]);
    assert!(output.contains("Qualified"));
    assert!(!output.contains("Lost"));
}

#[test]
fn run_remove() {
    let workspace = Workspace::new(Some("u1"));
    let board = workspace.create(&["board", "-n", "Sales"]);

    workspace
        .command()
        .args(["remove", "board", "-i", "missing"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Board not found with id missing"));

    let output = workspace.run(&["remove", "board", "-i", &board]);
    assert!(output.contains("Board Sales removed"));

    workspace
        .command()
        .args(["list", "board"])
        .assert()
        .failure()
        .code(1)
        .stdout(predicate::str::contains("No board found"));
}

#[test]
fn run_without_user() {
    let workspace = Workspace::new(None);

    workspace
        .command()
        .args(["new", "board", "-n", "Sales"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Login required"));
    assert!(!workspace.data().exists());

    workspace
        .command()
        .args(["new", "brand", "-n", "Acme", "-e", "Anvils"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Login required"));
    assert!(!workspace.data().exists());

    // Reads do not need a user.
    workspace
        .command()
        .args(["list", "board"])
        .assert()
        .failure()
        .code(1)
        .stdout(predicate::str::contains("No board found"));
    assert!(!workspace.data().exists());

    let board = workspace.create(&["board", "-n", "Sales", "-u", "u2"]);
    assert_eq!(17, board.len());
}

#[test]
fn run_brand_codes() {
    let workspace = Workspace::new(Some("u1"));

    let output = workspace.run(&["new", "brand", "-n", "Acme", "-e", "Anvils", "--code", "acme01"]);
    assert!(output.contains("Acme [acme01]"));

    let output = workspace.run(&["new", "brand", "-n", "Globex", "-e", "Widgets", "--code", "acme01"]);
    let code = Regex::new(r"Globex \[([0-9A-Za-z]{6})\]")
        .expect("Regex")
        .captures(&output)
        .and_then(|captures| captures.get(1))
        .map(|code| code.as_str().to_owned())
        .expect("Code");
    assert_ne!("acme01", code);

    let output = workspace.run(&["list", "brand", "--code", "acme01"]);
    assert!(output.contains("Acme"));
    assert!(!output.contains("Globex"));

    workspace
        .command()
        .args(["list", "brand", "--code", "nope00"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Brand not found with code nope00"));
}

#[test]
fn run_manage_integrations_and_conversations() {
    let workspace = Workspace::new(Some("u1"));
    let brand = workspace.create(&["brand", "-n", "Acme", "-e", "Anvils"]);
    let chat = workspace.create(&["integration", "-n", "Chat"]);
    let form = workspace.create(&["integration", "-n", "Lead form", "-k", "form"]);

    let output = workspace.run(&["edit", "integrations", "-b", &brand, &chat, &form]);
    assert!(output.contains("2 integration(s) now belong to brand"));

    let output = workspace.run(&["list", "integration", "--brand", &brand]);
    assert!(output.contains("Chat (messenger)"));
    assert!(output.contains("Lead form (form)"));

    let conversation = workspace.create(&["conversation", "-t", "Hello", "-g", &chat]);
    let output = workspace.run(&["edit", "conversation", "-i", &conversation]);
    assert!(output.contains("is now closed"));
    let output = workspace.run(&["edit", "conversation", "-i", &conversation]);
    assert!(output.contains("is now open"));
    let output = workspace.run(&["edit", "conversation", "-i", &conversation, "--status", "closed"]);
    assert!(output.contains("is now closed"));

    let output = workspace.run(&["edit", "conversation", "-i", &conversation, "-t", "Hi"]);
    assert!(output.contains("saved!"));
    assert!(!output.contains("is now"));
    let output = workspace.run(&["list", "conversation", "--integration", &chat]);
    assert!(output.contains("[closed] Hi"));
}

#[test]
fn run_deal_in_stage() {
    let workspace = Workspace::new(Some("u1"));
    let board = workspace.create(&["board", "-n", "Sales"]);
    let pipeline = workspace.create(&["pipeline", "-n", "Leads", "-b", &board]);
    let stage = workspace.create(&["stage", "-n", "Won", "-p", &pipeline, "--probability", "90"]);

    let output = workspace.run(&[
        "new",
        "deal",
        "-s",
        &stage,
        "-t",
        "Renewal",
        "--amount",
        "1250",
        "--close-date",
        "2024-07-05",
        "--product",
        "p1",
        "--product",
        "p2",
    ]);
    assert!(output.contains("Renewal [1250.00]"));

    let output = workspace.run(&["list", "stage", "--pipeline", &pipeline]);
    assert!(output.contains("Won (90%)"));

    let output = workspace.run(&["list", "deal", "--stage", &stage]);
    assert!(output.contains("Renewal"));
}
