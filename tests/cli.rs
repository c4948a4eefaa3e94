use assert_cmd::Command;
use predicates::prelude::*;
use predicates::str::contains;
use tempfile::TempDir;

fn cmd() -> Command {
    Command::cargo_bin("state-enforcer").unwrap()
}

fn model(name: &str) -> String {
    format!("{}/tests/models/{name}", env!("CARGO_MANIFEST_DIR"))
}

#[test]
fn java_and_diagram_are_written() {
    let out = TempDir::new().unwrap();
    cmd()
        .arg(model("door.yml"))
        .arg(out.path())
        .assert()
        .success()
        .stdout(contains("2 unique states found:"))
        .stdout(contains("0x2AAB"));

    let java = std::fs::read_to_string(out.path().join("StateModel.java")).unwrap();
    assert!(java.contains("package yourpackage;"));
    let dot = std::fs::read_to_string(out.path().join("state_model.dot")).unwrap();
    assert!(dot.contains("Source yaml file: door.yml"));
}

#[test]
fn rust_target_and_package_override() {
    let out = TempDir::new().unwrap();
    cmd()
        .args(["--target", "rust", "--package", "demo.pkg", "--no-diagram"])
        .arg(model("card.yml"))
        .arg(out.path())
        .assert()
        .success();

    let rust = std::fs::read_to_string(out.path().join("state_model.rs")).unwrap();
    assert!(rust.contains("pub struct CardStateModel"));
    assert!(rust.contains("demo.pkg"));
    assert!(!out.path().join("state_model.dot").exists());
}

#[test]
fn missing_output_directory_is_created() {
    let out = TempDir::new().unwrap();
    let nested = out.path().join("a").join("b");
    cmd().arg(model("door.yml")).arg(&nested).assert().success();
    assert!(nested.join("StateModel.java").exists());
}

#[test]
fn missing_model_argument_prints_usage() {
    cmd()
        .assert()
        .code(2)
        .stderr(contains("Usage"));
}

#[test]
fn bad_model_writes_nothing() {
    let out = TempDir::new().unwrap();
    cmd()
        .arg(model("broken.yml"))
        .arg(out.path())
        .assert()
        .code(1)
        .stderr(contains("error:").and(contains("ambiguous transition")));
    assert_eq!(std::fs::read_dir(out.path()).unwrap().count(), 0);
}

#[test]
fn failed_diagram_write_keeps_the_guards_back() {
    let out = TempDir::new().unwrap();
    std::fs::create_dir(out.path().join("state_model.dot")).unwrap();
    cmd()
        .arg(model("door.yml"))
        .arg(out.path())
        .assert()
        .code(1)
        .stderr(contains("state_model.dot"));

    assert!(!out.path().join("StateModel.java").exists());
    let left: Vec<_> = std::fs::read_dir(out.path())
        .unwrap()
        .map(|entry| entry.unwrap().file_name().into_string().unwrap())
        .collect();
    assert_eq!(left, ["state_model.dot"]);
}

#[test]
fn unreadable_model_names_the_path() {
    let out = TempDir::new().unwrap();
    cmd()
        .arg(model("missing.yml"))
        .arg(out.path())
        .assert()
        .code(1)
        .stderr(contains("failed to read model").and(contains("missing.yml")));
}
