//! Tests for the `fullupdate` binary.

use predicates::prelude::*;
use std::fs;

use fullupdate_cli::metadata::sha512_hex;
use fullupdate_cli::test_utils::WorkdirFixture;

use crate::common::{FAILING_BUILD_TOOL, FakeTools, LISTING_BUILD_TOOL, SLOW_BUILD_TOOL, fullupdate};

fn fixture_with_installer() -> WorkdirFixture {
    let fixture = WorkdirFixture::new("app").unwrap();
    fixture
        .add_installer(
            "App_25.8_Linux_x86-64.tar.gz",
            &[("App_25.8/program/soffice", "#!/bin/true"), ("App_25.8/readme.txt", "hi")],
        )
        .unwrap();
    fixture
}

#[test]
fn test_builds_signs_and_describes() {
    let fixture = fixture_with_installer();
    let tools = FakeTools::new(LISTING_BUILD_TOOL);

    fullupdate(&fixture, &tools)
        .assert()
        .success()
        .stdout(predicate::str::contains("update-complete.mar"))
        .stdout(predicate::str::contains("complete_info.json"));

    let container = fixture.update_dir().join("update-complete.mar");
    let content = fs::read_to_string(&container).unwrap();
    assert_eq!(content, "./program/soffice\n./readme.txt\nSIGNED:release");
    assert_eq!(tools.mar_invocations().len(), 1);
    assert!(!fixture.update_dir().join("update-signed-complete.mar").exists());

    let descriptor = fs::read_to_string(fixture.update_dir().join("complete_info.json")).unwrap();
    assert!(descriptor.starts_with("{\n    \"complete\": {\n        \"hash\""));
    assert!(!descriptor.ends_with('\n'));

    let json: serde_json::Value = serde_json::from_str(&descriptor).unwrap();
    let complete = &json["complete"];
    assert_eq!(complete["hash_function"], "sha512");
    assert_eq!(complete["hash"], sha512_hex(&container).unwrap());
    assert_eq!(complete["size"], content.len() as u64);
    assert_eq!(complete["url"], "https://example.org/builds/update-complete.mar");
}

#[test]
fn test_mar_receives_certificate_arguments() {
    let fixture = fixture_with_installer();
    let tools = FakeTools::new(LISTING_BUILD_TOOL);

    fullupdate(&fixture, &tools).assert().success();

    let args = &tools.mar_invocations()[0];
    let update_dir = fixture.update_dir().display().to_string();
    let expected = format!(
        "-C {update_dir} -d {} -n release -s {update_dir}/update-complete.mar {update_dir}/update-signed-complete.mar",
        fixture.certificate_dir().display()
    );
    assert_eq!(args, &expected);
}

#[test]
fn test_rerun_is_idempotent() {
    let fixture = fixture_with_installer();
    let tools = FakeTools::new(LISTING_BUILD_TOOL);
    let descriptor = fixture.update_dir().join("complete_info.json");

    fullupdate(&fixture, &tools).assert().success();
    let first = fs::read_to_string(&descriptor).unwrap();
    fullupdate(&fixture, &tools).assert().success();
    let second = fs::read_to_string(&descriptor).unwrap();

    assert_eq!(first, second);
}

#[test]
fn test_missing_installer_fails_before_build() {
    let fixture = WorkdirFixture::new("app").unwrap();
    let tools = FakeTools::new(LISTING_BUILD_TOOL);

    fullupdate(&fixture, &tools)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("No installer found"))
        .stderr(predicate::str::contains("locate-installer"));

    assert!(!fixture.update_dir().join("update-complete.mar").exists());
    assert!(tools.mar_invocations().is_empty());
}

#[test]
fn test_multiple_installers() {
    let fixture = fixture_with_installer();
    fixture.add_installer("App_25.8_Linux_x86-64_debug.tar.gz", &[("Debug/file", "x")]).unwrap();
    let tools = FakeTools::new(LISTING_BUILD_TOOL);

    fullupdate(&fixture, &tools)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Expected exactly one installer"));

    let config = fixture.root().join("fullupdate.toml");
    fs::write(&config, "installer_selection = \"lexicographic-first\"\n").unwrap();
    fullupdate(&fixture, &tools).arg("--config").arg(&config).assert().success();

    let content = fs::read_to_string(fixture.update_dir().join("update-complete.mar")).unwrap();
    assert!(content.contains("./readme.txt"));
}

#[test]
fn test_build_failure_skips_signing() {
    let fixture = fixture_with_installer();
    let tools = FakeTools::new(FAILING_BUILD_TOOL);

    fullupdate(&fixture, &tools)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("make_full_update.sh"))
        .stderr(predicate::str::contains("build-container"));

    assert!(tools.mar_invocations().is_empty());
    assert!(!fixture.update_dir().join("complete_info.json").exists());
}

#[test]
fn test_build_timeout() {
    let fixture = fixture_with_installer();
    let tools = FakeTools::new(SLOW_BUILD_TOOL);

    fullupdate(&fixture, &tools)
        .arg("--build-timeout")
        .arg("1")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("timed out"));

    assert!(tools.mar_invocations().is_empty());
}

#[test]
fn test_missing_build_tool() {
    let fixture = fixture_with_installer();
    let tools = FakeTools::new(LISTING_BUILD_TOOL);

    fullupdate(&fixture, &tools)
        .env("FULLUPDATE_CONTAINER_TOOL", fixture.root().join("no-such-tool.sh"))
        .assert()
        .code(1)
        .stderr(predicate::str::contains("not found"));

    assert!(tools.mar_invocations().is_empty());
}

#[test]
fn test_missing_certificate_store() {
    let fixture = fixture_with_installer();
    let tools = FakeTools::new(LISTING_BUILD_TOOL);
    fs::remove_dir(fixture.certificate_dir()).unwrap();

    fullupdate(&fixture, &tools)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Certificate database not found"));

    assert!(fixture.update_dir().join("update-complete.mar").exists());
    assert!(!fixture.update_dir().join("complete_info.json").exists());
}

#[test]
fn test_missing_arguments() {
    assert_cmd::Command::cargo_bin("fullupdate")
        .unwrap()
        .args(["app", "/tmp/work"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("<FILENAME_PREFIX>"));
}
