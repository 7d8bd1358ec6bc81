//! CLI subprocess integration tests.
//!
//! These tests invoke the `strata` binary as a subprocess and verify
//! exit codes, stdout content, and JSON output stability.

use std::process::Command;

fn strata_bin() -> Command {
    Command::new(env!("CARGO_BIN_EXE_strata"))
}

fn write_layout(dir: &std::path::Path, contents: &str) -> std::path::PathBuf {
    let path = dir.join("gadget.yaml");
    std::fs::write(&path, contents).unwrap();
    path
}

const PC_LAYOUT: &str = r#"volumes:
  pc:
    bootloader: grub
    structure:
      - name: mbr
        type: mbr
        size: 440
        content:
          - image: pc-boot.img
      - name: BIOS Boot
        type: DA,21686148-6449-6E6F-744E-656564454649
        size: 1M
        offset: 1M
        offset-write: mbr+92
        content:
          - image: pc-core.img
      - name: EFI System
        type: EF,C12A7328-F81F-11D2-BA4B-00A0C93EC93B
        filesystem: vfat
        filesystem-label: system-boot
        size: 50M
        content:
          - source: grubx64.efi
            target: EFI/boot/grubx64.efi
"#;

const CLASSIC_LAYOUT: &str = r#"defaults:
  system:
    service.ssh.disable: true
"#;

#[test]
fn cli_version_exits_zero() {
    let output = strata_bin().arg("--version").output().unwrap();
    assert!(output.status.success(), "strata --version must exit 0");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(
        stdout.contains("strata"),
        "version output must contain 'strata': {stdout}"
    );
}

#[test]
fn cli_help_exits_zero() {
    let output = strata_bin().arg("--help").output().unwrap();
    assert!(output.status.success(), "strata --help must exit 0");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(
        stdout.contains("validate"),
        "help must list 'validate' command"
    );
    assert!(
        stdout.contains("inspect"),
        "help must list 'inspect' command"
    );
}

#[test]
fn cli_validate_accepts_a_complete_layout() {
    let dir = tempfile::tempdir().unwrap();
    let layout = write_layout(dir.path(), PC_LAYOUT);

    let output = strata_bin()
        .args(["validate", &layout.to_string_lossy()])
        .output()
        .unwrap();

    assert!(
        output.status.success(),
        "validate must exit 0. stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(
        stdout.contains("1 volumes, 3 structures"),
        "validate must report counts, got: {stdout}"
    );
}

#[test]
fn cli_validate_json_reports_valid_documents() {
    let dir = tempfile::tempdir().unwrap();
    let layout = write_layout(dir.path(), PC_LAYOUT);

    let output = strata_bin()
        .args(["--json", "validate", &layout.to_string_lossy()])
        .output()
        .unwrap();

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    let json: serde_json::Value = serde_json::from_str(&stdout)
        .unwrap_or_else(|e| panic!("validate --json must produce valid JSON: {e}\n{stdout}"));
    assert_eq!(json["valid"].as_bool(), Some(true));
    assert_eq!(json["volumes"].as_u64(), Some(1));
    assert_eq!(json["structures"].as_u64(), Some(3));
}

#[test]
fn cli_validate_rejects_a_broken_layout() {
    let dir = tempfile::tempdir().unwrap();
    let layout = write_layout(
        dir.path(),
        "volumes:\n  pc:\n    bootloader: frob\n    structure:\n      - type: mbr\n        size: 440\n",
    );

    let output = strata_bin()
        .args(["validate", &layout.to_string_lossy()])
        .output()
        .unwrap();

    assert_eq!(
        output.status.code(),
        Some(2),
        "broken layouts must exit 2, stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(
        stdout.contains("cannot read gadget snap details:")
            && stdout.contains("bootloader must be one of grub, u-boot or android-boot"),
        "validate must print the failure, got: {stdout}"
    );
}

#[test]
fn cli_validate_json_reports_errors() {
    let dir = tempfile::tempdir().unwrap();
    let layout = write_layout(dir.path(), "volumes:\n  pc:\n    schema: sfs\n");

    let output = strata_bin()
        .args(["--json", "validate", &layout.to_string_lossy()])
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(2));
    let stdout = String::from_utf8_lossy(&output.stdout);
    let json: serde_json::Value = serde_json::from_str(&stdout)
        .unwrap_or_else(|e| panic!("validate --json must produce valid JSON: {e}\n{stdout}"));
    assert_eq!(json["valid"].as_bool(), Some(false));
    let error = json["error"].as_str().unwrap();
    assert!(
        error.contains(r#"invalid volume "pc": invalid schema "sfs""#),
        "error must name the volume and schema, got: {error}"
    );
}

#[test]
fn cli_validate_missing_file_exits_two() {
    let output = strata_bin()
        .args(["validate", "/tmp/nonexistent_strata_layout_12345.yaml"])
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("failed to read layout"),
        "stderr must mention the unreadable layout, got: {stderr}"
    );
}

#[test]
fn cli_validate_relaxed_accepts_classic_layouts() {
    let dir = tempfile::tempdir().unwrap();
    let layout = write_layout(dir.path(), CLASSIC_LAYOUT);

    let strict = strata_bin()
        .args(["validate", &layout.to_string_lossy()])
        .output()
        .unwrap();
    assert_eq!(
        strict.status.code(),
        Some(2),
        "strict mode must reject a volume-less layout"
    );

    let relaxed = strata_bin()
        .args(["validate", &layout.to_string_lossy(), "--relaxed"])
        .output()
        .unwrap();
    assert!(
        relaxed.status.success(),
        "relaxed mode must accept a volume-less layout. stderr: {}",
        String::from_utf8_lossy(&relaxed.stderr)
    );
}

#[test]
fn cli_inspect_json_matches_the_document() {
    let dir = tempfile::tempdir().unwrap();
    let layout = write_layout(dir.path(), PC_LAYOUT);

    let output = strata_bin()
        .args(["--json", "inspect", &layout.to_string_lossy()])
        .output()
        .unwrap();

    assert!(
        output.status.success(),
        "inspect --json must exit 0. stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let stdout = String::from_utf8_lossy(&output.stdout);
    let json: serde_json::Value = serde_json::from_str(&stdout)
        .unwrap_or_else(|e| panic!("inspect --json must produce valid JSON: {e}\n{stdout}"));
    let pc = &json["volumes"]["pc"];
    assert_eq!(pc["schema"].as_str(), Some("gpt"));
    assert_eq!(pc["bootloader"].as_str(), Some("grub"));
    assert_eq!(pc["structure"][0]["type"].as_str(), Some("mbr"));
    assert_eq!(pc["structure"][0]["role"].as_str(), Some("mbr"));
    assert_eq!(
        pc["structure"][2]["filesystem-label"].as_str(),
        Some("system-boot")
    );
}

#[test]
fn cli_inspect_plain_prints_volumes() {
    let dir = tempfile::tempdir().unwrap();
    let layout = write_layout(dir.path(), PC_LAYOUT);

    let output = strata_bin()
        .args(["inspect", &layout.to_string_lossy()])
        .output()
        .unwrap();

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("volume: pc"), "got: {stdout}");
    assert!(stdout.contains("grub"), "got: {stdout}");
    assert!(stdout.contains("EFI System"), "got: {stdout}");
    assert!(stdout.contains("50M"), "got: {stdout}");
}

#[test]
fn cli_inspect_broken_layout_exits_two() {
    let dir = tempfile::tempdir().unwrap();
    let layout = write_layout(dir.path(), "volumes:\n  -bad-name-:\n    bootloader: grub\n");

    let output = strata_bin()
        .args(["inspect", &layout.to_string_lossy()])
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("cannot read gadget snap details:"),
        "stderr must carry the read failure, got: {stderr}"
    );
}

#[test]
fn cli_completions_bash_exits_zero() {
    let output = strata_bin().args(["completions", "bash"]).output().unwrap();
    assert!(output.status.success(), "completions must exit 0");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(
        stdout.contains("strata"),
        "completion script must mention the binary, got: {stdout}"
    );
}
