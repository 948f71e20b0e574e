//! Integration tests for the kmsvault CLI.
//!
//! These tests exercise the binary end-to-end using `assert_cmd`.  They
//! run against the local key provider, so no network or cloud
//! credentials are needed.

use std::fs;
use std::path::PathBuf;

use assert_cmd::Command;
use assert_fs::prelude::*;
use assert_fs::TempDir;
use predicates::prelude::*;

const ENV_VARS: [&str; 9] = [
    "KMSVAULT_CONFIG",
    "KMSVAULT_PROJECT",
    "KMSVAULT_LOCATION",
    "KMSVAULT_KEYRING",
    "KMSVAULT_KEY",
    "KMSVAULT_VAULT",
    "KMSVAULT_PROVIDER",
    "KMSVAULT_LOCAL_KEY",
    "KMSVAULT_LOG",
];

/// Helper: get a Command pointing at the kmsvault binary, run inside `dir`.
fn kmsvault(dir: &TempDir) -> Command {
    #[allow(deprecated)]
    let mut cmd = Command::cargo_bin("kmsvault").expect("binary should exist");
    cmd.current_dir(dir.path());
    for var in ENV_VARS {
        cmd.env_remove(var);
    }
    cmd
}

fn key_path(dir: &TempDir) -> PathBuf {
    dir.path().join("keys").join("local.key")
}

/// Run `init` with the local provider and a complete key identity.
fn init_project(dir: &TempDir) {
    kmsvault(dir)
        .args(["init", "--provider", "local", "--local-key"])
        .arg(key_path(dir))
        .args(["-p", "acme", "-k", "app", "--key", "secrets"])
        .assert()
        .success();
}

fn stdout_of(cmd: &mut Command) -> String {
    let output = cmd.assert().success().get_output().stdout.clone();
    String::from_utf8(output).unwrap()
}

// ---------------------------------------------------------------------------
// Help and usage
// ---------------------------------------------------------------------------

#[test]
fn help_flag_shows_usage() {
    let dir = TempDir::new().unwrap();
    kmsvault(&dir)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("init"))
        .stdout(predicate::str::contains("encrypt"))
        .stdout(predicate::str::contains("decrypt"))
        .stdout(predicate::str::contains("secrets"))
        .stdout(predicate::str::contains("cloudbuild"))
        .stdout(predicate::str::contains("kube"));
}

#[test]
fn version_flag_shows_version() {
    let dir = TempDir::new().unwrap();
    kmsvault(&dir)
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("kmsvault"));
}

#[test]
fn no_args_shows_help() {
    let dir = TempDir::new().unwrap();
    kmsvault(&dir)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage"));
}

#[test]
fn completions_for_bash() {
    let dir = TempDir::new().unwrap();
    kmsvault(&dir)
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("kmsvault"));
}

// ---------------------------------------------------------------------------
// init
// ---------------------------------------------------------------------------

#[test]
fn init_writes_config_key_and_vault() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);

    dir.child(".kmsvault.toml")
        .assert(predicate::str::contains("project = \"acme\""))
        .assert(predicate::str::contains("provider = \"local\""));
    dir.child("kmsvault/main.json")
        .assert(predicate::str::contains("\"secrets\": {}"));
    assert_eq!(fs::read(key_path(&dir)).unwrap().len(), 32);
}

#[test]
fn init_twice_fails() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);

    kmsvault(&dir)
        .arg("init")
        .assert()
        .failure()
        .stderr(predicate::str::contains("already initialized"));
}

#[test]
fn init_without_key_settings_fails_and_writes_nothing() {
    let dir = TempDir::new().unwrap();

    kmsvault(&dir)
        .args(["init", "--provider", "local", "--local-key"])
        .arg(key_path(&dir))
        .args(["-p", "acme"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("keyring"));

    dir.child(".kmsvault.toml").assert(predicate::path::missing());
    dir.child("kmsvault").assert(predicate::path::missing());
}

// ---------------------------------------------------------------------------
// secrets
// ---------------------------------------------------------------------------

#[test]
fn add_get_remove_round_trip() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);

    kmsvault(&dir)
        .args(["secrets", "add", "DB_URL=postgres://u:p@h/db?ssl=on", "GREETING=hello world"])
        .assert()
        .success();

    let value = stdout_of(kmsvault(&dir).args(["secrets", "get", "DB_URL"]));
    assert_eq!(value, "postgres://u:p@h/db?ssl=on\n");

    // Stored values are ciphertext.
    dir.child("kmsvault/main.json")
        .assert(predicate::str::contains("hello world").not());

    kmsvault(&dir)
        .args(["secrets", "remove", "GREETING"])
        .assert()
        .success();

    kmsvault(&dir)
        .args(["secrets", "get", "GREETING"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found"));
}

#[test]
fn add_from_file_stores_contents() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);
    dir.child("cert.pem").write_str("-----BEGIN-----\nabc").unwrap();

    kmsvault(&dir)
        .args(["secrets", "add", "--file", "cert.pem", "--name", "TLS_CERT"])
        .assert()
        .success();

    let value = stdout_of(kmsvault(&dir).args(["secrets", "get", "TLS_CERT"]));
    assert_eq!(value, "-----BEGIN-----\nabc\n");
}

#[test]
fn add_rejects_invalid_pair() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);

    kmsvault(&dir)
        .args(["secrets", "add", "NOEQUALS"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("KEY=VALUE"));
}

#[test]
fn list_shows_names() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);
    kmsvault(&dir)
        .args(["secrets", "add", "ALPHA=1", "BETA=2"])
        .assert()
        .success();

    kmsvault(&dir)
        .args(["secrets", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("ALPHA"))
        .stdout(predicate::str::contains("BETA"));
}

#[test]
fn export_decrypted_shell() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);
    kmsvault(&dir)
        .args(["secrets", "add", "X=a b", "PORT=5432"])
        .assert()
        .success();

    let out = stdout_of(kmsvault(&dir).args([
        "secrets", "export", "--format", "shell", "--decrypt",
    ]));
    assert_eq!(out, "export PORT=5432\nexport X=\"a b\"\n");
}

#[test]
fn export_without_decrypt_keeps_ciphertext() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);
    kmsvault(&dir)
        .args(["secrets", "add", "X=plain"])
        .assert()
        .success();

    let out = stdout_of(kmsvault(&dir).args(["secrets", "export", "--format", "json"]));
    let parsed: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert!(parsed["X"].is_string());
    assert_ne!(parsed["X"], "plain");
}

#[test]
fn export_to_file() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);
    kmsvault(&dir)
        .args(["secrets", "add", "X=1"])
        .assert()
        .success();

    kmsvault(&dir)
        .args(["secrets", "export", "--format", "env", "--decrypt", "-o", "out.env"])
        .assert()
        .success();

    dir.child("out.env").assert("X=1");
}

#[test]
fn export_refuses_to_write_over_vault_by_relative_path() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);
    kmsvault(&dir)
        .args(["secrets", "add", "DB_PASS=hunter2"])
        .assert()
        .success();
    let before = std::fs::read_to_string(dir.path().join("kmsvault/main.json")).unwrap();

    for target in ["kmsvault/main.json", "./kmsvault/../kmsvault/main.json"] {
        kmsvault(&dir)
            .args(["secrets", "export", "--format", "env", "--decrypt", "-o", target])
            .assert()
            .failure()
            .stderr(predicate::str::contains("refusing to export"));
    }

    let after = std::fs::read_to_string(dir.path().join("kmsvault/main.json")).unwrap();
    assert_eq!(before, after);
    assert!(!after.contains("hunter2"));
}

#[test]
fn export_rejects_unknown_format() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);

    kmsvault(&dir)
        .args(["secrets", "export", "--format", "xml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not a supported export format"));
}

#[test]
fn import_env_file() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);
    dir.child(".env")
        .write_str("# app\nexport A=\"one two\"\nB=2\n")
        .unwrap();

    kmsvault(&dir)
        .args(["secrets", "import", ".env"])
        .assert()
        .success();

    let out = stdout_of(kmsvault(&dir).args([
        "secrets", "export", "--format", "env", "--decrypt",
    ]));
    assert_eq!(out, "A=\"one two\"\nB=2");
}

#[test]
fn get_on_missing_vault_fails() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);

    kmsvault(&dir)
        .args(["-v", "other", "secrets", "get", "ANY"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Vault not found"));
}

// ---------------------------------------------------------------------------
// encrypt / decrypt
// ---------------------------------------------------------------------------

#[test]
fn encrypt_then_decrypt() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);

    let token = stdout_of(kmsvault(&dir).args(["encrypt", "s3cret"]));
    assert!(!token.contains("s3cret"));

    let plain = stdout_of(kmsvault(&dir).args(["decrypt", &token]));
    assert_eq!(plain, "s3cret");

    let piped = stdout_of(kmsvault(&dir).args(["decrypt", "-"]).write_stdin(token));
    assert_eq!(piped, "s3cret");
}

#[test]
fn encrypt_from_stdin() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);

    let token = stdout_of(kmsvault(&dir).args(["encrypt", "--stdin"]).write_stdin("from pipe"));
    let plain = stdout_of(kmsvault(&dir).args(["decrypt", &token]));
    assert_eq!(plain, "from pipe");
}

#[test]
fn decrypt_with_other_key_fails() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);

    let token = stdout_of(kmsvault(&dir).args(["encrypt", "s3cret"]));

    kmsvault(&dir)
        .args(["--key", "other", "decrypt", &token])
        .assert()
        .failure()
        .stderr(predicate::str::contains("decrypt failed"));
}

// ---------------------------------------------------------------------------
// platform exports
// ---------------------------------------------------------------------------

#[test]
fn cloudbuild_lists_key_and_ciphertexts() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);
    kmsvault(&dir)
        .args(["secrets", "add", "DB_PASS=hunter2"])
        .assert()
        .success();

    kmsvault(&dir)
        .arg("cloudbuild")
        .assert()
        .success()
        .stdout(predicate::str::contains("kmsKeyName"))
        .stdout(predicate::str::contains(
            "projects/acme/locations/global/keyRings/app/cryptoKeys/secrets",
        ))
        .stdout(predicate::str::contains("DB_PASS"))
        .stdout(predicate::str::contains("hunter2").not());
}

#[test]
fn kube_manifest_is_named_after_version() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);
    kmsvault(&dir)
        .args(["secrets", "add", "DB_PASS=hunter2"])
        .assert()
        .success();

    kmsvault(&dir)
        .args(["kube", "manifest", "--namespace", "prod"])
        .assert()
        .success()
        .stdout(predicate::str::contains("kind: Secret"))
        .stdout(predicate::str::contains("type: Opaque"))
        .stdout(predicate::str::contains("namespace: prod"))
        .stdout(predicate::str::contains("name: kmsvault-main-"))
        // base64("hunter2")
        .stdout(predicate::str::contains("aHVudGVyMg=="));
}
