use assert_cmd::Command;
use predicates::str::contains;

#[test]
fn test_help_lists_subcommands() {
    Command::cargo_bin("repo-newsletter")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(contains("serve"))
        .stdout(contains("run"));
}

#[test]
fn test_run_requires_repo_and_page() {
    Command::cargo_bin("repo-newsletter")
        .unwrap()
        .arg("run")
        .assert()
        .failure()
        .stderr(contains("--repo"));
}

#[test]
fn test_serve_without_secrets_fails() {
    Command::cargo_bin("repo-newsletter")
        .unwrap()
        .arg("serve")
        .current_dir(std::env::temp_dir())
        .env_clear()
        .assert()
        .failure();
}
