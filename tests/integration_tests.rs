//! Integration tests for the issue-pilot CLI.
//!
//! Client commands run against an `httpmock` server standing in for the
//! backend, so no network access or real credentials are needed.

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use httpmock::prelude::*;
use predicates::prelude::*;
use serde_json::json;
use std::fs;
use tempfile::TempDir;

/// Helper to create an issue-pilot Command isolated from the caller's
/// environment and any `.env` file.
fn pilot(dir: &TempDir) -> Command {
    let mut cmd = cargo_bin_cmd!("issue-pilot");
    cmd.current_dir(dir.path())
        .env_remove("GITHUB_TOKEN")
        .env_remove("DEVIN_API_KEY")
        .env_remove("ISSUE_PILOT_SERVER_URL")
        .env_remove("ISSUE_PILOT_POLL_INTERVAL_SECS")
        .env_remove("ISSUE_PILOT_HTTP_TIMEOUT_SECS");
    cmd
}

fn create_temp_dir() -> TempDir {
    TempDir::new().unwrap()
}

fn session_json(session_id: &str, status: &str, kind: &str) -> serde_json::Value {
    json!({
        "session_id": session_id,
        "status": status,
        "kind": kind,
        "repo": "octo/demo",
        "issue_number": 1,
        "message": "Devin is analyzing the issue",
        "should_poll": status == "scoping" || status == "implementing"
    })
}

// =============================================================================
// Basic CLI Tests
// =============================================================================

mod cli_basics {
    use super::*;

    #[test]
    fn test_help() {
        let dir = create_temp_dir();
        pilot(&dir)
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("serve"))
            .stdout(predicate::str::contains("issues"))
            .stdout(predicate::str::contains("board"))
            .stdout(predicate::str::contains("scope"))
            .stdout(predicate::str::contains("complete"))
            .stdout(predicate::str::contains("watch"));
    }

    #[test]
    fn test_version() {
        let dir = create_temp_dir();
        pilot(&dir)
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("issue-pilot"));
    }

    #[test]
    fn test_help_hides_credential_values() {
        let dir = create_temp_dir();
        pilot(&dir)
            .env("GITHUB_TOKEN", "ghp_should_not_print")
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("ghp_should_not_print").not());
    }
}

// =============================================================================
// Argument Validation
// =============================================================================

mod argument_validation {
    use super::*;

    #[test]
    fn test_invalid_repo_rejected() {
        let dir = create_temp_dir();
        pilot(&dir)
            .args(["issues", "--repo", "not-a-repo", "--github-token", "t"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("owner/name"));
    }

    #[test]
    fn test_missing_github_token() {
        let dir = create_temp_dir();
        pilot(&dir)
            .args(["issues", "--repo", "octo/demo"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("GITHUB_TOKEN"));
    }

    #[test]
    fn test_scope_requires_devin_key() {
        let dir = create_temp_dir();
        pilot(&dir)
            .args(["scope", "--repo", "octo/demo", "--issue", "1", "--github-token", "t"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("DEVIN_API_KEY"));
    }

    #[test]
    fn test_unknown_session_kind_rejected() {
        let dir = create_temp_dir();
        pilot(&dir)
            .args([
                "watch",
                "--repo",
                "octo/demo",
                "--issue",
                "1",
                "--session-id",
                "s1",
                "--kind",
                "deploy",
            ])
            .assert()
            .failure()
            .stderr(predicate::str::contains("deploy"));
    }
}

// =============================================================================
// Client Commands Against A Mock Backend
// =============================================================================

mod client_commands {
    use super::*;

    #[test]
    fn test_issues_prints_table() {
        let dir = create_temp_dir();
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/api/issues")
                .query_param("repo", "octo/demo")
                .query_param("github_token", "ghp_test");
            then.status(200).json_body(json!([{
                "number": 1,
                "title": "Bug",
                "body": null,
                "state": "open",
                "html_url": "https://github.com/octo/demo/issues/1",
                "created_at": "2024-01-01T00:00:00Z",
                "updated_at": "2024-01-01T00:00:00Z",
                "labels": [{"name": "bug", "color": "d73a4a"}]
            }]));
        });

        pilot(&dir)
            .args(["--server-url", &server.base_url()])
            .args(["issues", "--repo", "octo/demo", "--github-token", "ghp_test"])
            .assert()
            .success()
            .stdout(predicate::str::contains("#1"))
            .stdout(predicate::str::contains("Bug"))
            .stdout(predicate::str::contains("bug"));
        mock.assert();
    }

    #[test]
    fn test_issues_backend_error_fails() {
        let dir = create_temp_dir();
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/api/issues");
            then.status(401)
                .json_body(json!({"error": "GitHub rejected the credential: Bad credentials"}));
        });

        pilot(&dir)
            .args(["--server-url", &server.base_url()])
            .args(["issues", "--repo", "octo/demo", "--github-token", "bad"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Bad credentials"));
    }

    #[test]
    fn test_scope_without_watch() {
        let dir = create_temp_dir();
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/api/scope")
                .json_body(json!({
                    "repo": "octo/demo",
                    "issue_number": 1,
                    "github_token": "t",
                    "devin_api_key": "k"
                }));
            then.status(200).json_body(session_json("s1", "scoping", "scope"));
        });

        pilot(&dir)
            .args(["--server-url", &server.base_url()])
            .args(["--github-token", "t", "--devin-api-key", "k"])
            .args(["scope", "--repo", "octo/demo", "--issue", "1", "--no-watch"])
            .assert()
            .success()
            .stdout(predicate::str::contains("s1"))
            .stdout(predicate::str::contains("scoping"));
        mock.assert();
    }

    #[test]
    fn test_complete_continues_given_session() {
        let dir = create_temp_dir();
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/api/complete")
                .body_includes("\"session_id\":\"s1\"");
            then.status(200)
                .json_body(session_json("s1", "implementing", "complete"));
        });

        pilot(&dir)
            .args(["--server-url", &server.base_url()])
            .args(["--github-token", "t", "--devin-api-key", "k"])
            .args(["complete", "--repo", "octo/demo", "--issue", "1"])
            .args(["--session-id", "s1", "--no-watch"])
            .assert()
            .success()
            .stdout(predicate::str::contains("implementing"));
        mock.assert();
    }

    #[test]
    fn test_watch_stops_when_finished() {
        let dir = create_temp_dir();
        let server = MockServer::start();
        let mut finished = session_json("s1", "finished", "scope");
        finished["confidence_score"] = json!(82);
        finished["action_plan"] = json!("1. ...");
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/api/session/s1")
                .query_param("devin_api_key", "k");
            then.status(200).json_body(finished);
        });

        pilot(&dir)
            .env("ISSUE_PILOT_POLL_INTERVAL_SECS", "1")
            .args(["--server-url", &server.base_url(), "--devin-api-key", "k"])
            .args(["watch", "--repo", "octo/demo", "--issue", "1", "--session-id", "s1"])
            .timeout(std::time::Duration::from_secs(30))
            .assert()
            .success()
            .stdout(predicate::str::contains("Confidence: 82/100"))
            .stdout(predicate::str::contains("1. ..."))
            .stdout(predicate::str::contains("Session s1 finished."));
        mock.assert();
    }
}

// =============================================================================
// Interactive Board
// =============================================================================

mod board {
    use super::*;

    fn mock_issues(server: &MockServer) {
        server.mock(|when, then| {
            when.method(GET).path("/api/issues");
            then.status(200).json_body(json!([{
                "number": 1,
                "title": "Bug",
                "body": null,
                "state": "open",
                "html_url": "https://github.com/octo/demo/issues/1",
                "created_at": "2024-01-01T00:00:00Z",
                "updated_at": "2024-01-01T00:00:00Z",
                "labels": []
            }]));
        });
    }

    fn mock_refresh(server: &MockServer, session_id: &str, status: &str, kind: &str) {
        let body = session_json(session_id, status, kind);
        let path = format!("/api/session/{}", session_id);
        server.mock(|when, then| {
            when.method(GET).path(path);
            then.status(200).json_body(body);
        });
    }

    #[test]
    fn test_second_scope_of_same_issue_refused() {
        let dir = create_temp_dir();
        let server = MockServer::start();
        mock_issues(&server);
        mock_refresh(&server, "s1", "scoping", "scope");
        let scope = server.mock(|when, then| {
            when.method(POST).path("/api/scope");
            then.status(200).json_body(session_json("s1", "scoping", "scope"));
        });

        pilot(&dir)
            .args(["--server-url", &server.base_url()])
            .args(["--github-token", "t", "--devin-api-key", "k"])
            .args(["board", "--repo", "octo/demo"])
            .write_stdin("scope 1\nscope 1\nlist\nquit\n")
            .timeout(std::time::Duration::from_secs(30))
            .assert()
            .success()
            .stdout(predicate::str::contains("Issue #1 already has a session"))
            .stdout(predicate::str::contains("(s1)"));
        scope.assert();
    }

    #[test]
    fn test_complete_continues_scope_session_from_board() {
        let dir = create_temp_dir();
        let server = MockServer::start();
        mock_issues(&server);
        mock_refresh(&server, "s1", "finished", "scope");
        server.mock(|when, then| {
            when.method(POST).path("/api/scope");
            then.status(200).json_body(session_json("s1", "scoping", "scope"));
        });
        let complete = server.mock(|when, then| {
            when.method(POST)
                .path("/api/complete")
                .body_includes("\"session_id\":\"s1\"");
            then.status(200)
                .json_body(session_json("s1", "implementing", "complete"));
        });

        pilot(&dir)
            .args(["--server-url", &server.base_url()])
            .args(["--github-token", "t", "--devin-api-key", "k"])
            .args(["board", "--repo", "octo/demo"])
            .write_stdin("scope 1\ncomplete 1\nquit\n")
            .timeout(std::time::Duration::from_secs(30))
            .assert()
            .success()
            .stdout(predicate::str::contains("implementing"));
        complete.assert();
    }

    #[test]
    fn test_unknown_board_command_reported() {
        let dir = create_temp_dir();
        let server = MockServer::start();
        mock_issues(&server);

        pilot(&dir)
            .args(["--server-url", &server.base_url(), "--github-token", "t"])
            .args(["board", "--repo", "octo/demo"])
            .write_stdin("deploy 1\n")
            .timeout(std::time::Duration::from_secs(30))
            .assert()
            .success()
            .stdout(predicate::str::contains("Unknown command 'deploy'"))
            .stdout(predicate::str::contains("Bug"));
    }
}

// =============================================================================
// Configuration
// =============================================================================

mod configuration {
    use super::*;

    #[test]
    fn test_server_url_from_config_file() {
        let dir = create_temp_dir();
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/api/issues");
            then.status(200).json_body(json!([]));
        });

        fs::create_dir_all(dir.path().join(".issue-pilot")).unwrap();
        fs::write(
            dir.path().join(".issue-pilot/config.toml"),
            format!("[client]\nserver_url = \"{}\"\n", server.base_url()),
        )
        .unwrap();

        pilot(&dir)
            .args(["issues", "--repo", "octo/demo", "--github-token", "t"])
            .assert()
            .success()
            .stdout(predicate::str::contains("No open issues in octo/demo"));
        mock.assert();
    }

    #[test]
    fn test_malformed_config_file_fails() {
        let dir = create_temp_dir();
        let path = dir.path().join("broken.toml");
        fs::write(&path, "[client\nserver_url = 1").unwrap();

        pilot(&dir)
            .args(["--config", path.to_str().unwrap()])
            .args(["issues", "--repo", "octo/demo", "--github-token", "t"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Failed to parse config.toml"));
    }

    #[test]
    fn test_bad_env_number_fails() {
        let dir = create_temp_dir();
        pilot(&dir)
            .env("ISSUE_PILOT_POLL_INTERVAL_SECS", "often")
            .args(["issues", "--repo", "octo/demo", "--github-token", "t"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("ISSUE_PILOT_POLL_INTERVAL_SECS"));
    }
}
