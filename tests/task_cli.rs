mod support;

use assert_cmd::Command;
use predicates::str::contains;
use serde_json::{json, Value};
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use support::{task_row, TestWorkspace};

const TABLE_PATH: &str = "/rest/v1/tasks";

fn pinboard(ws: &TestWorkspace, server: &MockServer) -> Command {
    let mut cmd = Command::cargo_bin("pinboard").expect("binary");
    cmd.current_dir(ws.path())
        .env("PINBOARD_STORE_URL", server.uri())
        .env("PINBOARD_STORE_KEY", "anon-key")
        .env_remove("PINBOARD_CONFIG")
        .env_remove("PINBOARD_DOCS_ROOT")
        .env_remove("RUST_LOG");
    cmd
}

fn workspace(max_attempts: u32) -> TestWorkspace {
    let ws = TestWorkspace::new();
    ws.write_config(&format!(
        "[retry]\nmax_attempts = {max_attempts}\nbase_delay_ms = 0\n"
    ));
    ws
}

fn json_stdout(output: &[u8]) -> Value {
    serde_json::from_slice(output).expect("stdout is JSON")
}

#[tokio::test(flavor = "multi_thread")]
async fn list_sends_board_statuses_and_range() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(TABLE_PATH))
        .and(header("apikey", "anon-key"))
        .and(header("authorization", "Bearer anon-key"))
        .and(header("range", "0-49"))
        .and(query_param("status", "in.(todo,in-progress,complete)"))
        .and(query_param("order", "created_at.desc"))
        .respond_with(
            ResponseTemplate::new(206)
                .insert_header("content-range", "0-1/75")
                .set_body_json(json!([
                    task_row("t-1", "Draft release notes", "todo"),
                    task_row("t-2", "Review PR", "in-progress"),
                ])),
        )
        .expect(1)
        .mount(&server)
        .await;

    let ws = workspace(1);
    let assert = pinboard(&ws, &server)
        .args(["task", "list", "--json"])
        .assert()
        .success();
    let payload = json_stdout(&assert.get_output().stdout);
    assert_eq!(payload["command"], "task list");
    assert_eq!(payload["data"]["total"], 75);
    assert_eq!(payload["data"]["has_more"], true);
    assert_eq!(payload["data"]["tasks"][1]["status"], "in-progress");
    assert_eq!(payload["next_steps"][0], "pinboard task list --page 2");
}

#[tokio::test(flavor = "multi_thread")]
async fn list_with_archived_and_filters() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(TABLE_PATH))
        .and(header("range", "10-19"))
        .and(query_param("priority", "eq.high"))
        .and(query_param("assignee", "eq.Jasper"))
        .and(query_param("due_date", "is.null"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-range", "10-10/11")
                .set_body_json(json!([task_row("t-9", "Old work", "archived")])),
        )
        .expect(1)
        .mount(&server)
        .await;

    let ws = workspace(1);
    pinboard(&ws, &server)
        .args([
            "task",
            "list",
            "--archived",
            "--priority",
            "high",
            "--assignee",
            "jasper",
            "--no-due",
            "--page",
            "2",
            "--page-size",
            "10",
        ])
        .assert()
        .success()
        .stdout(contains("[archived][high][research] t-9 Old work @Jasper"));

    let requests = server.received_requests().await.unwrap();
    assert!(!requests[0].url.query().unwrap_or("").contains("status="));
}

#[tokio::test(flavor = "multi_thread")]
async fn add_posts_sanitized_todo() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(TABLE_PATH))
        .and(header("prefer", "return=representation"))
        .and(body_partial_json(json!({
            "title": "Fix &lt;b&gt; tags",
            "status": "todo",
            "priority": "high",
            "category": "research",
            "assignee": "Arie"
        })))
        .respond_with(
            ResponseTemplate::new(201)
                .set_body_json(json!([task_row("t-3", "Fix &lt;b&gt; tags", "todo")])),
        )
        .expect(1)
        .mount(&server)
        .await;

    let ws = workspace(1);
    pinboard(&ws, &server)
        .args([
            "task",
            "add",
            "  Fix <b> tags  ",
            "--priority",
            "high",
            "--category",
            "research",
            "--assignee",
            "arie",
        ])
        .assert()
        .success()
        .stdout(contains("Task added"))
        .stdout(contains("ID: t-3"));
}

#[tokio::test(flavor = "multi_thread")]
async fn add_rejects_blank_title_before_calling_store() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&server)
        .await;

    let ws = workspace(1);
    pinboard(&ws, &server)
        .args(["task", "add", "   "])
        .assert()
        .code(2)
        .stderr(contains("Validation failed"));
}

#[tokio::test(flavor = "multi_thread")]
async fn move_patches_status_by_id() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path(TABLE_PATH))
        .and(query_param("id", "eq.t-1"))
        .and(body_partial_json(json!({ "status": "complete" })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([task_row("t-1", "Draft release notes", "complete")])),
        )
        .expect(1)
        .mount(&server)
        .await;

    let ws = workspace(1);
    let assert = pinboard(&ws, &server)
        .args(["task", "move", "t-1", "complete", "--json"])
        .assert()
        .success();
    let payload = json_stdout(&assert.get_output().stdout);
    assert_eq!(payload["data"]["status"], "complete");

    let requests = server.received_requests().await.unwrap();
    let body: Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert!(body["updated_at"].is_string());
    assert!(body["completed_at"].is_string());
}

#[tokio::test(flavor = "multi_thread")]
async fn move_to_unknown_status_is_user_error() {
    let server = MockServer::start().await;
    let ws = workspace(1);
    pinboard(&ws, &server)
        .args(["task", "move", "t-1", "done"])
        .assert()
        .code(2)
        .stderr(contains("invalid status 'done'"));
}

#[tokio::test(flavor = "multi_thread")]
async fn rm_of_missing_row_is_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path(TABLE_PATH))
        .and(query_param("id", "eq.ghost"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let ws = workspace(1);
    let assert = pinboard(&ws, &server)
        .args(["task", "rm", "ghost", "--json"])
        .assert()
        .code(3);
    let payload = json_stdout(&assert.get_output().stdout);
    assert_eq!(payload["error"]["details"]["task_id"], "ghost");
    assert_eq!(payload["next_steps"][0], "pinboard task list");
}

#[tokio::test(flavor = "multi_thread")]
async fn transient_failure_is_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(TABLE_PATH))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(TABLE_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-range", "*/0")
                .set_body_json(json!([])),
        )
        .mount(&server)
        .await;

    let ws = workspace(3);
    pinboard(&ws, &server)
        .args(["task", "list"])
        .assert()
        .success()
        .stdout(contains("Total: 0"));
    assert_eq!(server.received_requests().await.unwrap().len(), 2);
}

#[tokio::test(flavor = "multi_thread")]
async fn rejected_request_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(TABLE_PATH))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "message": "JWT expired",
            "hint": null
        })))
        .expect(1)
        .mount(&server)
        .await;

    let ws = workspace(3);
    let assert = pinboard(&ws, &server)
        .args(["task", "list", "--json"])
        .assert()
        .code(4);
    let payload = json_stdout(&assert.get_output().stdout);
    assert_eq!(payload["error"]["kind"], "remote");
    assert_eq!(payload["error"]["details"]["status"], 401);
    assert!(payload["error"]["message"]
        .as_str()
        .unwrap()
        .contains("JWT expired"));
}

#[tokio::test(flavor = "multi_thread")]
async fn archive_complete_sweeps_every_complete_task() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(TABLE_PATH))
        .and(query_param("status", "in.(complete)"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-range", "0-1/2")
                .set_body_json(json!([
                    task_row("c-1", "Shipped", "complete"),
                    task_row("c-2", "Also shipped", "complete"),
                ])),
        )
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path(TABLE_PATH))
        .and(query_param("id", "eq.c-1"))
        .and(body_partial_json(json!({ "status": "archived" })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([task_row("c-1", "Shipped", "archived")])),
        )
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path(TABLE_PATH))
        .and(query_param("id", "eq.c-2"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "message": "row is locked"
        })))
        .mount(&server)
        .await;

    let ws = workspace(1);
    let assert = pinboard(&ws, &server)
        .args(["task", "archive-complete", "--json"])
        .assert()
        .success();
    let payload = json_stdout(&assert.get_output().stdout);
    assert_eq!(payload["data"]["archived"], 1);
    assert_eq!(payload["data"]["failed"], 1);
}
