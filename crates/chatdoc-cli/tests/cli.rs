use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::json;
use tempfile::TempDir;

struct Env {
    data: TempDir,
    config: TempDir,
}

impl Env {
    fn new() -> Self {
        Self {
            data: TempDir::new().unwrap(),
            config: TempDir::new().unwrap(),
        }
    }

    fn chatdoc(&self) -> Command {
        let mut cmd = Command::cargo_bin("chatdoc").unwrap();
        cmd.arg("--data-dir")
            .arg(self.data.path())
            .arg("--config")
            .arg(self.config.path().join("config.toml"))
            .env("NO_COLOR", "1")
            .env_remove("RUST_LOG");
        cmd
    }

    fn write_import(&self, document: &serde_json::Value) -> std::path::PathBuf {
        let path = self.config.path().join("import.json");
        std::fs::write(&path, serde_json::to_string(document).unwrap()).unwrap();
        path
    }
}

fn sample_history() -> serde_json::Value {
    json!({
        "entries": [
            {
                "upload_id": "fresh",
                "filename": "report.pdf",
                "upload_date": chrono::Utc::now().to_rfc3339(),
                "byok": false,
                "chats": [
                    {"role": "user", "text": "What is the total?", "ts": "2025-03-04T09:00:00Z"},
                    {"role": "assistant", "text": "The total is $42.", "ts": "2025-03-04T09:00:05Z"}
                ]
            },
            {
                "upload_id": "old",
                "filename": "minutes.pdf",
                "upload_date": "2020-01-01T12:00:00Z",
                "byok": false,
                "chats": []
            }
        ]
    })
}

#[test]
fn test_list_empty() {
    let env = Env::new();
    env.chatdoc()
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("No conversations yet."));
}

#[test]
fn test_import_list_and_show() {
    let env = Env::new();
    let file = env.write_import(&sample_history());

    env.chatdoc()
        .arg("import")
        .arg(&file)
        .assert()
        .success()
        .stdout(predicate::str::contains("Imported 2 conversations"));

    env.chatdoc()
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("report.pdf"))
        .stdout(predicate::str::contains("minutes.pdf"))
        .stdout(predicate::str::contains("Will be auto-deleted at midnight"));

    env.chatdoc()
        .args(["show", "fresh"])
        .assert()
        .success()
        .stdout(predicate::str::contains("What is the total?"))
        .stdout(predicate::str::contains("The total is $42."));
}

#[test]
fn test_invalid_import_is_rejected() {
    let env = Env::new();
    let file = env.write_import(&json!({"history": []}));

    env.chatdoc()
        .arg("import")
        .arg(&file)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error"))
        .stderr(predicate::str::contains("entries"));
}

#[test]
fn test_expired_and_sweep() {
    let env = Env::new();
    let file = env.write_import(&sample_history());
    env.chatdoc().arg("import").arg(&file).assert().success();

    env.chatdoc()
        .arg("expired")
        .assert()
        .success()
        .stdout(predicate::str::diff("1\n"));

    env.chatdoc()
        .arg("sweep")
        .assert()
        .success()
        .stdout(predicate::str::contains("Removed 1 expired conversations (1 remaining)"));

    env.chatdoc()
        .args(["show", "old"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no conversation with id 'old'"));
}

#[test]
fn test_export_to_directory_uses_dated_name() {
    let env = Env::new();
    let file = env.write_import(&sample_history());
    env.chatdoc().arg("import").arg(&file).assert().success();

    let out = TempDir::new().unwrap();
    env.chatdoc()
        .arg("export")
        .arg("--output")
        .arg(out.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Exported 2 conversations"));

    let today = chrono::Local::now().date_naive();
    let exported = out
        .path()
        .join(format!("chatdoc-history-{}.json", today.format("%Y-%m-%d")));
    let value: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(exported).unwrap()).unwrap();
    assert_eq!(value["entries"][0]["upload_id"], "fresh");
}

#[test]
fn test_compose_includes_history() {
    let env = Env::new();
    let file = env.write_import(&sample_history());
    env.chatdoc().arg("import").arg(&file).assert().success();

    env.chatdoc()
        .args(["compose", "fresh", "And the tax?"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("Conversation history:"))
        .stdout(predicate::str::contains("User: What is the total?"))
        .stdout(predicate::str::contains("New question: And the tax?"));

    env.chatdoc()
        .args(["compose", "old", "Anything?"])
        .assert()
        .success()
        .stdout(predicate::str::diff("Anything?\n"));
}

#[test]
fn test_byok_status_masks_key() {
    let env = Env::new();
    env.chatdoc()
        .args(["byok", "status"])
        .assert()
        .success()
        .stdout(predicate::str::contains("not configured"));

    env.chatdoc()
        .args([
            "byok",
            "set",
            "--api-key",
            "sk-supersecret1234",
            "--vector-store-uri",
            "https://vectors.example",
            "--vector-store-token",
            "zt-token",
            "--collection",
            "my_docs",
        ])
        .assert()
        .success();

    env.chatdoc()
        .args(["byok", "status"])
        .assert()
        .success()
        .stdout(predicate::str::contains("configured"))
        .stdout(predicate::str::contains("1234"))
        .stdout(predicate::str::contains("sk-supersecret").not());

    env.chatdoc().args(["byok", "clear"]).assert().success();
    env.chatdoc()
        .args(["byok", "status"])
        .assert()
        .success()
        .stdout(predicate::str::contains("not configured"));
}

#[test]
fn test_api_url_roundtrip() {
    let env = Env::new();
    env.chatdoc()
        .args(["api-url", "get"])
        .assert()
        .success()
        .stdout(predicate::str::diff(
            "https://chatdoc-main-4df34c0.d2.zuplo.dev\n",
        ));

    env.chatdoc()
        .args(["api-url", "set", "http://localhost:8000"])
        .assert()
        .success();
    env.chatdoc()
        .args(["api-url", "get"])
        .assert()
        .success()
        .stdout(predicate::str::diff("http://localhost:8000\n"));

    env.chatdoc().args(["api-url", "reset"]).assert().success();
    env.chatdoc()
        .args(["api-url", "get"])
        .assert()
        .success()
        .stdout(predicate::str::contains("zuplo.dev"));
}

#[test]
fn test_config_file_is_honoured() {
    let env = Env::new();
    std::fs::write(
        env.config.path().join("config.toml"),
        "colors = false\n\n[store.context]\nmax_chars = 1234\n",
    )
    .unwrap();

    env.chatdoc()
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("colors = false"))
        .stdout(predicate::str::contains("max_chars = 1234"));
}
