//! Runs the `recap` binary against transcript files in a temp directory.
//!
//! Every run gets an isolated `XDG_CONFIG_HOME` and working directory so no user
//! config or `.env` leaks in.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use serde_json::json;
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

struct Sandbox {
    dir: tempfile::TempDir,
}

impl Sandbox {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("xdg")).unwrap();
        let messages = json!([
            { "name": "U", "is_user": true, "mes": "hi" },
            { "name": "A", "is_user": false, "mes": "hello" },
            { "name": "U", "is_user": true, "mes": "x".repeat(1500) }
        ]);
        std::fs::write(dir.path().join("chat.json"), messages.to_string()).unwrap();
        Self { dir }
    }

    fn transcript(&self) -> PathBuf {
        self.dir.path().join("chat.json")
    }

    fn db(&self) -> PathBuf {
        self.dir.path().join("cache.db")
    }

    fn recap(&self, args: &[&str], env: &[(&str, &str)]) -> Output {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_recap"));
        cmd.args(args)
            .current_dir(self.dir.path())
            .env("XDG_CONFIG_HOME", self.dir.path().join("xdg"))
            .env("RECAP_CACHE_PATH", self.db())
            .env_remove("RECAP_API_URL")
            .env_remove("RECAP_ENABLED")
            .env_remove("LOG_FILE");
        for (k, v) in env {
            cmd.env(k, v);
        }
        cmd.output().expect("failed to run recap binary")
    }
}

fn path_str(p: &Path) -> &str {
    p.to_str().unwrap()
}

fn stdout(out: &Output) -> String {
    String::from_utf8_lossy(&out.stdout).into_owned()
}

fn stderr(out: &Output) -> String {
    String::from_utf8_lossy(&out.stderr).into_owned()
}

#[test]
fn help_lists_subcommands() {
    let sb = Sandbox::new();
    let out = sb.recap(&["--help"], &[]);
    assert!(out.status.success());
    let text = stdout(&out);
    for sub in ["summarize", "prompt", "preview", "edit", "clear", "settings"] {
        assert!(text.contains(sub), "missing {} in help", sub);
    }
}

#[test]
fn preview_uncached_block() {
    let sb = Sandbox::new();
    let t = sb.transcript();
    let out = sb.recap(&["preview", path_str(&t), "--json"], &[]);
    assert!(out.status.success(), "{}", stderr(&out));
    let v: serde_json::Value = serde_json::from_str(&stdout(&out)).unwrap();
    assert_eq!(v["total_blocks"], 2);
    assert_eq!(v["cached"], false);
    assert_eq!(v["block_text"], "U: hi\nA: hello");
}

#[test]
fn preview_out_of_range_fails() {
    let sb = Sandbox::new();
    let t = sb.transcript();
    let out = sb.recap(&["preview", path_str(&t), "--block", "3"], &[]);
    assert!(!out.status.success());
    assert!(stderr(&out).contains("out of range"));
}

#[test]
fn summarize_without_endpoint_fails() {
    let sb = Sandbox::new();
    let t = sb.transcript();
    let out = sb.recap(&["summarize", path_str(&t)], &[]);
    assert!(!out.status.success());
    assert!(stderr(&out).contains("RECAP_API_URL"));
}

#[test]
fn edit_then_preview_shows_manual_summary() {
    let sb = Sandbox::new();
    let t = sb.transcript();
    let out = sb.recap(&["preview", path_str(&t), "--json"], &[]);
    let v: serde_json::Value = serde_json::from_str(&stdout(&out)).unwrap();
    let hash = v["hash"].as_str().unwrap().to_string();

    let out = sb.recap(&["edit", "--hash", &hash, "--text", "a greeting"], &[]);
    assert!(out.status.success(), "{}", stderr(&out));

    let out = sb.recap(&["preview", path_str(&t), "--json"], &[]);
    let v: serde_json::Value = serde_json::from_str(&stdout(&out)).unwrap();
    assert_eq!(v["cached"], true);
    assert_eq!(v["summary_text"], "a greeting");

    let out = sb.recap(&["clear"], &[]);
    assert!(out.status.success(), "{}", stderr(&out));
    let out = sb.recap(&["preview", path_str(&t), "--json"], &[]);
    let v: serde_json::Value = serde_json::from_str(&stdout(&out)).unwrap();
    assert_eq!(v["cached"], false);
}

#[test]
fn settings_report_sources() {
    let sb = Sandbox::new();
    std::fs::write(sb.dir.path().join(".env"), "RECAP_BLOCK_SIZE_CHARS=700\n").unwrap();
    let out = sb.recap(&["settings", "--json"], &[("RECAP_TRIGGER_THRESHOLD", "5")]);
    assert!(out.status.success(), "{}", stderr(&out));
    let v: serde_json::Value = serde_json::from_str(&stdout(&out)).unwrap();
    assert_eq!(v["settings"]["block_size_chars"], 700);
    assert_eq!(v["settings"]["trigger_threshold"], 5);
    assert_eq!(v["sources"]["RECAP_BLOCK_SIZE_CHARS"], "dotenv");
    assert_eq!(v["sources"]["RECAP_TRIGGER_THRESHOLD"], "env");
}

#[test]
fn invalid_setting_is_reported() {
    let sb = Sandbox::new();
    let out = sb.recap(&["settings"], &[("RECAP_BLOCK_SIZE_CHARS", "0")]);
    assert!(!out.status.success());
    assert!(stderr(&out).contains("RECAP_BLOCK_SIZE_CHARS"));
}

#[test]
fn disabled_prompt_prints_recent_messages() {
    let sb = Sandbox::new();
    let t = sb.transcript();
    let out = sb.recap(&["prompt", path_str(&t)], &[("RECAP_ENABLED", "false")]);
    assert!(out.status.success(), "{}", stderr(&out));
    assert!(stdout(&out).starts_with("U: hi\nA: hello\n"));
}

#[tokio::test(flavor = "multi_thread")]
async fn summarize_against_endpoint_then_preview_cached() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "summary": "S" })))
        .expect(2)
        .mount(&server)
        .await;

    let sb = Sandbox::new();
    let t = sb.transcript();
    let url = format!("{}/summarize", server.uri());
    let env = [("RECAP_API_URL", url.as_str())];

    let out = sb.recap(&["summarize", path_str(&t), "--json"], &env);
    assert!(out.status.success(), "{}", stderr(&out));
    let v: serde_json::Value = serde_json::from_str(&stdout(&out)).unwrap();
    assert_eq!(v["outcome"], "completed");
    assert_eq!(v["summaries"], json!(["S", "S"]));

    // Second process: served from the sqlite cache, no new requests.
    let out = sb.recap(&["summarize", path_str(&t)], &env);
    assert!(out.status.success(), "{}", stderr(&out));
    let out = sb.recap(&["preview", path_str(&t), "--block", "2", "--json"], &env);
    let v: serde_json::Value = serde_json::from_str(&stdout(&out)).unwrap();
    assert_eq!(v["cached"], true);
    assert_eq!(v["summary_text"], "S");
}
