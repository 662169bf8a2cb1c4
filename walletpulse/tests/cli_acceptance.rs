use serde_json::Value;
use std::ffi::OsString;
use std::fs;
use std::path::PathBuf;
use std::process::{Command, Output};
use tempfile::TempDir;

struct CliTestEnv {
    temp_dir: TempDir,
    home: PathBuf,
    xdg_config: PathBuf,
    xdg_state: PathBuf,
}

impl CliTestEnv {
    fn new() -> Self {
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        let base = temp_dir.path().to_path_buf();
        let home = base.join("home");
        let xdg_config = base.join("xdg-config");
        let xdg_state = base.join("xdg-state");

        fs::create_dir_all(&home).expect("failed to create HOME");
        fs::create_dir_all(&xdg_config).expect("failed to create XDG_CONFIG_HOME");
        fs::create_dir_all(&xdg_state).expect("failed to create XDG_STATE_HOME");

        Self {
            temp_dir,
            home,
            xdg_config,
            xdg_state,
        }
    }

    fn write_config(&self, content: &str) {
        let dir = self.xdg_config.join("walletpulse");
        fs::create_dir_all(&dir).expect("failed to create config dir");
        fs::write(dir.join("config.toml"), content).expect("failed to write config");
    }

    fn write_file(&self, name: &str, content: &str) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        fs::write(&path, content).expect("failed to write file");
        path
    }
}

fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("../walletpulse-core/tests/fixtures")
        .join(name)
}

fn run_bin(env: &CliTestEnv, args: &[&str]) -> Output {
    let bin_path = PathBuf::from(assert_cmd::cargo::cargo_bin!("walletpulse"));

    Command::new(bin_path)
        .args(args)
        .env("HOME", &env.home)
        .env("XDG_CONFIG_HOME", &env.xdg_config)
        .env("XDG_STATE_HOME", &env.xdg_state)
        .env_remove("RUST_LOG")
        .output()
        .unwrap_or_else(|e| panic!("failed to execute walletpulse: {e}"))
}

fn assert_success(args: &[&str], output: &Output) {
    if output.status.success() {
        return;
    }

    let rendered_args = args
        .iter()
        .map(|arg| OsString::from(arg).to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join(" ");
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    panic!(
        "walletpulse {rendered_args} failed\nstatus: {}\nstdout:\n{}\nstderr:\n{}",
        output.status, stdout, stderr
    );
}

fn stdout_lines(output: &Output) -> Vec<Value> {
    String::from_utf8_lossy(&output.stdout)
        .lines()
        .map(|line| serde_json::from_str(line).expect("dry-run output should be JSON lines"))
        .collect()
}

#[test]
fn status_without_config_reports_not_ready() {
    let env = CliTestEnv::new();

    let output = run_bin(&env, &["status"]);
    assert_success(&["status"], &output);

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("walletpulse Configuration"));
    assert!(stdout.contains("Status: Not ready"), "got:\n{stdout}");
    assert!(stdout.contains("[metrics]"));
}

#[test]
fn status_with_config_reports_ready() {
    let env = CliTestEnv::new();
    env.write_config(
        r#"
[app]
origin = "chrome-extension://abcdef"

[metrics]
enabled = true
endpoint = "https://metrics.example.com"
api_key = "secret"
"#,
    );

    let output = run_bin(&env, &["status"]);
    assert_success(&["status"], &output);

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("App Origin:      chrome-extension://abcdef"));
    assert!(stdout.contains("https://metrics.example.com"));
    assert!(stdout.contains("<set>"));
    assert!(!stdout.contains("secret"), "api key must not be printed");
    assert!(stdout.contains("Status: Ready to send"), "got:\n{stdout}");
}

#[test]
fn replay_dry_run_prints_records() {
    let env = CliTestEnv::new();
    let events = fixture_path("events.jsonl");
    let wallet = fixture_path("wallet.toml");
    let args = [
        "replay",
        events.to_str().unwrap(),
        "--wallet",
        wallet.to_str().unwrap(),
        "--dry-run",
    ];

    let output = run_bin(&env, &args);
    assert_success(&args, &output);

    let lines = stdout_lines(&output);
    let metrics: Vec<&str> = lines
        .iter()
        .filter(|l| l["sink"] == "metrics")
        .map(|l| l["name"].as_str().unwrap())
        .collect();
    assert_eq!(metrics.len(), 9);
    assert_eq!(metrics[0], "dapp_connection");

    let product: Vec<&str> = lines
        .iter()
        .filter(|l| l["sink"] == "product")
        .map(|l| l["name"].as_str().unwrap())
        .collect();
    assert_eq!(
        product,
        vec!["DApp: DApp Connection", "Transaction: Signed Transaction"]
    );

    let custom_evm = lines
        .iter()
        .find(|l| l["name"] == "add_custom_evm")
        .expect("add_custom_evm record");
    assert_eq!(custom_evm["record"]["user_id"], "u-1001");

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Replay complete:"));
    assert!(stderr.contains("Records:  11"), "got:\n{stderr}");
}

#[test]
fn replay_skips_unparseable_lines() {
    let env = CliTestEnv::new();
    let events = env.write_file(
        "events.jsonl",
        concat!(
            "{\"event\": \"screenView\", \"pathname\": \"/home\"}\n",
            "not json\n",
            "\n",
            "{\"event\": \"somethingElse\"}\n",
            "{\"event\": \"messageSigned\", \"initiator\": \"internal\"}\n",
        ),
    );
    let args = ["replay", events.to_str().unwrap(), "--dry-run"];

    let output = run_bin(&env, &args);
    assert_success(&args, &output);

    let lines = stdout_lines(&output);
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0]["name"], "screen_view");
    assert!(lines[0]["record"]["wallet_provider"].is_null());

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Events:   2"), "got:\n{stderr}");
    assert!(stderr.contains("Skipped:  2"), "got:\n{stderr}");
}

#[test]
fn replay_without_sink_asks_for_configuration() {
    let env = CliTestEnv::new();
    let events = fixture_path("events.jsonl");
    let args = ["replay", events.to_str().unwrap()];

    let output = run_bin(&env, &args);
    assert_success(&args, &output);

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Metrics sink is not configured"));
}

#[test]
fn replay_missing_file_fails() {
    let env = CliTestEnv::new();
    let output = run_bin(&env, &["replay", "/nonexistent/events.jsonl", "--dry-run"]);

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("failed to read events file"), "got:\n{stderr}");
}
