use lifeos_core::store::snapshot;
use lifeos_core::{Database, RecoveryPolicy, SlotStore, Store};
use serde_json::Value;
use std::ffi::OsString;
use std::fs;
use std::path::PathBuf;
use std::process::{Command, Output};
use tempfile::TempDir;

struct CliTestEnv {
    _temp_dir: TempDir,
    home: PathBuf,
    xdg_data: PathBuf,
    xdg_config: PathBuf,
    xdg_state: PathBuf,
    xdg_runtime: PathBuf,
}

impl CliTestEnv {
    fn new() -> Self {
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        let base = temp_dir.path().to_path_buf();
        let home = base.join("home");
        let xdg_data = base.join("xdg-data");
        let xdg_config = base.join("xdg-config");
        let xdg_state = base.join("xdg-state");
        let xdg_runtime = base.join("xdg-runtime");

        for dir in [&home, &xdg_data, &xdg_config, &xdg_state, &xdg_runtime] {
            fs::create_dir_all(dir).expect("failed to create test directory");
        }

        Self {
            _temp_dir: temp_dir,
            home,
            xdg_data,
            xdg_config,
            xdg_state,
            xdg_runtime,
        }
    }

    fn db_path(&self) -> PathBuf {
        self.xdg_data.join("lifeos/lifeos.db")
    }

    fn open_db(&self) -> Database {
        let db = Database::open(&self.db_path()).expect("failed to open db");
        db.migrate().expect("failed to migrate db");
        db
    }
}

fn run(env: &CliTestEnv, args: &[&str]) -> Output {
    let bin_path = PathBuf::from(assert_cmd::cargo::cargo_bin!("lifeos"));

    Command::new(bin_path)
        .args(args)
        .env("HOME", &env.home)
        .env("XDG_DATA_HOME", &env.xdg_data)
        .env("XDG_CONFIG_HOME", &env.xdg_config)
        .env("XDG_STATE_HOME", &env.xdg_state)
        .env("XDG_RUNTIME_DIR", &env.xdg_runtime)
        .output()
        .unwrap_or_else(|e| panic!("failed to execute lifeos: {e}"))
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
        "lifeos {rendered_args} failed\nstatus: {}\nstdout:\n{}\nstderr:\n{}",
        output.status, stdout, stderr
    );
}

/// Run with `--json` and parse stdout
fn run_json(env: &CliTestEnv, args: &[&str]) -> Value {
    let mut full = vec!["--json"];
    full.extend_from_slice(args);
    let output = run(env, &full);
    assert_success(&full, &output);
    serde_json::from_slice(&output.stdout).unwrap_or_else(|e| {
        panic!(
            "stdout of lifeos {} is not JSON: {e}\n{}",
            full.join(" "),
            String::from_utf8_lossy(&output.stdout)
        )
    })
}

fn created_id(value: &Value) -> String {
    value["id"]
        .as_str()
        .expect("create output should carry an id")
        .to_string()
}

#[test]
fn case_and_contact_links_show_on_both_sides() {
    let env = CliTestEnv::new();

    let case = created_id(&run_json(
        &env,
        &["case", "add", "--title", "Acme v. Smith", "--client", "Acme"],
    ));
    let contact = created_id(&run_json(
        &env,
        &["contact", "add", "--first", "Jane", "--last", "Doe", "--type", "client", "--case", &case],
    ));

    let shown = run_json(&env, &["case", "show", &case]);
    assert_eq!(shown["case"]["contact_ids"][0], contact.as_str());
    assert_eq!(shown["contacts"][0]["first_name"], "Jane");

    let shown = run_json(&env, &["contact", "show", &contact]);
    assert_eq!(shown["cases"][0]["id"], case.as_str());

    run_json(&env, &["contact", "delete", &contact]);
    let shown = run_json(&env, &["case", "show", &case]);
    assert_eq!(shown["case"]["contact_ids"], serde_json::json!([]));

    let db_path = env.db_path();
    assert!(
        db_path.exists(),
        "database file should exist at {}",
        db_path.display()
    );
}

#[test]
fn link_and_unlink_task_from_case() {
    let env = CliTestEnv::new();

    let case = created_id(&run_json(&env, &["case", "add", "--title", "T", "--client", "C"]));
    let task = created_id(&run_json(&env, &["task", "add", "--title", "Draft complaint"]));

    run_json(&env, &["case", "link", &case, "--task", &task]);
    let shown = run_json(&env, &["task", "show", &task]);
    assert_eq!(shown["case_ids"][0], case.as_str());

    run_json(&env, &["case", "unlink", &case, "--task", &task]);
    let shown = run_json(&env, &["case", "show", &case]);
    assert_eq!(shown["tasks"], serde_json::json!([]));
}

#[test]
fn billable_time_is_reported_on_case() {
    let env = CliTestEnv::new();

    let case = created_id(&run_json(&env, &["case", "add", "--title", "T", "--client", "C"]));
    run_json(
        &env,
        &["session", "add", "--case", &case, "--minutes", "45", "--billable"],
    );
    run_json(&env, &["session", "add", "--case", &case, "--minutes", "30"]);

    let shown = run_json(&env, &["case", "show", &case]);
    assert_eq!(shown["billable_minutes"], 45);

    let sessions = run_json(&env, &["session", "list", "--case", &case]);
    assert_eq!(sessions.as_array().map(Vec::len), Some(2));
}

#[test]
fn unknown_id_fails_with_not_found() {
    let env = CliTestEnv::new();

    let output = run(&env, &["case", "delete", "missing"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("case not found: missing"),
        "unexpected stderr:\n{stderr}"
    );
}

#[test]
fn empty_list_prints_placeholder() {
    let env = CliTestEnv::new();

    let args = ["task", "list"];
    let output = run(&env, &args);
    assert_success(&args, &output);
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "(none)");
}

#[test]
fn onboarding_flow_round_trips() {
    let env = CliTestEnv::new();

    let status = run_json(&env, &["onboarding", "status"]);
    assert_eq!(status["should_show"], true);

    run_json(&env, &["onboarding", "skip"]);
    let status = run_json(&env, &["onboarding", "status"]);
    assert_eq!(status["should_show"], false);
    assert_eq!(status["state"]["skipped"], true);

    run_json(&env, &["onboarding", "reset"]);
    let status = run_json(&env, &["onboarding", "status"]);
    assert_eq!(status["should_show"], true);
}

#[test]
fn doctor_reports_one_sided_links() {
    let env = CliTestEnv::new();

    let case = created_id(&run_json(&env, &["case", "add", "--title", "T", "--client", "C"]));

    let args = ["doctor"];
    let output = run(&env, &args);
    assert_success(&args, &output);
    assert!(String::from_utf8_lossy(&output.stdout).contains("No integrity problems found"));

    // Write a case that names a contact the store never saw
    let db = env.open_db();
    let store = Store::open(&db, RecoveryPolicy::Strict).expect("failed to load store");
    let mut cases = store.cases().to_vec();
    cases[0].contact_ids.push("ghost".to_string());
    let bytes = snapshot::encode(&cases).expect("failed to encode cases");
    db.write_batch(&[("cases", bytes)])
        .expect("failed to write cases");

    let output = run(&env, &args);
    assert!(!output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("1 integrity problem(s)"), "stdout:\n{stdout}");
    assert!(stdout.contains(&case));
    assert!(stdout.contains("ghost"));
}

#[test]
fn corrupt_slot_needs_discard_flag() {
    let env = CliTestEnv::new();

    run_json(&env, &["task", "add", "--title", "Before corruption"]);
    env.open_db()
        .write_batch(&[("tasks", b"{ not json".to_vec())])
        .expect("failed to corrupt tasks slot");

    let output = run(&env, &["task", "list"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("corrupt snapshot in slot 'tasks'"), "stderr:\n{stderr}");

    // Discarding starts tasks empty and rewrites the slot on the next change
    let tasks = run_json(&env, &["--discard-corrupt", "task", "list"]);
    assert_eq!(tasks, serde_json::json!([]));
    run_json(&env, &["--discard-corrupt", "task", "add", "--title", "After"]);

    let tasks = run_json(&env, &["task", "list"]);
    assert_eq!(tasks[0]["title"], "After");
}
