use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Output, Stdio};
use std::time::{Duration, Instant};
use tempfile::TempDir;

/// Nothing listens here, so every send fails fast
const UNREACHABLE: &str = "http://127.0.0.1:9/events";

struct CliTestEnv {
    _temp_dir: TempDir,
    home: PathBuf,
    xdg_data: PathBuf,
    xdg_config: PathBuf,
    xdg_state: PathBuf,
}

impl CliTestEnv {
    fn new() -> Self {
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        let base = temp_dir.path().to_path_buf();
        let home = base.join("home");
        let xdg_data = base.join("xdg-data");
        let xdg_config = base.join("xdg-config");
        let xdg_state = base.join("xdg-state");

        fs::create_dir_all(&home).expect("failed to create HOME");
        fs::create_dir_all(&xdg_data).expect("failed to create XDG_DATA_HOME");
        fs::create_dir_all(&xdg_config).expect("failed to create XDG_CONFIG_HOME");
        fs::create_dir_all(&xdg_state).expect("failed to create XDG_STATE_HOME");

        Self {
            _temp_dir: temp_dir,
            home,
            xdg_data,
            xdg_config,
            xdg_state,
        }
    }

    /// Env with a config file pointing at `endpoint`
    fn with_endpoint(endpoint: &str) -> Self {
        let env = Self::new();
        let dir = env.xdg_config.join("eventbuf");
        fs::create_dir_all(&dir).expect("failed to create config dir");
        fs::write(
            dir.join("config.toml"),
            format!(
                "[collector]\nendpoint = \"{}\"\ncooldown_secs = 0.1\ntimeout_secs = 2\nshutdown_grace_secs = 1\n",
                endpoint
            ),
        )
        .expect("failed to write config");
        env
    }

    fn store_path(&self) -> PathBuf {
        self.xdg_data.join("eventbuf/store.db")
    }

    fn log_files(&self) -> Vec<String> {
        match fs::read_dir(self.xdg_state.join("eventbuf")) {
            Ok(entries) => entries
                .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
                .filter(|name| name.starts_with("eventbuf.log"))
                .collect(),
            Err(_) => Vec::new(),
        }
    }

    fn command(&self, args: &[&str]) -> Command {
        let mut command = Command::new(PathBuf::from(assert_cmd::cargo::cargo_bin!("eventbuf")));
        command
            .args(args)
            .env("HOME", &self.home)
            .env("XDG_DATA_HOME", &self.xdg_data)
            .env("XDG_CONFIG_HOME", &self.xdg_config)
            .env("XDG_STATE_HOME", &self.xdg_state)
            .env_remove("RUST_LOG");
        command
    }

    fn run(&self, args: &[&str]) -> Output {
        self.command(args)
            .output()
            .unwrap_or_else(|e| panic!("failed to execute eventbuf {:?}: {e}", args))
    }

    fn run_with_stdin(&self, args: &[&str], input: &str) -> Output {
        let mut child = self
            .command(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .expect("failed to spawn eventbuf");

        child
            .stdin
            .take()
            .expect("stdin should be piped")
            .write_all(input.as_bytes())
            .expect("failed to write stdin");

        child.wait_with_output().expect("failed to wait for eventbuf")
    }
}

fn assert_success(args: &[&str], output: &Output) {
    assert!(
        output.status.success(),
        "eventbuf {:?} failed\nstdout:\n{}\nstderr:\n{}",
        args,
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    );
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

#[test]
fn status_without_config_reports_not_ready() {
    let env = CliTestEnv::new();

    let output = env.run(&["status"]);
    assert_success(&["status"], &output);

    let text = stdout(&output);
    assert!(text.contains("Endpoint:        <not set>"), "{text}");
    assert!(text.contains("Pending events:  0"), "{text}");
    assert!(text.contains("Status: Not ready (set collector.endpoint"), "{text}");
}

#[test]
fn track_without_endpoint_fails() {
    let env = CliTestEnv::new();

    let output = env.run(&["track", "click", "{}"]);

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("endpoint"), "{stderr}");
}

#[test]
fn undelivered_events_are_persisted_across_runs() {
    let env = CliTestEnv::with_endpoint(UNREACHABLE);

    let args = ["track", "level_start", "{\"level\":1}", "--wait", "0"];
    let output = env.run(&args);
    assert_success(&args, &output);
    assert!(stdout(&output).contains("1 event(s) queued for later delivery"));
    assert!(env.store_path().exists());

    // The second run restores the first event before adding its own
    let args = ["track", "level_end", "{\"level\":1}", "--wait", "0"];
    let output = env.run(&args);
    assert_success(&args, &output);
    assert!(stdout(&output).contains("2 event(s) queued for later delivery"));

    let output = env.run(&["status"]);
    assert_success(&["status"], &output);
    let text = stdout(&output);
    assert!(text.contains("Pending events:  2"), "{text}");
    assert!(text.contains("Last saved:"), "{text}");
    assert!(text.contains("Status: Ready to deliver"), "{text}");
}

#[test]
fn run_tracks_stdin_lines() {
    let env = CliTestEnv::with_endpoint(UNREACHABLE);

    let output = env.run_with_stdin(&["run"], "click\t{\"x\":1}\n\nquit\n");
    assert_success(&["run"], &output);

    let text = stdout(&output);
    assert!(text.contains("Tracked 2 event(s)"), "{text}");
    assert!(text.contains("2 event(s) queued for later delivery"), "{text}");

    // Logging is on for `run` without --verbose
    let logs = env.log_files();
    assert_eq!(logs.len(), 1, "{logs:?}");
    assert!(logs[0].starts_with("eventbuf.log."), "{logs:?}");
}

#[test]
fn status_does_not_write_logs_without_verbose() {
    let env = CliTestEnv::new();

    assert_success(&["status"], &env.run(&["status"]));
    assert!(env.log_files().is_empty());

    let args = ["--verbose", "status"];
    assert_success(&args, &env.run(&args));
    assert_eq!(env.log_files().len(), 1);
}

#[test]
fn invalid_cooldown_is_reported_not_fatal() {
    let env = CliTestEnv::new();
    let dir = env.xdg_config.join("eventbuf");
    fs::create_dir_all(&dir).unwrap();
    fs::write(
        dir.join("config.toml"),
        format!("[collector]\nendpoint = \"{}\"\ncooldown_secs = 1e30\n", UNREACHABLE),
    )
    .unwrap();

    let output = env.run(&["status"]);
    assert_success(&["status"], &output);
    assert!(stdout(&output).contains("cooldown_secs is out of range"));

    let output = env.run(&["track", "click", "{}"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(!stderr.contains("panicked"), "{stderr}");
}

#[cfg(unix)]
#[test]
fn interrupted_track_persists_event() {
    let env = CliTestEnv::with_endpoint(UNREACHABLE);

    let mut child = env
        .command(&["track", "click", "{}", "--wait", "30"])
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("failed to spawn eventbuf");

    // The store exists once the service is up; leave time for the handler
    let deadline = Instant::now() + Duration::from_secs(10);
    while !env.store_path().exists() && Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(20));
    }
    std::thread::sleep(Duration::from_millis(500));

    let status = Command::new("kill")
        .args(["-INT", &child.id().to_string()])
        .status()
        .expect("failed to run kill");
    assert!(status.success());

    let output = child.wait_with_output().expect("failed to wait for eventbuf");
    assert_success(&["track"], &output);
    assert!(stdout(&output).contains("1 event(s) queued for later delivery"));

    let output = env.run(&["status"]);
    let text = stdout(&output);
    assert!(text.contains("Pending events:  1"), "{text}");
}

#[test]
fn flush_with_empty_backlog() {
    let env = CliTestEnv::with_endpoint(UNREACHABLE);

    let output = env.run(&["flush"]);
    assert_success(&["flush"], &output);
    assert!(stdout(&output).contains("No pending events to flush."));
}

#[test]
fn flush_keeps_backlog_when_collector_is_down() {
    let env = CliTestEnv::with_endpoint(UNREACHABLE);

    let args = ["track", "click", "{}", "--wait", "0"];
    assert_success(&args, &env.run(&args));

    let args = ["flush", "--timeout", "1"];
    let output = env.run(&args);
    assert_success(&args, &output);

    let text = stdout(&output);
    assert!(text.contains("Flushing 1 pending event(s)..."), "{text}");
    assert!(text.contains("1 event(s) queued for later delivery"), "{text}");
}

#[test]
fn endpoint_flag_overrides_config() {
    let env = CliTestEnv::new();

    let args = ["--endpoint", UNREACHABLE, "status"];
    let output = env.run(&args);
    assert_success(&args, &output);
    assert!(stdout(&output).contains(UNREACHABLE));
}
