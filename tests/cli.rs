use std::io::Write;
use std::path::PathBuf;

use assert_cmd::Command;
use serde_json::Value;
use tempfile::NamedTempFile;

const FAST_TIMINGS: &str = r#"
flow:
  timings:
    generic_interval_ms: 1
    startup_pause_ms: 0
    settle_ms: 1
    text_entry_settle_ms: 1
    problem_scan_delay_ms: 1
    post_select_ms: 1
    open_settle_ms: 1
    open_spacing_ms: 1
    reopen_settle_ms: 1
    select_scan_delay_ms: 1
    select_spacing_ms: 1
"#;

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn config_file(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

fn handoff(config: &NamedTempFile) -> Command {
    let mut cmd = Command::cargo_bin("handoff").unwrap();
    cmd.env_remove("HANDOFF_GENERIC_ATTEMPTS")
        .env_remove("HANDOFF_GENERIC_INTERVAL_MS")
        .env("HANDOFF_LOG", "warn")
        .arg("--config")
        .arg(config.path());
    cmd
}

fn json_stdout(cmd: &mut Command) -> (bool, Value) {
    let output = cmd.output().unwrap();
    let value = serde_json::from_slice(&output.stdout).unwrap_or_else(|err| {
        panic!(
            "stdout is not JSON ({err}): {}",
            String::from_utf8_lossy(&output.stdout)
        )
    });
    (output.status.success(), value)
}

#[test]
fn plan_lists_eight_steps_for_record_without_wait() {
    let config = config_file("");
    let output = handoff(&config)
        .args(["plan", "--catalog"])
        .arg(fixture("catalog.json"))
        .args(["--id", "12"])
        .output()
        .unwrap();

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("(8 steps)"), "{stdout}");
    assert!(stdout.contains("select-service"));
    assert!(!stdout.contains("wait-for-return"));
}

#[test]
fn plan_json_puts_switch_second_when_record_asks_to_wait() {
    let config = config_file("");
    let (ok, value) = json_stdout(
        handoff(&config)
            .args(["--output", "json", "plan", "--catalog"])
            .arg(fixture("catalog.json"))
            .args(["--id", "3"]),
    );

    assert!(ok);
    let steps = value["plan"]["steps"].as_array().unwrap();
    assert_eq!(steps.len(), 9);
    assert_eq!(steps[1]["role"], "wait_for_return");
    assert_eq!(steps[1]["kind"]["kind"], "click");
    assert_eq!(value["record"]["servico"], "Reparo");
}

#[test]
fn plan_refuses_record_that_is_not_external() {
    let config = config_file("");
    handoff(&config)
        .args(["plan", "--catalog"])
        .arg(fixture("catalog.json"))
        .args(["--id", "4"])
        .assert()
        .failure();
}

#[test]
fn simulate_completes_against_scripted_surface() {
    let config = config_file(FAST_TIMINGS);
    let (ok, value) = json_stdout(
        handoff(&config)
            .args(["--output", "json", "simulate", "--catalog"])
            .arg(fixture("catalog.json"))
            .args(["--id", "12", "--surface"])
            .arg(fixture("surface.yaml")),
    );

    assert!(ok, "{value}");
    assert_eq!(value["report"]["outcome"]["status"], "completed");
    assert_eq!(value["report"]["steps"].as_array().unwrap().len(), 8);
    assert_eq!(value["report"]["steps"][0]["polls"], 3);

    let clicks: Vec<_> = value["actions"]
        .as_array()
        .unwrap()
        .iter()
        .filter(|a| a["action"] == "click")
        .map(|a| a["text"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(clicks.last().map(String::as_str), Some("Continuar"));
    assert!(clicks.contains(&"Cliente sem sinal".to_string()));
    assert!(clicks.contains(&"Instalação".to_string()));
    assert!(!clicks.contains(&"Instalação Fibra".to_string()));
}

#[test]
fn simulate_reports_service_step_when_list_never_renders() {
    let config = config_file(FAST_TIMINGS);
    let (ok, value) = json_stdout(
        handoff(&config)
            .args(["--output", "json", "simulate", "--catalog"])
            .arg(fixture("catalog.json"))
            .args(["--id", "12", "--surface"])
            .arg(fixture("surface_no_services.yaml")),
    );

    assert!(!ok);
    let outcome = &value["report"]["outcome"];
    assert_eq!(outcome["status"], "failed");
    assert_eq!(outcome["step_index"], 6);
    assert_eq!(outcome["reason"]["kind"], "step_timeout");
    assert_eq!(outcome["reason"]["criterion"]["text"], "Instalação");
}

#[test]
fn config_show_prints_effective_yaml() {
    let config = config_file("flow:\n  labels:\n    confirm: Prosseguir\n");
    let output = handoff(&config).arg("config").output().unwrap();

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("confirm: Prosseguir"), "{stdout}");
    assert!(stdout.contains("submit: Enviar"));
}

#[test]
fn env_override_must_be_numeric() {
    let config = config_file("");
    handoff(&config)
        .env("HANDOFF_GENERIC_ATTEMPTS", "lots")
        .arg("config")
        .assert()
        .failure();
}
