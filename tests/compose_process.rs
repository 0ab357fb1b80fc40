#![cfg(unix)]

mod common;

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use common::builders::compose_yaml;
use common::{init_tracing, with_timeout};
use stackpull::engine::UpdateCycle;
use stackpull::fs::RealFileSystem;
use stackpull::orchestrator::process::spawn_streaming;
use stackpull::orchestrator::{ComposeOrchestrator, Orchestrator, OutputStream, RestartScope};
use stackpull::types::RestartMode;
use stackpull::workload::WorkloadSpec;
use tempfile::{tempdir, TempDir};

/// A stand-in for the `docker` CLI: logs its arguments and answers the
/// queries the orchestrator makes.
fn fake_docker(dir: &Path, log: &Path) -> PathBuf {
    let script = format!(
        r#"echo "$*" >> "{log}"
case "$*" in
  *"image inspect"*) echo '"sha256:new"' ;;
  *"ps --format"*" web") echo "stack-web-1" ;;
  *"ps --format"*" broken") echo "daemon unreachable" >&2; exit 1 ;;
  *"ps --format"*) ;;
  *"container inspect"*) echo "sha256:old" ;;
  *" pull"*) echo "Pulling web"; echo "Pulled" >&2 ;;
  *" down") echo "Stopping stack" >&2 ;;
  *" stop "*) echo "stop failed" >&2; exit 4 ;;
  *" up -d"*) echo "Starting" ;;
esac
"#,
        log = log.display()
    );
    let path = dir.join("fake-docker.sh");
    fs::write(&path, script).unwrap();
    path
}

fn project(services: &[(&str, &str)]) -> (TempDir, ComposeOrchestrator, PathBuf) {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("docker-compose.yml"), compose_yaml(services)).unwrap();

    let log = dir.path().join("calls.log");
    let script = fake_docker(dir.path(), &log);
    let sh = vec!["sh".to_string(), script.to_string_lossy().into_owned()];

    let orchestrator = ComposeOrchestrator::new(Arc::new(RealFileSystem), dir.path())
        .with_compose_command(sh.clone())
        .with_docker_command(sh);

    (dir, orchestrator, log)
}

fn logged_calls(log: &Path) -> Vec<String> {
    fs::read_to_string(log)
        .unwrap_or_default()
        .lines()
        .map(str::to_string)
        .collect()
}

#[tokio::test]
async fn streaming_run_reports_both_pipes_and_exit_code() {
    init_tracing();

    with_timeout(async {
        let argv: Vec<String> = ["sh", "-c", "echo out; echo err >&2; exit 3"]
            .iter()
            .map(|s| s.to_string())
            .collect();

        let run = spawn_streaming("sh", &argv, Path::new(".")).unwrap();
        let output = run.follow().await.unwrap();

        assert_eq!(output.exit_code, 3);
        assert!(!output.success());
        assert!(output
            .lines
            .iter()
            .any(|l| l.stream == OutputStream::Stdout && l.text == "out"));
        assert!(output
            .lines
            .iter()
            .any(|l| l.stream == OutputStream::Stderr && l.text == "err"));
    })
    .await;
}

#[tokio::test]
async fn invalid_utf8_output_does_not_cut_the_command_short() {
    init_tracing();

    with_timeout(async {
        let dir = tempdir().unwrap();
        let marker = dir.path().join("finished");
        let script = format!(
            "printf 'before\\n'; printf '\\377\\n'; sleep 0.3; \
             i=0; while [ $i -lt 2000 ]; do echo line $i; i=$((i+1)); done; \
             echo tail >&2; touch '{}'",
            marker.display()
        );
        let argv = vec!["sh".to_string(), "-c".to_string(), script];

        let run = spawn_streaming("noisy", &argv, dir.path()).unwrap();
        let output = run.follow().await.unwrap();

        assert_eq!(output.exit_code, 0);
        assert!(marker.exists(), "command was killed before finishing");

        let stdout: Vec<&str> = output
            .lines
            .iter()
            .filter(|l| l.stream == OutputStream::Stdout)
            .map(|l| l.text.as_str())
            .collect();
        assert_eq!(stdout.len(), 2002);
        assert_eq!(stdout[0], "before");
        assert_eq!(stdout[1], "\u{FFFD}");
        assert_eq!(stdout[2001], "line 1999");
        assert!(output
            .lines
            .iter()
            .any(|l| l.stream == OutputStream::Stderr && l.text == "tail"));
    })
    .await;
}

#[tokio::test]
async fn missing_program_fails_to_spawn() {
    init_tracing();

    let argv = vec!["stackpull-no-such-binary-here".to_string()];
    assert!(spawn_streaming("ghost", &argv, Path::new(".")).is_err());
}

#[tokio::test]
async fn digests_are_read_through_the_cli() {
    init_tracing();

    with_timeout(async {
        let (_dir, orchestrator, log) = project(&[("web", "nginx:1.27"), ("worker", "busybox")]);

        let workloads = orchestrator.list_workload_specs().await.unwrap();
        assert_eq!(
            workloads,
            vec![
                WorkloadSpec::new("web", "nginx:1.27"),
                WorkloadSpec::new("worker", "busybox"),
            ]
        );

        let desired = orchestrator.inspect_image_digest("nginx:1.27").await.unwrap();
        assert_eq!(desired, "\"sha256:new\"");

        let running = orchestrator.inspect_running_digest("web").await.unwrap();
        assert_eq!(running.as_deref(), Some("sha256:old"));

        let absent = orchestrator.inspect_running_digest("worker").await.unwrap();
        assert_eq!(absent, None);

        let calls = logged_calls(&log);
        assert_eq!(calls[0], "image inspect --format={{.Id}} nginx:1.27");
        assert!(calls[1].ends_with("ps --format {{.Name}} web"));
        assert_eq!(calls[2], "container inspect --format={{.Image}} stack-web-1");
    })
    .await;
}

#[tokio::test]
async fn failing_query_is_a_resolve_error() {
    init_tracing();

    with_timeout(async {
        let (_dir, orchestrator, _log) = project(&[("broken", "app:1")]);

        let err = orchestrator.inspect_running_digest("broken").await.unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("broken"), "{msg}");
        assert!(msg.contains("daemon unreachable"), "{msg}");
    })
    .await;
}

#[tokio::test]
async fn full_cycle_pulls_then_restarts_whole_stack() {
    init_tracing();

    with_timeout(async {
        let (dir, orchestrator, log) = project(&[("web", "nginx:1.27"), ("worker", "busybox")]);

        let cycle = UpdateCycle::new(
            Arc::new(orchestrator),
            Arc::new(RealFileSystem),
            dir.path().join("stackpull.yml"),
            RestartMode::WholeStack,
        );
        let report = cycle.run_once().await.unwrap();

        assert!(report.any_required);
        assert!(report.decisions.iter().all(|d| d.required));
        assert!(report.restarted.as_ref().unwrap().is_success());

        let calls = logged_calls(&log);
        assert!(calls[0].ends_with(" pull web worker"), "{calls:?}");
        assert!(calls.iter().any(|c| c.ends_with(" down")), "{calls:?}");
        assert!(calls.last().unwrap().ends_with(" up -d"), "{calls:?}");
    })
    .await;
}

#[tokio::test]
async fn failed_subset_stop_still_starts() {
    init_tracing();

    with_timeout(async {
        let (_dir, orchestrator, log) = project(&[("web", "nginx:1.27")]);
        let scope = RestartScope::Subset(vec!["web".to_string()]);

        let stop = orchestrator.stop_workloads(&scope).await.unwrap();
        assert_eq!(stop.label(), "compose stop");
        let stop = stop.follow().await.unwrap();
        assert_eq!(stop.exit_code, 4);

        let start = orchestrator.start_workloads(&scope).await.unwrap();
        let start = start.follow().await.unwrap();
        assert!(start.success());

        let calls = logged_calls(&log);
        assert!(calls[0].ends_with(" stop web"), "{calls:?}");
        assert!(calls[1].ends_with(" up -d web"), "{calls:?}");
    })
    .await;
}

#[tokio::test]
async fn whole_stack_stop_is_labelled_as_down() {
    init_tracing();

    with_timeout(async {
        let (_dir, orchestrator, log) = project(&[("web", "nginx:1.27")]);

        let run = orchestrator.stop_workloads(&RestartScope::WholeStack).await.unwrap();
        assert_eq!(run.label(), "compose down");

        let output = run.follow().await.unwrap();
        assert_eq!(output.label, "compose down");
        assert!(output.success());
        assert!(logged_calls(&log)[0].ends_with(" down"));
    })
    .await;
}
