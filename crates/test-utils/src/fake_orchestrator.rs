use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use stackpull::errors::{Result, StackpullError};
use stackpull::orchestrator::{BoxFuture, CommandRun, Orchestrator, OutputLine, RestartScope};
use stackpull::workload::WorkloadSpec;

/// Every call the engine made, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrchestratorCall {
    ListWorkloads,
    Refresh(Vec<String>),
    InspectImage(String),
    InspectRunning(String),
    Stop(RestartScope),
    Pull(RestartScope),
    Start(RestartScope),
}

impl OrchestratorCall {
    /// Stop / pull / start, i.e. anything that mutates the stack.
    pub fn is_lifecycle(&self) -> bool {
        matches!(
            self,
            OrchestratorCall::Stop(_) | OrchestratorCall::Pull(_) | OrchestratorCall::Start(_)
        )
    }
}

#[derive(Debug, Default)]
struct Script {
    workloads: Vec<WorkloadSpec>,
    image_digests: HashMap<String, String>,
    failing_images: HashSet<String>,
    running: HashMap<String, String>,
    failing_running: HashSet<String>,
    refresh_exit: i32,
    refresh_unavailable: bool,
    stop_exit: i32,
    pull_exit: i32,
    start_exit: i32,
    calls: Vec<OrchestratorCall>,
}

/// Scriptable in-memory [`Orchestrator`].
///
/// - `list_workload_specs` returns the scripted workloads.
/// - image digests are keyed by image reference, running digests by
///   workload name; a workload without a running digest is "not running".
/// - a successful start marks the started workloads as running the current
///   desired digest, so a follow-up cycle sees them up to date.
#[derive(Debug, Clone, Default)]
pub struct FakeOrchestrator {
    script: Arc<Mutex<Script>>,
}

impl FakeOrchestrator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a workload whose image currently resolves to `desired`.
    pub fn with_workload(self, name: &str, image: &str, desired: &str) -> Self {
        {
            let mut s = self.script.lock().unwrap();
            s.workloads.push(WorkloadSpec::new(name, image));
            s.image_digests.insert(image.to_string(), desired.to_string());
        }
        self
    }

    /// Mark `name` as running `digest`.
    pub fn with_running(self, name: &str, digest: &str) -> Self {
        self.set_running(name, digest);
        self
    }

    pub fn with_failing_image(self, image: &str) -> Self {
        self.script
            .lock()
            .unwrap()
            .failing_images
            .insert(image.to_string());
        self
    }

    pub fn with_failing_running(self, name: &str) -> Self {
        self.script
            .lock()
            .unwrap()
            .failing_running
            .insert(name.to_string());
        self
    }

    pub fn with_refresh_exit(self, code: i32) -> Self {
        self.script.lock().unwrap().refresh_exit = code;
        self
    }

    /// Make the refresh fail to launch at all.
    pub fn with_refresh_unavailable(self) -> Self {
        self.script.lock().unwrap().refresh_unavailable = true;
        self
    }

    pub fn with_stop_exit(self, code: i32) -> Self {
        self.script.lock().unwrap().stop_exit = code;
        self
    }

    pub fn with_pull_exit(self, code: i32) -> Self {
        self.script.lock().unwrap().pull_exit = code;
        self
    }

    pub fn with_start_exit(self, code: i32) -> Self {
        self.script.lock().unwrap().start_exit = code;
        self
    }

    /// Simulate a newer image showing up in the registry.
    pub fn set_image_digest(&self, image: &str, digest: &str) {
        self.script
            .lock()
            .unwrap()
            .image_digests
            .insert(image.to_string(), digest.to_string());
    }

    pub fn set_running(&self, name: &str, digest: &str) {
        self.script
            .lock()
            .unwrap()
            .running
            .insert(name.to_string(), digest.to_string());
    }

    pub fn calls(&self) -> Vec<OrchestratorCall> {
        self.script.lock().unwrap().calls.clone()
    }

    /// Only stop / pull / start calls.
    pub fn lifecycle_calls(&self) -> Vec<OrchestratorCall> {
        self.calls()
            .into_iter()
            .filter(OrchestratorCall::is_lifecycle)
            .collect()
    }

    pub fn refresh_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, OrchestratorCall::Refresh(_)))
            .count()
    }

    pub fn clear_calls(&self) {
        self.script.lock().unwrap().calls.clear();
    }

    fn record(&self, call: OrchestratorCall) {
        self.script.lock().unwrap().calls.push(call);
    }

    fn lifecycle_run(&self, label: &str, scope: &RestartScope, exit_code: i32) -> CommandRun {
        let lines = if exit_code == 0 {
            vec![OutputLine::stdout(format!("{label} {scope}: done"))]
        } else {
            vec![OutputLine::stderr(format!("{label} {scope}: boom"))]
        };
        CommandRun::completed(label, lines, exit_code)
    }
}

impl Orchestrator for FakeOrchestrator {
    fn list_workload_specs(&self) -> BoxFuture<'_, Result<Vec<WorkloadSpec>>> {
        Box::pin(async move {
            self.record(OrchestratorCall::ListWorkloads);
            Ok(self.script.lock().unwrap().workloads.clone())
        })
    }

    fn refresh_desired_state<'a>(
        &'a self,
        workloads: &'a [WorkloadSpec],
    ) -> BoxFuture<'a, Result<CommandRun>> {
        Box::pin(async move {
            let names = workloads.iter().map(|w| w.name.clone()).collect();
            self.record(OrchestratorCall::Refresh(names));

            let s = self.script.lock().unwrap();
            if s.refresh_unavailable {
                return Err(StackpullError::Other(anyhow::anyhow!(
                    "compose binary not found"
                )));
            }
            let lines = vec![OutputLine::stderr("Pulling images")];
            Ok(CommandRun::completed("compose pull", lines, s.refresh_exit))
        })
    }

    fn inspect_image_digest<'a>(&'a self, image: &'a str) -> BoxFuture<'a, Result<String>> {
        Box::pin(async move {
            self.record(OrchestratorCall::InspectImage(image.to_string()));

            let s = self.script.lock().unwrap();
            if s.failing_images.contains(image) {
                return Err(StackpullError::ResolveError {
                    workload: image.to_string(),
                    reason: "No such image".to_string(),
                });
            }
            s.image_digests
                .get(image)
                .cloned()
                .ok_or_else(|| StackpullError::ResolveError {
                    workload: image.to_string(),
                    reason: "unknown image".to_string(),
                })
        })
    }

    fn inspect_running_digest<'a>(
        &'a self,
        workload: &'a str,
    ) -> BoxFuture<'a, Result<Option<String>>> {
        Box::pin(async move {
            self.record(OrchestratorCall::InspectRunning(workload.to_string()));

            let s = self.script.lock().unwrap();
            if s.failing_running.contains(workload) {
                return Err(StackpullError::ResolveError {
                    workload: workload.to_string(),
                    reason: "daemon unreachable".to_string(),
                });
            }
            Ok(s.running.get(workload).cloned())
        })
    }

    fn stop_workloads<'a>(&'a self, scope: &'a RestartScope) -> BoxFuture<'a, Result<CommandRun>> {
        Box::pin(async move {
            self.record(OrchestratorCall::Stop(scope.clone()));
            let code = self.script.lock().unwrap().stop_exit;
            let label = match scope {
                RestartScope::WholeStack => "compose down",
                RestartScope::Subset(_) => "compose stop",
            };
            Ok(self.lifecycle_run(label, scope, code))
        })
    }

    fn pull_workloads<'a>(&'a self, scope: &'a RestartScope) -> BoxFuture<'a, Result<CommandRun>> {
        Box::pin(async move {
            self.record(OrchestratorCall::Pull(scope.clone()));
            let code = self.script.lock().unwrap().pull_exit;
            Ok(self.lifecycle_run("compose pull", scope, code))
        })
    }

    fn start_workloads<'a>(&'a self, scope: &'a RestartScope) -> BoxFuture<'a, Result<CommandRun>> {
        Box::pin(async move {
            self.record(OrchestratorCall::Start(scope.clone()));

            let code = {
                let mut s = self.script.lock().unwrap();
                if s.start_exit == 0 {
                    let started: Vec<(String, String)> = s
                        .workloads
                        .iter()
                        .filter(|w| match scope {
                            RestartScope::WholeStack => true,
                            RestartScope::Subset(names) => names.contains(&w.name),
                        })
                        .filter_map(|w| {
                            s.image_digests
                                .get(&w.image)
                                .map(|d| (w.name.clone(), d.clone()))
                        })
                        .collect();
                    s.running.extend(started);
                }
                s.start_exit
            };

            Ok(self.lifecycle_run("compose up", scope, code))
        })
    }
}
