//! Run orchestration
//!
//! `execute_run` drives one run end to end: hydrate the plan and project,
//! take the run to RUNNING under the state machine, execute each step in a
//! per-step sandbox while streaming output, and finalize with the report,
//! audit and diff artifacts. Steps run strictly sequentially; the first
//! failure halts the run.
//!
//! The executor never propagates an error to the queue adapter: every
//! internal failure is caught, audited, and the run finalized as FAILED.
//! Redelivered jobs for terminal runs are no-ops.

use lo_artifacts::{ArtifactKind, ArtifactStore};
use lo_core::{time, LogStream, Plan, RunEvent, Settings};
use lo_policy::{evaluate_risk, validate_command};
use lo_state::{can_transition_run, can_transition_step, RunStatus, StepStatus};
use lo_storage::models::{
    action, actor, CreateArtifact, CreateAudit, Run, RunStep, UpdateRun, UpdateRunStep,
};
use lo_storage::{ArtifactsRepo, AuditsRepo, DbPool, PlansRepo, ProjectsRepo, RunsRepo, StepsRepo};
use metrics::counter;
use serde_json::json;
use std::path::Path;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info, instrument, warn};

use crate::events::EventClient;
use crate::report;
use crate::sandbox;
use crate::workspace::ScratchWorkspace;

/// Failed-step counter, labeled by command head token
pub const STEP_FAILURES_COUNTER: &str = "step_failures_total";

/// Working directory inside the sandbox
const SANDBOX_CWD: &str = "/workspace";
/// Environment variables allowed through to sandboxed commands
const ENV_ALLOWLIST: &[&str] = &["PATH", "HOME"];
/// Exit code recorded for policy-blocked steps
const POLICY_BLOCKED_EXIT: i32 = 126;

#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    #[error("database error: {0}")]
    Db(#[from] sqlx::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

type Result<T> = std::result::Result<T, RunnerError>;

enum StepOutcome {
    Continue,
    Halt,
}

/// Executes queued runs against their project workspaces
#[derive(Clone)]
pub struct RunExecutor {
    db: DbPool,
    settings: Settings,
    store: ArtifactStore,
    events: EventClient,
}

impl RunExecutor {
    pub fn new(db: DbPool, settings: Settings) -> Self {
        let store = ArtifactStore::new(settings.artifact_root.clone());
        let events = EventClient::new(&settings);
        Self {
            db,
            settings,
            store,
            events,
        }
    }

    fn runs(&self) -> RunsRepo {
        RunsRepo::new(self.db.clone())
    }

    fn steps(&self) -> StepsRepo {
        StepsRepo::new(self.db.clone())
    }

    fn audits(&self) -> AuditsRepo {
        AuditsRepo::new(self.db.clone())
    }

    fn artifacts(&self) -> ArtifactsRepo {
        ArtifactsRepo::new(self.db.clone())
    }

    /// Execute one run. Never returns an error to the caller.
    #[instrument(skip(self))]
    pub async fn execute_run(&self, run_id: &str) {
        if let Err(e) = self.execute_inner(run_id).await {
            error!(run_id = %run_id, error = %e, "Run execution aborted");
            self.mark_failed_best_effort(run_id, &e.to_string()).await;
        }
    }

    async fn execute_inner(&self, run_id: &str) -> Result<()> {
        let Some(run) = self.runs().get(run_id).await? else {
            warn!(run_id = %run_id, "Run not found, dropping job");
            return Ok(());
        };

        // Redelivery guard: a terminal run has nothing left to do.
        if run.status.is_terminal() {
            info!(run_id = %run_id, status = %run.status, "Run already terminal, skipping");
            return Ok(());
        }

        let plan_record = match &run.plan_id {
            Some(plan_id) => PlansRepo::new(self.db.clone()).get(plan_id).await?,
            None => None,
        };
        let project = ProjectsRepo::new(self.db.clone())
            .get(&run.project_id)
            .await?;

        let (Some(plan_record), Some(project)) = (plan_record, project) else {
            self.fail_before_execution(run_id, "missing plan or project")
                .await?;
            return Ok(());
        };

        if let Err(e) = Plan::from_value(&plan_record.plan_json) {
            self.fail_before_execution(run_id, &format!("invalid plan document: {e}"))
                .await?;
            return Ok(());
        }

        // The control API normally advanced the run to RUNNING at approval;
        // take the transition ourselves if the queue won a race, and abort
        // on a state the machine does not allow.
        let run = if run.status == RunStatus::Running {
            run
        } else if can_transition_run(run.status, RunStatus::Running) {
            self.runs()
                .update(
                    run_id,
                    UpdateRun {
                        status: Some(RunStatus::Running),
                        started_at: Some(time::now()),
                        ..Default::default()
                    },
                )
                .await?
                .ok_or(sqlx::Error::RowNotFound)?
        } else {
            self.fail_before_execution(
                run_id,
                &format!("invalid transition {} -> RUNNING", run.status),
            )
            .await?;
            return Ok(());
        };

        // Preparation: artifact dirs plus a throwaway copy of the project.
        // The tempdir drops (and is removed) on every exit path below.
        self.store.ensure_run_dirs(run_id)?;
        let workspace = ScratchWorkspace::create(run_id, Path::new(&project.root_path))?;

        self.events
            .emit(&RunEvent::RunStatus {
                run_id: run_id.to_string(),
                status: RunStatus::Running,
            })
            .await;

        let steps = self.steps().list_by_run(run_id).await?;
        let mut run_failed = false;
        for step in &steps {
            // Only QUEUED steps execute; terminal or racing steps are skipped.
            if !can_transition_step(step.status, StepStatus::Running) {
                continue;
            }
            match self.execute_step(&run, step, workspace.path()).await? {
                StepOutcome::Continue => {}
                StepOutcome::Halt => {
                    run_failed = true;
                    break;
                }
            }
        }

        self.finalize(run_id, run_failed, workspace.path()).await
    }

    /// Policy-gate, sandbox and record a single step.
    async fn execute_step(
        &self,
        run: &Run,
        step: &RunStep,
        workspace: &Path,
    ) -> Result<StepOutcome> {
        let decision = validate_command(&step.command);
        if decision.is_denied() {
            self.steps()
                .update(
                    &step.id,
                    UpdateRunStep {
                        status: Some(StepStatus::Failed),
                        exit_code: Some(POLICY_BLOCKED_EXIT),
                        finished_at: Some(time::now()),
                        ..Default::default()
                    },
                )
                .await?;
            self.audits()
                .append(CreateAudit::new(
                    run.id.clone(),
                    actor::WORKER,
                    action::COMMAND_BLOCKED,
                    json!({
                        "step_no": step.step_no,
                        "command": step.command,
                        "reason": decision.reason,
                    }),
                ))
                .await?;
            self.events
                .emit(&RunEvent::StepFinished {
                    run_id: run.id.clone(),
                    step_no: step.step_no,
                    status: StepStatus::Failed,
                    exit_code: POLICY_BLOCKED_EXIT,
                })
                .await;
            return Ok(StepOutcome::Halt);
        }

        self.steps()
            .update(
                &step.id,
                UpdateRunStep {
                    status: Some(StepStatus::Running),
                    started_at: Some(time::now()),
                    ..Default::default()
                },
            )
            .await?;
        self.events
            .emit(&RunEvent::StepStarted {
                run_id: run.id.clone(),
                step_no: step.step_no,
                command: step.command.clone(),
            })
            .await;

        let (exit_code, lines) = self.run_sandboxed(run, step, workspace).await;

        let stdout_path = self.store.step_stdout_path(&run.id, step.step_no);
        let stderr_path = self.store.step_stderr_path(&run.id, step.step_no);
        tokio::fs::write(&stdout_path, lines.join("\n")).await?;
        // Streams are merged inside the sandbox; the .err companion stays empty.
        tokio::fs::write(&stderr_path, "").await?;

        let status = if exit_code == 0 {
            StepStatus::Succeeded
        } else {
            StepStatus::Failed
        };
        self.steps()
            .update(
                &step.id,
                UpdateRunStep {
                    status: Some(status),
                    exit_code: Some(exit_code),
                    finished_at: Some(time::now()),
                    stdout_path: Some(stdout_path.display().to_string()),
                    stderr_path: Some(stderr_path.display().to_string()),
                    ..Default::default()
                },
            )
            .await?;

        self.audits()
            .append(CreateAudit::new(
                run.id.clone(),
                actor::WORKER,
                action::STEP_EXECUTED,
                json!({
                    "step_no": step.step_no,
                    "command": step.command,
                    "cwd": SANDBOX_CWD,
                    "env_allowlist": ENV_ALLOWLIST,
                    "exit_code": exit_code,
                    "risk": evaluate_risk(&step.command, false),
                    "sandbox": {
                        "network": "none",
                        "cpus": sandbox::SANDBOX_CPUS,
                        "memory": sandbox::SANDBOX_MEMORY,
                        "pids_limit": sandbox::SANDBOX_PIDS_LIMIT,
                    },
                }),
            ))
            .await?;

        self.events
            .emit(&RunEvent::StepFinished {
                run_id: run.id.clone(),
                step_no: step.step_no,
                status,
                exit_code,
            })
            .await;

        if exit_code != 0 {
            counter!(STEP_FAILURES_COUNTER, "command" => head_token(&step.command)).increment(1);
            return Ok(StepOutcome::Halt);
        }
        Ok(StepOutcome::Continue)
    }

    /// Spawn the sandbox and stream its merged output line by line.
    ///
    /// Stdout is drained to EOF before waiting on the child to avoid
    /// pipe-buffer deadlocks on chatty commands. A launch failure is a step
    /// failure, not a run-level error.
    async fn run_sandboxed(&self, run: &Run, step: &RunStep, workspace: &Path) -> (i32, Vec<String>) {
        let mut child = match sandbox::spawn(
            &step.command,
            workspace,
            false,
            &self.settings.sandbox_image,
        ) {
            Ok(child) => child,
            Err(e) => {
                warn!(step_no = step.step_no, error = %e, "Sandbox launch failed");
                return (-1, Vec::new());
            }
        };

        let mut lines = Vec::new();
        if let Some(stdout) = child.stdout.take() {
            let mut reader = BufReader::new(stdout).lines();
            while let Ok(Some(line)) = reader.next_line().await {
                self.events
                    .emit(&RunEvent::StepLog {
                        run_id: run.id.clone(),
                        step_no: step.step_no,
                        stream: LogStream::Stdout,
                        line: line.clone(),
                    })
                    .await;
                lines.push(line);
            }
        }

        let exit_code = match child.wait().await {
            Ok(status) => status.code().unwrap_or(-1),
            Err(e) => {
                warn!(step_no = step.step_no, error = %e, "Sandbox wait failed");
                -1
            }
        };
        (exit_code, lines)
    }

    /// Terminal status, artifacts, closing audit and terminal event.
    async fn finalize(&self, run_id: &str, run_failed: bool, workspace: &Path) -> Result<()> {
        let status = if run_failed {
            RunStatus::Failed
        } else {
            RunStatus::Succeeded
        };
        let run = self
            .runs()
            .update(
                run_id,
                UpdateRun {
                    status: Some(status),
                    finished_at: Some(time::now()),
                    ..Default::default()
                },
            )
            .await?
            .ok_or(sqlx::Error::RowNotFound)?;

        let steps = self.steps().list_by_run(run_id).await?;

        let report_path = self.store.report_path(run_id);
        let audit_path = self.store.audit_path(run_id);
        let diff_path = self.store.diff_path(run_id);

        let report_text = report::render_report(&run, &steps);
        let audit_text = report::to_pretty_json(&report::render_audit_document(&run, &steps));
        let diff_text = workspace_diff(workspace).await;

        for (path, content) in [
            (&report_path, report_text),
            (&audit_path, audit_text),
            (&diff_path, diff_text),
        ] {
            if let Err(e) = tokio::fs::write(path, content).await {
                warn!(path = %path.display(), error = %e, "Artifact write failed");
            }
        }

        // Record in creation order; a missing or unreadable file is audited
        // and skipped without touching run or step status.
        for (kind, path) in [
            (ArtifactKind::Report, &report_path),
            (ArtifactKind::Audit, &audit_path),
            (ArtifactKind::Diff, &diff_path),
        ] {
            self.record_artifact(run_id, kind, path).await?;
        }

        self.audits()
            .append(CreateAudit::new(
                run_id.to_string(),
                actor::WORKER,
                action::RUN_COMPLETED,
                json!({"status": run.status}),
            ))
            .await?;
        self.events
            .emit(&RunEvent::RunCompleted {
                run_id: run_id.to_string(),
                status: run.status,
            })
            .await;

        info!(run_id = %run_id, status = %run.status, "Run finalized");
        Ok(())
    }

    async fn record_artifact(
        &self,
        run_id: &str,
        kind: ArtifactKind,
        path: &Path,
    ) -> Result<()> {
        let described = match self.store.describe(kind, path) {
            Ok(Some(file)) => file,
            Ok(None) => {
                self.audit_artifact_failure(run_id, kind, path, "file missing")
                    .await?;
                return Ok(());
            }
            Err(e) => {
                self.audit_artifact_failure(run_id, kind, path, &e.to_string())
                    .await?;
                return Ok(());
            }
        };

        self.artifacts()
            .create(CreateArtifact {
                id: lo_core::ArtifactId::new().to_string(),
                run_id: run_id.to_string(),
                kind: kind.as_str().to_string(),
                path: described.path.display().to_string(),
                sha256: described.sha256,
                size: described.size,
            })
            .await?;

        self.events
            .emit(&RunEvent::ArtifactCreated {
                run_id: run_id.to_string(),
                kind: kind.as_str().to_string(),
                path: path.display().to_string(),
            })
            .await;
        Ok(())
    }

    async fn audit_artifact_failure(
        &self,
        run_id: &str,
        kind: ArtifactKind,
        path: &Path,
        reason: &str,
    ) -> Result<()> {
        warn!(run_id = %run_id, kind = %kind, reason = %reason, "Artifact not recorded");
        self.audits()
            .append(CreateAudit::new(
                run_id.to_string(),
                actor::WORKER,
                action::ARTIFACT_FAILED,
                json!({
                    "kind": kind.as_str(),
                    "path": path.display().to_string(),
                    "reason": reason,
                }),
            ))
            .await?;
        Ok(())
    }

    /// A run failed its preconditions: finalize FAILED before any step ran.
    async fn fail_before_execution(&self, run_id: &str, reason: &str) -> Result<()> {
        warn!(run_id = %run_id, reason = %reason, "Run failed before execution");
        self.runs()
            .update(
                run_id,
                UpdateRun {
                    status: Some(RunStatus::Failed),
                    finished_at: Some(time::now()),
                    ..Default::default()
                },
            )
            .await?;
        self.audits()
            .append(CreateAudit::new(
                run_id.to_string(),
                actor::WORKER,
                action::RUN_FAILED,
                json!({"reason": reason}),
            ))
            .await?;
        Ok(())
    }

    /// Last-resort failure path for internal errors; everything best-effort.
    async fn mark_failed_best_effort(&self, run_id: &str, reason: &str) {
        if let Ok(Some(run)) = self.runs().get(run_id).await {
            if !run.status.is_terminal() {
                let _ = self
                    .runs()
                    .update(
                        run_id,
                        UpdateRun {
                            status: Some(RunStatus::Failed),
                            finished_at: Some(time::now()),
                            ..Default::default()
                        },
                    )
                    .await;
            }
        }
        let _ = self
            .audits()
            .append(CreateAudit::new(
                run_id.to_string(),
                actor::WORKER,
                action::RUN_FAILED,
                json!({"reason": reason}),
            ))
            .await;
        self.events
            .emit(&RunEvent::RunCompleted {
                run_id: run_id.to_string(),
                status: RunStatus::Failed,
            })
            .await;
    }
}

/// First whitespace-separated token of a command, for metric labels
fn head_token(command: &str) -> String {
    command
        .split_whitespace()
        .next()
        .unwrap_or("unknown")
        .to_string()
}

/// Diff of the scratch workspace; empty when it is not a VCS checkout
async fn workspace_diff(workspace: &Path) -> String {
    match tokio::process::Command::new("git")
        .arg("-C")
        .arg(workspace)
        .arg("diff")
        .output()
        .await
    {
        Ok(output) => String::from_utf8_lossy(&output.stdout).into_owned(),
        Err(e) => {
            warn!(error = %e, "git diff unavailable, writing empty patch");
            String::new()
        }
    }
}
