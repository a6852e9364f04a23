//! Run report and audit document rendering

use lo_state::StepStatus;
use lo_storage::models::{Run, RunStep};
use serde_json::json;

fn render_timestamp(ts: Option<chrono::DateTime<chrono::Utc>>) -> String {
    ts.map(|t| t.to_rfc3339()).unwrap_or_else(|| "-".to_string())
}

fn render_exit(exit_code: Option<i32>) -> String {
    exit_code
        .map(|c| c.to_string())
        .unwrap_or_else(|| "none".to_string())
}

/// Render the Markdown run report.
pub fn render_report(run: &Run, steps: &[RunStep]) -> String {
    let mut lines: Vec<String> = Vec::new();
    lines.push(format!("# Run {} Report", run.id));
    lines.push(String::new());
    lines.push(format!("- status: {}", run.status));
    lines.push(format!("- risk_level: {}", run.risk_level));
    lines.push(format!("- started_at: {}", render_timestamp(run.started_at)));
    lines.push(format!(
        "- finished_at: {}",
        render_timestamp(run.finished_at)
    ));
    lines.push(String::new());
    lines.push("## Steps".to_string());
    for step in steps {
        lines.push(format!(
            "- step {}: {} => {} (exit={})",
            step.step_no,
            step.command,
            step.status,
            render_exit(step.exit_code)
        ));
    }

    let failed: Vec<&RunStep> = steps
        .iter()
        .filter(|s| s.status == StepStatus::Failed)
        .collect();
    if !failed.is_empty() {
        lines.push(String::new());
        lines.push("## Failure".to_string());
        for step in &failed {
            lines.push(format!("- step {} failed", step.step_no));
        }
    }

    lines.push(String::new());
    lines.push("## Next".to_string());
    if failed.is_empty() {
        lines.push("- review generated artifacts and finalize".to_string());
    } else {
        lines.push("- review stderr logs and fix command or source code".to_string());
    }

    lines.join("\n")
}

/// Build the audit.json document: run outcome plus a per-step timeline and
/// the sandbox caps that were in force.
pub fn render_audit_document(run: &Run, steps: &[RunStep]) -> serde_json::Value {
    let timeline: Vec<serde_json::Value> = steps
        .iter()
        .map(|step| {
            json!({
                "step_no": step.step_no,
                "command": step.command,
                "status": step.status,
                "exit_code": step.exit_code,
                "stdout_path": step.stdout_path,
                "stderr_path": step.stderr_path,
            })
        })
        .collect();

    json!({
        "run_id": run.id,
        "status": run.status,
        "timeline": timeline,
        "sandbox": run.sandbox_meta,
    })
}

/// Serialize with stable two-space indentation, preserving non-ASCII
/// characters literally (serde_json never escapes them).
pub fn to_pretty_json(value: &serde_json::Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| "{}".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use lo_state::RunStatus;

    fn sample_run(status: RunStatus) -> Run {
        Run {
            id: "run_1".to_string(),
            project_id: "prj_1".to_string(),
            plan_id: Some("pln_1".to_string()),
            status,
            started_at: Some(Utc::now()),
            finished_at: Some(Utc::now()),
            sandbox_meta: json!({"network_default": "none", "cpus": 1, "memory": "512m", "pids_limit": 128}),
            risk_level: "low".to_string(),
            created_at: Utc::now(),
        }
    }

    fn sample_step(step_no: i32, command: &str, status: StepStatus, exit_code: Option<i32>) -> RunStep {
        RunStep {
            id: format!("stp_{step_no}"),
            run_id: "run_1".to_string(),
            step_no,
            step_type: "execute".to_string(),
            command: command.to_string(),
            status,
            exit_code,
            started_at: Some(Utc::now()),
            finished_at: Some(Utc::now()),
            stdout_path: Some(format!("/data/logs/run_1/{step_no}.out")),
            stderr_path: Some(format!("/data/logs/run_1/{step_no}.err")),
        }
    }

    #[test]
    fn test_report_lists_steps_with_exit_codes() {
        let run = sample_run(RunStatus::Succeeded);
        let steps = vec![
            sample_step(1, "git status", StepStatus::Succeeded, Some(0)),
            sample_step(2, "pytest -q", StepStatus::Succeeded, Some(0)),
        ];
        let report = render_report(&run, &steps);

        assert!(report.starts_with("# Run run_1 Report"));
        assert!(report.contains("- status: SUCCEEDED"));
        assert!(report.contains("- risk_level: low"));
        assert!(report.contains("- step 1: git status => SUCCEEDED (exit=0)"));
        assert!(report.contains("- step 2: pytest -q => SUCCEEDED (exit=0)"));
        assert!(!report.contains("## Failure"));
        assert!(report.contains("- review generated artifacts and finalize"));
    }

    #[test]
    fn test_report_failure_section_enumerates_failed_steps() {
        let run = sample_run(RunStatus::Failed);
        let steps = vec![
            sample_step(1, "git status", StepStatus::Succeeded, Some(0)),
            sample_step(2, "pytest -q", StepStatus::Failed, Some(7)),
        ];
        let report = render_report(&run, &steps);

        assert!(report.contains("- step 2: pytest -q => FAILED (exit=7)"));
        assert!(report.contains("## Failure"));
        assert!(report.contains("- step 2 failed"));
        assert!(report.contains("- review stderr logs and fix command or source code"));
    }

    #[test]
    fn test_report_renders_unexecuted_steps_without_exit() {
        let run = sample_run(RunStatus::Failed);
        let mut queued = sample_step(2, "pytest -q", StepStatus::Queued, None);
        queued.started_at = None;
        queued.finished_at = None;
        let steps = vec![
            sample_step(1, "curl http://x", StepStatus::Failed, Some(126)),
            queued,
        ];
        let report = render_report(&run, &steps);
        assert!(report.contains("- step 2: pytest -q => QUEUED (exit=none)"));
    }

    #[test]
    fn test_audit_document_shape() {
        let run = sample_run(RunStatus::Succeeded);
        let steps = vec![sample_step(1, "git status", StepStatus::Succeeded, Some(0))];
        let doc = render_audit_document(&run, &steps);

        assert_eq!(doc["run_id"], "run_1");
        assert_eq!(doc["status"], "SUCCEEDED");
        assert_eq!(doc["timeline"].as_array().unwrap().len(), 1);
        assert_eq!(doc["timeline"][0]["step_no"], 1);
        assert_eq!(doc["timeline"][0]["exit_code"], 0);
        assert_eq!(doc["sandbox"]["memory"], "512m");
    }

    #[test]
    fn test_pretty_json_uses_two_space_indent_and_keeps_unicode() {
        let doc = json!({"intent": "运行单测", "steps": [1]});
        let text = to_pretty_json(&doc);
        assert!(text.contains("  \"intent\""));
        assert!(text.contains("运行单测"));
        assert!(!text.contains("\\u"));
    }
}
