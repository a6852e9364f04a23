//! Run event vocabulary
//!
//! Events the orchestrator emits while executing a run, fanned out to
//! WebSocket subscribers by the gateway's event bus. The wire form is a JSON
//! object tagged by an `event` field, e.g.
//! `{"event": "step.log", "run_id": "...", "step_no": 1, ...}`.
//!
//! Per-run ordering is guaranteed by the producer: `run.status=RUNNING`
//! precedes all `step.*` events, `step.started` precedes its `step.log`
//! lines, which precede the matching `step.finished`, and `artifact.created`
//! events precede `run.completed`.

use lo_state::{RunStatus, StepStatus};
use serde::{Deserialize, Serialize};

/// Which output stream a log line was captured from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogStream {
    Stdout,
    Stderr,
}

/// Events emitted over the lifetime of a run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event")]
pub enum RunEvent {
    #[serde(rename = "run.status")]
    RunStatus { run_id: String, status: RunStatus },

    #[serde(rename = "step.started")]
    StepStarted {
        run_id: String,
        step_no: i32,
        command: String,
    },

    #[serde(rename = "step.log")]
    StepLog {
        run_id: String,
        step_no: i32,
        stream: LogStream,
        line: String,
    },

    #[serde(rename = "step.finished")]
    StepFinished {
        run_id: String,
        step_no: i32,
        status: StepStatus,
        exit_code: i32,
    },

    #[serde(rename = "artifact.created")]
    ArtifactCreated {
        run_id: String,
        kind: String,
        path: String,
    },

    #[serde(rename = "run.completed")]
    RunCompleted { run_id: String, status: RunStatus },
}

impl RunEvent {
    /// The run this event belongs to.
    pub fn run_id(&self) -> &str {
        match self {
            RunEvent::RunStatus { run_id, .. }
            | RunEvent::StepStarted { run_id, .. }
            | RunEvent::StepLog { run_id, .. }
            | RunEvent::StepFinished { run_id, .. }
            | RunEvent::ArtifactCreated { run_id, .. }
            | RunEvent::RunCompleted { run_id, .. } => run_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_wire_names() {
        let event = RunEvent::RunStatus {
            run_id: "run_1".to_string(),
            status: RunStatus::Running,
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["event"], "run.status");
        assert_eq!(value["status"], "RUNNING");

        let event = RunEvent::StepFinished {
            run_id: "run_1".to_string(),
            step_no: 2,
            status: StepStatus::Succeeded,
            exit_code: 0,
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["event"], "step.finished");
        assert_eq!(value["step_no"], 2);
        assert_eq!(value["status"], "SUCCEEDED");
    }

    #[test]
    fn test_step_log_stream_is_lowercase() {
        let event = RunEvent::StepLog {
            run_id: "run_1".to_string(),
            step_no: 1,
            stream: LogStream::Stdout,
            line: "hello".to_string(),
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["event"], "step.log");
        assert_eq!(value["stream"], "stdout");
    }

    #[test]
    fn test_events_round_trip() {
        let event = RunEvent::ArtifactCreated {
            run_id: "run_9".to_string(),
            kind: "report".to_string(),
            path: "/data/reports/run_9/report.md".to_string(),
        };
        let text = serde_json::to_string(&event).unwrap();
        let parsed: RunEvent = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed.run_id(), "run_9");
    }
}
