//! The Plan schema and sandbox metadata
//!
//! A Plan is the structured recipe a run executes: a versioned document with
//! an intent, a risk classification and an ordered list of steps, each of
//! which carries one or more shell commands. `plan_json` in the database is
//! always a serialized `Plan`; validation happens at ingress so the worker
//! can trust the shape.

use serde::{Deserialize, Serialize};

/// The only plan document version currently understood.
pub const PLAN_VERSION: &str = "1.0";

/// Risk classification for a plan or a single command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
        }
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single planned step: a title plus the commands that realize it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanStep {
    pub id: String,
    #[serde(rename = "type")]
    pub step_type: String,
    pub title: String,
    pub commands: Vec<String>,
    #[serde(default)]
    pub dangerous: bool,
    #[serde(default)]
    pub network_required: bool,
}

/// A versioned execution recipe produced from a natural-language intent
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Plan {
    pub version: String,
    pub intent: String,
    pub risk_level: RiskLevel,
    #[serde(default)]
    pub assumptions: Vec<String>,
    pub steps: Vec<PlanStep>,
    #[serde(default)]
    pub outputs: Vec<String>,
}

/// Plan schema violations found at ingress
#[derive(Debug, Clone, thiserror::Error)]
pub enum PlanError {
    #[error("unsupported plan version '{0}'")]
    UnsupportedVersion(String),
    #[error("plan has no steps")]
    NoSteps,
    #[error("plan step '{0}' has no commands")]
    EmptyStep(String),
    #[error("plan is not valid JSON: {0}")]
    Malformed(String),
}

impl Plan {
    /// Parse and validate a `plan_json` value.
    pub fn from_value(value: &serde_json::Value) -> Result<Self, PlanError> {
        let plan: Plan = serde_json::from_value(value.clone())
            .map_err(|e| PlanError::Malformed(e.to_string()))?;
        plan.validate()?;
        Ok(plan)
    }

    /// Check the structural invariants the worker relies on.
    pub fn validate(&self) -> Result<(), PlanError> {
        if self.version != PLAN_VERSION {
            return Err(PlanError::UnsupportedVersion(self.version.clone()));
        }
        if self.steps.is_empty() {
            return Err(PlanError::NoSteps);
        }
        for step in &self.steps {
            if step.commands.is_empty() {
                return Err(PlanError::EmptyStep(step.id.clone()));
            }
        }
        Ok(())
    }

    /// Flatten plan steps into per-command run steps.
    ///
    /// Iterates steps in order, then each step's commands in order, assigning
    /// a dense 1-based `step_no` and carrying the enclosing step's type.
    pub fn flatten_commands(&self) -> Vec<FlatCommand> {
        let mut flat = Vec::new();
        for step in &self.steps {
            for command in &step.commands {
                flat.push(FlatCommand {
                    step_no: flat.len() as i32 + 1,
                    step_type: step.step_type.clone(),
                    command: command.clone(),
                });
            }
        }
        flat
    }
}

/// One command of a flattened plan, ready to become a RunStep
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlatCommand {
    pub step_no: i32,
    pub step_type: String,
    pub command: String,
}

/// Resource and network caps recorded on a run and enforced by the sandbox
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SandboxMeta {
    pub network_default: String,
    pub cpus: u32,
    pub memory: String,
    pub pids_limit: u32,
}

impl Default for SandboxMeta {
    fn default() -> Self {
        Self {
            network_default: "none".to_string(),
            cpus: 1,
            memory: "512m".to_string(),
            pids_limit: 128,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_plan() -> Plan {
        Plan {
            version: PLAN_VERSION.to_string(),
            intent: "run tests".to_string(),
            risk_level: RiskLevel::Low,
            assumptions: vec!["test command available".to_string()],
            steps: vec![
                PlanStep {
                    id: "s1".to_string(),
                    step_type: "inspect".to_string(),
                    title: "Inspect workspace".to_string(),
                    commands: vec!["git status".to_string()],
                    dangerous: false,
                    network_required: false,
                },
                PlanStep {
                    id: "s2".to_string(),
                    step_type: "execute".to_string(),
                    title: "Run tests".to_string(),
                    commands: vec!["pytest -q".to_string()],
                    dangerous: false,
                    network_required: false,
                },
            ],
            outputs: vec!["report.md".to_string()],
        }
    }

    #[test]
    fn test_plan_round_trips_through_json() {
        let plan = sample_plan();
        let value = serde_json::to_value(&plan).unwrap();
        assert_eq!(value["steps"][0]["type"], "inspect");
        assert_eq!(value["risk_level"], "low");

        let parsed = Plan::from_value(&value).unwrap();
        assert_eq!(parsed.steps.len(), 2);
        assert_eq!(parsed.steps[1].commands[0], "pytest -q");
    }

    #[test]
    fn test_validate_rejects_unknown_version() {
        let mut plan = sample_plan();
        plan.version = "2.0".to_string();
        assert!(matches!(
            plan.validate(),
            Err(PlanError::UnsupportedVersion(_))
        ));
    }

    #[test]
    fn test_validate_rejects_empty_steps() {
        let mut plan = sample_plan();
        plan.steps.clear();
        assert!(matches!(plan.validate(), Err(PlanError::NoSteps)));

        let mut plan = sample_plan();
        plan.steps[0].commands.clear();
        assert!(matches!(plan.validate(), Err(PlanError::EmptyStep(_))));
    }

    #[test]
    fn test_from_value_rejects_malformed_json() {
        let value = json!({"version": "1.0", "steps": "not-a-list"});
        assert!(matches!(
            Plan::from_value(&value),
            Err(PlanError::Malformed(_))
        ));
    }

    #[test]
    fn test_flatten_assigns_dense_step_numbers() {
        let mut plan = sample_plan();
        plan.steps[0].commands.push("git log -1".to_string());

        let flat = plan.flatten_commands();
        assert_eq!(flat.len(), 3);
        assert_eq!(
            flat.iter().map(|c| c.step_no).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );
        assert_eq!(flat[0].command, "git status");
        assert_eq!(flat[1].command, "git log -1");
        assert_eq!(flat[1].step_type, "inspect");
        assert_eq!(flat[2].step_type, "execute");
    }

    #[test]
    fn test_sandbox_meta_defaults() {
        let meta = SandboxMeta::default();
        let value = serde_json::to_value(&meta).unwrap();
        assert_eq!(
            value,
            json!({"network_default": "none", "cpus": 1, "memory": "512m", "pids_limit": 128})
        );
    }
}
