//! LocalOps planner
//!
//! Turns a natural-language intent into a constrained `Plan`. The synthesis
//! is pluggable behind the `Planner` trait; the built-in `RulePlanner`
//! classifies intents by keyword into a small set of canonical plans. Every
//! command any planner emits must survive the policy engine at dispatch.

use lo_core::plan::{Plan, PlanStep, RiskLevel, PLAN_VERSION};
use tracing::instrument;

/// Intent-to-plan synthesis
pub trait Planner: Send + Sync {
    fn plan(&self, intent: &str) -> Plan;
}

/// Keyword-driven planner covering the common operations intents
#[derive(Debug, Clone, Default)]
pub struct RulePlanner;

impl Planner for RulePlanner {
    #[instrument(skip(self))]
    fn plan(&self, intent: &str) -> Plan {
        let lowered = intent.to_lowercase();
        if lowered.contains("test") {
            return test_plan(intent);
        }
        if lowered.contains("build") {
            return build_plan(intent);
        }
        if lowered.contains("log") || lowered.contains("error") {
            return log_search_plan(intent);
        }
        fallback_plan(intent)
    }
}

const STANDARD_OUTPUTS: &[&str] = &["report.md", "audit.json", "diff.patch"];

fn outputs() -> Vec<String> {
    STANDARD_OUTPUTS.iter().map(|s| s.to_string()).collect()
}

fn step(
    id: &str,
    step_type: &str,
    title: &str,
    commands: &[&str],
) -> PlanStep {
    PlanStep {
        id: id.to_string(),
        step_type: step_type.to_string(),
        title: title.to_string(),
        commands: commands.iter().map(|c| c.to_string()).collect(),
        dangerous: false,
        network_required: false,
    }
}

fn test_plan(intent: &str) -> Plan {
    Plan {
        version: PLAN_VERSION.to_string(),
        intent: intent.to_string(),
        risk_level: RiskLevel::Low,
        assumptions: vec!["project test command is available".to_string()],
        steps: vec![
            step("s1", "inspect", "Inspect workspace", &["git status"]),
            step("s2", "execute", "Run tests", &["pytest -q"]),
        ],
        outputs: outputs(),
    }
}

fn build_plan(intent: &str) -> Plan {
    Plan {
        version: PLAN_VERSION.to_string(),
        intent: intent.to_string(),
        risk_level: RiskLevel::Low,
        assumptions: vec!["project supports a build command".to_string()],
        steps: vec![
            step("s1", "inspect", "Check toolchain", &["node -v", "pnpm -v"]),
            step("s2", "execute", "Build project", &["pnpm build"]),
        ],
        outputs: outputs(),
    }
}

fn log_search_plan(intent: &str) -> Plan {
    Plan {
        version: PLAN_VERSION.to_string(),
        intent: intent.to_string(),
        risk_level: RiskLevel::Low,
        assumptions: vec!["log files are readable".to_string()],
        steps: vec![step(
            "s1",
            "inspect",
            "Search error logs",
            &[r#"rg -n "error|exception|traceback" ."#],
        )],
        outputs: outputs(),
    }
}

fn fallback_plan(intent: &str) -> Plan {
    Plan {
        version: PLAN_VERSION.to_string(),
        intent: intent.to_string(),
        risk_level: RiskLevel::Medium,
        assumptions: vec!["executing with minimal risk".to_string()],
        steps: vec![step(
            "s1",
            "inspect",
            "Survey outstanding work",
            &[r#"rg -n "TODO|FIXME" ."#],
        )],
        outputs: outputs(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intent_produces_test_plan() {
        let plan = RulePlanner.plan("run tests");
        assert_eq!(plan.version, PLAN_VERSION);
        assert_eq!(plan.risk_level, RiskLevel::Low);
        assert_eq!(plan.steps.len(), 2);
        assert_eq!(plan.steps[0].commands, vec!["git status"]);
        assert_eq!(plan.steps[1].commands, vec!["pytest -q"]);
        assert!(plan.validate().is_ok());
    }

    #[test]
    fn test_build_intent_produces_build_plan() {
        let plan = RulePlanner.plan("build the project");
        assert_eq!(plan.steps.len(), 2);
        assert_eq!(plan.steps[0].commands, vec!["node -v", "pnpm -v"]);
        assert_eq!(plan.steps[1].commands, vec!["pnpm build"]);
    }

    #[test]
    fn test_error_intent_produces_log_search_plan() {
        let plan = RulePlanner.plan("find errors in the logs");
        assert_eq!(plan.steps.len(), 1);
        assert!(plan.steps[0].commands[0].starts_with("rg -n"));
    }

    #[test]
    fn test_unknown_intent_falls_back_to_medium_risk_survey() {
        let plan = RulePlanner.plan("do something unusual");
        assert_eq!(plan.risk_level, RiskLevel::Medium);
        assert_eq!(plan.steps.len(), 1);
        assert!(plan.steps[0].commands[0].contains("TODO|FIXME"));
    }

    #[test]
    fn test_all_plans_list_the_standard_outputs() {
        for intent in ["run tests", "build it", "scan logs", "anything"] {
            let plan = RulePlanner.plan(intent);
            assert_eq!(plan.outputs, vec!["report.md", "audit.json", "diff.patch"]);
        }
    }

    #[test]
    fn test_every_planned_command_passes_policy() {
        for intent in ["run tests", "build it", "scan error logs", "anything"] {
            let plan = RulePlanner.plan(intent);
            for flat in plan.flatten_commands() {
                let decision = lo_policy::validate_command(&flat.command);
                assert!(
                    decision.is_allowed(),
                    "{:?} was denied: {}",
                    flat.command,
                    decision.reason
                );
            }
        }
    }

    #[test]
    fn test_no_planned_step_requires_network() {
        for intent in ["run tests", "build it", "scan logs", "anything"] {
            for step in RulePlanner.plan(intent).steps {
                assert!(!step.network_required);
                assert!(!step.dangerous);
            }
        }
    }
}
