//! Policy engine implementation

use crate::decision::PolicyDecision;
use crate::rules;
use lo_core::RiskLevel;
use tracing::instrument;

/// Validate a command against the blocklist and allowlist.
///
/// Order matters: an empty command is rejected first, then dangerous
/// patterns, then the head-token allowlist.
#[instrument]
pub fn validate_command(command: &str) -> PolicyDecision {
    let stripped = command.trim();
    if stripped.is_empty() {
        return PolicyDecision::deny("empty command");
    }

    if rules::matches_dangerous_pattern(stripped) {
        return PolicyDecision::deny("dangerous pattern blocked");
    }

    let head_token = stripped.split_whitespace().next().unwrap_or_default();
    if !rules::is_allowed_command(head_token) {
        return PolicyDecision::deny(format!("command '{head_token}' not in allowlist"));
    }

    PolicyDecision::allow("ok")
}

/// Classify the risk of running a command.
///
/// Network access dominates; otherwise package/VCS tooling is medium and
/// everything else low.
#[instrument]
pub fn evaluate_risk(command: &str, network_required: bool) -> RiskLevel {
    if network_required {
        return RiskLevel::High;
    }
    if ["git", "pnpm", "npm"]
        .iter()
        .any(|token| command.contains(token))
    {
        return RiskLevel::Medium;
    }
    RiskLevel::Low
}

#[cfg(test)]
mod tests {
    use super::*;

    // =============================================================================
    // Allowlist Tests
    // =============================================================================

    #[test]
    fn test_allowlist_command_allowed() {
        let decision = validate_command("pytest -q");
        assert!(decision.is_allowed());
        assert_eq!(decision.reason, "ok");
    }

    #[test]
    fn test_every_allowlisted_head_token_passes() {
        for head in rules::ALLOWED_COMMANDS {
            let decision = validate_command(&format!("{head} --version"));
            assert!(decision.is_allowed(), "{head} should be allowed");
        }
    }

    #[test]
    fn test_unknown_command_blocked() {
        let decision = validate_command("curl https://example.com");
        assert!(decision.is_denied());
        assert!(decision.reason.contains("allowlist"));
        assert!(decision.reason.contains("curl"));
    }

    #[test]
    fn test_leading_whitespace_is_stripped() {
        let decision = validate_command("   git status");
        assert!(decision.is_allowed());
    }

    // =============================================================================
    // Dangerous Pattern Tests
    // =============================================================================

    #[test]
    fn test_empty_command_blocked() {
        for command in ["", "   ", "\t\n"] {
            let decision = validate_command(command);
            assert!(decision.is_denied());
            assert_eq!(decision.reason, "empty command");
        }
    }

    #[test]
    fn test_rm_rf_root_blocked() {
        for command in ["rm -rf /", "rm -rf / ", "echo ok && rm -rf /"] {
            let decision = validate_command(command);
            assert!(decision.is_denied(), "{command:?} should be blocked");
            assert!(decision.reason.contains("blocked"));
        }
    }

    #[test]
    fn test_rm_rf_subdir_is_not_the_root_pattern() {
        // /tmp/x is not the filesystem root; this falls through to the
        // allowlist check instead (rm is not allowlisted anyway).
        let decision = validate_command("rm -rf /tmp/x");
        assert!(decision.is_denied());
        assert!(decision.reason.contains("allowlist"));
    }

    #[test]
    fn test_mkfs_blocked_as_whole_word() {
        let decision = validate_command("mkfs /dev/sda1");
        assert!(decision.is_denied());
        assert_eq!(decision.reason, "dangerous pattern blocked");
    }

    #[test]
    fn test_dd_writes_blocked() {
        let decision = validate_command("dd if=/dev/zero of=/dev/sda");
        assert!(decision.is_denied());
        assert_eq!(decision.reason, "dangerous pattern blocked");
    }

    #[test]
    fn test_chmod_777_root_blocked() {
        let decision = validate_command("chmod 777 /");
        assert!(decision.is_denied());
        assert_eq!(decision.reason, "dangerous pattern blocked");
    }

    #[test]
    fn test_dangerous_pattern_wins_over_allowlist() {
        // Head token is allowlisted but the pattern must still block it.
        let decision = validate_command("echo boom; rm -rf /");
        assert!(decision.is_denied());
        assert_eq!(decision.reason, "dangerous pattern blocked");
    }

    // =============================================================================
    // Risk Classification Tests
    // =============================================================================

    #[test]
    fn test_network_required_is_high_risk() {
        assert_eq!(evaluate_risk("ls", true), RiskLevel::High);
    }

    #[test]
    fn test_package_and_vcs_tools_are_medium_risk() {
        assert_eq!(evaluate_risk("git status", false), RiskLevel::Medium);
        assert_eq!(evaluate_risk("pnpm build", false), RiskLevel::Medium);
        assert_eq!(evaluate_risk("npm ci", false), RiskLevel::Medium);
    }

    #[test]
    fn test_everything_else_is_low_risk() {
        assert_eq!(evaluate_risk("pytest -q", false), RiskLevel::Low);
        assert_eq!(evaluate_risk("ls -la", false), RiskLevel::Low);
    }
}
