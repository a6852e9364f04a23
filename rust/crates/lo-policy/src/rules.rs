//! Built-in policy rules
//!
//! A head-token allowlist and a dangerous-pattern blocklist. Matching is
//! case-sensitive; the patterns mirror the classic footguns rather than
//! trying to be a full shell analyzer.

use regex::Regex;
use std::sync::OnceLock;

/// Commands whose head token may run inside the sandbox
pub const ALLOWED_COMMANDS: &[&str] = &[
    "git", "python", "pytest", "node", "pnpm", "npm", "rg", "sed", "awk", "echo", "ls", "pwd",
];

/// Get built-in dangerous patterns (compiled once)
pub fn dangerous_patterns() -> &'static [Regex] {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();

    PATTERNS.get_or_init(|| {
        vec![
            // rm -rf / at end-of-string or followed by whitespace
            Regex::new(r"\brm\s+-rf\s+/(\s|$)").unwrap(),
            // mkfs as a whole word
            Regex::new(r"\bmkfs\b").unwrap(),
            // raw dd writes
            Regex::new(r"\bdd\s+if=").unwrap(),
            // world-writable root
            Regex::new(r"\bchmod\s+777\s+/\b").unwrap(),
        ]
    })
}

/// Whether a head token is in the allowlist
pub fn is_allowed_command(head_token: &str) -> bool {
    ALLOWED_COMMANDS.contains(&head_token)
}

/// Whether any dangerous pattern matches the command
pub fn matches_dangerous_pattern(command: &str) -> bool {
    dangerous_patterns()
        .iter()
        .any(|pattern| pattern.is_match(command))
}
