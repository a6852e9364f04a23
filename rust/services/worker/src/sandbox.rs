//! Sandbox invocation
//!
//! Each step runs inside a disposable container: the scratch workspace is
//! mounted read-write at /workspace, the network is off unless the step
//! declares it needs one, and CPU/memory/pid caps plus dropped capabilities
//! bound the blast radius. The command is handed to an in-container POSIX
//! shell as a single `-lc` string with stderr folded into stdout so the
//! parent reads one line-oriented stream.

use std::path::Path;
use std::process::Stdio;
use tokio::process::{Child, Command};

/// CPU cap handed to the container runtime
pub const SANDBOX_CPUS: &str = "1.0";
/// Memory cap handed to the container runtime
pub const SANDBOX_MEMORY: &str = "512m";
/// Pid cap handed to the container runtime
pub const SANDBOX_PIDS_LIMIT: &str = "128";

/// Shell script wrapping a step command, merging stderr into stdout
pub fn shell_script(command: &str) -> String {
    format!("{{ {command}\n}} 2>&1")
}

/// Argument vector for the container runtime
pub fn docker_args(
    command: &str,
    workspace: &Path,
    network_required: bool,
    image: &str,
) -> Vec<String> {
    let network_mode = if network_required { "bridge" } else { "none" };
    vec![
        "run".to_string(),
        "--rm".to_string(),
        "--network".to_string(),
        network_mode.to_string(),
        "--cpus".to_string(),
        SANDBOX_CPUS.to_string(),
        "--memory".to_string(),
        SANDBOX_MEMORY.to_string(),
        "--pids-limit".to_string(),
        SANDBOX_PIDS_LIMIT.to_string(),
        "--cap-drop=ALL".to_string(),
        "--security-opt".to_string(),
        "no-new-privileges".to_string(),
        "-v".to_string(),
        format!("{}:/workspace", workspace.display()),
        "-w".to_string(),
        "/workspace".to_string(),
        image.to_string(),
        "sh".to_string(),
        "-lc".to_string(),
        shell_script(command),
    ]
}

/// Spawn the sandbox for a step with stdout piped for line capture.
///
/// The caller must drain stdout to EOF before waiting on the child, or a
/// chatty command can deadlock on a full pipe buffer.
pub fn spawn(
    command: &str,
    workspace: &Path,
    network_required: bool,
    image: &str,
) -> std::io::Result<Child> {
    Command::new("docker")
        .args(docker_args(command, workspace, network_required, image))
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .kill_on_drop(true)
        .spawn()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_docker_args_default_to_no_network() {
        let args = docker_args("git status", &PathBuf::from("/tmp/ws"), false, "sandbox:latest");
        let joined = args.join(" ");
        assert!(joined.starts_with("run --rm --network none"));
        assert!(joined.contains("--cpus 1.0"));
        assert!(joined.contains("--memory 512m"));
        assert!(joined.contains("--pids-limit 128"));
        assert!(joined.contains("--cap-drop=ALL"));
        assert!(joined.contains("--security-opt no-new-privileges"));
        assert!(joined.contains("-v /tmp/ws:/workspace"));
        assert!(joined.contains("-w /workspace"));
    }

    #[test]
    fn test_docker_args_bridge_when_network_required() {
        let args = docker_args("npm ci", &PathBuf::from("/tmp/ws"), true, "sandbox:latest");
        let network_idx = args.iter().position(|a| a == "--network").unwrap();
        assert_eq!(args[network_idx + 1], "bridge");
    }

    #[test]
    fn test_command_is_a_single_lc_string() {
        let args = docker_args("echo hi", &PathBuf::from("/tmp/ws"), false, "img");
        let tail: Vec<_> = args.iter().rev().take(3).rev().collect();
        assert_eq!(tail[0], "sh");
        assert_eq!(tail[1], "-lc");
        assert_eq!(*tail[2], shell_script("echo hi"));
    }

    #[test]
    fn test_shell_script_merges_stderr() {
        let script = shell_script("pytest -q");
        assert!(script.contains("pytest -q"));
        assert!(script.ends_with("2>&1"));
    }
}
