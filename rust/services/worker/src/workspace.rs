//! Scratch workspaces
//!
//! Every run executes against a throwaway copy of the project root. The
//! sandbox mounts the copy read-write; the original project directory is
//! never touched. The tempdir is removed when the workspace drops, which
//! covers every exit path of the orchestrator.

use std::path::Path;
use tempfile::TempDir;
use tracing::instrument;

/// A per-run temporary workspace populated from the project root
#[derive(Debug)]
pub struct ScratchWorkspace {
    dir: TempDir,
}

impl ScratchWorkspace {
    /// Allocate a fresh workspace, copying the project root into it when it
    /// exists. A missing root yields an empty workspace.
    #[instrument(skip(source_root))]
    pub fn create(run_id: &str, source_root: &Path) -> std::io::Result<Self> {
        let dir = tempfile::Builder::new()
            .prefix(&format!("run-{run_id}-"))
            .tempdir()?;
        if source_root.exists() {
            copy_tree(source_root, dir.path())?;
        }
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }
}

/// Recursive copy of a directory tree
fn copy_tree(src: &Path, dst: &Path) -> std::io::Result<()> {
    std::fs::create_dir_all(dst)?;
    for entry in std::fs::read_dir(src)? {
        let entry = entry?;
        let target = dst.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            copy_tree(&entry.path(), &target)?;
        } else {
            std::fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_copies_nested_tree() {
        let source = TempDir::new().unwrap();
        std::fs::create_dir_all(source.path().join("src/deep")).unwrap();
        std::fs::write(source.path().join("README.md"), "hello").unwrap();
        std::fs::write(source.path().join("src/deep/main.py"), "print()").unwrap();

        let ws = ScratchWorkspace::create("run_1", source.path()).unwrap();
        assert_eq!(
            std::fs::read_to_string(ws.path().join("README.md")).unwrap(),
            "hello"
        );
        assert_eq!(
            std::fs::read_to_string(ws.path().join("src/deep/main.py")).unwrap(),
            "print()"
        );
    }

    #[test]
    fn test_missing_source_root_yields_empty_workspace() {
        let ws = ScratchWorkspace::create("run_1", Path::new("/nonexistent/project")).unwrap();
        assert!(ws.path().is_dir());
        assert_eq!(std::fs::read_dir(ws.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_workspace_is_removed_on_drop() {
        let source = TempDir::new().unwrap();
        let ws = ScratchWorkspace::create("run_1", source.path()).unwrap();
        let path = ws.path().to_path_buf();
        assert!(path.exists());
        drop(ws);
        assert!(!path.exists());
    }

    #[test]
    fn test_mutating_the_copy_leaves_the_source_alone() {
        let source = TempDir::new().unwrap();
        std::fs::write(source.path().join("file.txt"), "original").unwrap();

        let ws = ScratchWorkspace::create("run_1", source.path()).unwrap();
        std::fs::write(ws.path().join("file.txt"), "mutated").unwrap();

        assert_eq!(
            std::fs::read_to_string(source.path().join("file.txt")).unwrap(),
            "original"
        );
    }
}
