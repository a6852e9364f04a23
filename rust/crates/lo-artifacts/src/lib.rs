//! LocalOps artifact store
//!
//! A filesystem namespace rooted at the configured artifact path. Layout per
//! run:
//!
//! ```text
//! <root>/logs/<run_id>/<step_no>.out     per-step captured output
//! <root>/logs/<run_id>/<step_no>.err    empty companion (streams merged)
//! <root>/reports/<run_id>/report.md     human-readable summary
//! <root>/artifacts/<run_id>/audit.json  machine-readable timeline
//! <root>/artifacts/<run_id>/diff.patch  workspace diff
//! ```
//!
//! The store describes files (path, content hash, size); persisting the
//! Artifact row is the caller's business.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::instrument;

/// Artifact kinds a run produces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
    Report,
    Audit,
    Diff,
    Log,
}

impl ArtifactKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArtifactKind::Report => "report",
            ArtifactKind::Audit => "audit",
            ArtifactKind::Diff => "diff",
            ArtifactKind::Log => "log",
        }
    }
}

impl std::fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A described artifact file, ready to be recorded
#[derive(Debug, Clone)]
pub struct ArtifactFile {
    pub kind: ArtifactKind,
    pub path: PathBuf,
    pub sha256: String,
    pub size: i64,
}

/// Filesystem-backed artifact namespace for runs
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn logs_dir(&self, run_id: &str) -> PathBuf {
        self.root.join("logs").join(run_id)
    }

    pub fn reports_dir(&self, run_id: &str) -> PathBuf {
        self.root.join("reports").join(run_id)
    }

    pub fn artifacts_dir(&self, run_id: &str) -> PathBuf {
        self.root.join("artifacts").join(run_id)
    }

    pub fn step_stdout_path(&self, run_id: &str, step_no: i32) -> PathBuf {
        self.logs_dir(run_id).join(format!("{step_no}.out"))
    }

    pub fn step_stderr_path(&self, run_id: &str, step_no: i32) -> PathBuf {
        self.logs_dir(run_id).join(format!("{step_no}.err"))
    }

    pub fn report_path(&self, run_id: &str) -> PathBuf {
        self.reports_dir(run_id).join("report.md")
    }

    pub fn audit_path(&self, run_id: &str) -> PathBuf {
        self.artifacts_dir(run_id).join("audit.json")
    }

    pub fn diff_path(&self, run_id: &str) -> PathBuf {
        self.artifacts_dir(run_id).join("diff.patch")
    }

    /// Create the per-run directories. Idempotent.
    #[instrument(skip(self))]
    pub fn ensure_run_dirs(&self, run_id: &str) -> std::io::Result<()> {
        std::fs::create_dir_all(self.logs_dir(run_id))?;
        std::fs::create_dir_all(self.reports_dir(run_id))?;
        std::fs::create_dir_all(self.artifacts_dir(run_id))?;
        Ok(())
    }

    /// Describe a produced file for recording.
    ///
    /// Returns `None` when the file does not exist; hash and size are taken
    /// from the bytes on disk at call time.
    #[instrument(skip(self))]
    pub fn describe(&self, kind: ArtifactKind, path: &Path) -> std::io::Result<Option<ArtifactFile>> {
        if !path.exists() {
            return Ok(None);
        }
        let sha256 = sha256_of_file(path)?;
        let size = std::fs::metadata(path)?.len() as i64;
        Ok(Some(ArtifactFile {
            kind,
            path: path.to_path_buf(),
            sha256,
            size,
        }))
    }
}

/// SHA-256 of a file, streamed in 8 KiB chunks
pub fn sha256_of_file(path: &Path) -> std::io::Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; 8192];
    loop {
        let read = file.read(&mut buffer)?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }
    Ok(hex::encode(hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn test_layout_paths() {
        let store = ArtifactStore::new("/data");
        assert_eq!(
            store.step_stdout_path("run_1", 3),
            PathBuf::from("/data/logs/run_1/3.out")
        );
        assert_eq!(
            store.step_stderr_path("run_1", 3),
            PathBuf::from("/data/logs/run_1/3.err")
        );
        assert_eq!(
            store.report_path("run_1"),
            PathBuf::from("/data/reports/run_1/report.md")
        );
        assert_eq!(
            store.audit_path("run_1"),
            PathBuf::from("/data/artifacts/run_1/audit.json")
        );
        assert_eq!(
            store.diff_path("run_1"),
            PathBuf::from("/data/artifacts/run_1/diff.patch")
        );
    }

    #[test]
    fn test_ensure_run_dirs_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let store = ArtifactStore::new(dir.path());
        store.ensure_run_dirs("run_1").unwrap();
        store.ensure_run_dirs("run_1").unwrap();
        assert!(store.logs_dir("run_1").is_dir());
        assert!(store.reports_dir("run_1").is_dir());
        assert!(store.artifacts_dir("run_1").is_dir());
    }

    #[test]
    fn test_sha256_of_empty_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("empty");
        File::create(&path).unwrap();
        assert_eq!(
            sha256_of_file(&path).unwrap(),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_sha256_of_known_bytes() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("hello");
        let mut file = File::create(&path).unwrap();
        file.write_all(b"hello world").unwrap();
        drop(file);
        assert_eq!(
            sha256_of_file(&path).unwrap(),
            "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
        );
    }

    #[test]
    fn test_sha256_streams_past_one_chunk() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("big");
        let mut file = File::create(&path).unwrap();
        file.write_all(&vec![0xAB; 20_000]).unwrap();
        drop(file);

        let mut hasher = Sha256::new();
        hasher.update(vec![0xAB; 20_000]);
        assert_eq!(
            sha256_of_file(&path).unwrap(),
            hex::encode(hasher.finalize())
        );
    }

    #[test]
    fn test_describe_existing_file() {
        let dir = TempDir::new().unwrap();
        let store = ArtifactStore::new(dir.path());
        store.ensure_run_dirs("run_1").unwrap();

        let path = store.report_path("run_1");
        std::fs::write(&path, "# Run run_1 Report\n").unwrap();

        let file = store
            .describe(ArtifactKind::Report, &path)
            .unwrap()
            .expect("file exists");
        assert_eq!(file.kind, ArtifactKind::Report);
        assert_eq!(file.size, 19);
        assert_eq!(file.sha256, sha256_of_file(&path).unwrap());
    }

    #[test]
    fn test_describe_missing_file_is_none() {
        let dir = TempDir::new().unwrap();
        let store = ArtifactStore::new(dir.path());
        let missing = store.diff_path("run_1");
        assert!(store
            .describe(ArtifactKind::Diff, &missing)
            .unwrap()
            .is_none());
    }
}
