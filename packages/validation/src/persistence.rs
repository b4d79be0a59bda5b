//! On-disk layout of a model directory
//!
//! ```text
//! <directory>/classifier/classifier.json   persisted classifier
//! <directory>/logs/<runid>/                one directory per harness instance
//! ```
//!
//! The classifier file is replaced as a whole on every save. There is no locking; the last
//! writer wins.

use crate::classifier::ClassifierArtifact;
use crate::error::{Result, ValidationError};
use std::fs;
use std::path::{Path, PathBuf};

pub const PERSIST_DIRNAME: &str = "classifier";
pub const PERSIST_FILENAME: &str = "classifier.json";
pub const LOGS_DIRNAME: &str = "logs";

/// Load/save/exists access to the persisted classifier of one model directory
#[derive(Debug, Clone)]
pub struct ModelStore {
    dir: PathBuf,
}

impl ModelStore {
    /// Open the store, creating `<directory>/classifier` when missing
    pub fn open(directory: &Path) -> Result<Self> {
        let dir = directory.join(PERSIST_DIRNAME);
        create_dir(&dir)?;
        Ok(ModelStore { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn artifact_path(&self) -> PathBuf {
        self.dir.join(PERSIST_FILENAME)
    }

    pub fn exists(&self) -> bool {
        self.artifact_path().is_file()
    }

    /// The persisted classifier, or `None` when nothing was trained yet
    pub fn load(&self) -> Result<Option<ClassifierArtifact>> {
        let path = self.artifact_path();
        if !path.is_file() {
            return Ok(None);
        }
        let bytes = fs::read(&path)?;
        let artifact = serde_json::from_slice(&bytes).map_err(|e| {
            ValidationError::Persistence(format!("cannot read {}: {e}", path.display()))
        })?;
        Ok(Some(artifact))
    }

    pub fn save(&self, artifact: &ClassifierArtifact) -> Result<PathBuf> {
        let path = self.artifact_path();
        let bytes = serde_json::to_vec_pretty(artifact)?;
        fs::write(&path, bytes)?;
        tracing::debug!(path = %path.display(), "Stored classifier");
        Ok(path)
    }
}

/// Create `<directory>/logs/<run_id>`; an existing directory means two runs collided
pub fn create_run_dir(directory: &Path, run_id: &str) -> Result<PathBuf> {
    let dir = directory.join(LOGS_DIRNAME).join(run_id);
    if dir.is_dir() {
        return Err(ValidationError::storage_fault(&dir, "directory already exists"));
    }
    create_dir(&dir)?;
    Ok(dir)
}

fn create_dir(dir: &Path) -> Result<()> {
    fs::create_dir_all(dir)
        .map_err(|e| ValidationError::storage_fault(dir, format!("can not be created: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hyperparameter::Hyperparameter;
    use tempfile::TempDir;

    fn artifact() -> ClassifierArtifact {
        ClassifierArtifact {
            hyperparameter: Hyperparameter { c: 0.35938 },
            tolerance: 0.1,
            coefficients: vec![0.25, -1.5, 3.0],
            intercept: -0.125,
            scored_class: 1,
        }
    }

    #[test]
    fn test_open_creates_directory() {
        let tmp = TempDir::new().unwrap();
        let store = ModelStore::open(tmp.path()).unwrap();
        assert!(store.dir().is_dir());
        assert!(!store.exists());
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn test_save_then_load() {
        let tmp = TempDir::new().unwrap();
        let store = ModelStore::open(tmp.path()).unwrap();
        store.save(&artifact()).unwrap();
        assert!(store.exists());
        assert_eq!(store.load().unwrap(), Some(artifact()));
    }

    #[test]
    fn test_save_overwrites() {
        let tmp = TempDir::new().unwrap();
        let store = ModelStore::open(tmp.path()).unwrap();
        store.save(&artifact()).unwrap();
        let mut second = artifact();
        second.intercept = 4.0;
        store.save(&second).unwrap();
        assert_eq!(store.load().unwrap().unwrap().intercept, 4.0);
    }

    #[test]
    fn test_corrupt_artifact() {
        let tmp = TempDir::new().unwrap();
        let store = ModelStore::open(tmp.path()).unwrap();
        fs::write(store.artifact_path(), b"not json").unwrap();
        assert!(matches!(store.load(), Err(ValidationError::Persistence(_))));
    }

    #[test]
    fn test_run_dir_collision() {
        let tmp = TempDir::new().unwrap();
        let dir = create_run_dir(tmp.path(), "1700000000").unwrap();
        assert!(dir.ends_with("logs/1700000000"));
        assert!(matches!(
            create_run_dir(tmp.path(), "1700000000"),
            Err(ValidationError::StorageFault { .. })
        ));
    }

    #[test]
    fn test_unwritable_directory() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("plain-file");
        fs::write(&file, b"").unwrap();
        assert!(matches!(
            ModelStore::open(&file),
            Err(ValidationError::StorageFault { .. })
        ));
    }
}
