use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::StorageError;

/// Numbered variants tried per upload before giving up.
const MAX_NAME_ATTEMPTS: usize = 1000;

/// `name.ext`, then `name_2.ext`, `name_3.ext`, ... Only the last extension
/// is kept apart, so `a.tar.gz` continues as `a.tar_2.gz`.
fn candidate_names(filename: &str) -> impl Iterator<Item = String> + '_ {
    let path = Path::new(filename);
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(filename);
    let ext = path.extension().and_then(|e| e.to_str());

    std::iter::once(filename.to_string()).chain((2..=MAX_NAME_ATTEMPTS).map(move |n| {
        match ext {
            Some(ext) => format!("{}_{}.{}", stem, n, ext),
            None => format!("{}_{}", stem, n),
        }
    }))
}

/// Reference to a stored file: the storage-relative key that is persisted on
/// records, plus the resolved local path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactRef {
    /// Storage-relative key with forward slashes, e.g. `sources/{id}/abc.mp4`.
    pub key: String,
    pub path: PathBuf,
}

/// Local-disk media storage rooted at the data home.
#[derive(Debug, Clone)]
pub struct MediaStorage {
    root: PathBuf,
}

impl MediaStorage {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolves a relative subfolder below the root. Absolute paths and
    /// parent-directory components are rejected.
    pub fn resolve(&self, subfolder: &str) -> Result<PathBuf, StorageError> {
        let relative = Path::new(subfolder);
        if subfolder.is_empty() {
            return Err(StorageError::InvalidKey(subfolder.to_string()));
        }
        for component in relative.components() {
            match component {
                Component::Normal(_) | Component::CurDir => {}
                _ => return Err(StorageError::InvalidKey(subfolder.to_string())),
            }
        }
        Ok(self.root.join(relative))
    }

    /// Creates the subfolder (and parents) if needed and returns its path.
    /// An existing directory is not an error.
    pub fn ensure_folder(&self, subfolder: &str) -> Result<PathBuf, StorageError> {
        let path = self.resolve(subfolder)?;
        std::fs::create_dir_all(&path).map_err(|e| StorageError::CreateDirectory {
            path: path.clone(),
            source: e,
        })?;
        Ok(path)
    }

    /// Storage key for a path below the root.
    pub fn key_for(&self, path: &Path) -> Result<String, StorageError> {
        let relative = path
            .strip_prefix(&self.root)
            .map_err(|_| StorageError::InvalidKey(path.display().to_string()))?;
        let parts: Vec<String> = relative
            .components()
            .filter_map(|c| match c {
                Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
                _ => None,
            })
            .collect();
        if parts.is_empty() {
            return Err(StorageError::InvalidKey(path.display().to_string()));
        }
        Ok(parts.join("/"))
    }

    pub fn artifact(&self, path: PathBuf) -> Result<ArtifactRef, StorageError> {
        let key = self.key_for(&path)?;
        Ok(ArtifactRef { key, path })
    }

    /// Stores `content` as `filename` inside `subfolder`. Existing files are
    /// never overwritten: `name.ext` becomes `name_2.ext`, `name_3.ext`, ...
    pub fn store(
        &self,
        content: &[u8],
        subfolder: &str,
        filename: &str,
    ) -> Result<ArtifactRef, StorageError> {
        let filename = Path::new(filename)
            .file_name()
            .and_then(|n| n.to_str())
            .filter(|n| !n.is_empty())
            .ok_or_else(|| StorageError::InvalidKey(filename.to_string()))?;

        let dir_path = self.ensure_folder(subfolder)?;
        let file_path = self.write_unique(&dir_path, filename, content)?;
        self.artifact(file_path)
    }

    /// Writes `content` under the first free candidate name. Files are
    /// opened with `create_new`, so uploads racing for one name each end up
    /// with their own file.
    fn write_unique(
        &self,
        dir: &Path,
        filename: &str,
        content: &[u8],
    ) -> Result<PathBuf, StorageError> {
        for name in candidate_names(filename) {
            let path = dir.join(&name);
            let mut file = match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(file) => file,
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => continue,
                Err(source) => return Err(StorageError::WriteFile { path, source }),
            };
            if let Err(source) = file.write_all(content) {
                drop(file);
                // A truncated upload must not hold on to the name.
                let _ = std::fs::remove_file(&path);
                return Err(StorageError::WriteFile { path, source });
            }
            return Ok(path);
        }

        Err(StorageError::FileExists(dir.join(filename)))
    }

    /// Removes a subfolder and everything in it. Returns `false` when there
    /// was nothing to remove.
    pub fn remove_folder(&self, subfolder: &str) -> Result<bool, StorageError> {
        let path = self.resolve(subfolder)?;
        match std::fs::remove_dir_all(&path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(StorageError::Remove { path, source: e }),
        }
    }
}
