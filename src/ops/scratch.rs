//! Scratch directories owned by one harness run.
//!
//! Every directory a run creates is registered with a [`Scratch`] guard and
//! removed when the guard is released or dropped. That includes missing
//! parents created on the way to a scratch root. Only directories the guard
//! created itself are ever registered, so a path that existed before the run
//! is never deleted.

use std::io;
use std::path::{Path, PathBuf};

use crate::core::error::HarnessError;
use crate::util::fs::{create_fresh_dir, remove_dir_all_if_exists, remove_empty_dir_if_exists};

/// A directory created by the run.
#[derive(Debug)]
enum Owned {
    /// A scratch root; removed with its contents.
    Root(PathBuf),
    /// A parent created on the way to a root; removed only once empty.
    Parent(PathBuf),
}

impl Owned {
    fn path(&self) -> &Path {
        match self {
            Owned::Root(path) | Owned::Parent(path) => path,
        }
    }

    fn remove(&self) -> io::Result<()> {
        match self {
            Owned::Root(path) => remove_dir_all_if_exists(path),
            Owned::Parent(path) => remove_empty_dir_if_exists(path),
        }
    }
}

/// Scoped owner of the run's scratch directories.
#[derive(Debug, Default)]
pub struct Scratch {
    dirs: Vec<Owned>,
    released: bool,
}

impl Scratch {
    pub fn new() -> Self {
        Scratch::default()
    }

    /// Create `path` as a new directory and take ownership of it, and of
    /// any parent directories that had to be created for it.
    ///
    /// An existing path is a [`HarnessError::FixtureCollision`] and is left
    /// untouched.
    pub fn acquire_dir(&mut self, path: &Path) -> Result<PathBuf, HarnessError> {
        let mut created = create_fresh_dir(path).map_err(|e| match e.kind() {
            io::ErrorKind::AlreadyExists => HarnessError::FixtureCollision {
                path: path.to_path_buf(),
            },
            _ => HarnessError::io(format!("failed to create {}", path.display()), e),
        })?;

        let root = created.pop().unwrap_or_else(|| path.to_path_buf());
        for parent in created {
            tracing::debug!("Created scratch parent {}", parent.display());
            self.dirs.push(Owned::Parent(parent));
        }
        tracing::debug!("Acquired scratch directory {}", root.display());
        self.dirs.push(Owned::Root(root.clone()));
        Ok(root)
    }

    /// Directories currently owned, in creation order.
    pub fn owned(&self) -> impl Iterator<Item = &Path> {
        self.dirs.iter().map(Owned::path)
    }

    /// Remove every owned directory, newest first.
    ///
    /// Failures do not stop the sweep; each one is returned as a warning.
    pub fn release(mut self) -> Vec<String> {
        self.released = true;
        self.remove_all()
    }

    fn remove_all(&mut self) -> Vec<String> {
        let mut warnings = Vec::new();
        while let Some(dir) = self.dirs.pop() {
            match dir.remove() {
                Ok(()) => tracing::debug!("Removed {}", dir.path().display()),
                Err(e) => {
                    let warning = format!("failed to remove {}: {}", dir.path().display(), e);
                    tracing::warn!("{}", warning);
                    warnings.push(warning);
                }
            }
        }
        warnings
    }
}

impl Drop for Scratch {
    fn drop(&mut self) {
        if !self.released {
            self.remove_all();
        }
    }
}
