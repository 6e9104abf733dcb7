//! Scratch copy of the document source.
//!
//! Renders mutate the document (values file, space indicator, build
//! artifacts), so they never run in the user's source directory. The copy is
//! removed when the workspace is dropped.

use std::path::{Path, PathBuf};

use tempfile::TempDir;

/// A temporary, writable copy of a document source directory.
#[derive(Debug)]
pub struct RenderWorkspace {
    dir: TempDir,
}

impl RenderWorkspace {
    /// Copy `source` recursively into a fresh temporary directory.
    pub fn copy_from(source: &Path) -> std::io::Result<Self> {
        let dir = tempfile::Builder::new().prefix("vary-build-").tempdir()?;
        copy_dir(source, dir.path())?;
        log::debug!("copied {} into {}", source.display(), dir.path().display());
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn file(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }
}

fn copy_dir(from: &Path, to: &Path) -> std::io::Result<()> {
    std::fs::create_dir_all(to)?;
    for entry in std::fs::read_dir(from)? {
        let entry = entry?;
        let target = to.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            copy_dir(&entry.path(), &target)?;
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
    fn test_copy_is_recursive_and_removed_on_drop() {
        let source = tempfile::tempdir().unwrap();
        std::fs::write(source.path().join("main.tex"), "doc").unwrap();
        std::fs::create_dir(source.path().join("figures")).unwrap();
        std::fs::write(source.path().join("figures/a.tex"), "fig").unwrap();

        let workspace = RenderWorkspace::copy_from(source.path()).unwrap();
        let copied = workspace.path().to_path_buf();
        assert_eq!(std::fs::read_to_string(workspace.file("main.tex")).unwrap(), "doc");
        assert_eq!(std::fs::read_to_string(copied.join("figures/a.tex")).unwrap(), "fig");

        drop(workspace);
        assert!(!copied.exists());
    }
}
