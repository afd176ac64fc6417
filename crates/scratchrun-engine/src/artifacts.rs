use std::io;
use std::path::Path;

use tempfile::TempDir;

const ARTIFACT_DIR_PREFIX: &str = "scratch-compile";

/// Temporary directory receiving the compiled scratch program.
///
/// Owned by exactly one run. Removed by [`ArtifactDir::close`]; if that is
/// never reached, dropping the value still removes it.
#[derive(Debug)]
pub struct ArtifactDir {
    dir: TempDir,
}

impl ArtifactDir {
    pub fn create() -> io::Result<Self> {
        let dir = tempfile::Builder::new()
            .prefix(ARTIFACT_DIR_PREFIX)
            .tempdir()?;
        tracing::debug!(path = %dir.path().display(), "Created artifact directory");
        Ok(Self { dir })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Delete the directory. Failure is logged, never returned.
    pub fn close(self) {
        let path = self.dir.path().to_path_buf();
        match self.dir.close() {
            Ok(()) => tracing::debug!(path = %path.display(), "Removed artifact directory"),
            Err(e) => tracing::warn!(
                path = %path.display(),
                error = %e,
                "Failed to remove artifact directory"
            ),
        }
    }
}
