//! Source snapshots and repo housekeeping via the git CLI.

use std::path::{Path, PathBuf};

use tokio::process::Command;

use crate::error::{BuildError, Result};

/// Snapshots `short_sha` into `{repo_dir}/{app}.tar.gz` with `git archive`
/// and returns the tarball path.
pub async fn git_archive(repo_dir: &Path, app: &str, short_sha: &str) -> Result<PathBuf> {
    let output_flag = format!("--output={}.tar.gz", app);
    tracing::debug!(repo = %repo_dir.display(), sha = short_sha, "running git archive");

    let status = Command::new("git")
        .current_dir(repo_dir)
        .args(["archive", "--format=tar.gz", &output_flag, short_sha])
        .status()
        .await
        .map_err(|e| BuildError::GitArchiveFailed(e.to_string()))?;
    if !status.success() {
        return Err(BuildError::GitArchiveFailed(format!(
            "git archive exited with {}",
            status
        )));
    }
    Ok(repo_dir.join(format!("{}.tar.gz", app)))
}

/// Extracts the snapshot into `dest` for local stack inspection; the builder
/// pod reads its copy from object storage.
pub fn unpack_tarball(tarball: &Path, dest: &Path) -> Result<()> {
    let file = std::fs::File::open(tarball)?;
    let decoder = flate2::read::GzDecoder::new(file);
    let mut archive = tar::Archive::new(decoder);
    archive.unpack(dest)?;
    Ok(())
}

/// Best-effort `git gc` after a successful publish.
///
/// Serialized per repo through a lock file so two pushes never collect the
/// same repo at once; every failure is logged and swallowed.
pub async fn git_gc(repo_dir: &Path) {
    let lock = repo_dir.join("gc.lock");
    match std::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&lock)
    {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
            tracing::debug!(repo = %repo_dir.display(), "gc already running, skipping");
            return;
        }
        Err(e) => {
            tracing::debug!(error = %e, "could not take gc lock, skipping git gc");
            return;
        }
    }

    match Command::new("git").current_dir(repo_dir).arg("gc").status().await {
        Ok(status) if status.success() => {}
        Ok(status) => tracing::info!(repo = %repo_dir.display(), %status, "git gc failed"),
        Err(e) => tracing::info!(repo = %repo_dir.display(), error = %e, "git gc failed"),
    }

    if let Err(e) = std::fs::remove_file(&lock) {
        tracing::debug!(error = %e, "could not release gc lock");
    }
}
