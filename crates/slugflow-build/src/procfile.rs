use std::path::Path;

use slugflow_controller::ProcessType;
use slugflow_storage::{ObjectStorage, StorageError};

use crate::error::{BuildError, Result};
use crate::stack::StackKind;

/// Resolves the process-type mapping for the finished build.
///
/// A `Procfile` committed at the root of the source tree wins. Container
/// builds without one declare their processes in the image manifest, so the
/// mapping is empty. Buildpack builds without one fall back to the Procfile
/// the builder wrote next to the slug.
pub async fn resolve_procfile(
    storage: &dyn ObjectStorage,
    source_tree: &Path,
    procfile_key: &str,
    kind: StackKind,
) -> Result<ProcessType> {
    let on_disk = source_tree.join("Procfile");
    if on_disk.is_file() {
        let raw = tokio::fs::read(&on_disk).await?;
        return parse(&raw, &on_disk.display().to_string());
    }

    if kind == StackKind::Container {
        return Ok(ProcessType::new());
    }

    tracing::debug!(key = procfile_key, "Procfile not in the push, reading builder output");
    let raw = match storage.get_content(procfile_key).await {
        Ok(raw) => raw,
        Err(StorageError::NotFound(_)) => {
            return Err(BuildError::ProcfileInvalid(format!(
                "no Procfile in the push and none at {}",
                procfile_key
            )));
        }
        Err(err) => return Err(err.into()),
    };
    parse(&raw, procfile_key)
}

fn parse(raw: &[u8], origin: &str) -> Result<ProcessType> {
    serde_yaml::from_slice(raw)
        .map_err(|e| BuildError::ProcfileInvalid(format!("{}: {}", origin, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use slugflow_storage::MemoryStorage;

    const KEY: &str = "home/foo:git-abc12345/push/Procfile";

    #[tokio::test]
    async fn on_disk_procfile_wins() {
        let tree = tempfile::tempdir().unwrap();
        std::fs::write(tree.path().join("Procfile"), "web: bundle exec\n").unwrap();
        let storage = MemoryStorage::new();
        storage.seed(KEY, &b"web: from-storage\n"[..]);

        let procs = resolve_procfile(&storage, tree.path(), KEY, StackKind::Slug)
            .await
            .unwrap();
        assert_eq!(procs.get("web").unwrap(), "bundle exec");
        // Storage was never consulted.
        assert!(storage.operations().is_empty());
    }

    #[tokio::test]
    async fn malformed_on_disk_procfile_is_invalid() {
        let tree = tempfile::tempdir().unwrap();
        std::fs::write(tree.path().join("Procfile"), "web: [unclosed\n").unwrap();
        let storage = MemoryStorage::new();

        let err = resolve_procfile(&storage, tree.path(), KEY, StackKind::Slug)
            .await
            .unwrap_err();
        assert!(matches!(err, BuildError::ProcfileInvalid(_)));
    }

    #[tokio::test]
    async fn container_builds_default_to_no_processes() {
        let tree = tempfile::tempdir().unwrap();
        let storage = MemoryStorage::new();

        let procs = resolve_procfile(&storage, tree.path(), KEY, StackKind::Container)
            .await
            .unwrap();
        assert!(procs.is_empty());
    }

    #[tokio::test]
    async fn buildpack_falls_back_to_builder_output() {
        let tree = tempfile::tempdir().unwrap();
        let storage = MemoryStorage::new();
        storage.seed(KEY, &b"web: npm start\nworker: npm run jobs\n"[..]);

        let procs = resolve_procfile(&storage, tree.path(), KEY, StackKind::Slug)
            .await
            .unwrap();
        assert_eq!(procs.get("web").unwrap(), "npm start");
        assert_eq!(procs.get("worker").unwrap(), "npm run jobs");
    }

    #[tokio::test]
    async fn missing_everywhere_is_invalid() {
        let tree = tempfile::tempdir().unwrap();
        let storage = MemoryStorage::new();

        let err = resolve_procfile(&storage, tree.path(), KEY, StackKind::Slug)
            .await
            .unwrap_err();
        assert!(matches!(err, BuildError::ProcfileInvalid(_)));
    }

    #[tokio::test]
    async fn malformed_builder_output_is_invalid() {
        let tree = tempfile::tempdir().unwrap();
        let storage = MemoryStorage::new();
        storage.seed(KEY, &b"{nonsense"[..]);

        let err = resolve_procfile(&storage, tree.path(), KEY, StackKind::Slug)
            .await
            .unwrap_err();
        assert!(matches!(err, BuildError::ProcfileInvalid(_)));
    }
}
