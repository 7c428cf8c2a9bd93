use slugflow_controller::ControllerError;
use slugflow_k8s::K8sError;
use slugflow_storage::StorageError;
use thiserror::Error;

/// Failure kinds of the build pipeline.
///
/// Each kind carries a distinct user-visible message and maps to its own
/// process exit code; the pipeline never catches one mid-flight, it only
/// runs the cleanup stack and stops.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("invalid configuration: {0}")]
    ConfigInvalid(String),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("git archive failed: {0}")]
    GitArchiveFailed(String),

    #[error("builder pod failed to start: {0}")]
    BuilderStartTimeout(String),

    #[error("builder pod did not terminate: {0}")]
    BuilderHang(String),

    #[error("build pod exited with code {0}, stopping build")]
    BuilderFailed(i32),

    #[error("invalid Procfile: {0}")]
    ProcfileInvalid(String),

    #[error("the controller returned an error when publishing the release: {0}")]
    PublishFailed(#[source] ControllerError),

    #[error(transparent)]
    Controller(#[from] ControllerError),

    #[error(transparent)]
    Kubernetes(#[from] K8sError),

    #[error("filesystem error: {0}")]
    Io(#[from] std::io::Error),

    #[error("build cancelled")]
    Cancelled,
}

impl BuildError {
    /// Process exit code for the engine's per-push subprocess contract.
    pub fn exit_code(&self) -> i32 {
        match self {
            BuildError::ConfigInvalid(_) => 2,
            BuildError::Storage(_) => 3,
            BuildError::GitArchiveFailed(_) => 4,
            BuildError::BuilderStartTimeout(_) => 5,
            BuildError::BuilderHang(_) => 6,
            BuildError::BuilderFailed(_) => 7,
            BuildError::ProcfileInvalid(_) => 8,
            BuildError::PublishFailed(_) => 9,
            BuildError::Controller(_) => 10,
            BuildError::Kubernetes(_) => 11,
            BuildError::Io(_) => 12,
            BuildError::Cancelled => 13,
        }
    }
}

pub type Result<T> = std::result::Result<T, BuildError>;
