use futures_util::future::BoxFuture;

type CleanupResult = std::result::Result<(), Box<dyn std::error::Error + Send + Sync>>;

/// Deferred teardown actions for one build.
///
/// Steps register their undo as they go (temp dir removal, env-secret
/// deletion); the orchestrator runs the stack in reverse registration order
/// on every exit path. Cleanup failures are logged, never raised.
#[derive(Default)]
pub struct CleanupStack {
    actions: Vec<(String, Box<dyn FnOnce() -> BoxFuture<'static, CleanupResult> + Send>)>,
}

impl CleanupStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F, Fut>(&mut self, label: impl Into<String>, action: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: std::future::Future<Output = CleanupResult> + Send + 'static,
    {
        self.actions
            .push((label.into(), Box::new(move || Box::pin(action()))));
    }

    /// Runs all registered actions, most recent first.
    pub async fn run(mut self) {
        while let Some((label, action)) = self.actions.pop() {
            if let Err(err) = action().await {
                tracing::info!(cleanup = %label, error = %err, "cleanup failed");
            } else {
                tracing::debug!(cleanup = %label, "cleanup done");
            }
        }
    }
}
