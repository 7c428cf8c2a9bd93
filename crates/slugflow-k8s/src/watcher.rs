//! Reflector-backed pod observation.
//!
//! One watcher per build: a list-watch feeds a local cache, and the
//! orchestrator polls the cache on a tick until the pod reaches the phase it
//! is waiting for. The watch task runs until the stop signal fires, which
//! the orchestrator guarantees on every exit path.

use std::time::Duration;

use futures_util::StreamExt;
use k8s_openapi::api::core::v1::Pod;
use kube::runtime::reflector::{ObjectRef, Store};
use kube::runtime::{reflector, watcher, WatchStreamExt};
use kube::{Api, Client};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::error::{K8sError, Result};

/// Pod phases that are sinks.
fn is_terminal(phase: &str) -> bool {
    phase == "Succeeded" || phase == "Failed"
}

pub struct PodWatcher {
    store: Store<Pod>,
    stop: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl PodWatcher {
    /// Starts watching pods in `namespace`.
    pub fn new(client: Client, namespace: &str) -> Self {
        let api: Api<Pod> = Api::namespaced(client, namespace);
        let (store, writer) = reflector::store();
        let (stop_tx, mut stop_rx) = oneshot::channel::<()>();

        let mut stream = reflector(writer, watcher(api, watcher::Config::default()))
            .default_backoff()
            .applied_objects()
            .boxed();

        let task = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = &mut stop_rx => break,
                    event = stream.next() => match event {
                        Some(Ok(_)) => {}
                        Some(Err(err)) => {
                            tracing::warn!(error = %err, "pod watch stream error");
                        }
                        None => break,
                    },
                }
            }
        });

        Self {
            store,
            stop: Some(stop_tx),
            task: Some(task),
        }
    }

    /// Resolves once the pod is `Running` or already terminal; errors with a
    /// timeout after `total`. `tick` only bounds how often the cache is read.
    pub async fn wait_for_pod_running(
        &self,
        namespace: &str,
        name: &str,
        tick: Duration,
        total: Duration,
    ) -> Result<()> {
        self.wait_for_phase(namespace, name, tick, total, "Running", |phase| {
            phase == "Running" || is_terminal(phase)
        })
        .await
    }

    /// Resolves once the pod is `Succeeded` or `Failed`.
    pub async fn wait_for_pod_end(
        &self,
        namespace: &str,
        name: &str,
        tick: Duration,
        total: Duration,
    ) -> Result<()> {
        self.wait_for_phase(namespace, name, tick, total, "a terminal phase", is_terminal)
            .await
    }

    async fn wait_for_phase(
        &self,
        namespace: &str,
        name: &str,
        tick: Duration,
        total: Duration,
        expected: &'static str,
        done: impl Fn(&str) -> bool,
    ) -> Result<()> {
        let key = ObjectRef::<Pod>::new(name).within(namespace);
        let wait = async {
            let mut interval = tokio::time::interval(tick);
            loop {
                interval.tick().await;
                if let Some(pod) = self.store.get(&key) {
                    let phase = pod
                        .status
                        .as_ref()
                        .and_then(|s| s.phase.as_deref())
                        .unwrap_or("Pending");
                    tracing::debug!(pod = name, phase, "observed pod phase");
                    if done(phase) {
                        return;
                    }
                }
            }
        };

        tokio::time::timeout(total, wait)
            .await
            .map_err(|_| K8sError::PodWaitTimeout {
                pod: format!("{}/{}", namespace, name),
                expected,
                waited: total,
            })
    }

    /// Stops the watch task and waits for it to drain.
    pub async fn stop(mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        if let Some(task) = self.task.take() {
            if let Err(err) = task.await {
                tracing::warn!(error = %err, "pod watch task did not stop cleanly");
            }
        }
    }
}

// Failure paths drop the watcher without an explicit stop; the cache task
// must still go away with the build.
impl Drop for PodWatcher {
    fn drop(&mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
