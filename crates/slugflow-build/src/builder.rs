//! The build pipeline.
//!
//! One push, one linear pass: validate, snapshot, stage, run the builder
//! pod, inspect how it died, publish. Every step either advances or ends the
//! build; teardown is whatever the completed steps registered on the
//! cleanup stack, run in reverse on success, failure and cancellation alike.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use colored::Colorize;
use k8s_openapi::api::core::v1::Pod;
use slugflow_controller::{AppConfig, ControllerClient};
use slugflow_k8s::{self as k8s, ContainerBuildParams, PodWatcher, SlugBuildParams};
use slugflow_storage::{ObjectState, ObjectStorage};
use tokio_util::sync::CancellationToken;

use crate::archive;
use crate::cleanup::CleanupStack;
use crate::config::Config;
use crate::error::{BuildError, Result};
use crate::keys::SlugBuilderInfo;
use crate::procfile::resolve_procfile;
use crate::progress::ProgressTicker;
use crate::sha::GitSha;
use crate::stack::{resolve_stack, Stack, StackKind};

/// App config key whose presence disables the buildpack cache.
const DISABLE_CACHE_KEY: &str = "DRYCC_DISABLE_CACHE";

/// Registry location meaning "push through the in-cluster proxy".
const ON_CLUSTER: &str = "on-cluster";

/// One validated push, as handed over by the receive hook.
#[derive(Debug, Clone)]
pub struct BuildRequest {
    /// Application name, a lowercase DNS-1123 label.
    pub app: String,
    /// Account name of the pushing user.
    pub user: String,
    /// Full 40-hex revision to build.
    pub sha: String,
    /// Bare repository on local disk.
    pub repo_dir: PathBuf,
}

/// The engine. Holds the per-process collaborators; [`Builder::build`] runs
/// one push to completion.
pub struct Builder {
    config: Config,
    storage: Arc<dyn ObjectStorage>,
    controller: ControllerClient,
    kube: kube::Client,
}

impl Builder {
    pub fn new(
        config: Config,
        storage: Arc<dyn ObjectStorage>,
        controller: ControllerClient,
        kube: kube::Client,
    ) -> Self {
        Self {
            config,
            storage,
            controller,
            kube,
        }
    }

    /// Drives `request` to a published release and returns its version.
    ///
    /// On any failure or cancellation the registered cleanups still run;
    /// builder pods are deliberately left behind for debugging.
    pub async fn build(&self, request: &BuildRequest, cancel: &CancellationToken) -> Result<u64> {
        let mut cleanups = CleanupStack::new();
        let result = tokio::select! {
            result = self.run(request, &mut cleanups) => result,
            _ = cancel.cancelled() => Err(BuildError::Cancelled),
        };
        cleanups.run().await;
        result
    }

    async fn run(&self, request: &BuildRequest, cleanups: &mut CleanupStack) -> Result<u64> {
        let sha = GitSha::new(&request.sha)?;
        let app = request.app.as_str();
        let short = sha.short().to_string();
        let namespace = self.config.pod_namespace.clone();

        let build_dir = request.repo_dir.join("build");
        tokio::fs::create_dir_all(&build_dir).await?;
        let tmp_dir = tempfile::Builder::new()
            .prefix("tmp")
            .tempdir_in(&build_dir)?
            .keep();
        {
            let tmp = tmp_dir.clone();
            cleanups.register("remove temp dir", move || async move {
                tokio::fs::remove_dir_all(&tmp).await?;
                Ok(())
            });
        }

        let app_config = self.controller.get_app_config(&request.user, app).await?;
        let disable_caching = app_config.has(DISABLE_CACHE_KEY);
        if disable_caching {
            tracing::debug!(app, "caching disabled for this app");
        }
        let info = SlugBuilderInfo::new(app, &short, disable_caching);

        invalidate_cache(self.storage.as_ref(), &info).await?;

        let tarball = archive::git_archive(&request.repo_dir, app, &short).await?;
        archive::unpack_tarball(&tarball, &tmp_dir)?;

        let stack = resolve_stack(&self.config.stacks, &app_config, &tmp_dir)?;
        let kind = stack.kind();

        tracing::debug!(key = info.tar_key(), "uploading source tarball");
        let tar_bytes = tokio::fs::read(&tarball).await?;
        self.storage
            .put_content(info.tar_key(), tar_bytes.into())
            .await?;

        let (pod_name, pod, container_image) = match kind {
            StackKind::Container => {
                self.prepare_container_pod(request, &app_config, &info, &short, &stack)
                    .await?
            }
            StackKind::Slug => {
                let (name, pod) = self
                    .prepare_slug_pod(request, &app_config, &info, &short, &stack, cleanups)
                    .await?;
                (name, pod, String::new())
            }
        };

        println!("{}", "Starting build... but first, coffee!".bold());
        tracing::debug!(stack = %stack.name, image = %stack.image, "selected builder");
        if self.config.debug {
            match serde_json::to_string_pretty(&pod) {
                Ok(spec) => tracing::debug!(pod = %pod_name, %spec, "builder pod spec"),
                Err(err) => tracing::debug!(error = %err, "could not serialize pod spec"),
            }
        }

        k8s::create_pod(&self.kube, &namespace, &pod).await?;

        let watcher = PodWatcher::new(self.kube.clone(), &namespace);

        let ticker = ProgressTicker::start("...", self.config.session_idle_interval);
        let started = watcher
            .wait_for_pod_running(&namespace, &pod_name, self.config.pod_tick, self.config.pod_wait)
            .await;
        ticker.stop().await;
        started.map_err(|e| BuildError::BuilderStartTimeout(e.to_string()))?;

        // The exit code decides the build; a torn stream only costs output.
        match k8s::stream_pod_logs(&self.kube, &namespace, &pod_name).await {
            Ok(bytes) => tracing::debug!(bytes, "streamed builder logs"),
            Err(err) => {
                tracing::warn!(error = %err, "builder log stream broke, waiting for pod exit")
            }
        }

        tracing::debug!(
            pod = %pod_name,
            tick = ?self.config.pod_tick,
            total = ?self.config.pod_wait,
            "waiting for the builder pod to end"
        );
        watcher
            .wait_for_pod_end(&namespace, &pod_name, self.config.pod_tick, self.config.pod_wait)
            .await
            .map_err(|e| BuildError::BuilderHang(e.to_string()))?;
        watcher.stop().await;

        for code in k8s::pod_exit_codes(&self.kube, &namespace, &pod_name).await? {
            if code != 0 {
                return Err(BuildError::BuilderFailed(code));
            }
        }

        let proc_type =
            resolve_procfile(self.storage.as_ref(), &tmp_dir, &info.procfile_key(), kind).await?;

        println!("{}", "Build complete.".bold());
        println!("{}", "Launching App...".bold());

        let published_image = match kind {
            StackKind::Container => container_image,
            StackKind::Slug => info.slug_key(),
        };

        let ticker = ProgressTicker::start("...", self.config.session_idle_interval);
        let release = self
            .controller
            .create_build(
                &request.user,
                app,
                &published_image,
                &stack.name,
                &short,
                &proc_type,
                kind == StackKind::Container,
            )
            .await;
        ticker.stop().await;
        let version = release.map_err(BuildError::PublishFailed)?;

        println!(
            "{}",
            format!("Done, {}:v{} deployed to Workflow", app, version).green()
        );
        println!("Use 'drycc open' to view this application in your browser");

        archive::git_gc(&request.repo_dir).await;

        Ok(version)
    }

    async fn prepare_container_pod(
        &self,
        request: &BuildRequest,
        app_config: &AppConfig,
        info: &SlugBuilderInfo,
        short: &str,
        stack: &Stack,
    ) -> Result<(String, Pod, String)> {
        let app = request.app.as_str();
        let mut image = format!("{}:git-{}", app, short);

        let mut registry_env = HashMap::new();
        if self.config.registry_location != ON_CLUSTER {
            registry_env = k8s::registry_env(&self.kube, &self.config.pod_namespace).await?;
            if let Some(host) = registry_env.get("DRYCC_REGISTRY_HOSTNAME") {
                image = format!("{}/{}:git-{}", host, app, short);
            }
        }
        registry_env.insert(
            "DRYCC_REGISTRY_LOCATION".to_string(),
            self.config.registry_location.clone(),
        );

        let pod_name = format!("docker-{}-{}", app, short);
        let pod = k8s::container_builder_pod(&ContainerBuildParams {
            debug: self.config.debug,
            pod_name: &pod_name,
            namespace: &self.config.pod_namespace,
            env: &app_config.values,
            tar_key: info.tar_key(),
            short_sha: short,
            image_name: &image,
            storage_type: &self.config.storage_type,
            image: &stack.image,
            registry_host: &self.config.registry_host,
            registry_port: &self.config.registry_port,
            registry_env: &registry_env,
            pull_policy: self.config.dockerbuilder_pull_policy,
            node_selector: &self.config.node_selector,
        });
        Ok((pod_name, pod, image))
    }

    async fn prepare_slug_pod(
        &self,
        request: &BuildRequest,
        app_config: &AppConfig,
        info: &SlugBuilderInfo,
        short: &str,
        stack: &Stack,
        cleanups: &mut CleanupStack,
    ) -> Result<(String, Pod)> {
        let app = request.app.as_str();
        let env_secret_name = format!("{}-build-env", app);

        k8s::upsert_app_env_secret(
            &self.kube,
            &self.config.pod_namespace,
            &env_secret_name,
            &app_config.values,
        )
        .await?;
        {
            let client = self.kube.clone();
            let namespace = self.config.pod_namespace.clone();
            let secret = env_secret_name.clone();
            cleanups.register("delete build env secret", move || async move {
                k8s::delete_secret(&client, &namespace, &secret).await?;
                Ok(())
            });
        }

        let pod_name = format!("slug-{}-{}", app, short);
        let pod = k8s::slug_builder_pod(&SlugBuildParams {
            debug: self.config.debug,
            pod_name: &pod_name,
            namespace: &self.config.pod_namespace,
            env: &app_config.values,
            env_secret_name: &env_secret_name,
            tar_key: info.tar_key(),
            push_key: info.push_key(),
            cache_key: info.pod_cache_key(),
            short_sha: short,
            storage_type: &self.config.storage_type,
            image: &stack.image,
            pull_policy: self.config.slugbuilder_pull_policy,
            node_selector: &self.config.node_selector,
        });
        Ok((pod_name, pod))
    }
}

/// Drops the buildpack cache when the app asked for cache-free builds.
///
/// A missing cache is fine; any other storage fault fails the build before a
/// pod is created.
pub async fn invalidate_cache(storage: &dyn ObjectStorage, info: &SlugBuilderInfo) -> Result<()> {
    if !info.disable_caching() {
        return Ok(());
    }
    if storage.stat(info.cache_key()).await? == ObjectState::Exists {
        tracing::debug!(key = info.cache_key(), "deleting buildpack cache");
        storage.delete(info.cache_key()).await?;
    }
    Ok(())
}
