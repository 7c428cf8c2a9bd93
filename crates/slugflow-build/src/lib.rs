//! Build orchestration engine for git-push deploys.
//!
//! A validated push (app, revision, user, bare repo on disk) comes in; a
//! controller-side release or a classified failure comes out. In between:
//! source snapshot, object-storage staging, a single-shot builder pod on
//! Kubernetes whose log is the pusher's terminal output, exit-code
//! inspection and Procfile resolution.

pub mod archive;
pub mod builder;
pub mod cleanup;
pub mod config;
pub mod error;
pub mod keys;
pub mod procfile;
pub mod progress;
pub mod sha;
pub mod stack;

pub use builder::{invalidate_cache, BuildRequest, Builder};
pub use cleanup::CleanupStack;
pub use config::Config;
pub use error::{BuildError, Result};
pub use keys::SlugBuilderInfo;
pub use procfile::resolve_procfile;
pub use progress::ProgressTicker;
pub use sha::GitSha;
pub use stack::{resolve_stack, Stack, StackKind};
