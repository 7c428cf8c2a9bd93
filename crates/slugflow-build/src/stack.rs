use std::path::Path;

use serde::Deserialize;
use slugflow_controller::AppConfig;

use crate::error::{BuildError, Result};

/// App config key that pins a stack explicitly.
const STACK_OVERRIDE_KEY: &str = "DRYCC_STACK";

/// Marker file that selects the container pipeline.
const CONTAINER_MARKER: &str = "Dockerfile";

/// A build environment: its operator-facing name and the builder image that
/// implements it.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct Stack {
    pub name: String,
    pub image: String,
}

/// Which pipeline a stack drives. Decided once at resolution time and
/// carried forward; nothing downstream re-inspects the stack name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StackKind {
    Slug,
    Container,
}

impl Stack {
    pub fn kind(&self) -> StackKind {
        if self.name.contains("container") {
            StackKind::Container
        } else {
            StackKind::Slug
        }
    }
}

/// Picks the stack for this build.
///
/// Precedence: the app's `DRYCC_STACK` value, then a `Dockerfile` at the root
/// of the unpacked tree, then the platform default (the first non-container
/// stack the operator configured).
pub fn resolve_stack(
    stacks: &[Stack],
    app_config: &AppConfig,
    source_tree: &Path,
) -> Result<Stack> {
    if let Some(wanted) = app_config.value(STACK_OVERRIDE_KEY) {
        return stacks
            .iter()
            .find(|s| s.name == wanted)
            .cloned()
            .ok_or_else(|| {
                BuildError::ConfigInvalid(format!("unknown stack '{}' requested by app", wanted))
            });
    }

    if source_tree.join(CONTAINER_MARKER).is_file() {
        if let Some(stack) = stacks.iter().find(|s| s.kind() == StackKind::Container) {
            return Ok(stack.clone());
        }
    }

    stacks
        .iter()
        .find(|s| s.kind() == StackKind::Slug)
        .cloned()
        .ok_or_else(|| BuildError::ConfigInvalid("no buildpack stack configured".to_string()))
}
