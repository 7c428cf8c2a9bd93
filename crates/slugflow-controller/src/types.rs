use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

/// Process-name to command mapping, as parsed from a Procfile.
///
/// Ordered so serialized hook bodies are deterministic.
pub type ProcessType = BTreeMap<String, String>;

/// Per-app configuration as the controller stores it.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// Raw config values; the engine only interprets a handful of keys and
    /// forwards the rest into the builder pod environment.
    #[serde(default)]
    pub values: HashMap<String, String>,
}

impl AppConfig {
    /// Returns the value for `key`, if set.
    pub fn value(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Flag-style lookup: the key's presence is the signal, not its value.
    pub fn has(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }
}

/// Body of `POST /v2/hooks/build`.
#[derive(Debug, Serialize)]
pub(crate) struct BuildHook<'a> {
    pub receive_user: &'a str,
    pub receive_repo: &'a str,
    pub image: &'a str,
    pub stack: &'a str,
    pub sha: &'a str,
    pub procfile: &'a ProcessType,
    pub container: bool,
}

#[derive(Debug, Deserialize)]
pub(crate) struct BuildHookResponse {
    pub release: ReleaseRef,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ReleaseRef {
    pub version: u64,
}
