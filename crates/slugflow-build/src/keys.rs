//! Object-storage key layout for one build.
//!
//! ```text
//! home/{app}:git-{shortsha}/tar            uploaded source tarball
//! home/{app}:git-{shortsha}/push/slug.tgz  compiled slug
//! home/{app}:git-{shortsha}/push/Procfile  builder-written Procfile
//! home/{app}/cache                         buildpack cache, per app
//! ```

/// Storage keys derived from `(app, short sha)` plus the caching flag.
#[derive(Debug, Clone)]
pub struct SlugBuilderInfo {
    tar_key: String,
    push_key: String,
    cache_key: String,
    disable_caching: bool,
}

impl SlugBuilderInfo {
    pub fn new(app: &str, short_sha: &str, disable_caching: bool) -> Self {
        let base = format!("home/{}:git-{}", app, short_sha);
        Self {
            tar_key: format!("{}/tar", base),
            push_key: format!("{}/push", base),
            cache_key: format!("home/{}/cache", app),
            disable_caching,
        }
    }

    /// Where the source tarball is uploaded before the pod starts.
    pub fn tar_key(&self) -> &str {
        &self.tar_key
    }

    /// Prefix the builder writes its artifacts under.
    pub fn push_key(&self) -> &str {
        &self.push_key
    }

    /// Absolute key of the compiled slug.
    pub fn slug_key(&self) -> String {
        format!("{}/slug.tgz", self.push_key)
    }

    /// Absolute key of the builder-written Procfile.
    pub fn procfile_key(&self) -> String {
        format!("{}/Procfile", self.push_key)
    }

    /// The per-app cache key, independent of whether caching is on.
    pub fn cache_key(&self) -> &str {
        &self.cache_key
    }

    pub fn disable_caching(&self) -> bool {
        self.disable_caching
    }

    /// Cache key as the builder pod sees it: empty means "no cache".
    pub fn pod_cache_key(&self) -> &str {
        if self.disable_caching {
            ""
        } else {
            &self.cache_key
        }
    }
}
