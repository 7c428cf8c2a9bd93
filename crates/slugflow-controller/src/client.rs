use crate::error::{ControllerError, Result};
use crate::types::{AppConfig, BuildHook, BuildHookResponse, ProcessType};

/// Hooks API version this client speaks.
const API_VERSION: &str = "2.3";

/// Header carrying the shared builder key.
const AUTH_HEADER: &str = "X-Drycc-Builder-Auth";

/// Header the controller answers with, carrying its own API version.
const API_VERSION_HEADER: &str = "DRYCC_API_VERSION";

/// Client for the controller's git-push hooks.
pub struct ControllerClient {
    client: reqwest::Client,
    base_url: String,
    builder_key: String,
}

impl ControllerClient {
    /// Creates a client for the controller at `host:port`, authenticating
    /// every hook call with `builder_key`.
    pub fn new(host: &str, port: u16, builder_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: format!("http://{}:{}", host, port),
            builder_key: builder_key.into(),
        }
    }

    /// Fetches the app's configuration ahead of the build.
    pub async fn get_app_config(&self, user: &str, app: &str) -> Result<AppConfig> {
        let url = format!("{}/v2/hooks/config", self.base_url);
        let response = self
            .client
            .get(&url)
            .header(AUTH_HEADER, &self.builder_key)
            .query(&[("receive_user", user), ("receive_repo", app)])
            .send()
            .await?;

        let response = self.check_status(response).await?;
        self.check_api_compat(&response);
        Ok(response.json::<AppConfig>().await?)
    }

    /// Publishes a release for the freshly built image and returns its
    /// version number.
    #[allow(clippy::too_many_arguments)]
    pub async fn create_build(
        &self,
        user: &str,
        app: &str,
        image: &str,
        stack: &str,
        sha: &str,
        procfile: &ProcessType,
        container: bool,
    ) -> Result<u64> {
        let url = format!("{}/v2/hooks/build", self.base_url);
        let body = BuildHook {
            receive_user: user,
            receive_repo: app,
            image,
            stack,
            sha,
            procfile,
            container,
        };
        let response = self
            .client
            .post(&url)
            .header(AUTH_HEADER, &self.builder_key)
            .json(&body)
            .send()
            .await?;

        let response = self.check_status(response).await?;
        self.check_api_compat(&response);
        let parsed = response.json::<BuildHookResponse>().await?;
        Ok(parsed.release.version)
    }

    async fn check_status(&self, response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let message = response.text().await.unwrap_or_default();
        Err(ControllerError::Api {
            status: status.as_u16(),
            message,
        })
    }

    /// A version skew between this client and the controller is logged and
    /// otherwise ignored; the response is used as-is.
    fn check_api_compat(&self, response: &reqwest::Response) {
        let server = response
            .headers()
            .get(API_VERSION_HEADER)
            .and_then(|v| v.to_str().ok());
        if let Some(server) = server {
            if server != API_VERSION {
                tracing::warn!(
                    client = API_VERSION,
                    controller = server,
                    "client and controller API versions do not match"
                );
            }
        }
    }
}
