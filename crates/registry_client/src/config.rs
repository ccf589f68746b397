//! Registry client configuration.

use ans_api::*;

/// Configuration for a [RegistryClient](crate::RegistryClient).
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryClientConfig {
    /// Base url of the registry. E.g. `https://ans.example.com`.
    /// May carry a path prefix, `/register` and `/lookup` are appended.
    pub server_url: String,

    /// Overall timeout for a single request, in milliseconds.
    /// Default: 30 seconds.
    pub timeout_ms: u32,

    /// User agent header sent with every request.
    pub user_agent: String,
}

impl Default for RegistryClientConfig {
    fn default() -> Self {
        Self {
            server_url: "<https://your.registry.url>".into(),
            timeout_ms: 1000 * 30,
            user_agent: concat!(
                "ans-registry-client/",
                env!("CARGO_PKG_VERSION")
            )
            .into(),
        }
    }
}

impl RegistryClientConfig {
    /// Default configuration pointing at the given registry.
    pub fn with_server_url(server_url: impl Into<String>) -> Self {
        Self {
            server_url: server_url.into(),
            ..Default::default()
        }
    }

    /// Get the request timeout.
    pub fn timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.timeout_ms as u64)
    }

    /// Check the configuration, returning the parsed server url.
    pub fn validate(&self) -> AnsResult<url::Url> {
        let url = url::Url::parse(&self.server_url).map_err(|e| {
            AnsError::config(format!(
                "invalid registry server_url {:?}: {e}",
                self.server_url
            ))
        })?;

        if url.cannot_be_a_base() {
            return Err(AnsError::config(format!(
                "registry server_url {:?} cannot be a base url",
                self.server_url
            )));
        }

        match url.scheme() {
            "http" | "https" => (),
            scheme => {
                return Err(AnsError::config(format!(
                    "unsupported registry url scheme {scheme:?}"
                )));
            }
        }

        if self.timeout_ms == 0 {
            return Err(AnsError::config("timeout_ms must be non-zero"));
        }

        Ok(url)
    }
}
