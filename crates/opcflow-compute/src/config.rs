//! Provider configuration
//!
//! Values come from the manifest's `provider` block first and fall back to
//! `OPC_*` environment variables.

use crate::error::{ComputeError, Result};
use std::time::Duration;

const ENV_ENDPOINT: &str = "OPC_ENDPOINT";
const ENV_IDENTITY_DOMAIN: &str = "OPC_IDENTITY_DOMAIN";
const ENV_USERNAME: &str = "OPC_USERNAME";
const ENV_PASSWORD: &str = "OPC_PASSWORD";
const ENV_TIMEOUT_SECS: &str = "OPC_TIMEOUT_SECS";

/// Provider settings as written in a manifest; every value is optional
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProviderSettings {
    pub endpoint: Option<String>,
    pub identity_domain: Option<String>,
    pub user: Option<String>,
    pub timeout_secs: Option<u64>,
}

/// Connection settings for the compute control plane
#[derive(Debug, Clone)]
pub struct ComputeConfig {
    /// API endpoint, e.g. `https://api-z27.compute.us6.oraclecloud.com`
    pub endpoint: String,
    pub identity_domain: String,
    pub user: String,
    pub password: String,
    /// Default per-call timeout when the caller does not set one
    pub timeout: Option<Duration>,
}

impl ComputeConfig {
    /// Create ComputeConfig from environment variables
    pub fn from_env() -> Result<Self> {
        Self::resolve(&ProviderSettings::default())
    }

    /// Merge manifest settings over environment variables
    pub fn resolve(settings: &ProviderSettings) -> Result<Self> {
        let endpoint = pick(&settings.endpoint, "endpoint", ENV_ENDPOINT)?;
        let identity_domain =
            pick(&settings.identity_domain, "identity-domain", ENV_IDENTITY_DOMAIN)?;
        let user = pick(&settings.user, "user", ENV_USERNAME)?;
        let password = pick(&None, "password", ENV_PASSWORD)?;

        let timeout_secs = match settings.timeout_secs {
            Some(secs) => Some(secs),
            None => match std::env::var(ENV_TIMEOUT_SECS) {
                Ok(raw) => Some(raw.parse::<u64>().map_err(|_| {
                    ComputeError::InvalidConfig(format!(
                        "{} must be a number of seconds, got '{}'",
                        ENV_TIMEOUT_SECS, raw
                    ))
                })?),
                Err(_) => None,
            },
        };

        if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
            return Err(ComputeError::InvalidConfig(format!(
                "endpoint must be an http(s) URL, got '{}'",
                endpoint
            )));
        }

        Ok(Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            identity_domain,
            user,
            password,
            timeout: timeout_secs.map(Duration::from_secs),
        })
    }

    /// `/Compute-<domain>/<user>`
    pub fn qualified_user(&self) -> String {
        format!("/Compute-{}/{}", self.identity_domain, self.user)
    }

    /// `/Compute-<domain>/<user>/<name>`; already qualified names are kept
    pub fn qualify(&self, name: &str) -> String {
        if name.starts_with('/') {
            return name.to_string();
        }
        format!("{}/{}", self.qualified_user(), name)
    }

    /// Strip the `/Compute-<domain>/<user>/` prefix
    pub fn unqualify(&self, name: &str) -> String {
        if !name.starts_with('/') {
            return name.to_string();
        }
        name.splitn(4, '/').nth(3).unwrap_or(name).to_string()
    }
}

fn pick(value: &Option<String>, field: &'static str, env: &'static str) -> Result<String> {
    if let Some(value) = value.as_ref().filter(|v| !v.is_empty()) {
        return Ok(value.clone());
    }
    std::env::var(env)
        .ok()
        .filter(|v| !v.is_empty())
        .ok_or(ComputeError::MissingConfig { field, env })
}
