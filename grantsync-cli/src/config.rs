// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration of the backend command line tool.
use std::path::PathBuf;

/// Default name of the backend executable, looked up in `PATH`.
pub const DEFAULT_EXECUTABLE: &str = "tecton";

/// Environment variable carrying the API key for the backend executable.
const API_KEY_VAR: &str = "TECTON_API_KEY";

/// Environment variable carrying the API endpoint for the backend executable.
const API_SERVICE_VAR: &str = "API_SERVICE";

/// Parameters required to invoke the backend executable.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BackendConfig {
    /// Path or name of the backend executable.
    pub executable: PathBuf,

    /// Base URL of the backend service, without the `/api` suffix.
    pub url: String,

    /// API key used to authenticate against the backend.
    pub api_key: String,
}

impl BackendConfig {
    pub fn new(url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            executable: PathBuf::from(DEFAULT_EXECUTABLE),
            url: url.into(),
            api_key: api_key.into(),
        }
    }

    /// Variables added to the inherited environment of every backend invocation.
    pub fn command_env(&self) -> Vec<(&'static str, String)> {
        vec![
            (API_KEY_VAR, self.api_key.clone()),
            (
                API_SERVICE_VAR,
                format!("{}/api", self.url.trim_end_matches('/')),
            ),
        ]
    }
}
