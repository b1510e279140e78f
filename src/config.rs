use anyhow::Result;
use searchgate_coordinator::IssueOptions;
use searchgate_transports::{create_transport, JsonpTransport, PayloadShape};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct UpstreamConfig {
    pub url: String,
    pub query_param: Option<String>,
    pub callback_param: Option<String>,
    pub callback_prefix: Option<String>,

    /// Milliseconds, `0` disables the timeout.
    #[serde(default)]
    pub timeout: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CorsConfig {
    pub allow_any_origin: Option<bool>,
    pub allow_origins: Option<Vec<String>>,
    pub allow_headers: Option<Vec<String>>,
    pub allow_methods: Option<Vec<String>>,
    pub allow_credentials: Option<bool>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_bind")]
    pub bind: String,

    pub upstream: UpstreamConfig,

    #[serde(default)]
    pub payload: PayloadShape,

    #[serde(default)]
    pub cors: Option<CorsConfig>,
}

impl Config {
    pub fn create_transport(&self) -> Result<JsonpTransport> {
        let mut transport = create_transport(&self.upstream.url)?;
        if let Some(query_param) = &self.upstream.query_param {
            transport = transport.query_param(query_param);
        }
        if let Some(callback_param) = &self.upstream.callback_param {
            transport = transport.callback_param(callback_param);
        }
        if let Some(callback_prefix) = &self.upstream.callback_prefix {
            transport = transport.callback_prefix(callback_prefix);
        }
        Ok(transport)
    }

    pub fn issue_options(&self) -> IssueOptions {
        IssueOptions {
            timeout: self.upstream.timeout,
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:8000".to_string()
}
