//! DevTools HTTP discovery: finds the browser's WebSocket endpoint and its
//! open page targets on `http://host:port/json/*`.

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Deserialize;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DevtoolsSettings {
    pub host: String,
    pub port: u16,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
}

impl Default for DevtoolsSettings {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 9222,
            connect_timeout: Duration::from_secs(5),
            request_timeout: Duration::from_secs(10),
        }
    }
}

impl DevtoolsSettings {
    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}

/// Answer of `/json/version`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BrowserVersion {
    #[serde(rename = "Browser", default)]
    pub browser: String,
    #[serde(rename = "Protocol-Version", default)]
    pub protocol_version: String,
    #[serde(rename = "webSocketDebuggerUrl")]
    pub ws_url: String,
}

/// One entry of `/json`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DevtoolsTarget {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub url: String,
    #[serde(rename = "webSocketDebuggerUrl", default)]
    pub ws_url: Option<String>,
}

impl DevtoolsTarget {
    pub fn is_page(&self) -> bool {
        self.kind == "page"
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DiscoveryError {
    #[error("invalid devtools endpoint {0}")]
    InvalidEndpoint(String),
    #[error("devtools endpoint answered http status {0}")]
    HttpStatus(u16),
    #[error("devtools endpoint timed out")]
    Timeout,
    #[error("devtools endpoint unreachable: {0}")]
    Network(String),
    #[error("unexpected devtools answer: {0}")]
    Decode(String),
    #[error("no page is open in the browser")]
    NoPage,
}

#[derive(Debug, Clone)]
pub struct DevtoolsClient {
    settings: DevtoolsSettings,
}

impl DevtoolsClient {
    pub fn new(settings: DevtoolsSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &DevtoolsSettings {
        &self.settings
    }

    pub async fn version(&self) -> Result<BrowserVersion, DiscoveryError> {
        self.get_json("/json/version").await
    }

    /// Page targets in the order the browser lists them; the first one is
    /// the most recently focused tab.
    pub async fn pages(&self) -> Result<Vec<DevtoolsTarget>, DiscoveryError> {
        let targets: Vec<DevtoolsTarget> = self.get_json("/json").await?;
        Ok(targets.into_iter().filter(DevtoolsTarget::is_page).collect())
    }

    fn build_client(&self) -> Result<reqwest::Client, DiscoveryError> {
        reqwest::Client::builder()
            .connect_timeout(self.settings.connect_timeout)
            .timeout(self.settings.request_timeout)
            .build()
            .map_err(|err| DiscoveryError::Network(err.to_string()))
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, DiscoveryError> {
        let raw = format!("{}{}", self.settings.base_url(), path);
        let parsed = reqwest::Url::parse(&raw)
            .map_err(|err| DiscoveryError::InvalidEndpoint(format!("{raw}: {err}")))?;
        let client = self.build_client()?;

        let response = client.get(parsed).send().await.map_err(map_reqwest_error)?;
        let status = response.status();
        if !status.is_success() {
            return Err(DiscoveryError::HttpStatus(status.as_u16()));
        }

        let bytes = response.bytes().await.map_err(map_reqwest_error)?;
        serde_json::from_slice(&bytes).map_err(|err| DiscoveryError::Decode(err.to_string()))
    }
}

fn map_reqwest_error(err: reqwest::Error) -> DiscoveryError {
    if err.is_timeout() {
        return DiscoveryError::Timeout;
    }
    DiscoveryError::Network(err.to_string())
}
