use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub web: WebConfig,
    #[serde(default)]
    pub docker: DockerConfig,
    #[serde(default)]
    pub commands: CommandConfig,
    #[serde(default)]
    pub viewers: ViewerConfig,
    #[serde(default)]
    pub events: EventsConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct WebConfig {
    /// Directory the browser UI is served from
    pub directory: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DockerConfig {
    /// `unix:///path/to.sock`, `tcp://host:port` or `http://host:port`
    pub endpoint: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CommandConfig {
    /// Seconds a `stop` waits before the engine force-kills the container
    pub stop_grace_seconds: i64,
}

/// Who receives the full snapshot produced by an `init` command
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum InitReply {
    /// Every connected viewer gets the snapshot
    All,
    /// Only the viewer that sent `init`
    Requester,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ViewerConfig {
    /// Outbound messages buffered per viewer before it is considered stalled
    pub queue_depth: usize,
    pub init_reply: InitReply,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct EventsConfig {
    pub resubscribe_delay_ms: u64,
}

fn default_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

fn default_docker_timeout() -> u64 {
    120
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
        }
    }
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            directory: "web/".to_string(),
        }
    }
}

impl Default for DockerConfig {
    fn default() -> Self {
        Self {
            endpoint: "unix:///var/run/docker.sock".to_string(),
            timeout_secs: default_docker_timeout(),
        }
    }
}

impl Default for CommandConfig {
    fn default() -> Self {
        Self { stop_grace_seconds: 15 }
    }
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            queue_depth: 64,
            init_reply: InitReply::All,
        }
    }
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            resubscribe_delay_ms: 2000,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: default_version(),
            server: ServerConfig::default(),
            web: WebConfig::default(),
            docker: DockerConfig::default(),
            commands: CommandConfig::default(),
            viewers: ViewerConfig::default(),
            events: EventsConfig::default(),
        }
    }
}

impl Config {
    /// Load `path`, falling back to defaults when the file does not exist.
    pub fn load(path: &str) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        if !Path::new(path).exists() {
            tracing::info!("No config at {}, using defaults", path);
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        let config: Config = serde_json::from_str(content)?;
        if config.viewers.queue_depth == 0 {
            return Err("viewers.queue_depth must be at least 1".into());
        }
        Ok(config)
    }

    /// Apply command line overrides on top of the file values
    pub fn with_overrides(
        mut self,
        port: Option<u16>,
        directory: Option<String>,
        endpoint: Option<String>,
    ) -> Self {
        if let Some(port) = port {
            self.server.port = port;
        }
        if let Some(directory) = directory {
            self.web.directory = directory;
        }
        if let Some(endpoint) = endpoint {
            self.docker.endpoint = endpoint;
        }
        self
    }

    pub fn get_version(&self) -> &str {
        &self.version
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
