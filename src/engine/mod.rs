//! Container engine seam
//!
//! Everything the daemon needs from the host's container runtime goes through
//! [`EngineClient`]. The Docker implementation lives in [`docker`]; tests use
//! the in-memory fake.

pub mod docker;
pub mod entity;

#[cfg(test)]
pub mod fake;

use async_trait::async_trait;
use futures::stream::BoxStream;

pub use docker::DockerEngine;
pub use entity::{Container, Image};

pub type EngineError = Box<dyn std::error::Error + Send + Sync>;
pub type EngineResult<T> = Result<T, EngineError>;

/// Status carried by an engine event, reduced to the ones the daemon acts on
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventStatus {
    Start,
    Die,
    Destroy,
    Other(String),
}

impl From<&str> for EventStatus {
    fn from(status: &str) -> Self {
        match status {
            "start" => EventStatus::Start,
            "die" => EventStatus::Die,
            "destroy" => EventStatus::Destroy,
            other => EventStatus::Other(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineEvent {
    pub id: String,
    pub status: EventStatus,
}

impl EngineEvent {
    pub fn new(id: impl Into<String>, status: impl AsRef<str>) -> Self {
        Self {
            id: id.into(),
            status: EventStatus::from(status.as_ref()),
        }
    }
}

/// How a `remove` command treats the container's volumes and running state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemoveOptions {
    pub remove_volumes: bool,
    pub force: bool,
}

#[async_trait]
pub trait EngineClient: Send + Sync {
    /// Cheap reachability check used at startup
    async fn ping(&self) -> EngineResult<()>;

    async fn list_images(&self, all: bool) -> EngineResult<Vec<Image>>;

    /// IDs of the containers the engine knows about
    async fn list_containers(&self, all: bool) -> EngineResult<Vec<String>>;

    async fn inspect(&self, id: &str) -> EngineResult<Container>;

    async fn start_container(&self, id: &str) -> EngineResult<()>;

    async fn stop_container(&self, id: &str, grace_seconds: i64) -> EngineResult<()>;

    async fn kill_container(&self, id: &str) -> EngineResult<()>;

    async fn remove_container(&self, id: &str, opts: RemoveOptions) -> EngineResult<()>;

    /// Live container events. With `since` (unix seconds) the engine first
    /// replays what happened from that moment on, so a snapshot taken after
    /// the mark loses nothing. The stream ends (or yields an error) when the
    /// connection to the engine drops; callers subscribe again.
    fn subscribe(&self, since: Option<i64>) -> BoxStream<'static, EngineResult<EngineEvent>>;
}

/// Moment to replay events from, taken just before listing state
pub fn event_mark() -> i64 {
    chrono::Utc::now().timestamp()
}
