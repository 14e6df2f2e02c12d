//! Container and image records as the viewers see them.
//!
//! Both are opaque to the daemon apart from their identifier (and an image's
//! tags). Whatever else the engine reports is carried through verbatim in
//! `details`, so the browser gets the engine's native shape.

use bollard::models::{ContainerInspectResponse, ImageSummary};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Placeholder tag the engine reports for dangling images
pub const UNTAGGED: &str = "<none>:<none>";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Container {
    #[serde(rename = "ID", alias = "Id")]
    pub id: String,
    #[serde(flatten)]
    pub details: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Image {
    #[serde(rename = "ID", alias = "Id")]
    pub id: String,
    #[serde(rename = "RepoTags", default)]
    pub repo_tags: Vec<String>,
    #[serde(flatten)]
    pub details: Map<String, Value>,
}

impl Container {
    #[cfg(test)]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            details: Map::new(),
        }
    }

    pub fn from_inspect(info: ContainerInspectResponse) -> Result<Self, serde_json::Error> {
        serde_json::from_value(serde_json::to_value(info)?)
    }

    /// `State.Status` as reported by the engine, if present
    pub fn status(&self) -> Option<&str> {
        self.details
            .get("State")
            .and_then(|state| state.get("Status"))
            .and_then(Value::as_str)
    }
}

impl Image {
    pub fn from_summary(summary: ImageSummary) -> Result<Self, serde_json::Error> {
        serde_json::from_value(serde_json::to_value(summary)?)
    }

    /// An image is hidden from viewers when its only tag is the placeholder.
    /// Newer engines report no tags at all for the same case.
    pub fn is_untagged(&self) -> bool {
        match self.repo_tags.as_slice() {
            [] => true,
            [only] => only == UNTAGGED,
            _ => false,
        }
    }
}
