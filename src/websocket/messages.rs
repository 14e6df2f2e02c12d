//! Wire messages exchanged with viewers

use crate::engine::{Container, Image};
use serde::{Deserialize, Serialize};

/// State change sent TO viewers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "Type")]
pub enum DiffMessage {
    /// Complete snapshot, answer to `init` and resync after reconnect
    #[serde(rename = "full")]
    Full {
        #[serde(rename = "Images")]
        images: Vec<Image>,
        #[serde(rename = "Containers")]
        containers: Vec<Container>,
    },

    /// A container started
    #[serde(rename = "start")]
    Start {
        #[serde(rename = "Containers")]
        containers: Vec<Container>,
    },

    /// A container died; it stays listed until it is destroyed
    #[serde(rename = "remove")]
    Remove {
        #[serde(rename = "Containers")]
        containers: Vec<Container>,
    },

    /// A container is gone for good
    #[serde(rename = "destroy")]
    Destroy {
        #[serde(rename = "ID")]
        id: String,
    },
}

impl DiffMessage {
    pub fn started(container: Container) -> Self {
        DiffMessage::Start {
            containers: vec![container],
        }
    }

    pub fn died(container: Container) -> Self {
        DiffMessage::Remove {
            containers: vec![container],
        }
    }

    pub fn destroyed(id: impl Into<String>) -> Self {
        DiffMessage::Destroy { id: id.into() }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            DiffMessage::Full { .. } => "full",
            DiffMessage::Start { .. } => "start",
            DiffMessage::Remove { .. } => "remove",
            DiffMessage::Destroy { .. } => "destroy",
        }
    }
}

/// Raw control message received FROM a viewer.
/// The bundled web UI sends lower-case keys, so both casings are accepted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlMessage {
    #[serde(rename = "Command", alias = "command")]
    pub command: String,
    #[serde(rename = "Data", alias = "data", default)]
    pub data: String,
}

/// A control message that passed validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Init,
    Start(String),
    Stop(String),
    Kill(String),
    Remove(String),
}

impl TryFrom<ControlMessage> for Command {
    type Error = String;

    fn try_from(msg: ControlMessage) -> Result<Self, Self::Error> {
        let id = msg.data.trim().to_string();
        let needs_id = |build: fn(String) -> Command| {
            if id.is_empty() {
                Err(format!("'{}' requires a container id", msg.command))
            } else {
                Ok(build(id.clone()))
            }
        };

        match msg.command.as_str() {
            "init" => Ok(Command::Init),
            "start" => needs_id(Command::Start),
            "stop" => needs_id(Command::Stop),
            "kill" => needs_id(Command::Kill),
            "remove" => needs_id(Command::Remove),
            other => Err(format!("Unknown command: {}", other)),
        }
    }
}

impl Command {
    pub fn parse(text: &str) -> Result<Self, String> {
        let msg: ControlMessage = serde_json::from_str(text).map_err(|e| e.to_string())?;
        Command::try_from(msg)
    }
}
