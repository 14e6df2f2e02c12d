//! Control messages coming from viewers

use super::messages::{Command, DiffMessage};
use super::registry::{SessionId, ViewerRegistry};
use crate::config::InitReply;
use crate::engine::{EngineClient, RemoveOptions};
use crate::state::StateStore;

use std::sync::Arc;
use tokio::task::JoinHandle;

/// `remove` drops the container's volumes but never force-removes a running one
pub const REMOVE_POLICY: RemoveOptions = RemoveOptions {
    remove_volumes: true,
    force: false,
};

/// What a single inbound message led to
#[derive(Debug)]
pub enum DispatchOutcome {
    /// Undecodable or unknown message, already logged
    Ignored,
    /// `init` answered; number of viewers the snapshot reached
    Snapshot(usize),
    /// Lifecycle command handed to the engine in the background
    Forwarded(JoinHandle<()>),
}

#[derive(Clone)]
pub struct CommandDispatcher {
    engine: Arc<dyn EngineClient>,
    store: Arc<StateStore>,
    viewers: Arc<ViewerRegistry>,
    stop_grace_seconds: i64,
    init_reply: InitReply,
}

impl CommandDispatcher {
    pub fn new(
        engine: Arc<dyn EngineClient>,
        store: Arc<StateStore>,
        viewers: Arc<ViewerRegistry>,
        stop_grace_seconds: i64,
        init_reply: InitReply,
    ) -> Self {
        Self {
            engine,
            store,
            viewers,
            stop_grace_seconds,
            init_reply,
        }
    }

    /// Handle one text frame from `session`. Never fails: bad input and
    /// engine errors are logged and the session carries on.
    pub async fn handle_text(&self, session: SessionId, text: &str) -> DispatchOutcome {
        match Command::parse(text) {
            Ok(command) => self.dispatch(session, command).await,
            Err(e) => {
                tracing::warn!("Ignoring message from viewer {}: {} - {}", session, e, text);
                DispatchOutcome::Ignored
            }
        }
    }

    pub async fn dispatch(&self, session: SessionId, command: Command) -> DispatchOutcome {
        tracing::info!("Viewer {} sent {:?}", session, command);

        match command {
            Command::Init => DispatchOutcome::Snapshot(self.send_snapshot(session).await),
            lifecycle => DispatchOutcome::Forwarded(self.forward(lifecycle)),
        }
    }

    async fn send_snapshot(&self, session: SessionId) -> usize {
        let _turn = self.viewers.sequence().await;
        // Store lock is released before the registry lock is taken
        let (images, containers) = self.store.list_all().await;
        let diff = DiffMessage::Full { images, containers };

        match self.init_reply {
            InitReply::All => self.viewers.broadcast(&diff).await,
            InitReply::Requester => match serde_json::to_string(&diff) {
                Ok(json) => usize::from(self.viewers.send_to(session, &json).await),
                Err(e) => {
                    tracing::error!("Failed to serialize snapshot: {}", e);
                    0
                }
            },
        }
    }

    /// Fire-and-forget engine call; the resulting engine event, if any,
    /// is what updates the viewers.
    fn forward(&self, command: Command) -> JoinHandle<()> {
        let engine = self.engine.clone();
        let grace = self.stop_grace_seconds;

        tokio::spawn(async move {
            let (verb, id, result) = match command {
                Command::Start(id) => {
                    let result = engine.start_container(&id).await;
                    ("start", id, result)
                }
                Command::Stop(id) => {
                    let result = engine.stop_container(&id, grace).await;
                    ("stop", id, result)
                }
                Command::Kill(id) => {
                    let result = engine.kill_container(&id).await;
                    ("kill", id, result)
                }
                Command::Remove(id) => {
                    let result = engine.remove_container(&id, REMOVE_POLICY).await;
                    ("remove", id, result)
                }
                Command::Init => return,
            };

            match result {
                Ok(()) => tracing::info!("Engine accepted {} for {}", verb, id),
                Err(e) => tracing::error!("Failed to {} container {}: {}", verb, id, e),
            }
        })
    }
}
