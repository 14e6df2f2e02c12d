//! Connected viewers and fan-out delivery
//!
//! Each viewer owns a bounded outbound queue drained by its own writer task,
//! so the broadcaster only ever enqueues. A viewer whose queue is closed
//! (its socket write failed) or full (it stopped reading) is dropped on the
//! spot while delivery to everyone else carries on.
//!
//! Anything that reads the store and then delivers what it read holds
//! [`ViewerRegistry::sequence`] across both steps, so a snapshot can never
//! reach a viewer after a diff describing newer state. It is always taken
//! before the store lock and the session lock, never while holding either.

use super::messages::DiffMessage;
use std::collections::HashMap;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::{Mutex, MutexGuard};
use uuid::Uuid;

pub type SessionId = Uuid;

pub struct ViewerRegistry {
    sessions: Mutex<HashMap<SessionId, mpsc::Sender<String>>>,
    sequence: Mutex<()>,
}

impl ViewerRegistry {
    pub fn new() -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            sequence: Mutex::new(()),
        }
    }

    /// Turn for one read-then-deliver step
    pub async fn sequence(&self) -> MutexGuard<'_, ()> {
        self.sequence.lock().await
    }

    /// Add a viewer whose writer drains `outbound`
    pub async fn register(&self, outbound: mpsc::Sender<String>) -> SessionId {
        let id = Uuid::new_v4();
        let mut sessions = self.sessions.lock().await;
        sessions.insert(id, outbound);
        tracing::info!("Viewer {} registered ({} connected)", id, sessions.len());
        id
    }

    pub async fn unregister(&self, id: SessionId) -> bool {
        let mut sessions = self.sessions.lock().await;
        let removed = sessions.remove(&id).is_some();
        if removed {
            tracing::info!("Viewer {} unregistered ({} connected)", id, sessions.len());
        }
        removed
    }

    pub async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }

    /// Deliver `payload` to every viewer, pruning the ones that fail.
    /// Returns how many viewers accepted it.
    pub async fn broadcast_all(&self, payload: &str) -> usize {
        let mut sessions = self.sessions.lock().await;
        let mut failed = Vec::new();

        for (id, outbound) in sessions.iter() {
            if let Err(e) = outbound.try_send(payload.to_string()) {
                failed.push((*id, e));
            }
        }

        for (id, e) in &failed {
            sessions.remove(id);
            log_drop(*id, e);
        }

        sessions.len()
    }

    /// Deliver `payload` to one viewer. A failing viewer is pruned.
    pub async fn send_to(&self, id: SessionId, payload: &str) -> bool {
        let mut sessions = self.sessions.lock().await;
        let Some(outbound) = sessions.get(&id) else {
            tracing::debug!("Viewer {} is no longer connected", id);
            return false;
        };

        match outbound.try_send(payload.to_string()) {
            Ok(()) => true,
            Err(e) => {
                sessions.remove(&id);
                log_drop(id, &e);
                false
            }
        }
    }

    /// Serialize `diff` once and broadcast it
    pub async fn broadcast(&self, diff: &DiffMessage) -> usize {
        match serde_json::to_string(diff) {
            Ok(json) => {
                let delivered = self.broadcast_all(&json).await;
                tracing::debug!("Broadcast {} diff to {} viewers", diff.kind(), delivered);
                delivered
            }
            Err(e) => {
                tracing::error!("Failed to serialize {} diff: {}", diff.kind(), e);
                0
            }
        }
    }
}

impl Default for ViewerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn log_drop(id: SessionId, e: &TrySendError<String>) {
    match e {
        TrySendError::Full(_) => {
            tracing::warn!("Viewer {} is not keeping up, dropping it", id);
        }
        TrySendError::Closed(_) => {
            tracing::warn!("Viewer {} connection failed, dropping it", id);
        }
    }
}
