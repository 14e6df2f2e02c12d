//! Turns engine events into store mutations and viewer diffs
//!
//! `die` arrives before the engine tears the container down, so it is still
//! inspectable and stays in the store (with its dead status) until the
//! matching `destroy`. Only `destroy` removes it.
//!
//! Every subscription asks the engine to replay from a mark taken before the
//! state it follows was listed. Events that land between listing and
//! subscribing are therefore seen, some of them twice, which is harmless:
//! applying the same event again leaves the store as it was.

use super::bootstrap::inspect_all;
use super::store::StateStore;
use crate::engine::{event_mark, EngineClient, EngineEvent, EventStatus};
use crate::websocket::{DiffMessage, ViewerRegistry};

use futures::StreamExt;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

pub struct Reconciler {
    engine: Arc<dyn EngineClient>,
    store: Arc<StateStore>,
    viewers: Arc<ViewerRegistry>,
    resubscribe_delay: Duration,
}

impl Reconciler {
    pub fn new(
        engine: Arc<dyn EngineClient>,
        store: Arc<StateStore>,
        viewers: Arc<ViewerRegistry>,
        resubscribe_delay: Duration,
    ) -> Self {
        Self {
            engine,
            store,
            viewers,
            resubscribe_delay,
        }
    }

    /// Apply one event to the store and return the diff describing it
    pub async fn apply(&self, event: EngineEvent) -> Option<DiffMessage> {
        match event.status {
            EventStatus::Start => {
                let container = self.inspect_for(&event).await?;
                self.store.upsert_container(container.clone()).await;
                Some(DiffMessage::started(container))
            }
            EventStatus::Die => {
                let container = self.inspect_for(&event).await?;
                tracing::debug!(
                    "Container {} died, engine reports {}",
                    container.id,
                    container.status().unwrap_or("unknown")
                );
                self.store.upsert_container(container.clone()).await;
                Some(DiffMessage::died(container))
            }
            EventStatus::Destroy => {
                if !self.store.remove_container(&event.id).await {
                    tracing::debug!("Destroyed container {} was not tracked", event.id);
                }
                Some(DiffMessage::destroyed(event.id))
            }
            EventStatus::Other(status) => {
                tracing::trace!("Ignoring {} for {}", status, event.id);
                None
            }
        }
    }

    async fn inspect_for(&self, event: &EngineEvent) -> Option<crate::engine::Container> {
        match self.engine.inspect(&event.id).await {
            Ok(container) => Some(container),
            Err(e) => {
                tracing::warn!(
                    "Dropping {:?} event, failed to inspect {}: {}",
                    event.status,
                    event.id,
                    e
                );
                None
            }
        }
    }

    pub async fn handle(&self, event: EngineEvent) {
        tracing::debug!("Engine event {:?} for {}", event.status, event.id);
        let _turn = self.viewers.sequence().await;
        if let Some(diff) = self.apply(event).await {
            self.viewers.broadcast(&diff).await;
        }
    }

    /// Rebuild the container list from scratch and push it to every viewer.
    /// Used after the event stream dropped, since events may have been missed.
    pub async fn resync(&self) {
        match inspect_all(self.engine.as_ref()).await {
            Ok(containers) => {
                let _turn = self.viewers.sequence().await;
                self.store.replace_containers(containers).await;
                let (images, containers) = self.store.list_all().await;
                tracing::info!("Resynced {} containers after reconnect", containers.len());
                self.viewers
                    .broadcast(&DiffMessage::Full { images, containers })
                    .await;
            }
            Err(e) => {
                tracing::warn!("Failed to resync containers: {}", e);
            }
        }
    }

    /// Consume engine events for the life of the process, subscribing again
    /// whenever the stream ends or fails. `since` is the mark taken before
    /// the startup snapshot was listed.
    pub async fn run(self: Arc<Self>, mut since: Option<i64>) {
        let mut reconnecting = false;

        loop {
            if reconnecting {
                since = Some(event_mark());
                self.resync().await;
            }

            let mut events = self.engine.subscribe(since);
            tracing::info!("Listening for engine events");

            while let Some(item) = events.next().await {
                match item {
                    Ok(event) => self.handle(event).await,
                    Err(e) => {
                        tracing::error!("Engine event stream error: {}", e);
                        break;
                    }
                }
            }

            tracing::warn!(
                "Engine event stream ended, subscribing again in {}ms",
                self.resubscribe_delay.as_millis()
            );
            tokio::time::sleep(self.resubscribe_delay).await;
            reconnecting = true;
        }
    }

    pub fn spawn(self, since: Option<i64>) -> JoinHandle<()> {
        tokio::spawn(Arc::new(self).run(since))
    }
}
