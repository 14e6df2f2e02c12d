//! Authoritative in-memory view of the host's containers and images.
//!
//! Every mutation and every snapshot runs under one lock so readers never
//! see a half-applied change.

use crate::engine::{Container, Image};
use tokio::sync::RwLock;

#[derive(Default)]
struct Inventory {
    images: Vec<Image>,
    containers: Vec<Container>,
}

#[derive(Default)]
pub struct StateStore {
    inner: RwLock<Inventory>,
}

impl StateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consistent copy of everything the store knows
    pub async fn list_all(&self) -> (Vec<Image>, Vec<Container>) {
        let inventory = self.inner.read().await;
        (inventory.images.clone(), inventory.containers.clone())
    }

    /// Insert `container`, or replace the entry with the same ID in place.
    pub async fn upsert_container(&self, container: Container) {
        let mut inventory = self.inner.write().await;
        match inventory.containers.iter_mut().find(|c| c.id == container.id) {
            Some(existing) => *existing = container,
            None => inventory.containers.push(container),
        }
    }

    /// Returns whether an entry was removed
    pub async fn remove_container(&self, id: &str) -> bool {
        let mut inventory = self.inner.write().await;
        let before = inventory.containers.len();
        inventory.containers.retain(|c| c.id != id);
        inventory.containers.len() != before
    }

    pub async fn replace_containers(&self, containers: Vec<Container>) {
        self.inner.write().await.containers = containers;
    }

    /// Images are loaded once; the engine's event stream does not report
    /// image changes reliably enough to keep them live.
    pub async fn set_images(&self, images: Vec<Image>) {
        self.inner.write().await.images = images;
    }

    #[cfg(test)]
    pub async fn container(&self, id: &str) -> Option<Container> {
        self.inner
            .read()
            .await
            .containers
            .iter()
            .find(|c| c.id == id)
            .cloned()
    }

    /// (images, containers)
    pub async fn counts(&self) -> (usize, usize) {
        let inventory = self.inner.read().await;
        (inventory.images.len(), inventory.containers.len())
    }
}
