use super::store::StateStore;
use crate::engine::{Container, EngineClient, EngineResult};

/// Load images and containers into `store` at startup.
/// Listing failures are returned; a container that vanishes between listing
/// and inspection is skipped.
pub async fn load_snapshot(engine: &dyn EngineClient, store: &StateStore) -> EngineResult<()> {
    let images: Vec<_> = engine
        .list_images(true)
        .await?
        .into_iter()
        .filter(|image| !image.is_untagged())
        .collect();
    tracing::info!("Loaded {} tagged images", images.len());
    store.set_images(images).await;

    let containers = inspect_all(engine).await?;
    tracing::info!("Loaded {} containers", containers.len());
    store.replace_containers(containers).await;

    Ok(())
}

/// Inspect every container the engine lists, in listing order
pub async fn inspect_all(engine: &dyn EngineClient) -> EngineResult<Vec<Container>> {
    let ids = engine.list_containers(true).await?;
    let mut containers = Vec::with_capacity(ids.len());

    for id in ids {
        match engine.inspect(&id).await {
            Ok(container) => containers.push(container),
            Err(e) => tracing::warn!("Skipping container {}: {}", id, e),
        }
    }

    Ok(containers)
}
