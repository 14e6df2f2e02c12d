use super::{Container, EngineClient, EngineError, EngineEvent, EngineResult, Image, RemoveOptions};

use async_trait::async_trait;
use bollard::container::{
    InspectContainerOptions, KillContainerOptions, ListContainersOptions, RemoveContainerOptions,
    StartContainerOptions, StopContainerOptions,
};
use bollard::image::ListImagesOptions;
use bollard::system::EventsOptions;
use bollard::{API_DEFAULT_VERSION, Docker};
use futures::stream::BoxStream;
use futures::StreamExt;
use std::collections::HashMap;

/// [`EngineClient`] backed by a Docker daemon
#[derive(Clone)]
pub struct DockerEngine {
    docker: Docker,
}

impl DockerEngine {
    /// Connect to `endpoint` (`unix://`, `tcp://` or `http://`). An empty
    /// endpoint uses the platform defaults and `DOCKER_HOST`.
    pub fn connect(endpoint: &str, timeout_secs: u64) -> EngineResult<Self> {
        let docker = if endpoint.is_empty() {
            Docker::connect_with_local_defaults()?
        } else if let Some(path) = endpoint.strip_prefix("unix://") {
            Docker::connect_with_unix(path, timeout_secs, API_DEFAULT_VERSION)?
        } else if endpoint.starts_with("tcp://") || endpoint.starts_with("http://") {
            Docker::connect_with_http(endpoint, timeout_secs, API_DEFAULT_VERSION)?
        } else {
            return Err(format!("Unsupported docker endpoint: {}", endpoint).into());
        };

        tracing::debug!("Docker client configured for {}", endpoint);
        Ok(Self { docker })
    }
}

#[async_trait]
impl EngineClient for DockerEngine {
    async fn ping(&self) -> EngineResult<()> {
        self.docker.ping().await?;
        Ok(())
    }

    async fn list_images(&self, all: bool) -> EngineResult<Vec<Image>> {
        let opts = ListImagesOptions::<String> {
            all,
            ..Default::default()
        };
        let summaries = self.docker.list_images(Some(opts)).await?;

        let mut images = Vec::with_capacity(summaries.len());
        for summary in summaries {
            images.push(Image::from_summary(summary)?);
        }
        Ok(images)
    }

    async fn list_containers(&self, all: bool) -> EngineResult<Vec<String>> {
        let opts = ListContainersOptions::<String> {
            all,
            ..Default::default()
        };
        let summaries = self.docker.list_containers(Some(opts)).await?;
        Ok(summaries.into_iter().filter_map(|c| c.id).collect())
    }

    async fn inspect(&self, id: &str) -> EngineResult<Container> {
        let info = self
            .docker
            .inspect_container(id, None::<InspectContainerOptions>)
            .await?;
        Ok(Container::from_inspect(info)?)
    }

    async fn start_container(&self, id: &str) -> EngineResult<()> {
        self.docker
            .start_container(id, None::<StartContainerOptions<String>>)
            .await?;
        Ok(())
    }

    async fn stop_container(&self, id: &str, grace_seconds: i64) -> EngineResult<()> {
        self.docker
            .stop_container(id, Some(StopContainerOptions { t: grace_seconds }))
            .await?;
        Ok(())
    }

    async fn kill_container(&self, id: &str) -> EngineResult<()> {
        self.docker
            .kill_container(id, Some(KillContainerOptions { signal: "SIGKILL" }))
            .await?;
        Ok(())
    }

    async fn remove_container(&self, id: &str, opts: RemoveOptions) -> EngineResult<()> {
        let opts = RemoveContainerOptions {
            v: opts.remove_volumes,
            force: opts.force,
            ..Default::default()
        };
        self.docker.remove_container(id, Some(opts)).await?;
        Ok(())
    }

    fn subscribe(&self, since: Option<i64>) -> BoxStream<'static, EngineResult<EngineEvent>> {
        let mut filters = HashMap::new();
        filters.insert("type".to_string(), vec!["container".to_string()]);
        let opts = EventsOptions::<String> {
            since: since.map(|mark| mark.to_string()),
            filters,
            ..Default::default()
        };

        self.docker
            .events(Some(opts))
            .filter_map(|message| async move {
                match message {
                    Ok(event) => {
                        let id = event.actor.and_then(|actor| actor.id)?;
                        let action = event.action?;
                        Some(Ok(EngineEvent::new(id, action)))
                    }
                    Err(e) => Some(Err(EngineError::from(e))),
                }
            })
            .boxed()
    }
}
