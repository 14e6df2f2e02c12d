//! In-memory engine used by the unit tests

use super::{event_mark, Container, EngineClient, EngineEvent, EngineResult, Image, RemoveOptions};

use async_trait::async_trait;
use futures::stream::{self, BoxStream};
use futures::StreamExt;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

#[derive(Debug, Clone, PartialEq)]
pub enum EngineCall {
    Start(String),
    Stop(String, i64),
    Kill(String),
    Remove(String, RemoveOptions),
}

type ListHook = Box<dyn FnOnce(&FakeEngine) + Send>;

#[derive(Default)]
pub struct FakeEngine {
    containers: Mutex<HashMap<String, Container>>,
    order: Mutex<Vec<String>>,
    images: Mutex<Vec<Image>>,
    calls: Mutex<Vec<EngineCall>>,
    batches: Mutex<VecDeque<Vec<EngineResult<EngineEvent>>>>,
    failing_calls: Mutex<bool>,
    // (unix seconds, event) for everything that already happened
    history: Mutex<Vec<(i64, EngineEvent)>>,
    on_list: Mutex<Option<ListHook>>,
}

pub fn container(id: &str, status: &str) -> Container {
    let mut c = Container::new(id);
    c.details.insert(
        "State".to_string(),
        serde_json::json!({ "Status": status, "Running": status == "running" }),
    );
    c
}

pub fn image(id: &str, tags: &[&str]) -> Image {
    Image {
        id: id.to_string(),
        repo_tags: tags.iter().map(|t| t.to_string()).collect(),
        details: serde_json::Map::new(),
    }
}

impl FakeEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `inspect(id)` return `container` from now on
    pub fn put(&self, container: Container) {
        let mut order = self.order.lock().unwrap();
        if !order.contains(&container.id) {
            order.push(container.id.clone());
        }
        self.containers
            .lock()
            .unwrap()
            .insert(container.id.clone(), container);
    }

    /// Make `inspect(id)` fail, as if the container vanished
    pub fn forget(&self, id: &str) {
        self.containers.lock().unwrap().remove(id);
        self.order.lock().unwrap().retain(|known| known != id);
    }

    pub fn set_images(&self, images: Vec<Image>) {
        *self.images.lock().unwrap() = images;
    }

    /// Queue the events the next `subscribe` call will yield
    pub fn push_subscription(&self, events: Vec<EngineResult<EngineEvent>>) {
        self.batches.lock().unwrap().push_back(events);
    }

    /// Record `event` as having happened now. Only a subscription with a
    /// `since` at or before this moment sees it.
    pub fn emit(&self, event: EngineEvent) {
        self.history.lock().unwrap().push((event_mark(), event));
    }

    /// Run `hook` once, right after the next `list_containers` has taken its
    /// listing. Lets a test change the engine while a snapshot is underway.
    pub fn during_next_listing(&self, hook: impl FnOnce(&FakeEngine) + Send + 'static) {
        *self.on_list.lock().unwrap() = Some(Box::new(hook));
    }

    pub fn fail_lifecycle_calls(&self) {
        *self.failing_calls.lock().unwrap() = true;
    }

    pub fn calls(&self) -> Vec<EngineCall> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: EngineCall) -> EngineResult<()> {
        self.calls.lock().unwrap().push(call);
        if *self.failing_calls.lock().unwrap() {
            return Err("engine unavailable".into());
        }
        Ok(())
    }
}

#[async_trait]
impl EngineClient for FakeEngine {
    async fn ping(&self) -> EngineResult<()> {
        Ok(())
    }

    async fn list_images(&self, _all: bool) -> EngineResult<Vec<Image>> {
        Ok(self.images.lock().unwrap().clone())
    }

    async fn list_containers(&self, _all: bool) -> EngineResult<Vec<String>> {
        let listed = self.order.lock().unwrap().clone();
        let hook = self.on_list.lock().unwrap().take();
        if let Some(hook) = hook {
            hook(self);
        }
        Ok(listed)
    }

    async fn inspect(&self, id: &str) -> EngineResult<Container> {
        self.containers
            .lock()
            .unwrap()
            .get(id)
            .cloned()
            .ok_or_else(|| format!("No such container: {}", id).into())
    }

    async fn start_container(&self, id: &str) -> EngineResult<()> {
        self.record(EngineCall::Start(id.to_string()))
    }

    async fn stop_container(&self, id: &str, grace_seconds: i64) -> EngineResult<()> {
        self.record(EngineCall::Stop(id.to_string(), grace_seconds))
    }

    async fn kill_container(&self, id: &str) -> EngineResult<()> {
        self.record(EngineCall::Kill(id.to_string()))
    }

    async fn remove_container(&self, id: &str, opts: RemoveOptions) -> EngineResult<()> {
        self.record(EngineCall::Remove(id.to_string(), opts))
    }

    fn subscribe(&self, since: Option<i64>) -> BoxStream<'static, EngineResult<EngineEvent>> {
        let replay: Vec<EngineResult<EngineEvent>> = match since {
            Some(mark) => self
                .history
                .lock()
                .unwrap()
                .iter()
                .filter(|(at, _)| *at >= mark)
                .map(|(_, event)| Ok(event.clone()))
                .collect(),
            None => Vec::new(),
        };

        let live = match self.batches.lock().unwrap().pop_front() {
            Some(events) => stream::iter(events).boxed(),
            None => stream::pending().boxed(),
        };
        stream::iter(replay).chain(live).boxed()
    }
}
