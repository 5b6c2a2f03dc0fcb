//! Polling monitors for project jobs and publications
//!
//! Each poll is reconciled against what the monitor has seen before: new ids
//! are reported together as `Added`, known ids whose tracked fields changed
//! are reported one by one as `Updated`.

use async_trait::async_trait;
use rana_core::error::Result;
use rana_core::models::{Job, Publication};
use rana_core::ports::ProjectClient;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::scheduler::PersistentTask;

/// An item tracked by a monitor
pub trait Monitored: Clone + Send + Sync + 'static {
    fn key(&self) -> &str;

    /// Whether the tracked fields differ from the last seen version
    fn has_changed(&self, previous: &Self) -> bool;
}

impl Monitored for Job {
    fn key(&self) -> &str {
        &self.id
    }

    fn has_changed(&self, previous: &Self) -> bool {
        self.state != previous.state || self.process != previous.process
    }
}

impl Monitored for Publication {
    fn key(&self) -> &str {
        &self.id
    }

    fn has_changed(&self, previous: &Self) -> bool {
        self.updated_at != previous.updated_at
    }
}

/// Items seen so far, keyed by id
#[derive(Debug, Clone)]
pub struct MonitorState<T> {
    seen: HashMap<String, T>,
}

impl<T> Default for MonitorState<T> {
    fn default() -> Self {
        Self { seen: HashMap::new() }
    }
}

/// Difference between a poll and the previous state
#[derive(Debug, Clone, PartialEq)]
pub struct PollDelta<T> {
    pub added: Vec<T>,
    pub updated: Vec<T>,
}

impl<T: Monitored> MonitorState<T> {
    /// Record a poll result and return what changed since the last one
    pub fn reconcile(&mut self, current: Vec<T>) -> PollDelta<T> {
        let mut added = Vec::new();
        let mut updated = Vec::new();

        for item in current {
            match self.seen.get(item.key()) {
                None => added.push(item.clone()),
                Some(previous) if item.has_changed(previous) => updated.push(item.clone()),
                Some(_) => {}
            }
            self.seen.insert(item.key().to_string(), item);
        }
        PollDelta { added, updated }
    }

    pub fn clear(&mut self) {
        self.seen.clear();
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum MonitorEvent<T> {
    /// All newly seen items of one poll; never empty
    Added(Vec<T>),
    Updated(T),
    Failed(String),
}

/// Fetches the current items of one project
#[async_trait]
pub trait MonitorSource<T>: Send + Sync {
    async fn fetch(&self, client: &dyn ProjectClient, project_id: &str) -> Result<Vec<T>>;
}

pub struct JobSource;

#[async_trait]
impl MonitorSource<Job> for JobSource {
    async fn fetch(&self, client: &dyn ProjectClient, project_id: &str) -> Result<Vec<Job>> {
        client.list_jobs(project_id).await
    }
}

pub struct PublicationSource;

#[async_trait]
impl MonitorSource<Publication> for PublicationSource {
    async fn fetch(&self, client: &dyn ProjectClient, project_id: &str) -> Result<Vec<Publication>> {
        client.list_publications(project_id).await
    }
}

/// Polls one project and reports changes as [`MonitorEvent`]s
pub struct ProjectMonitor<T, S> {
    name: String,
    project_id: String,
    client: Arc<dyn ProjectClient>,
    source: S,
    state: Mutex<MonitorState<T>>,
    events: mpsc::UnboundedSender<MonitorEvent<T>>,
}

pub type ProjectJobMonitor = ProjectMonitor<Job, JobSource>;
pub type PublicationMonitor = ProjectMonitor<Publication, PublicationSource>;

impl ProjectJobMonitor {
    pub fn jobs(
        project_id: impl Into<String>,
        client: Arc<dyn ProjectClient>,
    ) -> (Self, mpsc::UnboundedReceiver<MonitorEvent<Job>>) {
        Self::new("job monitor", project_id, client, JobSource)
    }
}

impl PublicationMonitor {
    pub fn publications(
        project_id: impl Into<String>,
        client: Arc<dyn ProjectClient>,
    ) -> (Self, mpsc::UnboundedReceiver<MonitorEvent<Publication>>) {
        Self::new("publication monitor", project_id, client, PublicationSource)
    }
}

impl<T: Monitored, S: MonitorSource<T>> ProjectMonitor<T, S> {
    pub fn new(
        name: impl Into<String>,
        project_id: impl Into<String>,
        client: Arc<dyn ProjectClient>,
        source: S,
    ) -> (Self, mpsc::UnboundedReceiver<MonitorEvent<T>>) {
        let (events, rx) = mpsc::unbounded_channel();
        let monitor = Self {
            name: name.into(),
            project_id: project_id.into(),
            client,
            source,
            state: Mutex::new(MonitorState::default()),
            events,
        };
        (monitor, rx)
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    /// Forget every seen item; the next poll reports all items as added
    pub fn clear(&self) {
        self.state.lock().unwrap_or_else(PoisonError::into_inner).clear();
    }

    /// Poll once and emit the resulting events
    pub async fn poll(&self) {
        let current = match self.source.fetch(self.client.as_ref(), &self.project_id).await {
            Ok(items) => items,
            Err(e) => {
                warn!(monitor = %self.name, project = %self.project_id, "Poll failed: {}", e);
                let _ = self.events.send(MonitorEvent::Failed(e.user_message()));
                return;
            }
        };

        let delta = self.state.lock().unwrap_or_else(PoisonError::into_inner).reconcile(current);
        debug!(
            monitor = %self.name,
            added = delta.added.len(),
            updated = delta.updated.len(),
            "Poll reconciled"
        );

        if !delta.added.is_empty() {
            let _ = self.events.send(MonitorEvent::Added(delta.added));
        }
        for item in delta.updated {
            let _ = self.events.send(MonitorEvent::Updated(item));
        }
    }
}

#[async_trait]
impl<T: Monitored, S: MonitorSource<T> + 'static> PersistentTask for ProjectMonitor<T, S> {
    async fn run(&self) {
        self.poll().await;
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Map};

    fn job(id: &str, state: &str) -> Job {
        Job { id: id.to_string(), state: json!(state), process: json!("simulation"), extra: Map::new() }
    }

    fn publication(id: &str, updated_at: &str) -> Publication {
        Publication {
            id: id.to_string(),
            name: None,
            updated_at: updated_at.to_string(),
            extra: Map::new(),
        }
    }

    #[test]
    fn test_first_poll_reports_everything_as_added() {
        let mut state = MonitorState::default();
        let delta = state.reconcile(vec![job("1", "queued"), job("2", "running")]);
        assert_eq!(delta.added.len(), 2);
        assert!(delta.updated.is_empty());
        assert_eq!(state.len(), 2);
    }

    #[test]
    fn test_only_tracked_fields_count_as_updates() {
        let mut state = MonitorState::default();
        state.reconcile(vec![job("1", "queued")]);

        let mut extra_only = job("1", "queued");
        extra_only.extra.insert("progress".to_string(), json!(50));
        assert_eq!(state.reconcile(vec![extra_only]), PollDelta { added: vec![], updated: vec![] });

        let delta = state.reconcile(vec![job("1", "finished")]);
        assert_eq!(delta.updated, vec![job("1", "finished")]);
    }

    #[test]
    fn test_publications_track_updated_at() {
        let mut state = MonitorState::default();
        state.reconcile(vec![publication("p", "2024-01-01")]);

        assert!(state.reconcile(vec![publication("p", "2024-01-01")]).updated.is_empty());
        assert_eq!(state.reconcile(vec![publication("p", "2024-02-01")]).updated.len(), 1);
    }

    #[test]
    fn test_clear_forgets_seen_items() {
        let mut state = MonitorState::default();
        state.reconcile(vec![job("1", "queued")]);
        state.clear();
        assert!(state.is_empty());
        assert_eq!(state.reconcile(vec![job("1", "queued")]).added.len(), 1);
    }
}
