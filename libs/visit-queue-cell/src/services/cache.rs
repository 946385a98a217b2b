use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{broadcast, RwLock};
use tracing::{debug, info, warn};

use shared_database::RestClient;

use crate::error::VisitQueueError;
use crate::models::{QueueEntry, RemoteVisitQueueEntry, ResultsPage};

/// Collection key for "all active visit queue entries".
pub const ACTIVE_QUEUE_ENTRIES_KEY: &str = "/ws/rest/v1/visit-queue-entry?v=full";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CacheEvent {
    Invalidated { key: String, generation: u64 },
    Refreshed { key: String, entries: usize },
    RefreshFailed { key: String, message: String },
}

/// Holds the shared list of active queue entries.
///
/// Nothing mutates the list directly: readers fetch on a miss and writers call
/// [`ActiveEntriesCache::invalidate`], which drops the list, publishes a
/// [`CacheEvent`] and refetches.
pub struct ActiveEntriesCache {
    client: Arc<RestClient>,
    entries: RwLock<Option<Vec<QueueEntry>>>,
    generation: AtomicU64,
    sender: broadcast::Sender<CacheEvent>,
}

impl ActiveEntriesCache {
    pub fn new(client: Arc<RestClient>) -> Self {
        let (sender, _) = broadcast::channel(100);

        Self {
            client,
            entries: RwLock::new(None),
            generation: AtomicU64::new(0),
            sender,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CacheEvent> {
        self.sender.subscribe()
    }

    /// How many times the active-entries key has been invalidated.
    pub fn invalidation_count(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    pub async fn active_entries(&self, auth_token: &str) -> Result<Vec<QueueEntry>, VisitQueueError> {
        if let Some(entries) = self.entries.read().await.as_ref() {
            debug!("Serving {} active queue entries from cache", entries.len());
            return Ok(entries.clone());
        }

        let generation = self.invalidation_count();
        let entries = self
            .fetch(auth_token)
            .await
            .map_err(|e| VisitQueueError::LookupError(e.message().to_string()))?;

        self.store(generation, entries.clone()).await;
        Ok(entries)
    }

    /// Drops the cached collection for `key` and revalidates it.
    ///
    /// A failed refetch is returned as [`VisitQueueError::CacheRefreshError`];
    /// the invalidation itself has already happened by then.
    pub async fn invalidate(&self, key: &str, auth_token: &str) -> Result<usize, VisitQueueError> {
        if key != ACTIVE_QUEUE_ENTRIES_KEY {
            debug!("Ignoring invalidation of unknown key {}", key);
            return Ok(0);
        }

        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        *self.entries.write().await = None;
        self.publish(CacheEvent::Invalidated { key: key.to_string(), generation });

        match self.fetch(auth_token).await {
            Ok(entries) => {
                let count = entries.len();
                self.store(generation, entries).await;
                self.publish(CacheEvent::Refreshed { key: key.to_string(), entries: count });
                info!("Active queue entries revalidated ({} entries)", count);
                Ok(count)
            }
            Err(err) => {
                warn!("Failed to revalidate active queue entries: {}", err);
                self.publish(CacheEvent::RefreshFailed {
                    key: key.to_string(),
                    message: err.message().to_string(),
                });
                Err(VisitQueueError::CacheRefreshError(err.message().to_string()))
            }
        }
    }

    async fn fetch(&self, auth_token: &str) -> Result<Vec<QueueEntry>, VisitQueueError> {
        let page: ResultsPage<RemoteVisitQueueEntry> = self
            .client
            .get(ACTIVE_QUEUE_ENTRIES_KEY, Some(auth_token))
            .await
            .map_err(|e| VisitQueueError::RemoteError(e.to_string()))?;

        Ok(page.results.into_iter().map(QueueEntry::from).collect())
    }

    // A fetch that started before a newer invalidation must not overwrite it.
    async fn store(&self, generation: u64, entries: Vec<QueueEntry>) {
        let mut slot = self.entries.write().await;
        if self.invalidation_count() == generation {
            *slot = Some(entries);
        } else {
            debug!("Discarding stale active entries from generation {}", generation);
        }
    }

    fn publish(&self, event: CacheEvent) {
        // No subscribers is fine.
        let _ = self.sender.send(event);
    }
}
