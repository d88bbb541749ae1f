//! Client side of the persistence gateway: whole-directory load and save.
//!
//! Saves never reach the caller as errors. They are pushed onto a queue that
//! a single task drains in order, and a failed save is logged and dropped.

use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use http::StatusCode;
use reqwest::Client;
use serde_json::Value;
use tokio::sync::mpsc::{unbounded_channel, UnboundedSender};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};
use tracing_futures::Instrument;

use crate::controller::SaveHook;
use crate::model::{Directory, Snapshot};

pub static USERS_PATH: &str = "api/users";

#[async_trait]
pub trait Store: Send + Sync {
    // Ok(None): nothing usable is stored.
    async fn load(&self) -> Result<Option<Snapshot>>;

    async fn save(&self, snapshot: &Snapshot) -> Result<()>;
}

/// Interpret a load response: a versioned snapshot, or a bare array of users
/// as older stores hold it. Anything else counts as no data.
pub fn decode_snapshot(value: Value) -> Option<Snapshot> {
    match value {
        Value::Array(_) => match serde_json::from_value::<Directory>(value) {
            Ok(users) => Some(Snapshot { version: 0, users }),
            Err(e) => {
                warn!(error = %e, "stored users could not be decoded");
                None
            }
        },
        Value::Object(_) => match serde_json::from_value::<Snapshot>(value) {
            Ok(snapshot) => Some(snapshot),
            Err(e) => {
                warn!(error = %e, "stored snapshot could not be decoded");
                None
            }
        },
        _ => None,
    }
}

pub async fn load_or_empty(store: &dyn Store) -> Snapshot {
    match store.load().await {
        Ok(Some(snapshot)) => snapshot,
        Ok(None) => Snapshot::default(),
        Err(e) => {
            error!(error = ?e, "Error loading users");
            Snapshot::default()
        }
    }
}

pub struct HttpStore {
    client: Client,
    url: String,
}

impl HttpStore {
    pub fn new(client: Client, base_url: &str) -> Self {
        HttpStore {
            client,
            url: format!("{}/{}", base_url.trim_end_matches('/'), USERS_PATH),
        }
    }
}

#[async_trait]
impl Store for HttpStore {
    async fn load(&self) -> Result<Option<Snapshot>> {
        let res = self
            .client
            .get(&self.url)
            .send()
            .await
            .context("Failed to reach the users endpoint")?;

        if !res.status().is_success() {
            return Err(anyhow!("Failed to load users: {}", res.status()));
        }
        let value = res.json::<Value>().await?;
        Ok(decode_snapshot(value))
    }

    async fn save(&self, snapshot: &Snapshot) -> Result<()> {
        let res = self
            .client
            .post(&self.url)
            .json(snapshot)
            .send()
            .await
            .context("Failed to reach the users endpoint")?;

        match res.status() {
            StatusCode::OK => Ok(()),
            StatusCode::CONFLICT => Err(anyhow!(
                "Snapshot version {} is stale, a newer one is stored",
                snapshot.version
            )),
            status => Err(anyhow!("Status code: {}", status)),
        }
    }
}

/// Keeps the snapshot in memory and applies the same version rule as the
/// daemon.
#[derive(Debug, Default)]
pub struct MemoryStore {
    stored: Mutex<Option<Snapshot>>,
}

impl MemoryStore {
    pub fn new(snapshot: Option<Snapshot>) -> Self {
        MemoryStore {
            stored: Mutex::new(snapshot),
        }
    }

    pub fn stored(&self) -> Option<Snapshot> {
        self.stored.lock().ok().and_then(|s| s.clone())
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn load(&self) -> Result<Option<Snapshot>> {
        Ok(self.stored())
    }

    async fn save(&self, snapshot: &Snapshot) -> Result<()> {
        let mut stored = self
            .stored
            .lock()
            .map_err(|_| anyhow!("Memory store lock poisoned"))?;
        if let Some(current) = stored.as_ref() {
            if snapshot.version <= current.version {
                return Err(anyhow!(
                    "Snapshot version {} is stale, a newer one is stored",
                    snapshot.version
                ));
            }
        }
        *stored = Some(snapshot.clone());
        Ok(())
    }
}

/// Single writer for snapshots: saves are issued one at a time in the order
/// they were queued.
pub struct SaveQueue {
    tx: UnboundedSender<Snapshot>,
    handle: JoinHandle<()>,
}

impl SaveQueue {
    pub fn spawn(store: Arc<dyn Store>) -> Self {
        let (tx, mut rx) = unbounded_channel::<Snapshot>();

        let handle = tokio::spawn(
            async move {
                while let Some(snapshot) = rx.recv().await {
                    match store.save(&snapshot).await {
                        Ok(()) => info!(version = snapshot.version, "users saved"),
                        Err(e) => error!(version = snapshot.version, error = ?e, "Error saving users"),
                    }
                }
            }
            .instrument(tracing::info_span!("save_queue")),
        );

        SaveQueue { tx, handle }
    }

    pub async fn close(self) {
        drop(self.tx);
        if let Err(e) = self.handle.await {
            error!(error = %e, "save queue stopped unexpectedly");
        }
    }
}

impl SaveHook for SaveQueue {
    fn schedule(&mut self, snapshot: Snapshot) {
        if self.tx.send(snapshot).is_err() {
            error!("save queue is closed, snapshot dropped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::User;

    fn snapshot(version: u64, name: &str) -> Snapshot {
        let user = User::new(format!("{}-1", name.to_lowercase()), name.into(), "1234".into());
        Snapshot {
            version,
            users: Directory::new(vec![user]),
        }
    }

    #[test]
    fn test_decode_bare_array() {
        let value = serde_json::json!([
            {"id": "ann-1", "name": "Ann", "passcode": "1234", "entries": [], "currentSessionStart": null}
        ]);
        let snapshot = decode_snapshot(value).unwrap();
        assert_eq!(snapshot.version, 0);
        assert_eq!(snapshot.users.get("ann-1").unwrap().name, "Ann");
    }

    #[test]
    fn test_decode_versioned_snapshot() {
        let value = serde_json::to_value(&snapshot(7, "Ann")).unwrap();
        assert_eq!(decode_snapshot(value), Some(snapshot(7, "Ann")));
    }

    #[test]
    fn test_decode_garbage_is_no_data() {
        assert_eq!(decode_snapshot(Value::Null), None);
        assert_eq!(decode_snapshot(serde_json::json!("users")), None);
        assert_eq!(decode_snapshot(serde_json::json!({"success": true})), None);
        assert_eq!(decode_snapshot(serde_json::json!([1, 2, 3])), None);
    }

    #[tokio::test]
    async fn test_memory_store_rejects_stale_versions() -> Result<()> {
        let store = MemoryStore::default();
        store.save(&snapshot(2, "Ann")).await?;

        assert!(store.save(&snapshot(2, "Bob")).await.is_err());
        assert!(store.save(&snapshot(1, "Bob")).await.is_err());
        assert_eq!(store.load().await?, Some(snapshot(2, "Ann")));

        store.save(&snapshot(3, "Bob")).await?;
        assert_eq!(store.load().await?, Some(snapshot(3, "Bob")));

        Ok(())
    }

    #[tokio::test]
    async fn test_queue_writes_in_order() -> Result<()> {
        let store = Arc::new(MemoryStore::default());
        let mut queue = SaveQueue::spawn(store.clone());

        for version in 1..=20 {
            queue.schedule(snapshot(version, "Ann"));
        }
        queue.close().await;

        assert_eq!(store.stored().map(|s| s.version), Some(20));

        Ok(())
    }

    #[tokio::test]
    async fn test_failed_saves_are_swallowed() -> Result<()> {
        let store = Arc::new(MemoryStore::new(Some(snapshot(10, "Ann"))));
        let mut queue = SaveQueue::spawn(store.clone());

        queue.schedule(snapshot(3, "Bob"));
        queue.schedule(snapshot(11, "Cy"));
        queue.close().await;

        assert_eq!(store.stored(), Some(snapshot(11, "Cy")));

        Ok(())
    }

    #[tokio::test]
    async fn test_load_or_empty_without_data() {
        let store = MemoryStore::default();
        assert_eq!(load_or_empty(&store).await, Snapshot::default());
    }

    #[tokio::test]
    async fn test_http_store_unreachable_degrades_to_empty() {
        let store = HttpStore::new(Client::new(), "http://127.0.0.1:9");
        assert_eq!(load_or_empty(&store).await, Snapshot::default());
    }
}
