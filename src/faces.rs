//! ==============================================================================
//! faces.rs - uploaded face-file registry
//! ==============================================================================
//!
//! purpose:
//!     tracks the clock face archives a developer uploads through the web
//!     ui. the simulator does not keep the bytes - only the fact that a
//!     named artifact exists - and tells the connected client by pushing a
//!     fresh faces snapshot shortly after the http call returns.
//!
//! key derivation:
//!     the artifact key is the filename's stem before the first '.'
//!     ("dots.tar.gz" -> "dots"). a filename with no '.' uses the whole
//!     name as its key.
//!
//! relationships:
//!     - called by: server.rs (/upload_face, /delete_face)
//!     - mutates: state.rs (screen 3 face_files)
//!     - broadcasts via: session.rs Broadcaster
//!
//! ==============================================================================

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::protocol;
use crate::session::Broadcaster;
use crate::state::{screens, StateStore};

#[derive(Clone)]
pub struct FaceRegistry {
    store: Arc<RwLock<StateStore>>,
    broadcaster: Broadcaster,
    /// the snapshot push is deferred so the http response is not held
    /// open on the broadcast; it is decoupling, not a correctness need
    broadcast_delay: Duration,
}

/// filename stem before the first '.', or the whole name without one
pub fn artifact_key(filename: &str) -> &str {
    filename.split('.').next().unwrap_or(filename)
}

impl FaceRegistry {
    pub fn new(
        store: Arc<RwLock<StateStore>>,
        broadcaster: Broadcaster,
        broadcast_delay: Duration,
    ) -> Self {
        Self {
            store,
            broadcaster,
            broadcast_delay,
        }
    }

    /// record a successful upload and schedule the faces snapshot push
    pub async fn on_upload(&self, filename: &str) {
        let key = artifact_key(filename);
        {
            let mut store = self.store.write().await;
            store.insert_face(key, filename);
        }
        println!("[FACES] registered {} -> {}", key, filename);
        self.schedule_faces_broadcast();
    }

    /// drop an artifact by key. false leaves the store untouched and the
    /// http caller reports the failure.
    pub async fn on_delete(&self, key: &str) -> bool {
        let removed = {
            let mut store = self.store.write().await;
            store.remove_face(key)
        };
        if removed {
            println!("[FACES] removed {}", key);
            self.schedule_faces_broadcast();
        }
        removed
    }

    #[allow(dead_code)]
    pub async fn is_registered(&self, key: &str) -> bool {
        self.store.read().await.has_face(key)
    }

    fn schedule_faces_broadcast(&self) {
        let registry = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(registry.broadcast_delay).await;
            let frame = {
                let store = registry.store.read().await;
                let Some(fields) = store.fields(screens::FACES) else {
                    return;
                };
                protocol::snapshot_frame("faces", fields)
            };
            if !registry.broadcaster.broadcast(&frame).await {
                println!("[FACES] broadcast dropped (no client)");
            }
        });
    }
}

// ==============================================================================
// tests
// ==============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};
    use tokio::sync::mpsc;
    use tokio::time::timeout;

    async fn registry() -> (FaceRegistry, mpsc::UnboundedReceiver<String>) {
        let store = Arc::new(RwLock::new(StateStore::seeded()));
        let broadcaster = Broadcaster::default();
        let (tx, rx) = mpsc::unbounded_channel();
        broadcaster.install(tx).await;
        let registry = FaceRegistry::new(store, broadcaster, Duration::from_millis(1));
        (registry, rx)
    }

    #[test]
    fn key_is_the_stem_before_the_first_dot() {
        assert_eq!(artifact_key("dots.tar.gz"), "dots");
        assert_eq!(artifact_key("blue_ribbon.tar.gz"), "blue_ribbon");
        // explicit policy: no extension means the whole name is the key
        assert_eq!(artifact_key("plainname"), "plainname");
    }

    #[tokio::test(start_paused = true)]
    async fn upload_registers_and_pushes_one_faces_snapshot() {
        let (registry, mut rx) = registry().await;

        registry.on_upload("sunset.tar.gz").await;
        assert!(registry.is_registered("sunset").await);

        let raw = timeout(Duration::from_secs(1), rx.recv())
            .await
            .expect("deferred broadcast")
            .unwrap();
        let frame: Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(frame["type"], "sv.init.faces");
        assert_eq!(frame["value"]["face_files"]["sunset"], json!("sunset.tar.gz"));

        // exactly one snapshot per upload
        assert!(timeout(Duration::from_secs(1), rx.recv()).await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn delete_of_a_registered_key_removes_and_broadcasts() {
        let (registry, mut rx) = registry().await;

        assert!(registry.on_delete("blue_ribbon").await);
        assert!(!registry.is_registered("blue_ribbon").await);

        let raw = timeout(Duration::from_secs(1), rx.recv())
            .await
            .expect("deferred broadcast")
            .unwrap();
        let frame: Value = serde_json::from_str(&raw).unwrap();
        assert!(frame["value"]["face_files"].get("blue_ribbon").is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn delete_of_an_unknown_key_is_a_silent_no() {
        let (registry, mut rx) = registry().await;

        assert!(!registry.on_delete("never_uploaded").await);
        assert!(registry.is_registered("dots").await, "store untouched");
        assert!(timeout(Duration::from_secs(1), rx.recv()).await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn upload_without_a_client_drops_the_broadcast() {
        // no broadcast target installed at all
        let store = Arc::new(RwLock::new(StateStore::seeded()));
        let registry =
            FaceRegistry::new(store, Broadcaster::default(), Duration::from_millis(1));
        registry.on_upload("lonely.tar.gz").await;
        tokio::time::sleep(Duration::from_millis(5)).await;
        assert!(registry.is_registered("lonely").await);
    }
}
