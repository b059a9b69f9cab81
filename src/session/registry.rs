use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

use super::session::Session;

/// A registered session. Only the poll loop thread ever locks it to mutate.
pub type SharedSession = Arc<Mutex<Session>>;

/// Active sessions keyed by stream ID
///
/// The registry owns session lifetime: a session is dropped once its entry is
/// gone and the poll loop has finished with it. Entries are inserted only by
/// the poll loop; the webhook router and the poll loop may both remove them.
/// Cheap to clone; all clones share the same map.
#[derive(Clone, Default)]
pub struct SessionRegistry {
    /// Active sessions (stream_id → session)
    sessions: Arc<RwLock<HashMap<String, SharedSession>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a session, returning whatever was previously stored under the same ID
    pub async fn put(&self, stream_id: impl Into<String>, session: SharedSession) -> Option<SharedSession> {
        let mut sessions = self.sessions.write().await;
        sessions.insert(stream_id.into(), session)
    }

    pub async fn get(&self, stream_id: &str) -> Option<SharedSession> {
        let sessions = self.sessions.read().await;
        sessions.get(stream_id).cloned()
    }

    pub async fn remove(&self, stream_id: &str) -> Option<SharedSession> {
        let mut sessions = self.sessions.write().await;
        sessions.remove(stream_id)
    }

    /// Remove the entry only if it still refers to `session`
    ///
    /// A stream can be stopped and started again between two ticks; the poll
    /// loop must not evict the newer session when the older one closes.
    pub async fn remove_if_same(&self, stream_id: &str, session: &SharedSession) -> bool {
        let mut sessions = self.sessions.write().await;
        match sessions.get(stream_id) {
            Some(current) if Arc::ptr_eq(current, session) => {
                sessions.remove(stream_id);
                true
            }
            _ => false,
        }
    }

    pub async fn contains(&self, stream_id: &str) -> bool {
        let sessions = self.sessions.read().await;
        sessions.contains_key(stream_id)
    }

    /// Copy of all entries at this instant; later mutations do not affect it
    pub async fn snapshot(&self) -> Vec<(String, SharedSession)> {
        let sessions = self.sessions.read().await;
        sessions
            .iter()
            .map(|(id, session)| (id.clone(), Arc::clone(session)))
            .collect()
    }

    pub async fn stream_ids(&self) -> Vec<String> {
        let sessions = self.sessions.read().await;
        sessions.keys().cloned().collect()
    }

    /// Remove and return every entry
    pub async fn drain(&self) -> Vec<(String, SharedSession)> {
        let mut sessions = self.sessions.write().await;
        sessions.drain().collect()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{DesignatedThread, JoinRequest};
    use crate::testing::MockFactory;

    async fn session(stream_id: &str) -> SharedSession {
        let thread = DesignatedThread::claim();
        let request = JoinRequest {
            stream_id: stream_id.to_string(),
            meeting_uuid: "meeting".to_string(),
            server_urls: "wss://rtms.example.com".to_string(),
            signature: "sig".to_string(),
        };
        let transport = MockFactory::default().transport(stream_id);
        Arc::new(Mutex::new(Session::new(request, transport, &thread)))
    }

    #[tokio::test]
    async fn test_put_get_remove() {
        let registry = SessionRegistry::new();
        assert!(registry.is_empty().await);

        registry.put("s1", session("s1").await).await;
        assert!(registry.contains("s1").await);
        assert_eq!(registry.len().await, 1);

        let found = registry.get("s1").await.unwrap();
        assert_eq!(found.lock().await.stream_id(), "s1");

        assert!(registry.remove("s1").await.is_some());
        assert!(registry.get("s1").await.is_none());
        assert!(registry.remove("s1").await.is_none());
    }

    #[tokio::test]
    async fn test_put_replaces_existing_entry() {
        let registry = SessionRegistry::new();
        let first = session("s1").await;
        let second = session("s1").await;

        assert!(registry.put("s1", Arc::clone(&first)).await.is_none());
        let previous = registry.put("s1", Arc::clone(&second)).await.unwrap();

        assert!(Arc::ptr_eq(&previous, &first));
        assert_eq!(registry.len().await, 1);
    }

    #[tokio::test]
    async fn test_remove_if_same_ignores_newer_session() {
        let registry = SessionRegistry::new();
        let old = session("s1").await;
        let new = session("s1").await;

        registry.put("s1", Arc::clone(&new)).await;
        assert!(!registry.remove_if_same("s1", &old).await);
        assert!(registry.contains("s1").await);

        assert!(registry.remove_if_same("s1", &new).await);
        assert!(!registry.contains("s1").await);
    }

    #[tokio::test]
    async fn test_snapshot_is_detached_from_later_changes() {
        let registry = SessionRegistry::new();
        registry.put("s1", session("s1").await).await;
        registry.put("s2", session("s2").await).await;

        let snapshot = registry.snapshot().await;
        registry.remove("s1").await;

        assert_eq!(snapshot.len(), 2);
        assert_eq!(registry.stream_ids().await, vec!["s2".to_string()]);
    }

    #[tokio::test]
    async fn test_drain_empties_registry() {
        let registry = SessionRegistry::new();
        registry.put("s1", session("s1").await).await;
        registry.put("s2", session("s2").await).await;

        let mut drained: Vec<String> = registry.drain().await.into_iter().map(|(id, _)| id).collect();
        drained.sort();

        assert_eq!(drained, vec!["s1", "s2"]);
        assert!(registry.is_empty().await);
    }
}
