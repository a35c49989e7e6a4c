//! Registry of open client sessions and the version controlling each.

use std::collections::HashMap;
use tokio::sync::RwLock;

#[derive(Debug, Default)]
pub struct ClientSessions {
    sessions: RwLock<HashMap<String, Option<String>>>,
}

impl ClientSessions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a session. A session that is already known keeps its controller.
    pub async fn open(&self, id: &str) {
        self.sessions.write().await.entry(id.to_string()).or_insert(None);
    }

    pub async fn close(&self, id: &str) -> bool {
        self.sessions.write().await.remove(id).is_some()
    }

    /// Version controlling a session, if any.
    pub async fn controller(&self, id: &str) -> Option<String> {
        self.sessions.read().await.get(id).cloned().flatten()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }

    /// Every session with its controller, ordered by id.
    pub async fn list(&self) -> Vec<(String, Option<String>)> {
        let mut sessions: Vec<_> = self
            .sessions
            .read()
            .await
            .iter()
            .map(|(id, controller)| (id.clone(), controller.clone()))
            .collect();
        sessions.sort();
        sessions
    }

    /// Take control of one open session. Returns false for unknown sessions.
    pub async fn claim_session(&self, id: &str, version: &str) -> bool {
        match self.sessions.write().await.get_mut(id) {
            Some(controller) => {
                *controller = Some(version.to_string());
                true
            }
            None => false,
        }
    }

    /// Take control of every open session for `version`.
    ///
    /// Returns how many sessions changed controller.
    pub async fn claim(&self, version: &str) -> usize {
        let mut sessions = self.sessions.write().await;
        let mut claimed = 0;
        for controller in sessions.values_mut() {
            if controller.as_deref() != Some(version) {
                *controller = Some(version.to_string());
                claimed += 1;
            }
        }
        claimed
    }
}
