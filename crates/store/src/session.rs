//! In-memory session store
//!
//! Conversation and disambiguation sessions keyed by (tenant, customer).
//! Storing a disambiguation session supersedes any pending one for the
//! same customer: at most one outstanding question at a time.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;

use order_agent_core::{
    ConversationSession, DisambiguationSession, DisambiguationStatus, SessionStore, StoreError,
};

type Key = (String, String);

#[derive(Default)]
pub struct InMemorySessionStore {
    conversations: RwLock<HashMap<Key, ConversationSession>>,
    disambiguations: RwLock<HashMap<Key, DisambiguationSession>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn get_conversation(
        &self,
        tenant: &str,
        customer: &str,
    ) -> Result<Option<ConversationSession>, StoreError> {
        Ok(self
            .conversations
            .read()
            .get(&(tenant.to_string(), customer.to_string()))
            .cloned())
    }

    async fn put_conversation(&self, session: &ConversationSession) -> Result<(), StoreError> {
        let key = (session.tenant.clone(), session.customer.clone());
        self.conversations.write().insert(key, session.clone());
        Ok(())
    }

    async fn get_pending_disambiguation(
        &self,
        tenant: &str,
        customer: &str,
    ) -> Result<Option<DisambiguationSession>, StoreError> {
        Ok(self
            .disambiguations
            .read()
            .get(&(tenant.to_string(), customer.to_string()))
            .filter(|s| s.is_pending())
            .cloned())
    }

    async fn put_disambiguation(&self, session: &DisambiguationSession) -> Result<(), StoreError> {
        let key = (session.tenant.clone(), session.customer.clone());
        let mut sessions = self.disambiguations.write();
        if let Some(previous) = sessions.get(&key) {
            if previous.is_pending() {
                tracing::debug!(
                    tenant = %session.tenant,
                    customer = %session.customer,
                    "superseding pending disambiguation session"
                );
            }
        }
        sessions.insert(key, session.clone());
        Ok(())
    }

    async fn close_disambiguation(
        &self,
        tenant: &str,
        customer: &str,
        status: DisambiguationStatus,
    ) -> Result<(), StoreError> {
        let key = (tenant.to_string(), customer.to_string());
        if let Some(session) = self.disambiguations.write().get_mut(&key) {
            session.status = status;
        }
        Ok(())
    }
}
