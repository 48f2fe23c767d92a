//! Persistence traits
//!
//! All session/order state is read-modify-write against a store, never
//! cached indefinitely in process memory. Order updates are versioned:
//! a write with a stale version fails with `VersionConflict`.

use async_trait::async_trait;

use crate::catalog::Product;
use crate::error::StoreError;
use crate::order::Order;
use crate::session::{ConversationSession, DisambiguationSession};

/// Tenant product catalog. An empty product list means "no catalog
/// enforcement for this tenant", not an error.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn list_products(&self, tenant: &str) -> Result<Vec<Product>, StoreError>;
}

/// Order persistence plus the idempotent inbound-event insert
#[async_trait]
pub trait OrderStore: Send + Sync {
    async fn create(&self, order: &Order) -> Result<(), StoreError>;

    async fn get(&self, tenant: &str, order_id: &str) -> Result<Option<Order>, StoreError>;

    /// Most recently active order for a customer, any status.
    async fn find_last_for_customer(
        &self,
        tenant: &str,
        source_identity: &str,
    ) -> Result<Option<Order>, StoreError>;

    /// Compare-and-swap update: succeeds only if the stored version equals
    /// `order.version`, then bumps it.
    async fn update(&self, order: &Order) -> Result<Order, StoreError>;

    /// Has this inbound-event fingerprint already been recorded?
    async fn seen_fingerprint(&self, fingerprint: &str) -> Result<bool, StoreError>;

    /// Idempotent insert of an inbound-event fingerprint. Returns `true`
    /// if this is the first time the fingerprint was seen.
    async fn insert_fingerprint(&self, fingerprint: &str) -> Result<bool, StoreError>;
}

/// Conversation and disambiguation session persistence,
/// keyed by (tenant, customer)
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn get_conversation(
        &self,
        tenant: &str,
        customer: &str,
    ) -> Result<Option<ConversationSession>, StoreError>;

    async fn put_conversation(&self, session: &ConversationSession) -> Result<(), StoreError>;

    /// The pending disambiguation session for a customer, if any.
    async fn get_pending_disambiguation(
        &self,
        tenant: &str,
        customer: &str,
    ) -> Result<Option<DisambiguationSession>, StoreError>;

    /// Store a disambiguation session, superseding any other pending one
    /// for the same (tenant, customer).
    async fn put_disambiguation(&self, session: &DisambiguationSession) -> Result<(), StoreError>;

    /// Mark the customer's pending session resolved/expired.
    async fn close_disambiguation(
        &self,
        tenant: &str,
        customer: &str,
        status: crate::session::DisambiguationStatus,
    ) -> Result<(), StoreError>;
}
