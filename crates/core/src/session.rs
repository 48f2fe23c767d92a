//! Conversation and disambiguation session types
//!
//! Both are keyed by (tenant, customer) and persisted through the
//! session store; stage transitions are the only legal mutation path
//! for the conversation stage.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::modifier::ModifierPayload;

/// Phase of the order lifecycle for one customer conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ConversationStage {
    /// No active order
    #[default]
    Idle,
    /// An order is being built from inbound messages
    BuildingOrder,
    /// A clarification question is outstanding
    AwaitingClarification,
    /// Items settled, waiting for a delivery address
    AwaitingAddress,
    /// Order finalized
    PostOrder,
}

impl ConversationStage {
    /// Allowed transitions from the current stage.
    ///
    /// `Idle` is reachable from everywhere: an explicit start-new command
    /// force-closes the active order and resets the conversation.
    pub fn allowed_transitions(&self) -> Vec<ConversationStage> {
        match self {
            ConversationStage::Idle => vec![ConversationStage::BuildingOrder],
            ConversationStage::BuildingOrder => vec![
                ConversationStage::AwaitingClarification,
                ConversationStage::AwaitingAddress,
                ConversationStage::PostOrder,
            ],
            ConversationStage::AwaitingClarification => vec![
                ConversationStage::BuildingOrder,
                ConversationStage::AwaitingAddress,
            ],
            ConversationStage::AwaitingAddress => vec![
                ConversationStage::BuildingOrder,
                ConversationStage::PostOrder,
            ],
            ConversationStage::PostOrder => vec![ConversationStage::BuildingOrder],
        }
    }

    pub fn can_transition_to(&self, target: ConversationStage) -> bool {
        target == ConversationStage::Idle
            || *self == target
            || self.allowed_transitions().contains(&target)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ConversationStage::Idle => "idle",
            ConversationStage::BuildingOrder => "building_order",
            ConversationStage::AwaitingClarification => "awaiting_clarification",
            ConversationStage::AwaitingAddress => "awaiting_address",
            ConversationStage::PostOrder => "post_order",
        }
    }
}

impl std::fmt::Display for ConversationStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Per-customer conversation state, created lazily on first inbound message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationSession {
    pub tenant: String,
    pub customer: String,
    pub stage: ConversationStage,
    /// Order currently being built/clarified
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active_order_id: Option<String>,
    /// Free-text audit tag for the last transition
    pub last_action: String,
    pub updated_at: DateTime<Utc>,
}

impl ConversationSession {
    pub fn new(tenant: impl Into<String>, customer: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            tenant: tenant.into(),
            customer: customer.into(),
            stage: ConversationStage::Idle,
            active_order_id: None,
            last_action: "created".to_string(),
            updated_at: now,
        }
    }

    /// The only legal stage mutation path. Transitioning to `Idle` also
    /// drops the active order pointer.
    pub fn transition(
        &mut self,
        target: ConversationStage,
        action: &str,
        now: DateTime<Utc>,
    ) -> Result<(), CoreError> {
        if !self.stage.can_transition_to(target) {
            return Err(CoreError::IllegalTransition {
                from: self.stage.as_str(),
                to: target.as_str(),
            });
        }
        self.stage = target;
        self.last_action = action.to_string();
        self.updated_at = now;
        if target == ConversationStage::Idle {
            self.active_order_id = None;
        }
        Ok(())
    }

    pub fn set_active_order(&mut self, order_id: impl Into<String>) {
        self.active_order_id = Some(order_id.into());
    }
}

/// Status of a disambiguation session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisambiguationStatus {
    Pending,
    Resolved,
    Expired,
}

/// What the outstanding question is about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisambiguationPurpose {
    /// Which line item should a modifier apply to
    ModifierTarget,
    /// Which catalog variant did the customer mean
    CatalogVariant,
}

/// A pending clarification question, at most one per (tenant, customer)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisambiguationSession {
    pub tenant: String,
    pub customer: String,
    pub order_id: String,
    pub purpose: DisambiguationPurpose,
    /// Line-item positions the question refers to, in original item order
    pub candidate_indexes: Vec<usize>,
    /// Human-readable labels, parallel to `candidate_indexes`
    pub options: Vec<String>,
    /// The literal modifier that triggered the question, replayed on
    /// resolution (absent for catalog-variant questions)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modifier: Option<ModifierPayload>,
    pub status: DisambiguationStatus,
    pub created_at: DateTime<Utc>,
}

impl DisambiguationSession {
    pub fn is_pending(&self) -> bool {
        self.status == DisambiguationStatus::Pending
    }

    pub fn expired(&self, now: DateTime<Utc>, expiry_minutes: i64) -> bool {
        now.signed_duration_since(self.created_at).num_minutes() >= expiry_minutes
    }
}
