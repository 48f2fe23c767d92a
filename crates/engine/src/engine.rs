//! Ingest orchestrator
//!
//! One entry point per inbound message. The flow is: serialize per
//! customer, dedupe, settle any pending clarification, classify, then
//! route to the order / modifier / cancel / address handler. Every
//! store mutation happens under the customer lock and goes through the
//! versioned order update.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use order_agent_catalog::{ReconcileGate, ReconcileOutcome, VariantClarification};
use order_agent_config::EngineSettings;
use order_agent_core::{
    dedupe, ApplyStatus, CatalogStore, Classification, Classifier, ConversationSession,
    ConversationStage, DisambiguationPurpose, DisambiguationSession, DisambiguationStatus,
    IngestResult, IntentCategory, LineItem, MatchType, Order, OrderExtractor, OrderStatus,
    OrderStore, Product, SessionStore, SkipReason,
};
use order_agent_nlu::{parse_modifier, GatedClassifier, OrderParser};

use crate::disambiguation;
use crate::linking::{self, LinkAction, LinkDecision, LinkReason};
use crate::locks::CustomerLocks;
use crate::modifier::ModifierEngine;
use crate::EngineError;

const REPLY_ASK_ADDRESS: &str = "Got it! Where should we deliver this order?";
const REPLY_ADDRESS_SAVED: &str = "Thanks, your order is confirmed.";

/// One inbound customer message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundMessage {
    pub tenant: String,
    /// Opaque customer key (phone-derived)
    pub customer: String,
    /// Channel-assigned message id, part of the dedupe key
    pub message_id: String,
    pub text: String,
    pub at: DateTime<Utc>,
    /// Pin any parsed items to this order, bypassing the linking
    /// decision. A closed or unknown id makes the message a no-op.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub forced_order_id: Option<String>,
}

pub struct OrderAgent {
    settings: EngineSettings,
    classifier: GatedClassifier,
    parser: OrderParser,
    gate: ReconcileGate,
    modifiers: ModifierEngine,
    catalog: Arc<dyn CatalogStore>,
    orders: Arc<dyn OrderStore>,
    sessions: Arc<dyn SessionStore>,
    locks: CustomerLocks,
}

impl OrderAgent {
    /// Deterministic-only agent: rule classifier and line parser, no
    /// model collaborators wired.
    pub fn new(
        settings: EngineSettings,
        catalog: Arc<dyn CatalogStore>,
        orders: Arc<dyn OrderStore>,
        sessions: Arc<dyn SessionStore>,
    ) -> Self {
        Self::with_nlu(settings, catalog, orders, sessions, None, None)
    }

    pub fn with_nlu(
        settings: EngineSettings,
        catalog: Arc<dyn CatalogStore>,
        orders: Arc<dyn OrderStore>,
        sessions: Arc<dyn SessionStore>,
        model_classifier: Option<Arc<dyn Classifier>>,
        extractor: Option<Arc<dyn OrderExtractor>>,
    ) -> Self {
        let classifier =
            GatedClassifier::new(model_classifier, settings.classifier.confidence_floor);
        let parser = OrderParser::new(extractor);
        let gate = ReconcileGate::new(settings.matcher.clone());
        Self {
            settings,
            classifier,
            parser,
            gate,
            modifiers: ModifierEngine::new(),
            catalog,
            orders,
            sessions,
            locks: CustomerLocks::new(),
        }
    }

    /// Process one inbound message and decide what (if anything) changes.
    ///
    /// The dedupe fingerprint is recorded only after the message is fully
    /// processed: a failed run leaves it unrecorded, so the channel can
    /// redeliver the event and get a clean retry instead of a
    /// `DuplicateMessage` swallow.
    pub async fn ingest(&self, msg: &InboundMessage) -> Result<IngestResult, EngineError> {
        let fp = dedupe::fingerprint(&msg.tenant, &msg.customer, &msg.message_id, &msg.text, msg.at);
        let _guard = self.locks.acquire(&msg.tenant, &msg.customer).await;
        if self.orders.seen_fingerprint(&fp).await? {
            debug!(tenant = %msg.tenant, customer = %msg.customer, "duplicate inbound event");
            return Ok(IngestResult::None {
                reason: SkipReason::DuplicateMessage,
            });
        }

        let result = self.route(msg).await?;
        self.orders.insert_fingerprint(&fp).await?;
        Ok(result)
    }

    /// Classification and routing for one deduplicated message; runs
    /// under the customer lock.
    async fn route(&self, msg: &InboundMessage) -> Result<IngestResult, EngineError> {
        let now = msg.at;

        let mut session = match self
            .sessions
            .get_conversation(&msg.tenant, &msg.customer)
            .await?
        {
            Some(session) => session,
            None => ConversationSession::new(&msg.tenant, &msg.customer, now),
        };

        // A pending clarification question intercepts the message before
        // classification, unless the customer clearly moved on.
        let mut classification: Option<Classification> = None;
        if let Some(pending) = self
            .sessions
            .get_pending_disambiguation(&msg.tenant, &msg.customer)
            .await?
        {
            if pending.expired(now, self.settings.disambiguation.expiry_minutes) {
                info!(order_id = %pending.order_id, "pending clarification expired");
                self.sessions
                    .close_disambiguation(&msg.tenant, &msg.customer, DisambiguationStatus::Expired)
                    .await?;
            } else if let Some(pos) = disambiguation::resolve_reply(&msg.text, &pending.options) {
                return self.resolve_pending(&mut session, pending, pos, now).await;
            } else {
                let c = self.classifier.classify(&msg.text).await;
                match c.category {
                    // Order-level commands supersede the open question.
                    IntentCategory::Cancel | IntentCategory::StartNew => {
                        self.sessions
                            .close_disambiguation(
                                &msg.tenant,
                                &msg.customer,
                                DisambiguationStatus::Expired,
                            )
                            .await?;
                        classification = Some(c);
                    }
                    _ => return self.reask_pending(&mut session, pending, now).await,
                }
            }
        }

        let classification = match classification {
            Some(c) => c,
            None => self.classifier.classify(&msg.text).await,
        };
        debug!(
            category = %classification.category,
            confidence = classification.confidence,
            "inbound message classified"
        );

        // Waiting for an address: anything that is not an order-level
        // command or more items is taken as the address text.
        if session.stage == ConversationStage::AwaitingAddress {
            match classification.category {
                IntentCategory::Cancel => return self.handle_cancel(&mut session, msg, now).await,
                IntentCategory::StartNew => {
                    return self.handle_start_new(&mut session, msg, now).await
                }
                IntentCategory::Order => {
                    session.transition(ConversationStage::BuildingOrder, "more_items", now)?;
                }
                _ => return self.capture_address(&mut session, msg, now).await,
            }
        }

        match classification.category {
            IntentCategory::Greeting => Ok(IngestResult::None {
                reason: SkipReason::Greeting,
            }),
            IntentCategory::StartNew => self.handle_start_new(&mut session, msg, now).await,
            IntentCategory::Cancel => self.handle_cancel(&mut session, msg, now).await,
            IntentCategory::Modify => self.handle_modifier(&mut session, msg, now).await,
            IntentCategory::Question => Ok(IngestResult::Inquiry {
                topic: "question".to_string(),
                reply: None,
            }),
            // Address-looking text only counts as an address while we
            // are waiting for one; here it is just chatter.
            IntentCategory::Address => Ok(IngestResult::None {
                reason: SkipReason::Smalltalk,
            }),
            IntentCategory::Order => self.handle_order(&mut session, msg, now, None).await,
            IntentCategory::Unknown
                if classification.hints.list_shape || classification.hints.has_quantity =>
            {
                self.handle_order(&mut session, msg, now, None).await
            }
            IntentCategory::Other => Ok(IngestResult::None {
                reason: SkipReason::Smalltalk,
            }),
            IntentCategory::Unknown => Ok(IngestResult::None {
                reason: SkipReason::NothingParsed,
            }),
        }
    }

    /// Reprocess an edited message: reparse and wholesale-replace the
    /// open order's items. The only path that bypasses the modifier
    /// engine for item mutation.
    pub async fn ingest_edit(&self, msg: &InboundMessage) -> Result<IngestResult, EngineError> {
        let _guard = self.locks.acquire(&msg.tenant, &msg.customer).await;
        let now = msg.at;

        let mut session = match self
            .sessions
            .get_conversation(&msg.tenant, &msg.customer)
            .await?
        {
            Some(session) => session,
            None => ConversationSession::new(&msg.tenant, &msg.customer, now),
        };

        let Some(mut order) = self.open_order(&session, msg).await? else {
            return Ok(IngestResult::None {
                reason: SkipReason::NoActiveOrder,
            });
        };

        let products = self.catalog.list_products(&msg.tenant).await?;
        let parsed = self.parser.parse(&msg.text, &products).await;
        if !parsed.usable() {
            return Ok(IngestResult::None {
                reason: SkipReason::NothingParsed,
            });
        }

        let (items, unmatched, clarifications) = match self.gate.reconcile(parsed.items, &products)
        {
            ReconcileOutcome::NoCatalog { items } => (items, Vec::new(), Vec::new()),
            ReconcileOutcome::AllUnmatched { items } => {
                return Ok(self.catalog_miss_inquiry(&items));
            }
            ReconcileOutcome::Partitioned {
                matched,
                unmatched,
                clarifications,
            } => (matched, unmatched, clarifications),
        };

        order.replace_items(items);
        order.push_link_reason(LinkReason::EditedLastMessage.as_str());
        if !unmatched.is_empty() {
            order.push_link_reason(&unmatched_note(&unmatched));
        }
        order.touch_inbound(now);
        let order = self.orders.update(&order).await?;

        let reply = self
            .open_variant_question(&mut session, &order, 0, &clarifications, now)
            .await?;
        session.set_active_order(&order.id);
        if session.stage == ConversationStage::Idle {
            session.transition(ConversationStage::BuildingOrder, "message_edited", now)?;
        }
        self.sessions.put_conversation(&session).await?;

        info!(order_id = %order.id, items = order.items.len(), "order rebuilt from edit");
        Ok(IngestResult::Order {
            order_id: order.id.clone(),
            items: order.items,
            link_reason: order.link_reason,
            reply,
        })
    }

    // --- intent handlers -------------------------------------------------

    async fn handle_order(
        &self,
        session: &mut ConversationSession,
        msg: &InboundMessage,
        now: DateTime<Utc>,
        forced_reason: Option<LinkReason>,
    ) -> Result<IngestResult, EngineError> {
        let products = self.catalog.list_products(&msg.tenant).await?;
        let parsed = self.parser.parse(&msg.text, &products).await;
        if !parsed.usable() {
            return Ok(IngestResult::None {
                reason: SkipReason::NothingParsed,
            });
        }
        debug!(
            items = parsed.items.len(),
            source = parsed.source.as_str(),
            "order text parsed"
        );

        let (matched, unmatched, clarifications) = match self.gate.reconcile(parsed.items, &products)
        {
            ReconcileOutcome::NoCatalog { items } => (items, Vec::new(), Vec::new()),
            ReconcileOutcome::AllUnmatched { items } => {
                // No phantom orders from text the shop cannot fulfill.
                return Ok(self.catalog_miss_inquiry(&items));
            }
            ReconcileOutcome::Partitioned {
                matched,
                unmatched,
                clarifications,
            } => (matched, unmatched, clarifications),
        };

        // A caller-pinned order id wins over the linking heuristics; an
        // id pointing at a closed or unknown order drops the message.
        let (last, decision) = if let Some(ref id) = msg.forced_order_id {
            let Some(target) = self
                .orders
                .get(&msg.tenant, id)
                .await?
                .filter(|o| !o.status.is_closed())
            else {
                warn!(order_id = %id, "pinned order is gone or closed");
                return Ok(IngestResult::None {
                    reason: SkipReason::StaleSession,
                });
            };
            let decision = LinkDecision {
                action: LinkAction::Append,
                reason: LinkReason::ForcedLink,
            };
            (Some(target), decision)
        } else {
            let last = self
                .orders
                .find_last_for_customer(&msg.tenant, &msg.customer)
                .await?;
            let decision = match forced_reason {
                Some(reason) => LinkDecision {
                    action: LinkAction::New,
                    reason,
                },
                None => linking::decide(
                    last.as_ref(),
                    &msg.text,
                    now,
                    self.settings.linking.merge_window_minutes,
                ),
            };
            (last, decision)
        };
        info!(
            action = ?decision.action,
            reason = decision.reason.as_str(),
            "linking decision"
        );

        let (mut order, created) = match (decision.action, last) {
            (LinkAction::Append, Some(mut existing)) => {
                existing.push_link_reason(decision.reason.as_str());
                (existing, false)
            }
            _ => {
                let mut fresh = Order::new(&msg.tenant, &msg.customer, now);
                fresh.push_link_reason(decision.reason.as_str());
                (fresh, true)
            }
        };

        let append_offset = order.items.len();
        order.append_items(matched);
        if !unmatched.is_empty() {
            order.push_link_reason(&unmatched_note(&unmatched));
        }
        order.touch_inbound(now);

        let order = if created {
            self.orders.create(&order).await?;
            order
        } else {
            self.orders.update(&order).await?
        };

        session.set_active_order(&order.id);
        if session.stage != ConversationStage::BuildingOrder {
            session.transition(ConversationStage::BuildingOrder, "order_items_added", now)?;
        }

        let mut reply = self
            .open_variant_question(session, &order, append_offset, &clarifications, now)
            .await?;
        if reply.is_none() {
            if !unmatched.is_empty() {
                reply = Some(format!(
                    "Added what we could. Not on the menu: {}.",
                    item_names(&unmatched)
                ));
            }
            if self.settings.address.required && order.delivery_address.is_none() {
                session.transition(ConversationStage::AwaitingAddress, "address_requested", now)?;
                reply = Some(match reply {
                    Some(prefix) => format!("{prefix} {REPLY_ASK_ADDRESS}"),
                    None => REPLY_ASK_ADDRESS.to_string(),
                });
            }
        }
        self.sessions.put_conversation(session).await?;

        Ok(IngestResult::Order {
            order_id: order.id.clone(),
            items: order.items,
            link_reason: order.link_reason,
            reply,
        })
    }

    async fn handle_modifier(
        &self,
        session: &mut ConversationSession,
        msg: &InboundMessage,
        now: DateTime<Utc>,
    ) -> Result<IngestResult, EngineError> {
        let Some(mut order) = self.open_order(session, msg).await? else {
            return Ok(IngestResult::None {
                reason: SkipReason::NoActiveOrder,
            });
        };

        let payload = parse_modifier(&msg.text);
        debug!(change = %payload.describe(), "modifier parsed");
        let outcome = self.modifiers.apply(&order.items, &payload);

        match outcome.status {
            ApplyStatus::Applied => {
                order.items = outcome.items;
                order.push_link_reason(&format!("modifier_{}", payload.change.kind()));
                order.touch_inbound(now);
                let order = self.orders.update(&order).await?;

                session.set_active_order(&order.id);
                if session.stage != ConversationStage::BuildingOrder {
                    session.transition(ConversationStage::BuildingOrder, "modifier_applied", now)?;
                }
                self.sessions.put_conversation(session).await?;

                info!(order_id = %order.id, summary = %outcome.summary, "modifier applied");
                Ok(IngestResult::Modifier {
                    order_id: order.id,
                    status: ApplyStatus::Applied,
                    summary: outcome.summary,
                    items: order.items,
                    candidates: None,
                })
            }
            ApplyStatus::Ambiguous => {
                let candidates = outcome.candidates.unwrap_or_default();
                let pending = disambiguation::modifier_session(
                    &msg.tenant,
                    &msg.customer,
                    &order.id,
                    &candidates,
                    payload,
                    now,
                );
                self.sessions.put_disambiguation(&pending).await?;
                session.set_active_order(&order.id);
                if session.stage != ConversationStage::BuildingOrder
                    && session.stage != ConversationStage::AwaitingClarification
                {
                    session.transition(ConversationStage::BuildingOrder, "modifier_pending", now)?;
                }
                session.transition(
                    ConversationStage::AwaitingClarification,
                    "modifier_ambiguous",
                    now,
                )?;
                self.sessions.put_conversation(session).await?;

                Ok(IngestResult::Modifier {
                    order_id: order.id,
                    status: ApplyStatus::Ambiguous,
                    summary: disambiguation::question_text(&pending),
                    items: order.items,
                    candidates: Some(candidates),
                })
            }
            // NoMatch and Noop decide to do nothing; no store write.
            status => Ok(IngestResult::Modifier {
                order_id: order.id.clone(),
                status,
                summary: outcome.summary,
                items: order.items,
                candidates: None,
            }),
        }
    }

    async fn handle_cancel(
        &self,
        session: &mut ConversationSession,
        msg: &InboundMessage,
        now: DateTime<Utc>,
    ) -> Result<IngestResult, EngineError> {
        let Some(mut order) = self.open_order(session, msg).await? else {
            return Ok(IngestResult::None {
                reason: SkipReason::NoActiveOrder,
            });
        };

        order.status = OrderStatus::CancelledByCustomer;
        order.push_link_reason("cancelled_by_customer");
        order.touch_inbound(now);
        self.orders.update(&order).await?;

        self.sessions
            .close_disambiguation(&msg.tenant, &msg.customer, DisambiguationStatus::Expired)
            .await?;
        session.transition(ConversationStage::Idle, "cancelled", now)?;
        self.sessions.put_conversation(session).await?;

        info!(order_id = %order.id, "order cancelled by customer");
        Ok(IngestResult::None {
            reason: SkipReason::Cancelled,
        })
    }

    /// Explicit start-new: archive the open order, reset the session,
    /// then treat any items in the same message as a fresh order.
    async fn handle_start_new(
        &self,
        session: &mut ConversationSession,
        msg: &InboundMessage,
        now: DateTime<Utc>,
    ) -> Result<IngestResult, EngineError> {
        if let Some(mut order) = self.open_order(session, msg).await? {
            order.status = OrderStatus::ArchivedForNew;
            order.push_link_reason("archived_for_new");
            order.touch_inbound(now);
            self.orders.update(&order).await?;
            info!(order_id = %order.id, "order archived for a new one");
        }
        self.sessions
            .close_disambiguation(&msg.tenant, &msg.customer, DisambiguationStatus::Expired)
            .await?;
        session.transition(ConversationStage::Idle, "start_new", now)?;
        self.sessions.put_conversation(session).await?;

        let result = self
            .handle_order(session, msg, now, Some(LinkReason::ExplicitKeyword))
            .await?;
        if matches!(
            result,
            IngestResult::None {
                reason: SkipReason::NothingParsed
            }
        ) {
            return Ok(IngestResult::None {
                reason: SkipReason::StartedNew,
            });
        }
        Ok(result)
    }

    /// Attach free-text delivery address to the open order and confirm
    /// it. Only reachable while the stage is awaiting-address.
    async fn capture_address(
        &self,
        session: &mut ConversationSession,
        msg: &InboundMessage,
        now: DateTime<Utc>,
    ) -> Result<IngestResult, EngineError> {
        let Some(mut order) = self.open_order(session, msg).await? else {
            session.transition(ConversationStage::Idle, "stale_session", now)?;
            self.sessions.put_conversation(session).await?;
            return Ok(IngestResult::None {
                reason: SkipReason::StaleSession,
            });
        };

        order.delivery_address = Some(msg.text.trim().to_string());
        order.status = OrderStatus::Confirmed;
        order.push_link_reason("address_received");
        order.touch_inbound(now);
        let order = self.orders.update(&order).await?;

        session.set_active_order(&order.id);
        session.transition(ConversationStage::PostOrder, "address_received", now)?;
        self.sessions.put_conversation(session).await?;

        info!(order_id = %order.id, "delivery address captured");
        Ok(IngestResult::Order {
            order_id: order.id.clone(),
            items: order.items,
            link_reason: order.link_reason,
            reply: Some(REPLY_ADDRESS_SAVED.to_string()),
        })
    }

    // --- disambiguation --------------------------------------------------

    /// The customer answered the pending question.
    async fn resolve_pending(
        &self,
        session: &mut ConversationSession,
        pending: DisambiguationSession,
        pos: usize,
        now: DateTime<Utc>,
    ) -> Result<IngestResult, EngineError> {
        let Some(order) = self
            .orders
            .get(&pending.tenant, &pending.order_id)
            .await?
            .filter(|o| !o.status.is_closed())
        else {
            return self.drop_stale_pending(session, &pending, now).await;
        };

        match pending.purpose {
            DisambiguationPurpose::ModifierTarget => {
                self.resolve_modifier_target(session, pending, order, pos, now)
                    .await
            }
            DisambiguationPurpose::CatalogVariant => {
                self.resolve_catalog_variant(session, pending, order, pos, now)
                    .await
            }
        }
    }

    async fn resolve_modifier_target(
        &self,
        session: &mut ConversationSession,
        pending: DisambiguationSession,
        mut order: Order,
        pos: usize,
        now: DateTime<Utc>,
    ) -> Result<IngestResult, EngineError> {
        let (Some(modifier), Some(&index)) =
            (pending.modifier.as_ref(), pending.candidate_indexes.get(pos))
        else {
            return self.drop_stale_pending(session, &pending, now).await;
        };
        if index >= order.items.len() {
            return self.drop_stale_pending(session, &pending, now).await;
        }

        let outcome = self
            .modifiers
            .apply_to_indices(&order.items, &[index], modifier);
        let status = outcome.status;
        if status == ApplyStatus::Applied {
            order.items = outcome.items;
            order.push_link_reason(&format!("modifier_{}", modifier.change.kind()));
            order.touch_inbound(now);
            order = self.orders.update(&order).await?;
        }

        self.sessions
            .close_disambiguation(&pending.tenant, &pending.customer, DisambiguationStatus::Resolved)
            .await?;
        session.transition(
            ConversationStage::BuildingOrder,
            "clarification_resolved",
            now,
        )?;
        self.sessions.put_conversation(session).await?;

        info!(order_id = %order.id, summary = %outcome.summary, "modifier target resolved");
        Ok(IngestResult::Modifier {
            order_id: order.id,
            status,
            summary: outcome.summary,
            items: order.items,
            candidates: None,
        })
    }

    async fn resolve_catalog_variant(
        &self,
        session: &mut ConversationSession,
        pending: DisambiguationSession,
        mut order: Order,
        pos: usize,
        now: DateTime<Utc>,
    ) -> Result<IngestResult, EngineError> {
        let (Some(&index), Some(label)) =
            (pending.candidate_indexes.first(), pending.options.get(pos))
        else {
            return self.drop_stale_pending(session, &pending, now).await;
        };
        if index >= order.items.len() {
            return self.drop_stale_pending(session, &pending, now).await;
        }

        let products = self.catalog.list_products(&pending.tenant).await?;
        let Some(product) = products.iter().find(|p| p.label() == *label) else {
            // Catalog changed under the open question.
            return self.drop_stale_pending(session, &pending, now).await;
        };

        let item = &mut order.items[index];
        item.product_id = Some(product.id.clone());
        item.canonical = product.canonical.clone();
        item.variant = product.variant.clone();
        if item.unit.is_none() {
            item.unit = product.unit.clone();
        }
        item.match_type = MatchType::CatalogExact;
        item.needs_clarify = false;

        order.push_link_reason("variant_clarified");
        order.touch_inbound(now);
        let order = self.orders.update(&order).await?;

        self.sessions
            .close_disambiguation(&pending.tenant, &pending.customer, DisambiguationStatus::Resolved)
            .await?;

        // Any further flagged item gets its own question; one at a time.
        let mut reply = None;
        let next_flagged = order.items.iter().position(|i| i.needs_clarify);
        if let Some(next_index) = next_flagged {
            let options = variant_options(&products, &order.items[next_index].canonical);
            if options.len() >= 2 {
                let next = disambiguation::variant_session(
                    &pending.tenant,
                    &pending.customer,
                    &order.id,
                    vec![next_index],
                    options,
                    now,
                );
                self.sessions.put_disambiguation(&next).await?;
                reply = Some(disambiguation::question_text(&next));
            }
        }
        if reply.is_some() {
            // stay in AwaitingClarification
        } else if self.settings.address.required
            && order.delivery_address.is_none()
            && session
                .stage
                .can_transition_to(ConversationStage::AwaitingAddress)
        {
            session.transition(ConversationStage::AwaitingAddress, "address_requested", now)?;
            reply = Some(REPLY_ASK_ADDRESS.to_string());
        } else {
            session.transition(
                ConversationStage::BuildingOrder,
                "clarification_resolved",
                now,
            )?;
        }
        self.sessions.put_conversation(session).await?;

        info!(order_id = %order.id, variant = %product.label(), "catalog variant resolved");
        Ok(IngestResult::Order {
            order_id: order.id.clone(),
            items: order.items,
            link_reason: order.link_reason,
            reply,
        })
    }

    /// Reply did not answer the question and was not an order-level
    /// command: ask again, leave everything pending.
    async fn reask_pending(
        &self,
        session: &mut ConversationSession,
        pending: DisambiguationSession,
        now: DateTime<Utc>,
    ) -> Result<IngestResult, EngineError> {
        let Some(order) = self
            .orders
            .get(&pending.tenant, &pending.order_id)
            .await?
            .filter(|o| !o.status.is_closed())
        else {
            return self.drop_stale_pending(session, &pending, now).await;
        };

        Ok(IngestResult::Modifier {
            order_id: order.id,
            status: ApplyStatus::Ambiguous,
            summary: disambiguation::question_text(&pending),
            items: order.items,
            candidates: None,
        })
    }

    /// The order behind the pending question is gone or closed.
    async fn drop_stale_pending(
        &self,
        session: &mut ConversationSession,
        pending: &DisambiguationSession,
        now: DateTime<Utc>,
    ) -> Result<IngestResult, EngineError> {
        warn!(order_id = %pending.order_id, "pending clarification no longer applies");
        self.sessions
            .close_disambiguation(&pending.tenant, &pending.customer, DisambiguationStatus::Expired)
            .await?;
        session.transition(ConversationStage::Idle, "stale_session", now)?;
        self.sessions.put_conversation(session).await?;
        Ok(IngestResult::None {
            reason: SkipReason::StaleSession,
        })
    }

    // --- helpers ---------------------------------------------------------

    /// The order the customer is talking about: the session's active
    /// order if it is still open, else their most recent open order.
    async fn open_order(
        &self,
        session: &ConversationSession,
        msg: &InboundMessage,
    ) -> Result<Option<Order>, EngineError> {
        if let Some(ref id) = session.active_order_id {
            if let Some(order) = self.orders.get(&msg.tenant, id).await? {
                if !order.status.is_closed() {
                    return Ok(Some(order));
                }
            }
        }
        let last = self
            .orders
            .find_last_for_customer(&msg.tenant, &msg.customer)
            .await?;
        Ok(last.filter(|o| !o.status.is_closed()))
    }

    fn catalog_miss_inquiry(&self, items: &[LineItem]) -> IngestResult {
        IngestResult::Inquiry {
            topic: "catalog_clarification".to_string(),
            reply: Some(format!(
                "Sorry, we couldn't find these on the menu: {}. Could you check the names?",
                item_names(items)
            )),
        }
    }

    /// Open a variant question for the first flagged item, if any.
    /// Returns the question text to use as the reply.
    async fn open_variant_question(
        &self,
        session: &mut ConversationSession,
        order: &Order,
        append_offset: usize,
        clarifications: &[VariantClarification],
        now: DateTime<Utc>,
    ) -> Result<Option<String>, EngineError> {
        let Some(first) = clarifications.first() else {
            return Ok(None);
        };
        let pending = disambiguation::variant_session(
            &order.tenant,
            &order.source_identity,
            &order.id,
            vec![append_offset + first.item_index],
            first.options.clone(),
            now,
        );
        self.sessions.put_disambiguation(&pending).await?;
        session.transition(
            ConversationStage::AwaitingClarification,
            "variant_clarification",
            now,
        )?;
        Ok(Some(disambiguation::question_text(&pending)))
    }
}

fn item_names(items: &[LineItem]) -> String {
    items
        .iter()
        .map(|i| i.display_name().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

fn unmatched_note(items: &[LineItem]) -> String {
    format!("unmatched: {}", item_names(items))
}

fn variant_options(products: &[Product], canonical: &str) -> Vec<String> {
    products
        .iter()
        .filter(|p| p.canonical == canonical)
        .map(|p| p.label())
        .collect()
}
