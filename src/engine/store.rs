use crate::core::actor::{AccessControl, ActorId, Role};
use crate::core::cipher::{CipherValue, InputProof};
use crate::core::error::EngineError;
use crate::core::events::{EngineEvent, EventLog};
use crate::core::policy::{PolicyRegistry, PoolPolicy, SegmentKey, SegmentPolicy};
use crate::core::position::{
    transition_allowed, ActivityKind, CreditLineActivity, EncryptedInputs, LifecycleTrigger,
    Position, PositionId, PositionStatus,
};
use crate::ledger::aggregate::PoolAggregateTracker;
use crate::ledger::manager::ManagerLedger;
use crate::oracle::client::DecryptionOracleClient;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Owns every position record and enforces id uniqueness.
#[derive(Debug, Clone, Default)]
pub struct PositionStore {
    positions: HashMap<PositionId, Position>,
}

impl PositionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, position: Position) -> Result<(), EngineError> {
        let id = position.id().clone();
        if self.positions.contains_key(&id) {
            return Err(EngineError::DuplicatePosition(id));
        }
        self.positions.insert(id, position);
        Ok(())
    }

    pub fn get(&self, id: &PositionId) -> Result<&Position, EngineError> {
        self.positions
            .get(id)
            .ok_or_else(|| EngineError::PositionNotFound(id.clone()))
    }

    pub fn get_mut(&mut self, id: &PositionId) -> Result<&mut Position, EngineError> {
        self.positions
            .get_mut(id)
            .ok_or_else(|| EngineError::PositionNotFound(id.clone()))
    }

    pub fn contains(&self, id: &PositionId) -> bool {
        self.positions.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Position> {
        self.positions.values()
    }
}

/// Apply a table-checked lifecycle transition and emit the mandatory
/// status-change event. Self-transitions are no-ops: no event, no
/// counter increment.
pub(crate) fn apply_transition(
    events: &mut EventLog,
    position: &mut Position,
    trigger: LifecycleTrigger,
    next: PositionStatus,
    action: &'static str,
    now: DateTime<Utc>,
) -> Result<(), EngineError> {
    let current = position.status();
    if current == next {
        return Ok(());
    }
    if !transition_allowed(current, trigger, next) {
        return Err(EngineError::InvalidState {
            status: current,
            action,
        });
    }
    position.force_status(next);
    log::info!("position {}: {} -> {}", position.id(), current, next);
    events.record(EngineEvent::StatusChanged {
        position: position.id().clone(),
        old: current,
        new: next,
        at: now,
    });
    Ok(())
}

pub(crate) fn unauthorized(caller: &ActorId, required: &str) -> EngineError {
    EngineError::Unauthorized {
        caller: caller.to_string(),
        required: required.to_string(),
    }
}

/// The credit engine: policy registry, position store, oracle client,
/// ledgers, access control and event log behind one serialized surface.
///
/// Each public operation runs to completion atomically — checks first,
/// then mutation — so any error leaves no partial state behind.
#[derive(Debug, Clone)]
pub struct CreditEngine {
    pub(crate) registry: PolicyRegistry,
    pub(crate) store: PositionStore,
    pub(crate) oracle: DecryptionOracleClient,
    pub(crate) managers: ManagerLedger,
    pub(crate) aggregates: PoolAggregateTracker,
    pub(crate) access: AccessControl,
    pub(crate) events: EventLog,
}

impl CreditEngine {
    pub fn new(governor: ActorId, council: ActorId) -> Self {
        Self::with_policy(governor, council, PoolPolicy::default())
    }

    pub fn with_policy(governor: ActorId, council: ActorId, policy: PoolPolicy) -> Self {
        Self {
            registry: PolicyRegistry::new(policy),
            store: PositionStore::new(),
            oracle: DecryptionOracleClient::new(),
            managers: ManagerLedger::new(),
            aggregates: PoolAggregateTracker::new(),
            access: AccessControl::new(governor, council),
            events: EventLog::new(),
        }
    }

    // --- Component access ---

    pub fn registry(&self) -> &PolicyRegistry {
        &self.registry
    }

    pub fn events(&self) -> &EventLog {
        &self.events
    }

    pub fn aggregates(&self) -> &PoolAggregateTracker {
        &self.aggregates
    }

    pub fn managers(&self) -> &ManagerLedger {
        &self.managers
    }

    pub fn oracle(&self) -> &DecryptionOracleClient {
        &self.oracle
    }

    pub fn position(&self, id: &PositionId) -> Result<&Position, EngineError> {
        self.store.get(id)
    }

    pub fn position_count(&self) -> usize {
        self.store.len()
    }

    pub(crate) fn ensure_role(&self, caller: &ActorId, role: Role) -> Result<(), EngineError> {
        if self.access.authorize(caller, role) {
            Ok(())
        } else {
            Err(unauthorized(caller, &role.to_string()))
        }
    }

    // --- Borrower operations ---

    /// Open a position: unique id, Draft advanced to Active, manager
    /// profile created lazily, aggregates adjusted in the same call.
    pub fn open_position(
        &mut self,
        caller: &ActorId,
        id: PositionId,
        segment: Option<SegmentKey>,
        inputs: EncryptedInputs,
    ) -> Result<(), EngineError> {
        if self.store.contains(&id) {
            return Err(EngineError::DuplicatePosition(id));
        }
        let now = Utc::now();
        let position = Position::open(id.clone(), caller.clone(), segment, inputs, now);
        self.store.insert(position)?;
        self.managers.record_open(caller, id.clone());
        self.aggregates.on_open(&inputs);
        log::info!("position {} opened by {}", id, caller);
        self.events.record(EngineEvent::PositionOpened {
            position: id.clone(),
            manager: caller.clone(),
            at: now,
        });
        self.events.record(EngineEvent::StatusChanged {
            position: id,
            old: PositionStatus::Draft,
            new: PositionStatus::Active,
            at: now,
        });
        Ok(())
    }

    /// Draw against the credit line. The `drawn + amount <= creditLine`
    /// check runs on encrypted operands; only its boolean guard is
    /// disclosed. A violating draw aborts with limit-exceeded and no
    /// state change.
    pub fn draw_credit(
        &mut self,
        caller: &ActorId,
        id: &PositionId,
        amount: i128,
        proof: &InputProof,
    ) -> Result<(), EngineError> {
        let cipher = CipherValue::from_external(amount, proof)?;
        let position = self.store.get_mut(id)?;
        if position.manager() != caller {
            return Err(unauthorized(caller, "owner"));
        }
        if position.frozen {
            return Err(EngineError::PositionFrozen(id.clone()));
        }
        if !position.status().in_health_family() || !position.active {
            return Err(EngineError::InvalidState {
                status: position.status(),
                action: "draw credit",
            });
        }

        let new_drawn = position.drawn.add(&cipher);
        if !new_drawn.le(&position.credit_line).into_guard() {
            return Err(EngineError::CreditLimitExceeded);
        }

        let now = Utc::now();
        position.drawn = new_drawn;
        position.debt = position.debt.add(&cipher);
        position.utilization = new_drawn
            .mul_plain(10_000)
            .div(&position.credit_line.add_plain(1));
        position.activity.push(CreditLineActivity {
            id: Uuid::new_v4(),
            kind: ActivityKind::Draw,
            amount: cipher,
            at: now,
        });
        self.managers.record_draw(caller, &cipher);
        self.aggregates.on_draw(&cipher);
        self.events.record(EngineEvent::CreditDrawn {
            position: id.clone(),
            at: now,
        });
        Ok(())
    }

    /// Repay outstanding debt. Over-repayment is a benign mistake: the
    /// amount is clamped to the outstanding debt, never rejected.
    pub fn repay_credit(
        &mut self,
        caller: &ActorId,
        id: &PositionId,
        amount: i128,
        proof: &InputProof,
    ) -> Result<(), EngineError> {
        let cipher = CipherValue::from_external(amount, proof)?;
        let position = self.store.get_mut(id)?;
        if position.manager() != caller {
            return Err(unauthorized(caller, "owner"));
        }
        if position.frozen {
            return Err(EngineError::PositionFrozen(id.clone()));
        }
        if position.status().is_terminal() {
            return Err(EngineError::InvalidState {
                status: position.status(),
                action: "repay credit",
            });
        }

        let now = Utc::now();
        let applied = cipher.min_with(&position.debt);
        // The drawn reduction can be smaller than the applied amount
        // when part of the debt predates any draw.
        let drawn_reduction = applied.min_with(&position.drawn);
        position.debt = position.debt.sub(&applied);
        position.drawn = position.drawn.sub(&drawn_reduction);
        position.utilization = position
            .drawn
            .mul_plain(10_000)
            .div(&position.credit_line.add_plain(1));
        position.activity.push(CreditLineActivity {
            id: Uuid::new_v4(),
            kind: ActivityKind::Repay,
            amount: applied,
            at: now,
        });
        self.managers.record_repay(caller, &applied);
        self.aggregates.on_repay(&applied, &drawn_reduction);
        self.events.record(EngineEvent::CreditRepaid {
            position: id.clone(),
            at: now,
        });
        Ok(())
    }

    /// Close a position carrying zero debt. The zero-debt condition is
    /// checked on the encrypted field; only the boolean is disclosed.
    pub fn close_position(&mut self, caller: &ActorId, id: &PositionId) -> Result<(), EngineError> {
        let position = self.store.get_mut(id)?;
        if position.manager() != caller {
            return Err(unauthorized(caller, "owner"));
        }
        if !position.status().in_health_family() {
            return Err(EngineError::InvalidState {
                status: position.status(),
                action: "close position",
            });
        }
        if !position.debt.eq_plain(0).into_guard() {
            return Err(EngineError::InvalidState {
                status: position.status(),
                action: "close with outstanding debt",
            });
        }

        let now = Utc::now();
        apply_transition(
            &mut self.events,
            position,
            LifecycleTrigger::Close,
            PositionStatus::Closed,
            "close position",
            now,
        )?;
        position.active = false;
        position.closed_at = Some(now);
        self.managers.record_close(caller);
        self.aggregates.on_close();
        self.events.record(EngineEvent::PositionClosed {
            position: id.clone(),
            at: now,
        });
        Ok(())
    }

    /// Fold the live interest rate into the encrypted accrued-interest
    /// field. Available to the owner and the council.
    pub fn accrue_interest(&mut self, caller: &ActorId, id: &PositionId) -> Result<(), EngineError> {
        let is_council = self.access.authorize(caller, Role::Council);
        let position = self.store.get_mut(id)?;
        if position.manager() != caller && !is_council {
            return Err(unauthorized(caller, "owner or council"));
        }
        if position.status().is_terminal() {
            return Err(EngineError::InvalidState {
                status: position.status(),
                action: "accrue interest",
            });
        }
        let increment = position.debt.mul(&position.interest_rate).div_plain(10_000);
        position.accrued_interest = position.accrued_interest.add(&increment);
        Ok(())
    }

    // --- Council controls ---

    pub fn flag_position(&mut self, caller: &ActorId, id: &PositionId) -> Result<(), EngineError> {
        self.ensure_role(caller, Role::Council)?;
        let position = self.store.get_mut(id)?;
        position.flagged = true;
        self.events.record(EngineEvent::PositionFlagged {
            position: id.clone(),
            at: Utc::now(),
        });
        Ok(())
    }

    pub fn set_frozen(
        &mut self,
        caller: &ActorId,
        id: &PositionId,
        frozen: bool,
    ) -> Result<(), EngineError> {
        self.ensure_role(caller, Role::Council)?;
        let position = self.store.get_mut(id)?;
        position.frozen = frozen;
        self.events.record(EngineEvent::PositionFrozen {
            position: id.clone(),
            frozen,
            at: Utc::now(),
        });
        Ok(())
    }

    // --- Governance surface ---

    pub fn update_default_policy(
        &mut self,
        caller: &ActorId,
        policy: PoolPolicy,
    ) -> Result<(), EngineError> {
        self.ensure_role(caller, Role::Governor)?;
        self.registry.update_default(policy);
        self.events.record(EngineEvent::PolicyUpdated { at: Utc::now() });
        Ok(())
    }

    /// Install a segment override; the stress boost arrives as an
    /// encrypted input with its proof.
    pub fn set_segment_policy(
        &mut self,
        caller: &ActorId,
        key: SegmentKey,
        policy: PoolPolicy,
        stress_boost: i128,
        proof: &InputProof,
    ) -> Result<(), EngineError> {
        self.ensure_role(caller, Role::Council)?;
        let boost = CipherValue::from_external(stress_boost, proof)?;
        self.registry
            .set_segment(key.clone(), SegmentPolicy::new(policy, boost));
        self.events.record(EngineEvent::SegmentPolicySet {
            segment: key,
            at: Utc::now(),
        });
        Ok(())
    }

    pub fn clear_segment_policy(
        &mut self,
        caller: &ActorId,
        key: &SegmentKey,
    ) -> Result<(), EngineError> {
        self.ensure_role(caller, Role::Council)?;
        self.registry.clear_segment(key);
        Ok(())
    }

    pub fn grant_role(
        &mut self,
        caller: &ActorId,
        actor: ActorId,
        role: Role,
    ) -> Result<(), EngineError> {
        self.ensure_role(caller, Role::Governor)?;
        match role {
            Role::Liquidator => self.access.grant_liquidator(actor.clone()),
            Role::Auditor => self.access.grant_auditor(actor.clone()),
            Role::Governor => self.access.transfer_governance(actor.clone()),
            Role::Council => self.access.update_council(actor.clone()),
        }
        self.events.record(EngineEvent::RoleGranted {
            actor,
            role,
            at: Utc::now(),
        });
        Ok(())
    }

    pub fn revoke_role(
        &mut self,
        caller: &ActorId,
        actor: &ActorId,
        role: Role,
    ) -> Result<(), EngineError> {
        self.ensure_role(caller, Role::Governor)?;
        let removed = match role {
            Role::Liquidator => self.access.revoke_liquidator(actor),
            Role::Auditor => self.access.revoke_auditor(actor),
            // Governance and council are transferred, not revoked.
            Role::Governor | Role::Council => false,
        };
        if removed {
            self.events.record(EngineEvent::RoleRevoked {
                actor: actor.clone(),
                role,
                at: Utc::now(),
            });
        }
        Ok(())
    }

    // --- Read surface (plaintext only) ---

    pub fn position_summary(&self, id: &PositionId) -> Result<PositionSummary, EngineError> {
        let position = self.store.get(id)?;
        Ok(PositionSummary {
            id: position.id().clone(),
            manager: position.manager().clone(),
            segment: position.segment().cloned(),
            status: position.status(),
            active: position.is_active(),
            flagged: position.is_flagged(),
            frozen: position.is_frozen(),
            opened_at: position.opened_at(),
            closed_at: position.closed_at(),
            review_count: position.review_count(),
            rebalance_count: position.rebalance_count(),
            status_change_count: position.status_change_count(),
            current_rate_bps: position.current_rate_bps(),
            rebalance_records: position.rebalances().len(),
            liquidation_records: position.liquidations().len(),
            activity_records: position.activity().len(),
        })
    }

    /// Decrypted review fields, available only after the oracle has
    /// answered.
    pub fn review_summary(&self, id: &PositionId) -> Result<ReviewSummary, EngineError> {
        let position = self.store.get(id)?;
        let review = position
            .review()
            .filter(|r| r.is_complete())
            .ok_or_else(|| EngineError::ReviewNotComplete(id.clone()))?;
        let outcome = review
            .outcome
            .ok_or_else(|| EngineError::ReviewNotComplete(id.clone()))?;
        Ok(ReviewSummary {
            position: id.clone(),
            request_id: review.request_id,
            requested_at: review.requested_at,
            completed_at: review.completed_at,
            health_band: outcome.health_band,
            stability_tier: outcome.stability_tier,
            collateral_ratio_bps: outcome.collateral_ratio_bps,
            risk_score: outcome.risk_score,
            liquidity_score: outcome.liquidity_score,
            interest_rate_bps: outcome.interest_rate_bps,
        })
    }

    pub fn manager_summary(&self, manager: &ActorId) -> Result<ManagerSummary, EngineError> {
        let profile = self
            .managers
            .profile(manager)
            .ok_or_else(|| EngineError::ManagerNotFound(manager.to_string()))?;
        Ok(ManagerSummary {
            manager: manager.clone(),
            total_positions: profile.total_positions(),
            active_positions: profile.active_positions(),
            liquidated_positions: profile.liquidated_positions(),
            closed_positions: profile.closed_positions(),
            credit_rating: profile.credit_rating(),
            average_health_band: profile.average_health_band(),
        })
    }

    pub fn pool_summary(&self) -> PoolSummary {
        PoolSummary {
            positions: self.store.len(),
            opened: self.aggregates.opened_positions(),
            active: self.aggregates.active_positions(),
            liquidated: self.aggregates.liquidated_positions(),
            closed: self.aggregates.closed_positions(),
            managers: self.managers.manager_count(),
            pending_reviews: self.oracle.pending_count(),
        }
    }
}

/// Plaintext view of a position's public fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionSummary {
    pub id: PositionId,
    pub manager: ActorId,
    pub segment: Option<SegmentKey>,
    pub status: PositionStatus,
    pub active: bool,
    pub flagged: bool,
    pub frozen: bool,
    pub opened_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
    pub review_count: u32,
    pub rebalance_count: u32,
    pub status_change_count: u32,
    pub current_rate_bps: Option<i128>,
    pub rebalance_records: usize,
    pub liquidation_records: usize,
    pub activity_records: usize,
}

/// Plaintext view of a completed health review.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewSummary {
    pub position: PositionId,
    pub request_id: Uuid,
    pub requested_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub health_band: i128,
    pub stability_tier: i128,
    pub collateral_ratio_bps: i128,
    pub risk_score: i128,
    pub liquidity_score: i128,
    pub interest_rate_bps: i128,
}

/// Plaintext view of a manager profile.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManagerSummary {
    pub manager: ActorId,
    pub total_positions: u32,
    pub active_positions: u32,
    pub liquidated_positions: u32,
    pub closed_positions: u32,
    pub credit_rating: u32,
    pub average_health_band: Option<i128>,
}

/// Plaintext pool-wide counts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolSummary {
    pub positions: usize,
    pub opened: u64,
    pub active: u64,
    pub liquidated: u64,
    pub closed: u64,
    pub managers: usize,
    pub pending_reviews: usize,
}
