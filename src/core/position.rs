use crate::core::actor::ActorId;
use crate::core::cipher::CipherValue;
use crate::core::policy::SegmentKey;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier for a credit position.
///
/// Chosen by the opener; uniqueness is enforced by the store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PositionId(String);

impl PositionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PositionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for PositionId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Lifecycle states of a position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PositionStatus {
    Draft,
    Active,
    Monitored,
    Warning,
    Undercollateralized,
    Liquidating,
    PartialLiquidated,
    Liquidated,
    Closed,
}

impl PositionStatus {
    /// Terminal states admit no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, PositionStatus::Liquidated | PositionStatus::Closed)
    }

    /// The states a health outcome may move between.
    pub fn in_health_family(&self) -> bool {
        matches!(
            self,
            PositionStatus::Active
                | PositionStatus::Monitored
                | PositionStatus::Warning
                | PositionStatus::Undercollateralized
        )
    }
}

impl fmt::Display for PositionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// External triggers that drive lifecycle transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleTrigger {
    Open,
    HealthOutcome,
    StartLiquidation,
    CompleteLiquidation,
    Close,
}

/// The closed transition table: `(current, trigger, next)`.
///
/// Any `(current, trigger, next)` triple absent here is rejected as
/// invalid-state. Health outcomes move freely within the health family;
/// self-transitions there are handled as no-ops by the caller before
/// the table is consulted.
const TRANSITIONS: &[(PositionStatus, LifecycleTrigger, PositionStatus)] = {
    use LifecycleTrigger::*;
    use PositionStatus::*;
    &[
        (Draft, Open, Active),
        // Health outcomes: any health-family state to any other.
        (Active, HealthOutcome, Monitored),
        (Active, HealthOutcome, Warning),
        (Active, HealthOutcome, Undercollateralized),
        (Monitored, HealthOutcome, Active),
        (Monitored, HealthOutcome, Warning),
        (Monitored, HealthOutcome, Undercollateralized),
        (Warning, HealthOutcome, Active),
        (Warning, HealthOutcome, Monitored),
        (Warning, HealthOutcome, Undercollateralized),
        (Undercollateralized, HealthOutcome, Active),
        (Undercollateralized, HealthOutcome, Monitored),
        (Undercollateralized, HealthOutcome, Warning),
        // Liquidation cascade.
        (Undercollateralized, StartLiquidation, Liquidating),
        (Undercollateralized, StartLiquidation, PartialLiquidated),
        (Liquidating, CompleteLiquidation, Liquidated),
        (Liquidating, CompleteLiquidation, PartialLiquidated),
        (PartialLiquidated, CompleteLiquidation, Liquidated),
        (PartialLiquidated, CompleteLiquidation, PartialLiquidated),
        // Close with zero debt.
        (Active, Close, Closed),
        (Monitored, Close, Closed),
        (Warning, Close, Closed),
        (Undercollateralized, Close, Closed),
    ]
};

/// Whether the transition table permits `current --trigger--> next`.
pub fn transition_allowed(
    current: PositionStatus,
    trigger: LifecycleTrigger,
    next: PositionStatus,
) -> bool {
    TRANSITIONS
        .iter()
        .any(|&(from, t, to)| from == current && t == trigger && to == next)
}

/// Map a decrypted health band to its lifecycle status.
///
/// Bands 4 and 3 are healthy, 2 warrants monitoring, 1 is a warning,
/// 0 (and anything out of range, defensively) is undercollateralized.
pub fn status_for_band(band: i128) -> PositionStatus {
    match band {
        4 | 3 => PositionStatus::Active,
        2 => PositionStatus::Monitored,
        1 => PositionStatus::Warning,
        _ => PositionStatus::Undercollateralized,
    }
}

/// Plaintext outcome of a completed health review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewOutcome {
    pub health_band: i128,
    pub stability_tier: i128,
    pub collateral_ratio_bps: i128,
    pub risk_score: i128,
    pub liquidity_score: i128,
    pub interest_rate_bps: i128,
}

/// One health review cycle: the encrypted metrics queued for the
/// oracle, and their plaintexts once the callback lands.
///
/// Exactly one outstanding (incomplete) review may exist per position.
#[derive(Debug, Clone)]
pub struct HealthReview {
    pub id: Uuid,
    pub request_id: Uuid,
    pub health_band: CipherValue,
    pub stability_tier: CipherValue,
    pub collateral_ratio: CipherValue,
    pub masked_asset_value: CipherValue,
    pub risk_score: CipherValue,
    pub liquidity_score: CipherValue,
    pub interest_rate: CipherValue,
    pub liquidation_threshold: CipherValue,
    pub requested_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub outcome: Option<ReviewOutcome>,
}

impl HealthReview {
    pub fn is_complete(&self) -> bool {
        self.outcome.is_some()
    }

    /// The six ciphertexts queued for decryption, in callback order.
    pub fn oracle_handles(&self) -> Vec<CipherValue> {
        vec![
            self.health_band,
            self.stability_tier,
            self.collateral_ratio,
            self.risk_score,
            self.liquidity_score,
            self.interest_rate,
        ]
    }
}

/// Immutable record of a rebalance initiation.
#[derive(Debug, Clone)]
pub struct RebalanceAction {
    pub id: Uuid,
    pub required_collateral: CipherValue,
    pub deficit: CipherValue,
    pub urgency: u8,
    pub at: DateTime<Utc>,
}

/// Immutable record of one liquidation round.
#[derive(Debug, Clone)]
pub struct LiquidationRecord {
    pub id: Uuid,
    pub liquidated_asset: CipherValue,
    pub recovered_debt: CipherValue,
    pub penalty: CipherValue,
    pub is_complete: bool,
    pub at: DateTime<Utc>,
}

/// Kind of a credit line movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActivityKind {
    Draw,
    Repay,
    TopUp,
}

/// Immutable record of a draw, repayment or collateral top-up.
#[derive(Debug, Clone)]
pub struct CreditLineActivity {
    pub id: Uuid,
    pub kind: ActivityKind,
    pub amount: CipherValue,
    pub at: DateTime<Utc>,
}

/// Encrypted inputs submitted when opening a position.
#[derive(Debug, Clone, Copy)]
pub struct EncryptedInputs {
    pub assets: CipherValue,
    pub debt: CipherValue,
    pub credit_line: CipherValue,
    pub drawn: CipherValue,
    pub utilization: CipherValue,
    pub covenant_score: CipherValue,
    pub risk_level: CipherValue,
    pub liquidity_score: CipherValue,
    pub covenant_drift: CipherValue,
    pub stress_index: CipherValue,
}

/// An encrypted credit position.
///
/// Owned exclusively by the store; history lists are owned by the
/// position they describe. The manager is referenced by id, not owned.
#[derive(Debug, Clone)]
pub struct Position {
    pub(crate) id: PositionId,
    pub(crate) manager: ActorId,
    pub(crate) segment: Option<SegmentKey>,

    pub(crate) assets: CipherValue,
    pub(crate) debt: CipherValue,
    pub(crate) credit_line: CipherValue,
    pub(crate) drawn: CipherValue,
    pub(crate) utilization: CipherValue,
    pub(crate) covenant_score: CipherValue,
    pub(crate) risk_level: CipherValue,
    pub(crate) liquidity_score: CipherValue,
    pub(crate) covenant_drift: CipherValue,
    pub(crate) stress_index: CipherValue,
    pub(crate) interest_rate: CipherValue,
    pub(crate) accrued_interest: CipherValue,

    pub(crate) status: PositionStatus,
    pub(crate) opened_at: DateTime<Utc>,
    pub(crate) last_review_at: Option<DateTime<Utc>>,
    pub(crate) last_rebalance_at: Option<DateTime<Utc>>,
    pub(crate) liquidation_started_at: Option<DateTime<Utc>>,
    pub(crate) closed_at: Option<DateTime<Utc>>,

    pub(crate) review_count: u32,
    pub(crate) rebalance_count: u32,
    pub(crate) status_change_count: u32,

    pub(crate) active: bool,
    pub(crate) flagged: bool,
    pub(crate) frozen: bool,

    pub(crate) review: Option<HealthReview>,
    pub(crate) current_rate_bps: Option<i128>,

    pub(crate) rebalances: Vec<RebalanceAction>,
    pub(crate) liquidations: Vec<LiquidationRecord>,
    pub(crate) activity: Vec<CreditLineActivity>,
}

impl Position {
    /// Create a position in `Draft` and immediately advance it to
    /// `Active`, per the lifecycle rules for `open`.
    pub fn open(
        id: PositionId,
        manager: ActorId,
        segment: Option<SegmentKey>,
        inputs: EncryptedInputs,
        now: DateTime<Utc>,
    ) -> Self {
        let mut position = Self {
            id,
            manager,
            segment,
            assets: inputs.assets,
            debt: inputs.debt,
            credit_line: inputs.credit_line,
            drawn: inputs.drawn,
            utilization: inputs.utilization,
            covenant_score: inputs.covenant_score,
            risk_level: inputs.risk_level,
            liquidity_score: inputs.liquidity_score,
            covenant_drift: inputs.covenant_drift,
            stress_index: inputs.stress_index,
            interest_rate: CipherValue::zero(),
            accrued_interest: CipherValue::zero(),
            status: PositionStatus::Draft,
            opened_at: now,
            last_review_at: None,
            last_rebalance_at: None,
            liquidation_started_at: None,
            closed_at: None,
            review_count: 0,
            rebalance_count: 0,
            status_change_count: 0,
            active: true,
            flagged: false,
            frozen: false,
            review: None,
            current_rate_bps: None,
            rebalances: Vec::new(),
            liquidations: Vec::new(),
            activity: Vec::new(),
        };
        position.force_status(PositionStatus::Active);
        position
    }

    /// Apply a table-checked status change. The caller has already
    /// consulted [`transition_allowed`]; genuine changes increment the
    /// status-change counter.
    pub(crate) fn force_status(&mut self, next: PositionStatus) {
        if self.status != next {
            self.status = next;
            self.status_change_count += 1;
        }
    }

    // --- Accessors (read surface) ---

    pub fn id(&self) -> &PositionId {
        &self.id
    }

    pub fn manager(&self) -> &ActorId {
        &self.manager
    }

    pub fn segment(&self) -> Option<&SegmentKey> {
        self.segment.as_ref()
    }

    pub fn status(&self) -> PositionStatus {
        self.status
    }

    // Ciphertext handles are public; their plaintexts are not.

    pub fn assets(&self) -> &CipherValue {
        &self.assets
    }

    pub fn debt(&self) -> &CipherValue {
        &self.debt
    }

    pub fn credit_line(&self) -> &CipherValue {
        &self.credit_line
    }

    pub fn drawn(&self) -> &CipherValue {
        &self.drawn
    }

    pub fn accrued_interest(&self) -> &CipherValue {
        &self.accrued_interest
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn is_flagged(&self) -> bool {
        self.flagged
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    pub fn review_count(&self) -> u32 {
        self.review_count
    }

    pub fn rebalance_count(&self) -> u32 {
        self.rebalance_count
    }

    pub fn status_change_count(&self) -> u32 {
        self.status_change_count
    }

    pub fn opened_at(&self) -> DateTime<Utc> {
        self.opened_at
    }

    pub fn closed_at(&self) -> Option<DateTime<Utc>> {
        self.closed_at
    }

    pub fn review(&self) -> Option<&HealthReview> {
        self.review.as_ref()
    }

    /// The live interest rate, known only after a completed review.
    pub fn current_rate_bps(&self) -> Option<i128> {
        self.current_rate_bps
    }

    pub fn rebalances(&self) -> &[RebalanceAction] {
        &self.rebalances
    }

    pub fn liquidations(&self) -> &[LiquidationRecord] {
        &self.liquidations
    }

    pub fn activity(&self) -> &[CreditLineActivity] {
        &self.activity
    }

    /// Is there a completed review to act on?
    pub fn has_completed_review(&self) -> bool {
        self.review.as_ref().is_some_and(|r| r.is_complete())
    }
}
