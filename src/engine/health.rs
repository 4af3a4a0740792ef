use crate::core::cipher::CipherValue;
use crate::core::error::EngineError;
use crate::core::events::EngineEvent;
use crate::core::policy::EffectivePolicy;
use crate::core::position::{
    status_for_band, transition_allowed, HealthReview, LifecycleTrigger, Position, PositionId,
    PositionStatus, ReviewOutcome,
};
use crate::engine::store::{apply_transition, unauthorized, CreditEngine};
use crate::core::actor::{ActorId, Role};
use chrono::{Duration, Utc};
use uuid::Uuid;

/// Risk-score weight of the raw risk level.
pub const RISK_LEVEL_WEIGHT: i128 = 120;
/// Divisor folding the utilization indicator into the risk score.
pub const UTILIZATION_DIVISOR: i128 = 90;
/// Risk-score weight of covenant drift.
pub const DRIFT_WEIGHT: i128 = 2;
/// Divisor applied to the risk premium before it joins the base rate.
pub const RATE_PREMIUM_DIVISOR: i128 = 10;

/// Fee units attached to each oracle request.
const REVIEW_FEE_BUDGET: u64 = 1;

/// The encrypted metrics a health evaluation produces, all still
/// ciphertext. Plaintexts exist only after the oracle answers.
#[derive(Debug, Clone, Copy)]
pub struct HealthComputation {
    pub health_band: CipherValue,
    pub stability_tier: CipherValue,
    pub collateral_ratio: CipherValue,
    pub masked_asset_value: CipherValue,
    pub risk_score: CipherValue,
    pub liquidity_score: CipherValue,
    pub interest_rate: CipherValue,
    pub liquidation_threshold: CipherValue,
}

/// Evaluate a position's health entirely on ciphertext.
///
/// Collateral ratio uses buffered operands and the plus-one divisor
/// convention:
///
/// ```text
/// ratio = (assets + assetBuffer) * 10000 / ((debt + debtBuffer) + 1)
/// ```
///
/// The band folds seven threshold conditions and three ratio bands
/// through selects, so the shape of the computation leaks nothing about
/// which branch applied:
///
/// * ratio below the liquidation threshold is band 0 outright;
/// * between the liquidation and healthy thresholds, fundamentals
///   decide between 2 and 1;
/// * at or above the healthy threshold, fundamentals plus discipline
///   reach 4, fundamentals alone 3, anything less 2.
///
/// Fundamentals are the asset floor, covenant floor, risk ceiling and
/// liquidity floor; discipline is the utilization ceiling, drift
/// ceiling and stress floor.
pub fn evaluate_health(position: &Position, effective: &EffectivePolicy<'_>) -> HealthComputation {
    let policy = effective.policy;

    let adjusted_asset = position.assets.add_plain(policy.asset_buffer);
    let adjusted_debt = position.debt.add_plain(policy.debt_buffer);
    let collateral_ratio = adjusted_asset
        .mul_plain(10_000)
        .div(&adjusted_debt.add_plain(1));

    let asset_floor = position.assets.ge_plain(policy.min_asset_value);
    let covenant_floor = position.covenant_score.ge_plain(policy.min_covenant_score);
    let risk_ceiling = position.risk_level.le_plain(policy.max_risk_level);
    let liquidity_floor = position.liquidity_score.ge_plain(policy.min_liquidity_score);
    let utilization_ceiling = position.utilization.le_plain(policy.max_utilization_bps);
    let drift_ceiling = position.covenant_drift.le_plain(policy.max_covenant_drift);
    let stress_floor = position.stress_index.ge_plain(policy.min_stress_index);

    let fundamentals = asset_floor
        .and(&covenant_floor)
        .and(&risk_ceiling)
        .and(&liquidity_floor);
    let discipline = utilization_ceiling.and(&drift_ceiling).and(&stress_floor);

    let ratio_healthy = collateral_ratio.ge_plain(policy.collateral_ratio_threshold_bps);
    let ratio_above_liquidation = collateral_ratio.ge_plain(policy.liquidation_threshold_bps);

    let four = CipherValue::encrypt(4);
    let three = CipherValue::encrypt(3);
    let two = CipherValue::encrypt(2);
    let one = CipherValue::encrypt(1);
    let zero = CipherValue::zero();

    let healthy_band = CipherValue::select(
        &fundamentals.and(&discipline),
        &four,
        &CipherValue::select(&fundamentals, &three, &two),
    );
    let warning_band = CipherValue::select(&fundamentals, &two, &one);
    let health_band = CipherValue::select(
        &ratio_healthy,
        &healthy_band,
        &CipherValue::select(&ratio_above_liquidation, &warning_band, &zero),
    );

    let stability_tier = CipherValue::select(
        &liquidity_floor.and(&stress_floor),
        &CipherValue::select(&drift_ceiling, &three, &two),
        &CipherValue::select(&stress_floor, &one, &zero),
    );

    let risk_score = {
        let base = position
            .risk_level
            .mul_plain(RISK_LEVEL_WEIGHT)
            .add(&position.utilization.div_plain(UTILIZATION_DIVISOR))
            .add(&position.covenant_drift.mul_plain(DRIFT_WEIGHT));
        match effective.stress_boost {
            Some(boost) => base.add(boost),
            None => base,
        }
    };

    let interest_rate = position
        .risk_level
        .mul_plain(policy.risk_premium_rate)
        .div_plain(RATE_PREMIUM_DIVISOR)
        .add_plain(policy.base_rate_bps);

    HealthComputation {
        health_band,
        stability_tier,
        collateral_ratio,
        masked_asset_value: adjusted_asset,
        risk_score,
        liquidity_score: position.liquidity_score,
        interest_rate,
        liquidation_threshold: CipherValue::encrypt(policy.liquidation_threshold_bps),
    }
}

impl CreditEngine {
    /// Evaluate health on ciphertext and queue the six result handles
    /// for decryption. Returns the oracle request id.
    ///
    /// Preconditions: the position is in the health family and not
    /// frozen, the review cap and cooldown allow a new cycle, and no
    /// earlier cycle is still waiting on its callback.
    pub fn request_review(
        &mut self,
        caller: &ActorId,
        id: &PositionId,
    ) -> Result<Uuid, EngineError> {
        let is_council = self.access.authorize(caller, Role::Council);
        let position = self.store.get_mut(id)?;
        if position.manager() != caller && !is_council {
            return Err(unauthorized(caller, "owner or council"));
        }
        if position.frozen {
            return Err(EngineError::PositionFrozen(id.clone()));
        }
        if !position.status().in_health_family() || !position.active {
            return Err(EngineError::InvalidState {
                status: position.status(),
                action: "request health review",
            });
        }

        let effective = self.registry.effective(position.segment.as_ref());
        if position.review_count >= effective.policy.max_reviews {
            return Err(EngineError::ReviewLimitReached {
                max: effective.policy.max_reviews,
            });
        }
        // An outstanding review blocks before the cooldown does: the
        // caller should learn a callback is still owed, not a window.
        if position.review.as_ref().is_some_and(|r| !r.is_complete()) {
            return Err(EngineError::ReviewAlreadyPending(id.clone()));
        }
        let now = Utc::now();
        if let Some(last) = position.last_review_at {
            if now < last + Duration::seconds(effective.policy.review_cooldown_secs) {
                return Err(EngineError::ReviewCooldownActive);
            }
        }

        let computation = evaluate_health(position, &effective);
        let window_secs = effective.policy.review_window_secs;
        let urgent = matches!(
            position.status(),
            PositionStatus::Warning | PositionStatus::Undercollateralized
        );

        let mut review = HealthReview {
            id: Uuid::new_v4(),
            request_id: Uuid::nil(),
            health_band: computation.health_band,
            stability_tier: computation.stability_tier,
            collateral_ratio: computation.collateral_ratio,
            masked_asset_value: computation.masked_asset_value,
            risk_score: computation.risk_score,
            liquidity_score: computation.liquidity_score,
            interest_rate: computation.interest_rate,
            liquidation_threshold: computation.liquidation_threshold,
            requested_at: now,
            completed_at: None,
            outcome: None,
        };
        let request_id = self.oracle.submit(
            id.clone(),
            review.oracle_handles(),
            window_secs,
            REVIEW_FEE_BUDGET,
            urgent,
            now,
        );
        review.request_id = request_id;

        position.review = Some(review);
        position.review_count += 1;
        position.last_review_at = Some(now);
        self.events.record(EngineEvent::ReviewRequested {
            position: id.clone(),
            request_id,
            at: now,
        });
        Ok(request_id)
    }

    /// Apply the oracle's answer for a pending review.
    ///
    /// Validates the request id and the six-value arity, persists the
    /// plaintext outcome, moves the position per the transition table,
    /// adopts the decrypted interest rate as the live rate, folds the
    /// result into the manager profile and pool aggregates, and clears
    /// the request — so a second callback for the same id is rejected
    /// as request-not-found.
    pub fn oracle_callback(
        &mut self,
        request_id: Uuid,
        values: &[i128],
    ) -> Result<(), EngineError> {
        let position_id = self
            .oracle
            .validate_callback(request_id, values)?
            .position
            .clone();
        let position = self.store.get_mut(&position_id)?;
        let review = position
            .review
            .as_mut()
            .ok_or_else(|| EngineError::MalformedCallback {
                reason: format!("position '{}' has no review cycle", position_id),
            })?;
        if review.request_id != request_id {
            return Err(EngineError::MalformedCallback {
                reason: format!(
                    "request {} does not match the pending review of '{}'",
                    request_id, position_id
                ),
            });
        }

        let band = values[0];
        let next = status_for_band(band);
        let current = position.status;
        if next != current
            && !transition_allowed(current, LifecycleTrigger::HealthOutcome, next)
        {
            return Err(EngineError::InvalidState {
                status: current,
                action: "apply health outcome",
            });
        }

        let now = Utc::now();
        let outcome = ReviewOutcome {
            health_band: band,
            stability_tier: values[1],
            collateral_ratio_bps: values[2],
            risk_score: values[3],
            liquidity_score: values[4],
            interest_rate_bps: values[5],
        };
        // Cipher copies for the aggregates, taken before the reborrow.
        let risk_score = review.risk_score;
        let liquidity_score = review.liquidity_score;
        let interest_rate = review.interest_rate;

        review.outcome = Some(outcome);
        review.completed_at = Some(now);
        position.current_rate_bps = Some(outcome.interest_rate_bps);
        position.interest_rate = CipherValue::encrypt(outcome.interest_rate_bps);

        apply_transition(
            &mut self.events,
            position,
            LifecycleTrigger::HealthOutcome,
            next,
            "apply health outcome",
            now,
        )?;
        let manager = position.manager.clone();
        self.managers.record_review(&manager, band);
        self.aggregates
            .on_review(&risk_score, &liquidity_score, &interest_rate);
        self.oracle.complete(request_id);
        log::info!(
            "review for position {} complete: band {}, rate {} bps",
            position_id,
            band,
            outcome.interest_rate_bps
        );
        self.events.record(EngineEvent::ReviewCompleted {
            position: position_id,
            request_id,
            health_band: band,
            at: now,
        });
        Ok(())
    }
}
