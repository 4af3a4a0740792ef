use crate::core::actor::{ActorId, Role};
use crate::core::cipher::{CipherValue, InputProof};
use crate::core::error::EngineError;
use crate::core::events::EngineEvent;
use crate::core::position::{LifecycleTrigger, LiquidationRecord, PositionId, PositionStatus};
use crate::engine::store::{apply_transition, CreditEngine};
use chrono::Utc;
use uuid::Uuid;

impl CreditEngine {
    /// Move an undercollateralized position into liquidation.
    ///
    /// Only a liquidator may call. The position's latest completed
    /// review must show a collateral ratio below the liquidation
    /// threshold; the decrypted ratio is the evidence, so an unanswered
    /// review cannot start a liquidation. `is_partial` declares the
    /// intent up front and picks the branch of the transition table,
    /// but a ratio at or above the partial-liquidation threshold only
    /// justifies a partial round, whatever the intent.
    pub fn start_liquidation(
        &mut self,
        caller: &ActorId,
        id: &PositionId,
        is_partial: bool,
    ) -> Result<(), EngineError> {
        self.ensure_role(caller, Role::Liquidator)?;
        let position = self.store.get_mut(id)?;
        if position.status() != PositionStatus::Undercollateralized {
            return Err(EngineError::InvalidState {
                status: position.status(),
                action: "start liquidation",
            });
        }
        let outcome = position
            .review
            .as_ref()
            .and_then(|r| r.outcome)
            .ok_or_else(|| EngineError::ReviewNotComplete(id.clone()))?;
        let effective = self.registry.effective(position.segment.as_ref());
        if outcome.collateral_ratio_bps >= effective.policy.liquidation_threshold_bps {
            return Err(EngineError::InvalidState {
                status: position.status(),
                action: "start liquidation above the liquidation threshold",
            });
        }

        let force_partial = outcome.collateral_ratio_bps
            >= effective.policy.partial_liquidation_threshold_bps;
        let next = if is_partial || force_partial {
            PositionStatus::PartialLiquidated
        } else {
            PositionStatus::Liquidating
        };
        let now = Utc::now();
        apply_transition(
            &mut self.events,
            position,
            LifecycleTrigger::StartLiquidation,
            next,
            "start liquidation",
            now,
        )?;
        position.liquidation_started_at = Some(now);
        let effective_partial = next == PositionStatus::PartialLiquidated;
        log::warn!(
            "liquidation started for {} ({})",
            id,
            if effective_partial { "partial" } else { "full" }
        );
        self.events.record(EngineEvent::LiquidationStarted {
            position: id.clone(),
            is_partial: effective_partial,
            at: now,
        });
        Ok(())
    }

    /// Settle one liquidation round.
    ///
    /// The seized asset amount and recovered debt arrive as encrypted
    /// inputs with proofs. Recovery is clamped to the outstanding debt;
    /// the penalty is computed on ciphertext and kept in the record.
    /// Whether the round finalizes the position is decided by the
    /// encrypted zero-debt check — the only disclosure this operation
    /// makes.
    pub fn complete_liquidation(
        &mut self,
        caller: &ActorId,
        id: &PositionId,
        liquidated_asset: i128,
        asset_proof: &InputProof,
        recovered_debt: i128,
        debt_proof: &InputProof,
    ) -> Result<(), EngineError> {
        self.ensure_role(caller, Role::Liquidator)?;
        let asset_cipher = CipherValue::from_external(liquidated_asset, asset_proof)?;
        let recovered_cipher = CipherValue::from_external(recovered_debt, debt_proof)?;
        let position = self.store.get_mut(id)?;
        if !matches!(
            position.status(),
            PositionStatus::Liquidating | PositionStatus::PartialLiquidated
        ) {
            return Err(EngineError::InvalidState {
                status: position.status(),
                action: "complete liquidation",
            });
        }
        let effective = self.registry.effective(position.segment.as_ref());
        let penalty_bps = effective.policy.liquidation_penalty_bps;

        let asset_reduction = asset_cipher.min_with(&position.assets);
        let debt_reduction = recovered_cipher.min_with(&position.debt);
        let penalty = asset_cipher.mul_plain(penalty_bps).div_plain(10_000);

        let new_assets = position.assets.sub(&asset_reduction);
        let new_debt = position.debt.sub(&debt_reduction);
        let finalized = new_debt.eq_plain(0).into_guard();
        let next = if finalized {
            PositionStatus::Liquidated
        } else {
            PositionStatus::PartialLiquidated
        };

        let now = Utc::now();
        apply_transition(
            &mut self.events,
            position,
            LifecycleTrigger::CompleteLiquidation,
            next,
            "complete liquidation",
            now,
        )?;
        position.assets = new_assets;
        position.debt = new_debt;
        position.liquidations.push(LiquidationRecord {
            id: Uuid::new_v4(),
            liquidated_asset: asset_reduction,
            recovered_debt: debt_reduction,
            penalty,
            is_complete: finalized,
            at: now,
        });
        if finalized {
            position.active = false;
            position.closed_at = Some(now);
            let manager = position.manager.clone();
            self.managers.record_liquidation(&manager);
        }
        self.aggregates
            .on_liquidation(&asset_reduction, &debt_reduction, finalized);
        log::warn!(
            "liquidation round settled for {} (finalized: {})",
            id,
            finalized
        );
        self.events.record(EngineEvent::LiquidationCompleted {
            position: id.clone(),
            finalized,
            at: now,
        });
        Ok(())
    }
}
