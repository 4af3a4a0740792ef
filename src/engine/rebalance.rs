use crate::core::actor::{ActorId, Role};
use crate::core::cipher::{CipherValue, InputProof};
use crate::core::error::EngineError;
use crate::core::events::EngineEvent;
use crate::core::position::{ActivityKind, CreditLineActivity, PositionId, PositionStatus, RebalanceAction};
use crate::engine::store::{unauthorized, CreditEngine};
use chrono::{Duration, Utc};
use uuid::Uuid;

/// Map a decrypted health band to rebalance urgency.
///
/// Band 0 is critical, band 1 is a recovery case, anything else is
/// routine.
fn urgency_for_band(band: i128) -> u8 {
    match band {
        0 => 5,
        1 => 3,
        _ => 1,
    }
}

impl CreditEngine {
    /// Open a rebalance cycle for a distressed position.
    ///
    /// Requires a completed review: urgency derives from the decrypted
    /// band, so an unanswered review cannot start a cycle. The required
    /// collateral and deficit stay encrypted; the status is untouched —
    /// only a fresh review moves it back up the family.
    pub fn initiate_rebalance(
        &mut self,
        caller: &ActorId,
        id: &PositionId,
    ) -> Result<(), EngineError> {
        let is_council = self.access.authorize(caller, Role::Council);
        let position = self.store.get_mut(id)?;
        if position.manager() != caller && !is_council {
            return Err(unauthorized(caller, "owner or council"));
        }
        if position.frozen {
            return Err(EngineError::PositionFrozen(id.clone()));
        }
        if !matches!(
            position.status(),
            PositionStatus::Warning | PositionStatus::Undercollateralized
        ) {
            return Err(EngineError::InvalidState {
                status: position.status(),
                action: "initiate rebalance",
            });
        }
        let outcome = position
            .review
            .as_ref()
            .and_then(|r| r.outcome)
            .ok_or_else(|| EngineError::ReviewNotComplete(id.clone()))?;

        let effective = self.registry.effective(position.segment.as_ref());
        let now = Utc::now();
        if let Some(last) = position.last_rebalance_at {
            if now < last + Duration::seconds(effective.policy.rebalance_window_secs) {
                return Err(EngineError::RebalanceCooldownActive);
            }
        }

        let required_collateral = position
            .debt
            .mul_plain(effective.policy.collateral_ratio_threshold_bps)
            .div_plain(10_000);
        let deficit = required_collateral
            .sub(&position.assets)
            .max_with(&CipherValue::zero());
        let urgency = urgency_for_band(outcome.health_band);

        position.rebalances.push(RebalanceAction {
            id: Uuid::new_v4(),
            required_collateral,
            deficit,
            urgency,
            at: now,
        });
        position.rebalance_count += 1;
        position.last_rebalance_at = Some(now);
        log::info!("rebalance cycle opened for {} (urgency {})", id, urgency);
        self.events.record(EngineEvent::RebalanceInitiated {
            position: id.clone(),
            urgency,
            at: now,
        });
        Ok(())
    }

    /// Record a collateral top-up answering a rebalance cycle. The
    /// amount joins the encrypted asset value; whether it cured the
    /// deficit is only learned from the next review.
    pub fn record_top_up(
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
                action: "top up collateral",
            });
        }

        let now = Utc::now();
        position.assets = position.assets.add(&cipher);
        position.activity.push(CreditLineActivity {
            id: Uuid::new_v4(),
            kind: ActivityKind::TopUp,
            amount: cipher,
            at: now,
        });
        self.aggregates.on_top_up(&cipher);
        self.events.record(EngineEvent::RebalanceCompleted {
            position: id.clone(),
            at: now,
        });
        Ok(())
    }
}
