use crate::core::actor::ActorId;
use crate::core::cipher::CipherValue;
use crate::core::position::PositionId;
use std::collections::HashMap;

/// Rating every manager starts with.
pub const INITIAL_CREDIT_RATING: u32 = 70;
/// Rating points lost per finalized liquidation, floor-clamped at zero.
pub const LIQUIDATION_RATING_PENALTY: u32 = 15;

/// Per-borrower aggregate bookkeeping.
///
/// Created lazily on the manager's first position. Encrypted totals
/// follow the same discipline as the pool aggregates: adjusted at each
/// mutation site, never recomputed from positions.
#[derive(Debug, Clone)]
pub struct ManagerProfile {
    manager: ActorId,
    positions: Vec<PositionId>,
    active_positions: u32,
    liquidated_positions: u32,
    closed_positions: u32,
    credit_used: CipherValue,
    credit_repaid: CipherValue,
    health_band_sum: i128,
    health_samples: u32,
    credit_rating: u32,
}

impl ManagerProfile {
    fn new(manager: ActorId) -> Self {
        Self {
            manager,
            positions: Vec::new(),
            active_positions: 0,
            liquidated_positions: 0,
            closed_positions: 0,
            credit_used: CipherValue::zero(),
            credit_repaid: CipherValue::zero(),
            health_band_sum: 0,
            health_samples: 0,
            credit_rating: INITIAL_CREDIT_RATING,
        }
    }

    pub fn manager(&self) -> &ActorId {
        &self.manager
    }

    pub fn positions(&self) -> &[PositionId] {
        &self.positions
    }

    pub fn total_positions(&self) -> u32 {
        self.positions.len() as u32
    }

    pub fn active_positions(&self) -> u32 {
        self.active_positions
    }

    pub fn liquidated_positions(&self) -> u32 {
        self.liquidated_positions
    }

    pub fn closed_positions(&self) -> u32 {
        self.closed_positions
    }

    pub fn credit_used(&self) -> &CipherValue {
        &self.credit_used
    }

    pub fn credit_repaid(&self) -> &CipherValue {
        &self.credit_repaid
    }

    pub fn credit_rating(&self) -> u32 {
        self.credit_rating
    }

    /// Average decrypted health band over completed reviews.
    pub fn average_health_band(&self) -> Option<i128> {
        if self.health_samples == 0 {
            None
        } else {
            Some(self.health_band_sum / self.health_samples as i128)
        }
    }
}

/// Owns all manager profiles; positions reference managers by id only.
#[derive(Debug, Clone, Default)]
pub struct ManagerLedger {
    profiles: HashMap<ActorId, ManagerProfile>,
}

impl ManagerLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn profile(&self, manager: &ActorId) -> Option<&ManagerProfile> {
        self.profiles.get(manager)
    }

    pub fn manager_count(&self) -> usize {
        self.profiles.len()
    }

    fn profile_mut(&mut self, manager: &ActorId) -> &mut ManagerProfile {
        self.profiles
            .entry(manager.clone())
            .or_insert_with(|| ManagerProfile::new(manager.clone()))
    }

    pub fn record_open(&mut self, manager: &ActorId, position: PositionId) {
        let profile = self.profile_mut(manager);
        profile.positions.push(position);
        profile.active_positions += 1;
    }

    pub fn record_draw(&mut self, manager: &ActorId, amount: &CipherValue) {
        let profile = self.profile_mut(manager);
        profile.credit_used = profile.credit_used.add(amount);
    }

    pub fn record_repay(&mut self, manager: &ActorId, amount: &CipherValue) {
        let profile = self.profile_mut(manager);
        profile.credit_repaid = profile.credit_repaid.add(amount);
    }

    pub fn record_review(&mut self, manager: &ActorId, health_band: i128) {
        let profile = self.profile_mut(manager);
        profile.health_band_sum += health_band;
        profile.health_samples += 1;
    }

    /// A finalized liquidation: the position count flips and the rating
    /// takes its penalty, floor-clamped at zero.
    pub fn record_liquidation(&mut self, manager: &ActorId) {
        let profile = self.profile_mut(manager);
        profile.active_positions = profile.active_positions.saturating_sub(1);
        profile.liquidated_positions += 1;
        profile.credit_rating = profile.credit_rating.saturating_sub(LIQUIDATION_RATING_PENALTY);
    }

    pub fn record_close(&mut self, manager: &ActorId) {
        let profile = self.profile_mut(manager);
        profile.active_positions = profile.active_positions.saturating_sub(1);
        profile.closed_positions += 1;
    }
}
