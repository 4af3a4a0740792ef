use crate::core::cipher::CipherValue;
use crate::core::position::EncryptedInputs;

/// Pool-wide encrypted running sums.
///
/// Every position mutation that touches assets, debt, the credit line
/// or the drawn amount adjusts these totals inside the same operation
/// that mutates the position; the tracker is never rebuilt by scanning
/// positions. The decryption of these sums is a test-only path used by
/// the aggregate-consistency property.
#[derive(Debug, Clone)]
pub struct PoolAggregateTracker {
    total_assets: CipherValue,
    total_debt: CipherValue,
    total_credit_line: CipherValue,
    total_drawn: CipherValue,
    risk_score_sum: CipherValue,
    liquidity_score_sum: CipherValue,
    rate_sum: CipherValue,
    review_samples: u64,
    opened_positions: u64,
    active_positions: u64,
    liquidated_positions: u64,
    closed_positions: u64,
}

impl Default for PoolAggregateTracker {
    fn default() -> Self {
        Self {
            total_assets: CipherValue::zero(),
            total_debt: CipherValue::zero(),
            total_credit_line: CipherValue::zero(),
            total_drawn: CipherValue::zero(),
            risk_score_sum: CipherValue::zero(),
            liquidity_score_sum: CipherValue::zero(),
            rate_sum: CipherValue::zero(),
            review_samples: 0,
            opened_positions: 0,
            active_positions: 0,
            liquidated_positions: 0,
            closed_positions: 0,
        }
    }
}

impl PoolAggregateTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_open(&mut self, inputs: &EncryptedInputs) {
        self.total_assets = self.total_assets.add(&inputs.assets);
        self.total_debt = self.total_debt.add(&inputs.debt);
        self.total_credit_line = self.total_credit_line.add(&inputs.credit_line);
        self.total_drawn = self.total_drawn.add(&inputs.drawn);
        self.opened_positions += 1;
        self.active_positions += 1;
    }

    /// A draw raises both the drawn amount and the outstanding debt.
    pub fn on_draw(&mut self, amount: &CipherValue) {
        self.total_drawn = self.total_drawn.add(amount);
        self.total_debt = self.total_debt.add(amount);
    }

    /// Both amounts arrive pre-clamped: `debt_reduction` to the
    /// position's outstanding debt, `drawn_reduction` to its drawn
    /// amount. They diverge when part of the debt predates any draw.
    pub fn on_repay(&mut self, debt_reduction: &CipherValue, drawn_reduction: &CipherValue) {
        self.total_debt = self.total_debt.sub(debt_reduction);
        self.total_drawn = self.total_drawn.sub(drawn_reduction);
    }

    pub fn on_top_up(&mut self, amount: &CipherValue) {
        self.total_assets = self.total_assets.add(amount);
    }

    pub fn on_review(
        &mut self,
        risk_score: &CipherValue,
        liquidity_score: &CipherValue,
        interest_rate: &CipherValue,
    ) {
        self.risk_score_sum = self.risk_score_sum.add(risk_score);
        self.liquidity_score_sum = self.liquidity_score_sum.add(liquidity_score);
        self.rate_sum = self.rate_sum.add(interest_rate);
        self.review_samples += 1;
    }

    pub fn on_liquidation(
        &mut self,
        asset_reduction: &CipherValue,
        debt_reduction: &CipherValue,
        finalized: bool,
    ) {
        self.total_assets = self.total_assets.sub(asset_reduction);
        self.total_debt = self.total_debt.sub(debt_reduction);
        if finalized {
            self.active_positions = self.active_positions.saturating_sub(1);
            self.liquidated_positions += 1;
        }
    }

    pub fn on_close(&mut self) {
        self.active_positions = self.active_positions.saturating_sub(1);
        self.closed_positions += 1;
    }

    // --- Accessors ---

    pub fn total_assets(&self) -> &CipherValue {
        &self.total_assets
    }

    pub fn total_debt(&self) -> &CipherValue {
        &self.total_debt
    }

    pub fn total_credit_line(&self) -> &CipherValue {
        &self.total_credit_line
    }

    pub fn total_drawn(&self) -> &CipherValue {
        &self.total_drawn
    }

    pub fn risk_score_sum(&self) -> &CipherValue {
        &self.risk_score_sum
    }

    pub fn liquidity_score_sum(&self) -> &CipherValue {
        &self.liquidity_score_sum
    }

    /// Average live rate over reviewed positions, encrypted.
    pub fn average_rate(&self) -> CipherValue {
        if self.review_samples == 0 {
            CipherValue::zero()
        } else {
            self.rate_sum.div_plain(self.review_samples as i128)
        }
    }

    pub fn opened_positions(&self) -> u64 {
        self.opened_positions
    }

    pub fn active_positions(&self) -> u64 {
        self.active_positions
    }

    pub fn liquidated_positions(&self) -> u64 {
        self.liquidated_positions
    }

    pub fn closed_positions(&self) -> u64 {
        self.closed_positions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inputs(assets: i128, debt: i128, credit_line: i128) -> EncryptedInputs {
        EncryptedInputs {
            assets: CipherValue::encrypt(assets),
            debt: CipherValue::encrypt(debt),
            credit_line: CipherValue::encrypt(credit_line),
            drawn: CipherValue::zero(),
            utilization: CipherValue::zero(),
            covenant_score: CipherValue::encrypt(80),
            risk_level: CipherValue::encrypt(2),
            liquidity_score: CipherValue::encrypt(60),
            covenant_drift: CipherValue::encrypt(5),
            stress_index: CipherValue::encrypt(40),
        }
    }

    #[test]
    fn test_open_draw_repay_totals() {
        let mut tracker = PoolAggregateTracker::new();
        tracker.on_open(&inputs(200, 0, 100));
        tracker.on_open(&inputs(500, 50, 300));
        assert_eq!(tracker.total_assets().reveal(), 700);
        assert_eq!(tracker.total_debt().reveal(), 50);
        assert_eq!(tracker.total_credit_line().reveal(), 400);
        assert_eq!(tracker.active_positions(), 2);

        tracker.on_draw(&CipherValue::encrypt(60));
        assert_eq!(tracker.total_drawn().reveal(), 60);
        assert_eq!(tracker.total_debt().reveal(), 110);

        tracker.on_repay(&CipherValue::encrypt(110), &CipherValue::encrypt(60));
        assert_eq!(tracker.total_debt().reveal(), 0);
        assert_eq!(tracker.total_drawn().reveal(), 0);
    }

    #[test]
    fn test_liquidation_counts() {
        let mut tracker = PoolAggregateTracker::new();
        tracker.on_open(&inputs(200, 100, 100));
        tracker.on_liquidation(&CipherValue::encrypt(50), &CipherValue::encrypt(40), false);
        assert_eq!(tracker.active_positions(), 1);
        tracker.on_liquidation(&CipherValue::encrypt(50), &CipherValue::encrypt(60), true);
        assert_eq!(tracker.active_positions(), 0);
        assert_eq!(tracker.liquidated_positions(), 1);
        assert_eq!(tracker.total_debt().reveal(), 0);
        assert_eq!(tracker.total_assets().reveal(), 100);
    }

    #[test]
    fn test_average_rate() {
        let mut tracker = PoolAggregateTracker::new();
        assert_eq!(tracker.average_rate().reveal(), 0);
        tracker.on_review(
            &CipherValue::encrypt(240),
            &CipherValue::encrypt(60),
            &CipherValue::encrypt(300),
        );
        tracker.on_review(
            &CipherValue::encrypt(480),
            &CipherValue::encrypt(40),
            &CipherValue::encrypt(500),
        );
        assert_eq!(tracker.average_rate().reveal(), 400);
    }
}
