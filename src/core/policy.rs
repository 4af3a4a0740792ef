use crate::core::cipher::CipherValue;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Key naming a borrower segment (a cohort sharing a policy override).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SegmentKey(String);

impl SegmentKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SegmentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for SegmentKey {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Plaintext risk thresholds applied to a position during evaluation.
///
/// Ratios and rates are in basis points (10000 = 100%); windows and
/// cooldowns are in seconds. Thresholds are plaintext by design — only
/// position data is encrypted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolPolicy {
    /// Floor on raw asset value.
    pub min_asset_value: i128,
    /// Buffer added to assets before the collateral ratio is computed.
    pub asset_buffer: i128,
    /// Buffer added to debt before the collateral ratio is computed.
    pub debt_buffer: i128,
    /// Ceiling on the utilization indicator, basis points.
    pub max_utilization_bps: i128,
    /// Floor on the covenant score.
    pub min_covenant_score: i128,
    /// Ceiling on the risk level indicator.
    pub max_risk_level: i128,
    /// Floor on the liquidity score.
    pub min_liquidity_score: i128,
    /// Ceiling on covenant drift.
    pub max_covenant_drift: i128,
    /// Floor on the stress index.
    pub min_stress_index: i128,
    /// Collateral ratio at or above which a position is healthy, bps.
    pub collateral_ratio_threshold_bps: i128,
    /// Collateral ratio below which liquidation may start, bps.
    pub liquidation_threshold_bps: i128,
    /// Collateral ratio below which only partial liquidation applies, bps.
    pub partial_liquidation_threshold_bps: i128,
    /// Base interest rate, bps.
    pub base_rate_bps: i128,
    /// Premium multiplied by the risk level (divided by ten) on top of
    /// the base rate.
    pub risk_premium_rate: i128,
    /// Penalty applied to liquidated assets, bps.
    pub liquidation_penalty_bps: i128,
    /// Oracle answer window for a review request, seconds.
    pub review_window_secs: i64,
    /// Minimum spacing between review requests, seconds.
    pub review_cooldown_secs: i64,
    /// Spacing between rebalance initiations, seconds.
    pub rebalance_window_secs: i64,
    /// Hard cap on reviews per position.
    pub max_reviews: u32,
}

impl Default for PoolPolicy {
    fn default() -> Self {
        Self {
            min_asset_value: 100,
            asset_buffer: 50,
            debt_buffer: 25,
            max_utilization_bps: 8_000,
            min_covenant_score: 40,
            max_risk_level: 7,
            min_liquidity_score: 30,
            max_covenant_drift: 20,
            min_stress_index: 10,
            collateral_ratio_threshold_bps: 15_000,
            liquidation_threshold_bps: 12_000,
            partial_liquidation_threshold_bps: 10_000,
            base_rate_bps: 300,
            risk_premium_rate: 50,
            liquidation_penalty_bps: 500,
            review_window_secs: 3_600,
            review_cooldown_secs: 600,
            rebalance_window_secs: 1_800,
            max_reviews: 10,
        }
    }
}

/// A pool policy override for one borrower segment, plus an encrypted
/// stress-boost factor folded into that segment's risk score.
#[derive(Debug, Clone)]
pub struct SegmentPolicy {
    pub policy: PoolPolicy,
    pub stress_boost: CipherValue,
}

impl SegmentPolicy {
    pub fn new(policy: PoolPolicy, stress_boost: CipherValue) -> Self {
        Self {
            policy,
            stress_boost,
        }
    }
}

/// The policy a given position is evaluated against, resolved once per
/// operation.
#[derive(Debug, Clone, Copy)]
pub struct EffectivePolicy<'a> {
    pub policy: &'a PoolPolicy,
    pub stress_boost: Option<&'a CipherValue>,
}

/// Holds the default pool policy and per-segment overrides.
///
/// Resolution is "segment policy if present, else default", decided
/// per call and never cached across calls.
///
/// # Examples
///
/// ```
/// use credit_engine::core::policy::{PolicyRegistry, PoolPolicy, SegmentKey};
///
/// let registry = PolicyRegistry::new(PoolPolicy::default());
/// let effective = registry.effective(Some(&SegmentKey::new("mid-market")));
/// assert_eq!(effective.policy.max_reviews, 10); // falls back to default
/// ```
#[derive(Debug, Clone)]
pub struct PolicyRegistry {
    default: PoolPolicy,
    segments: HashMap<SegmentKey, SegmentPolicy>,
}

impl PolicyRegistry {
    pub fn new(default: PoolPolicy) -> Self {
        Self {
            default,
            segments: HashMap::new(),
        }
    }

    pub fn default_policy(&self) -> &PoolPolicy {
        &self.default
    }

    pub fn update_default(&mut self, policy: PoolPolicy) {
        self.default = policy;
    }

    pub fn set_segment(&mut self, key: SegmentKey, policy: SegmentPolicy) {
        self.segments.insert(key, policy);
    }

    pub fn clear_segment(&mut self, key: &SegmentKey) -> bool {
        self.segments.remove(key).is_some()
    }

    pub fn segment(&self, key: &SegmentKey) -> Option<&SegmentPolicy> {
        self.segments.get(key)
    }

    /// Resolve the effective policy for a position's segment.
    pub fn effective(&self, segment: Option<&SegmentKey>) -> EffectivePolicy<'_> {
        match segment.and_then(|key| self.segments.get(key)) {
            Some(seg) => EffectivePolicy {
                policy: &seg.policy,
                stress_boost: Some(&seg.stress_boost),
            },
            None => EffectivePolicy {
                policy: &self.default,
                stress_boost: None,
            },
        }
    }
}
