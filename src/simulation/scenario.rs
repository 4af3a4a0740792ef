//! Random portfolio generation and a scripted lifecycle pass.
//!
//! The generator keeps a plaintext shadow of the values it submitted,
//! which is how the scripted liquidator and borrower know what amounts
//! to quote without touching any ciphertext.

use crate::core::actor::{ActorId, Role};
use crate::core::cipher::{CipherValue, InputProof};
use crate::core::error::EngineError;
use crate::core::position::{EncryptedInputs, PositionId, PositionStatus};
use crate::engine::store::CreditEngine;
use crate::simulation::oracle_sim::SimulatedOracle;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use std::fmt;

/// Configuration for generating a random credit portfolio.
#[derive(Debug, Clone)]
pub struct PortfolioConfig {
    /// Number of borrowing managers.
    pub manager_count: usize,
    /// Positions opened per manager.
    pub positions_per_manager: usize,
    /// Asset value range for healthy positions.
    pub healthy_asset_range: (i128, i128),
    /// Credit line range for all positions.
    pub credit_line_range: (i128, i128),
    /// Share of positions opened already distressed.
    pub distressed_share: f64,
    /// Seed for reproducible runs; `None` draws from entropy.
    pub seed: Option<u64>,
}

impl Default for PortfolioConfig {
    fn default() -> Self {
        Self {
            manager_count: 5,
            positions_per_manager: 4,
            healthy_asset_range: (500, 1_500),
            credit_line_range: (200, 600),
            distressed_share: 0.3,
            seed: None,
        }
    }
}

/// Counters from one scripted lifecycle pass.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ScenarioReport {
    pub managers: usize,
    pub positions_opened: usize,
    pub draws: usize,
    pub reviews_completed: usize,
    pub rebalances_initiated: usize,
    pub top_ups: usize,
    pub liquidations_finalized: usize,
    pub positions_closed: usize,
}

impl fmt::Display for ScenarioReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Scenario Report")?;
        writeln!(f, "  Managers:               {}", self.managers)?;
        writeln!(f, "  Positions opened:       {}", self.positions_opened)?;
        writeln!(f, "  Credit draws:           {}", self.draws)?;
        writeln!(f, "  Reviews completed:      {}", self.reviews_completed)?;
        writeln!(f, "  Rebalances initiated:   {}", self.rebalances_initiated)?;
        writeln!(f, "  Collateral top-ups:     {}", self.top_ups)?;
        writeln!(f, "  Liquidations finalized: {}", self.liquidations_finalized)?;
        write!(f, "  Positions closed:       {}", self.positions_closed)
    }
}

/// Encrypted inputs with unremarkable indicator values, for demos.
pub fn demo_inputs(assets: i128, debt: i128, credit_line: i128) -> EncryptedInputs {
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

/// Plaintext shadow of one generated position.
struct TrackedPosition {
    id: PositionId,
    manager: ActorId,
    assets: i128,
    debt: i128,
    distressed: bool,
}

/// Run a full lifecycle pass over a random portfolio: open, draw,
/// review, rebalance the distressed tail, liquidate what the reviews
/// condemn, close a share of the healthy book.
pub fn run_scenario(config: &PortfolioConfig) -> Result<(CreditEngine, ScenarioReport), EngineError> {
    let mut rng = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let governor = ActorId::new("GOV");
    let council = ActorId::new("COUNCIL");
    let liquidator = ActorId::new("LIQUIDATOR-1");
    let mut engine = CreditEngine::new(governor.clone(), council);
    engine.grant_role(&governor, liquidator.clone(), Role::Liquidator)?;

    let mut report = ScenarioReport {
        managers: config.manager_count,
        ..ScenarioReport::default()
    };
    let mut tracked: Vec<TrackedPosition> = Vec::new();

    // Open the book.
    for m in 0..config.manager_count {
        let manager = ActorId::new(format!("MGR-{:03}", m));
        for p in 0..config.positions_per_manager {
            let id = PositionId::new(format!("POS-{:03}-{:02}", m, p));
            let distressed = rng.gen_bool(config.distressed_share);
            let (assets, debt) = if distressed {
                (rng.gen_range(50..150), rng.gen_range(150..300))
            } else {
                (
                    rng.gen_range(config.healthy_asset_range.0..config.healthy_asset_range.1),
                    0,
                )
            };
            let credit_line =
                rng.gen_range(config.credit_line_range.0..config.credit_line_range.1);
            let inputs = EncryptedInputs {
                assets: CipherValue::encrypt(assets),
                debt: CipherValue::encrypt(debt),
                credit_line: CipherValue::encrypt(credit_line),
                drawn: CipherValue::zero(),
                utilization: CipherValue::zero(),
                covenant_score: CipherValue::encrypt(rng.gen_range(60..95)),
                risk_level: CipherValue::encrypt(rng.gen_range(1..5)),
                liquidity_score: CipherValue::encrypt(rng.gen_range(40..80)),
                covenant_drift: CipherValue::encrypt(rng.gen_range(0..10)),
                stress_index: CipherValue::encrypt(rng.gen_range(20..60)),
            };
            engine.open_position(&manager, id.clone(), None, inputs)?;
            report.positions_opened += 1;

            let mut shadow = TrackedPosition {
                id: id.clone(),
                manager: manager.clone(),
                assets,
                debt,
                distressed,
            };
            if !distressed {
                let draw = rng.gen_range(0..=credit_line / 2);
                if draw > 0 {
                    engine.draw_credit(&manager, &id, draw, &InputProof::for_value(draw))?;
                    shadow.debt += draw;
                    report.draws += 1;
                }
            }
            tracked.push(shadow);
        }
    }

    // Review everything, then let the demo oracle answer.
    for shadow in &tracked {
        engine.request_review(&shadow.manager, &shadow.id)?;
    }
    report.reviews_completed = SimulatedOracle::new().answer_all(&mut engine)?;
    log::info!(
        "scenario: {} positions reviewed, {} pending",
        report.reviews_completed,
        engine.oracle().pending_count()
    );

    // Rebalance the distressed tail; some managers answer with top-ups.
    for shadow in &tracked {
        let status = engine.position(&shadow.id)?.status();
        if matches!(
            status,
            PositionStatus::Warning | PositionStatus::Undercollateralized
        ) {
            engine.initiate_rebalance(&shadow.manager, &shadow.id)?;
            report.rebalances_initiated += 1;
            if rng.gen_bool(0.5) {
                let amount = rng.gen_range(50..200);
                engine.record_top_up(
                    &shadow.manager,
                    &shadow.id,
                    amount,
                    &InputProof::for_value(amount),
                )?;
                report.top_ups += 1;
            }
        }
    }

    // Liquidate what the reviews condemned.
    for shadow in &tracked {
        if engine.position(&shadow.id)?.status() == PositionStatus::Undercollateralized {
            engine.start_liquidation(&liquidator, &shadow.id, false)?;
            engine.complete_liquidation(
                &liquidator,
                &shadow.id,
                shadow.assets,
                &InputProof::for_value(shadow.assets),
                shadow.debt,
                &InputProof::for_value(shadow.debt),
            )?;
            report.liquidations_finalized += 1;
        }
    }

    // Wind down part of the healthy book.
    for shadow in &tracked {
        if shadow.distressed || !rng.gen_bool(0.4) {
            continue;
        }
        if engine.position(&shadow.id)?.status() != PositionStatus::Active {
            continue;
        }
        if shadow.debt > 0 {
            engine.repay_credit(
                &shadow.manager,
                &shadow.id,
                shadow.debt,
                &InputProof::for_value(shadow.debt),
            )?;
        }
        engine.close_position(&shadow.manager, &shadow.id)?;
        report.positions_closed += 1;
    }

    Ok((engine, report))
}
