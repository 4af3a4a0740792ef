use credit_engine::core::actor::{ActorId, Role};
use credit_engine::core::cipher::{CipherValue, InputProof};
use credit_engine::core::error::EngineError;
use credit_engine::core::events::EngineEvent;
use credit_engine::core::policy::{PoolPolicy, SegmentKey};
use credit_engine::core::position::{EncryptedInputs, PositionId, PositionStatus};
use credit_engine::engine::store::CreditEngine;
use credit_engine::ledger::manager::{INITIAL_CREDIT_RATING, LIQUIDATION_RATING_PENALTY};
use credit_engine::simulation::oracle_sim::SimulatedOracle;
use uuid::Uuid;

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

fn engine_with_liquidator() -> (CreditEngine, ActorId) {
    let gov = ActorId::new("GOV");
    let mut engine = CreditEngine::new(gov.clone(), ActorId::new("COUNCIL"));
    let liquidator = ActorId::new("LIQ");
    engine
        .grant_role(&gov, liquidator.clone(), Role::Liquidator)
        .unwrap();
    (engine, liquidator)
}

fn review(engine: &mut CreditEngine, caller: &ActorId, id: &PositionId) -> Uuid {
    let request_id = engine.request_review(caller, id).unwrap();
    SimulatedOracle::new().answer(engine, request_id).unwrap();
    request_id
}

/// Full healthy lifecycle: open, draw, review, repay, close.
#[test]
fn healthy_position_full_lifecycle() {
    let (mut engine, _) = engine_with_liquidator();
    let acme = ActorId::new("ACME-TREASURY");
    let id = PositionId::new("ACME-01");

    engine
        .open_position(&acme, id.clone(), None, inputs(800, 0, 400))
        .unwrap();
    engine
        .draw_credit(&acme, &id, 150, &InputProof::for_value(150))
        .unwrap();
    review(&mut engine, &acme, &id);

    let position = engine.position(&id).unwrap();
    assert_eq!(position.status(), PositionStatus::Active);
    assert_eq!(position.current_rate_bps(), Some(310));
    assert_eq!(position.review_count(), 1);

    let summary = engine.review_summary(&id).unwrap();
    assert_eq!(summary.health_band, 4);
    assert_eq!(summary.stability_tier, 3);

    engine
        .repay_credit(&acme, &id, 150, &InputProof::for_value(150))
        .unwrap();
    engine.close_position(&acme, &id).unwrap();

    let position = engine.position(&id).unwrap();
    assert_eq!(position.status(), PositionStatus::Closed);
    assert!(position.closed_at().is_some());

    let pool = engine.pool_summary();
    assert_eq!(pool.opened, 1);
    assert_eq!(pool.active, 0);
    assert_eq!(pool.closed, 1);

    let profile = engine.manager_summary(&acme).unwrap();
    assert_eq!(profile.closed_positions, 1);
    assert_eq!(profile.credit_rating, INITIAL_CREDIT_RATING);
}

/// Distress pipeline: review condemns, rebalance records the deficit,
/// a top-up lands, liquidation clears the book.
#[test]
fn distressed_position_rebalance_then_liquidation() {
    let (mut engine, liquidator) = engine_with_liquidator();
    let acme = ActorId::new("ACME-TREASURY");
    let id = PositionId::new("ACME-02");

    engine
        .open_position(&acme, id.clone(), None, inputs(100, 200, 250))
        .unwrap();
    review(&mut engine, &acme, &id);
    assert_eq!(
        engine.position(&id).unwrap().status(),
        PositionStatus::Undercollateralized
    );

    engine.initiate_rebalance(&acme, &id).unwrap();
    let position = engine.position(&id).unwrap();
    assert_eq!(position.rebalance_count(), 1);
    assert_eq!(position.rebalances()[0].urgency, 5);

    engine
        .record_top_up(&acme, &id, 60, &InputProof::for_value(60))
        .unwrap();
    assert_eq!(engine.position(&id).unwrap().assets().reveal(), 160);

    engine.start_liquidation(&liquidator, &id, false).unwrap();
    engine
        .complete_liquidation(
            &liquidator,
            &id,
            160,
            &InputProof::for_value(160),
            200,
            &InputProof::for_value(200),
        )
        .unwrap();

    let position = engine.position(&id).unwrap();
    assert_eq!(position.status(), PositionStatus::Liquidated);
    assert_eq!(position.debt().reveal(), 0);
    assert!(!position.is_active());

    let profile = engine.manager_summary(&acme).unwrap();
    assert_eq!(profile.liquidated_positions, 1);
    assert_eq!(
        profile.credit_rating,
        INITIAL_CREDIT_RATING - LIQUIDATION_RATING_PENALTY
    );
    assert_eq!(engine.aggregates().liquidated_positions(), 1);
}

/// Partial intent keeps the position alive until a round clears the
/// remaining debt.
#[test]
fn partial_liquidation_takes_two_rounds() {
    let (mut engine, liquidator) = engine_with_liquidator();
    let acme = ActorId::new("ACME-TREASURY");
    let id = PositionId::new("ACME-03");

    engine
        .open_position(&acme, id.clone(), None, inputs(100, 200, 250))
        .unwrap();
    review(&mut engine, &acme, &id);
    engine.start_liquidation(&liquidator, &id, true).unwrap();
    assert_eq!(
        engine.position(&id).unwrap().status(),
        PositionStatus::PartialLiquidated
    );

    engine
        .complete_liquidation(
            &liquidator,
            &id,
            50,
            &InputProof::for_value(50),
            120,
            &InputProof::for_value(120),
        )
        .unwrap();
    let position = engine.position(&id).unwrap();
    assert_eq!(position.status(), PositionStatus::PartialLiquidated);
    assert_eq!(position.debt().reveal(), 80);
    assert!(position.is_active());

    engine
        .complete_liquidation(
            &liquidator,
            &id,
            30,
            &InputProof::for_value(30),
            80,
            &InputProof::for_value(80),
        )
        .unwrap();
    let position = engine.position(&id).unwrap();
    assert_eq!(position.status(), PositionStatus::Liquidated);
    assert_eq!(position.liquidations().len(), 2);
    assert!(position.liquidations()[1].is_complete);
}

/// A segment override changes both the thresholds and the risk score of
/// positions in that segment, and nothing else.
#[test]
fn segment_policy_reshapes_evaluation() {
    let (mut engine, _) = engine_with_liquidator();
    let council = ActorId::new("COUNCIL");
    let acme = ActorId::new("ACME-TREASURY");
    let key = SegmentKey::new("mid-market");

    let mut tight = PoolPolicy::default();
    tight.collateral_ratio_threshold_bps = 25_000;
    engine
        .set_segment_policy(&council, key.clone(), tight, 40, &InputProof::for_value(40))
        .unwrap();

    let in_segment = PositionId::new("SEG-01");
    let outside = PositionId::new("DEF-01");
    engine
        .open_position(&acme, in_segment.clone(), Some(key), inputs(200, 100, 250))
        .unwrap();
    engine
        .open_position(&acme, outside.clone(), None, inputs(200, 100, 250))
        .unwrap();

    review(&mut engine, &acme, &in_segment);
    review(&mut engine, &acme, &outside);

    // ratio = 250 * 10000 / 126 = 19841: healthy by default policy,
    // below the segment's 25000 threshold.
    let seg_summary = engine.review_summary(&in_segment).unwrap();
    let def_summary = engine.review_summary(&outside).unwrap();
    assert_eq!(seg_summary.collateral_ratio_bps, def_summary.collateral_ratio_bps);
    assert_eq!(def_summary.health_band, 4);
    assert_eq!(seg_summary.health_band, 2);
    assert_eq!(
        engine.position(&in_segment).unwrap().status(),
        PositionStatus::Monitored
    );
    assert_eq!(
        engine.position(&outside).unwrap().status(),
        PositionStatus::Active
    );
    // Stress boost folds into the segment's risk score only.
    assert_eq!(def_summary.risk_score, 250);
    assert_eq!(seg_summary.risk_score, 290);
}

/// The oracle arena applies each callback exactly once.
#[test]
fn callback_applies_exactly_once() {
    let (mut engine, _) = engine_with_liquidator();
    let acme = ActorId::new("ACME-TREASURY");
    let id = PositionId::new("ACME-04");
    engine
        .open_position(&acme, id.clone(), None, inputs(800, 0, 400))
        .unwrap();

    let request_id = engine.request_review(&acme, &id).unwrap();
    let values: Vec<i128> = engine
        .oracle()
        .pending_request(request_id)
        .unwrap()
        .handles
        .iter()
        .map(|h| h.reveal())
        .collect();

    engine.oracle_callback(request_id, &values).unwrap();
    assert_eq!(engine.oracle().pending_count(), 0);
    let err = engine.oracle_callback(request_id, &values).unwrap_err();
    assert!(matches!(err, EngineError::RequestNotFound(_)));
    // Counters unchanged by the rejected duplicate.
    assert_eq!(engine.position(&id).unwrap().review_count(), 1);
}

/// Pool aggregates stay equal to the sum over live positions through a
/// mixed mutation sequence.
#[test]
fn aggregates_match_position_totals() {
    let (mut engine, liquidator) = engine_with_liquidator();
    let acme = ActorId::new("ACME-TREASURY");
    let globex = ActorId::new("GLOBEX");

    engine
        .open_position(&acme, PositionId::new("A-1"), None, inputs(800, 0, 400))
        .unwrap();
    engine
        .open_position(&acme, PositionId::new("A-2"), None, inputs(100, 200, 250))
        .unwrap();
    engine
        .open_position(&globex, PositionId::new("G-1"), None, inputs(600, 50, 300))
        .unwrap();

    engine
        .draw_credit(&acme, &PositionId::new("A-1"), 120, &InputProof::for_value(120))
        .unwrap();
    engine
        .repay_credit(&acme, &PositionId::new("A-1"), 70, &InputProof::for_value(70))
        .unwrap();
    engine
        .record_top_up(&globex, &PositionId::new("G-1"), 90, &InputProof::for_value(90))
        .unwrap();

    review(&mut engine, &acme, &PositionId::new("A-2"));
    engine
        .start_liquidation(&liquidator, &PositionId::new("A-2"), false)
        .unwrap();
    engine
        .complete_liquidation(
            &liquidator,
            &PositionId::new("A-2"),
            100,
            &InputProof::for_value(100),
            200,
            &InputProof::for_value(200),
        )
        .unwrap();

    let ids = ["A-1", "A-2", "G-1"];
    let mut asset_sum = 0;
    let mut debt_sum = 0;
    for id in ids {
        let position = engine.position(&PositionId::new(id)).unwrap();
        asset_sum += position.assets().reveal();
        debt_sum += position.debt().reveal();
    }
    assert_eq!(engine.aggregates().total_assets().reveal(), asset_sum);
    assert_eq!(engine.aggregates().total_debt().reveal(), debt_sum);
    assert_eq!(engine.aggregates().total_credit_line().reveal(), 950);
}

/// Role checks on every restricted surface.
#[test]
fn restricted_surfaces_reject_unauthorized_callers() {
    let (mut engine, _) = engine_with_liquidator();
    let acme = ActorId::new("ACME-TREASURY");
    let mallory = ActorId::new("MALLORY");
    let id = PositionId::new("ACME-05");
    engine
        .open_position(&acme, id.clone(), None, inputs(100, 200, 250))
        .unwrap();
    review(&mut engine, &acme, &id);

    assert!(matches!(
        engine.start_liquidation(&mallory, &id, false),
        Err(EngineError::Unauthorized { .. })
    ));
    assert!(matches!(
        engine.flag_position(&mallory, &id),
        Err(EngineError::Unauthorized { .. })
    ));
    assert!(matches!(
        engine.update_default_policy(&mallory, PoolPolicy::default()),
        Err(EngineError::Unauthorized { .. })
    ));
    assert!(matches!(
        engine.grant_role(&mallory, mallory.clone(), Role::Liquidator),
        Err(EngineError::Unauthorized { .. })
    ));
    // The governor holds every role implicitly.
    engine
        .flag_position(&ActorId::new("GOV"), &id)
        .unwrap();
}

/// The audit stream for one position reflects its lifecycle in order.
#[test]
fn event_stream_follows_the_lifecycle() {
    let (mut engine, liquidator) = engine_with_liquidator();
    let acme = ActorId::new("ACME-TREASURY");
    let id = PositionId::new("ACME-06");

    engine
        .open_position(&acme, id.clone(), None, inputs(100, 200, 250))
        .unwrap();
    review(&mut engine, &acme, &id);
    engine.start_liquidation(&liquidator, &id, false).unwrap();
    engine
        .complete_liquidation(
            &liquidator,
            &id,
            100,
            &InputProof::for_value(100),
            200,
            &InputProof::for_value(200),
        )
        .unwrap();

    let kinds: Vec<&'static str> = engine
        .events()
        .for_position(&id)
        .map(|event| match event {
            EngineEvent::PositionOpened { .. } => "opened",
            EngineEvent::StatusChanged { .. } => "status",
            EngineEvent::ReviewRequested { .. } => "review_requested",
            EngineEvent::ReviewCompleted { .. } => "review_completed",
            EngineEvent::LiquidationStarted { .. } => "liquidation_started",
            EngineEvent::LiquidationCompleted { .. } => "liquidation_completed",
            _ => "other",
        })
        .collect();
    assert_eq!(
        kinds,
        vec![
            "opened",
            "status", // Draft -> Active
            "review_requested",
            "status", // Active -> Undercollateralized
            "review_completed",
            "status", // -> Liquidating
            "liquidation_started",
            "status", // -> Liquidated
            "liquidation_completed",
        ]
    );
}

/// Interest accrual folds the reviewed rate into the encrypted field.
#[test]
fn interest_accrues_at_the_reviewed_rate() {
    let (mut engine, _) = engine_with_liquidator();
    let acme = ActorId::new("ACME-TREASURY");
    let id = PositionId::new("ACME-07");
    engine
        .open_position(&acme, id.clone(), None, inputs(800, 0, 400))
        .unwrap();
    engine
        .draw_credit(&acme, &id, 200, &InputProof::for_value(200))
        .unwrap();
    review(&mut engine, &acme, &id);

    engine.accrue_interest(&acme, &id).unwrap();
    // 200 * 310 / 10000
    assert_eq!(engine.position(&id).unwrap().accrued_interest().reveal(), 6);
    engine.accrue_interest(&acme, &id).unwrap();
    assert_eq!(engine.position(&id).unwrap().accrued_interest().reveal(), 12);
}
