use credit_engine::core::actor::ActorId;
use credit_engine::core::cipher::{CipherValue, InputProof};
use credit_engine::core::error::EngineError;
use credit_engine::core::position::{status_for_band, EncryptedInputs, PositionId, PositionStatus};
use credit_engine::engine::store::CreditEngine;
use credit_engine::simulation::oracle_sim::SimulatedOracle;
use proptest::prelude::*;

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

/// One borrower movement: a draw or a repayment.
#[derive(Debug, Clone, Copy)]
enum Movement {
    Draw(i128),
    Repay(i128),
}

fn arb_movement() -> impl Strategy<Value = Movement> {
    prop_oneof![
        (1i128..500).prop_map(Movement::Draw),
        (1i128..500).prop_map(Movement::Repay),
    ]
}

fn arb_opening() -> impl Strategy<Value = (i128, i128, i128)> {
    (0i128..5_000, 0i128..2_000, 1i128..2_000)
}

proptest! {
    // ===================================================================
    // INVARIANT 1: drawn never exceeds the credit line, and debt never
    // goes negative, for any sequence of draws and repayments.
    // A rejected draw must leave the position untouched.
    // ===================================================================
    #[test]
    fn drawn_bounded_by_credit_line(
        credit_line in 1i128..1_000,
        movements in prop::collection::vec(arb_movement(), 0..30),
    ) {
        let acme = ActorId::new("ACME");
        let id = PositionId::new("P-1");
        let mut engine = CreditEngine::new(ActorId::new("GOV"), ActorId::new("COUNCIL"));
        engine
            .open_position(&acme, id.clone(), None, inputs(10_000, 0, credit_line))
            .unwrap();

        for movement in movements {
            match movement {
                Movement::Draw(amount) => {
                    let before_drawn = engine.position(&id).unwrap().drawn().reveal();
                    let result =
                        engine.draw_credit(&acme, &id, amount, &InputProof::for_value(amount));
                    let position = engine.position(&id).unwrap();
                    if result.is_err() {
                        prop_assert!(matches!(
                            result.unwrap_err(),
                            EngineError::CreditLimitExceeded
                        ));
                        prop_assert_eq!(position.drawn().reveal(), before_drawn);
                    }
                    prop_assert!(position.drawn().reveal() <= credit_line);
                }
                Movement::Repay(amount) => {
                    engine
                        .repay_credit(&acme, &id, amount, &InputProof::for_value(amount))
                        .unwrap();
                }
            }
            let position = engine.position(&id).unwrap();
            prop_assert!(position.debt().reveal() >= 0);
            prop_assert!(position.drawn().reveal() >= 0);
        }
    }

    // ===================================================================
    // INVARIANT 2: pool aggregates equal the sum over positions after
    // any portfolio of openings and borrower movements.
    // ===================================================================
    #[test]
    fn aggregates_are_consistent(
        openings in prop::collection::vec(arb_opening(), 1..10),
        movements in prop::collection::vec((0usize..10, arb_movement()), 0..40),
    ) {
        let acme = ActorId::new("ACME");
        let mut engine = CreditEngine::new(ActorId::new("GOV"), ActorId::new("COUNCIL"));
        let ids: Vec<PositionId> = openings
            .iter()
            .enumerate()
            .map(|(i, _)| PositionId::new(format!("P-{}", i)))
            .collect();
        for (id, &(assets, debt, credit_line)) in ids.iter().zip(&openings) {
            engine
                .open_position(&acme, id.clone(), None, inputs(assets, debt, credit_line))
                .unwrap();
        }

        for (index, movement) in movements {
            let id = &ids[index % ids.len()];
            match movement {
                Movement::Draw(amount) => {
                    // Out-of-line draws are rejected; both paths keep
                    // the invariant.
                    let _ = engine.draw_credit(&acme, id, amount, &InputProof::for_value(amount));
                }
                Movement::Repay(amount) => {
                    engine
                        .repay_credit(&acme, id, amount, &InputProof::for_value(amount))
                        .unwrap();
                }
            }
        }

        let mut asset_sum = 0i128;
        let mut debt_sum = 0i128;
        let mut drawn_sum = 0i128;
        for id in &ids {
            let position = engine.position(id).unwrap();
            asset_sum += position.assets().reveal();
            debt_sum += position.debt().reveal();
            drawn_sum += position.drawn().reveal();
        }
        prop_assert_eq!(engine.aggregates().total_assets().reveal(), asset_sum);
        prop_assert_eq!(engine.aggregates().total_debt().reveal(), debt_sum);
        prop_assert_eq!(engine.aggregates().total_drawn().reveal(), drawn_sum);
    }

    // ===================================================================
    // INVARIANT 3: a review callback applies exactly once. The second
    // delivery is rejected and changes nothing.
    // ===================================================================
    #[test]
    fn callbacks_apply_exactly_once(
        assets in 0i128..2_000,
        debt in 0i128..2_000,
    ) {
        let acme = ActorId::new("ACME");
        let id = PositionId::new("P-1");
        let mut engine = CreditEngine::new(ActorId::new("GOV"), ActorId::new("COUNCIL"));
        engine
            .open_position(&acme, id.clone(), None, inputs(assets, debt, 500))
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

        let status = engine.position(&id).unwrap().status();
        let changes = engine.position(&id).unwrap().status_change_count();

        let result = engine.oracle_callback(request_id, &values);
        prop_assert!(matches!(result, Err(EngineError::RequestNotFound(_))));
        prop_assert_eq!(engine.position(&id).unwrap().status(), status);
        prop_assert_eq!(engine.position(&id).unwrap().status_change_count(), changes);
    }

    // ===================================================================
    // INVARIANT 4: the decrypted band always lands the position on the
    // status the band mapping names, and that status is in the health
    // family.
    // ===================================================================
    #[test]
    fn review_lands_on_the_mapped_status(
        assets in 0i128..2_000,
        debt in 0i128..2_000,
        covenant in 0i128..100,
        risk in 0i128..10,
        liquidity in 0i128..100,
    ) {
        let acme = ActorId::new("ACME");
        let id = PositionId::new("P-1");
        let mut engine = CreditEngine::new(ActorId::new("GOV"), ActorId::new("COUNCIL"));
        let mut opening = inputs(assets, debt, 500);
        opening.covenant_score = CipherValue::encrypt(covenant);
        opening.risk_level = CipherValue::encrypt(risk);
        opening.liquidity_score = CipherValue::encrypt(liquidity);
        engine.open_position(&acme, id.clone(), None, opening).unwrap();

        let request_id = engine.request_review(&acme, &id).unwrap();
        SimulatedOracle::new().answer(&mut engine, request_id).unwrap();

        let summary = engine.review_summary(&id).unwrap();
        prop_assert!((0..=4).contains(&summary.health_band));
        let expected = status_for_band(summary.health_band);
        prop_assert_eq!(engine.position(&id).unwrap().status(), expected);
        prop_assert!(engine.position(&id).unwrap().status().in_health_family());
    }

    // ===================================================================
    // INVARIANT 5: counters are monotone. Reviews and rebalances only
    // ever increase, and only on successful calls.
    // ===================================================================
    #[test]
    fn counters_only_move_on_success(attempts in 1usize..5) {
        let acme = ActorId::new("ACME");
        let id = PositionId::new("P-1");
        let mut engine = CreditEngine::new(ActorId::new("GOV"), ActorId::new("COUNCIL"));
        engine
            .open_position(&acme, id.clone(), None, inputs(2_000, 0, 500))
            .unwrap();

        engine.request_review(&acme, &id).unwrap();
        for _ in 0..attempts {
            // Blocked while the first request is pending.
            prop_assert!(engine.request_review(&acme, &id).is_err());
        }
        prop_assert_eq!(engine.position(&id).unwrap().review_count(), 1);

        // Rebalance from a healthy state never succeeds, and never
        // moves the counter.
        for _ in 0..attempts {
            prop_assert!(engine.initiate_rebalance(&acme, &id).is_err());
        }
        prop_assert_eq!(engine.position(&id).unwrap().rebalance_count(), 0);
    }
}

#[test]
fn status_for_band_is_total() {
    for band in -10i128..10 {
        let status = status_for_band(band);
        assert!(matches!(
            status,
            PositionStatus::Active
                | PositionStatus::Monitored
                | PositionStatus::Warning
                | PositionStatus::Undercollateralized
        ));
    }
}
