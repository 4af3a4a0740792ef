//! In-process stand-in for the decryption oracle.
//!
//! Answers pending requests by decrypting exactly the handles that were
//! queued, in their queued order, and feeding the plaintexts back
//! through the regular callback path. This is the one non-test call
//! site of [`CipherValue::reveal`].
//!
//! [`CipherValue::reveal`]: crate::core::cipher::CipherValue::reveal

use crate::core::error::EngineError;
use crate::engine::store::CreditEngine;
use uuid::Uuid;

/// Drives oracle callbacks for demos and simulations.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimulatedOracle;

impl SimulatedOracle {
    pub fn new() -> Self {
        Self
    }

    /// Answer one pending request.
    pub fn answer(&self, engine: &mut CreditEngine, request_id: Uuid) -> Result<(), EngineError> {
        let values: Vec<i128> = engine
            .oracle()
            .pending_request(request_id)
            .ok_or(EngineError::RequestNotFound(request_id))?
            .handles
            .iter()
            .map(|handle| handle.reveal())
            .collect();
        engine.oracle_callback(request_id, &values)
    }

    /// Answer every pending request; returns how many were answered.
    pub fn answer_all(&self, engine: &mut CreditEngine) -> Result<usize, EngineError> {
        let ids = engine.oracle().pending_ids();
        let count = ids.len();
        for request_id in ids {
            self.answer(engine, request_id)?;
        }
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::actor::ActorId;
    use crate::core::cipher::CipherValue;
    use crate::core::position::{EncryptedInputs, PositionId, PositionStatus};

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
    fn test_answer_all_drains_the_arena() {
        let mut engine = CreditEngine::new(ActorId::new("GOV"), ActorId::new("COUNCIL"));
        let acme = ActorId::new("ACME");
        for i in 0..3 {
            let id = PositionId::new(format!("P-{}", i));
            engine
                .open_position(&acme, id.clone(), None, inputs(500, 0, 200))
                .unwrap();
            engine.request_review(&acme, &id).unwrap();
        }
        assert_eq!(engine.oracle().pending_count(), 3);
        let answered = SimulatedOracle::new().answer_all(&mut engine).unwrap();
        assert_eq!(answered, 3);
        assert_eq!(engine.oracle().pending_count(), 0);
        for i in 0..3 {
            let id = PositionId::new(format!("P-{}", i));
            assert_eq!(
                engine.position(&id).unwrap().status(),
                PositionStatus::Active
            );
        }
    }

    #[test]
    fn test_answer_unknown_request_fails() {
        let mut engine = CreditEngine::new(ActorId::new("GOV"), ActorId::new("COUNCIL"));
        let err = SimulatedOracle::new()
            .answer(&mut engine, Uuid::new_v4())
            .unwrap_err();
        assert!(matches!(err, EngineError::RequestNotFound(_)));
    }
}
