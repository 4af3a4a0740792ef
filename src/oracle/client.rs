use crate::core::cipher::CipherValue;
use crate::core::error::EngineError;
use crate::core::position::PositionId;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use uuid::Uuid;

/// Number of plaintext values a health-review callback must carry:
/// health band, stability tier, collateral ratio, risk score,
/// liquidity score, interest rate — in that order.
pub const REVIEW_CALLBACK_ARITY: usize = 6;

/// One outstanding decryption request.
///
/// The deadline is advisory: the core never enforces it. A request the
/// oracle never answers simply stays pending; the position keeps its
/// prior status and a fresh review (after the cooldown) is the only
/// recovery path.
#[derive(Debug, Clone)]
pub struct PendingRequest {
    pub id: Uuid,
    pub position: PositionId,
    pub handles: Vec<CipherValue>,
    pub requested_at: DateTime<Utc>,
    pub deadline: DateTime<Utc>,
    pub fee_budget: u64,
    pub urgent: bool,
}

impl PendingRequest {
    pub fn is_lapsed(&self, now: DateTime<Utc>) -> bool {
        now > self.deadline
    }
}

/// Correlates outstanding decryption requests to positions.
///
/// An arena keyed by request id: inserted on submit, removed exactly
/// once on a valid callback. Never a blocking call.
#[derive(Debug, Clone, Default)]
pub struct DecryptionOracleClient {
    pending: HashMap<Uuid, PendingRequest>,
}

impl DecryptionOracleClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Submit an ordered list of ciphertext handles for decryption.
    /// Returns the request id the callback must quote.
    pub fn submit(
        &mut self,
        position: PositionId,
        handles: Vec<CipherValue>,
        window_secs: i64,
        fee_budget: u64,
        urgent: bool,
        now: DateTime<Utc>,
    ) -> Uuid {
        let id = Uuid::new_v4();
        let request = PendingRequest {
            id,
            position,
            handles,
            requested_at: now,
            deadline: now + Duration::seconds(window_secs),
            fee_budget,
            urgent,
        };
        log::debug!(
            "oracle request {} for position {} ({} handles, deadline {})",
            id,
            request.position,
            request.handles.len(),
            request.deadline
        );
        self.pending.insert(id, request);
        id
    }

    /// Validate a callback payload against the arena without consuming
    /// the request. Unknown id or wrong arity is a malformed callback
    /// with no state effect; a duplicate callback for an already
    /// cleared id falls under the unknown-id case.
    pub fn validate_callback(
        &self,
        request_id: Uuid,
        values: &[i128],
    ) -> Result<&PendingRequest, EngineError> {
        let request = self
            .pending
            .get(&request_id)
            .ok_or(EngineError::RequestNotFound(request_id))?;
        if values.len() != REVIEW_CALLBACK_ARITY {
            return Err(EngineError::MalformedCallback {
                reason: format!(
                    "expected {} values, got {}",
                    REVIEW_CALLBACK_ARITY,
                    values.len()
                ),
            });
        }
        Ok(request)
    }

    /// Remove a request once its callback has been fully applied.
    pub fn complete(&mut self, request_id: Uuid) -> Option<PendingRequest> {
        self.pending.remove(&request_id)
    }

    pub fn pending_request(&self, request_id: Uuid) -> Option<&PendingRequest> {
        self.pending.get(&request_id)
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Request ids currently pending, in no particular order.
    pub fn pending_ids(&self) -> Vec<Uuid> {
        self.pending.keys().copied().collect()
    }
}
