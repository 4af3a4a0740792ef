use crate::core::position::{PositionId, PositionStatus};
use thiserror::Error;
use uuid::Uuid;

/// Errors surfaced by the credit engine.
///
/// Every operation is all-or-nothing: any error here means the call
/// aborted with no partial mutation. Nothing is retried internally;
/// re-requesting a lapsed review, for example, is an explicit caller
/// action.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("position '{0}' not found")]
    PositionNotFound(PositionId),

    #[error("position '{0}' already exists")]
    DuplicatePosition(PositionId),

    #[error("no pending decryption request with id {0}")]
    RequestNotFound(Uuid),

    #[error("manager profile for '{0}' not found")]
    ManagerNotFound(String),

    #[error("caller '{caller}' lacks required role {required}")]
    Unauthorized { caller: String, required: String },

    #[error("cannot {action} from status {status:?}")]
    InvalidState {
        status: PositionStatus,
        action: &'static str,
    },

    #[error("draw would exceed the credit line")]
    CreditLimitExceeded,

    #[error("review count has reached the policy maximum of {max}")]
    ReviewLimitReached { max: u32 },

    #[error("review cooldown has not elapsed")]
    ReviewCooldownActive,

    #[error("rebalance window has not elapsed")]
    RebalanceCooldownActive,

    #[error("a review is already pending for position '{0}'")]
    ReviewAlreadyPending(PositionId),

    #[error("no completed health review for position '{0}'")]
    ReviewNotComplete(PositionId),

    #[error("malformed oracle callback: {reason}")]
    MalformedCallback { reason: String },

    #[error("ciphertext proof does not commit to the submitted handle")]
    InvalidProof,

    #[error("position '{0}' is frozen")]
    PositionFrozen(PositionId),
}
