use crate::core::actor::{ActorId, Role};
use crate::core::policy::SegmentKey;
use crate::core::position::{PositionId, PositionStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Observability events consumed by external indexers and UI.
///
/// Every genuine state change emits exactly one event; self-transitions
/// emit none. Payloads carry only plaintext or inherently public data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EngineEvent {
    PositionOpened {
        position: PositionId,
        manager: ActorId,
        at: DateTime<Utc>,
    },
    StatusChanged {
        position: PositionId,
        old: PositionStatus,
        new: PositionStatus,
        at: DateTime<Utc>,
    },
    ReviewRequested {
        position: PositionId,
        request_id: Uuid,
        at: DateTime<Utc>,
    },
    ReviewCompleted {
        position: PositionId,
        request_id: Uuid,
        health_band: i128,
        at: DateTime<Utc>,
    },
    RebalanceInitiated {
        position: PositionId,
        urgency: u8,
        at: DateTime<Utc>,
    },
    RebalanceCompleted {
        position: PositionId,
        at: DateTime<Utc>,
    },
    LiquidationStarted {
        position: PositionId,
        is_partial: bool,
        at: DateTime<Utc>,
    },
    LiquidationCompleted {
        position: PositionId,
        finalized: bool,
        at: DateTime<Utc>,
    },
    CreditDrawn {
        position: PositionId,
        at: DateTime<Utc>,
    },
    CreditRepaid {
        position: PositionId,
        at: DateTime<Utc>,
    },
    PositionClosed {
        position: PositionId,
        at: DateTime<Utc>,
    },
    PositionFlagged {
        position: PositionId,
        at: DateTime<Utc>,
    },
    PositionFrozen {
        position: PositionId,
        frozen: bool,
        at: DateTime<Utc>,
    },
    PolicyUpdated {
        at: DateTime<Utc>,
    },
    SegmentPolicySet {
        segment: SegmentKey,
        at: DateTime<Utc>,
    },
    RoleGranted {
        actor: ActorId,
        role: Role,
        at: DateTime<Utc>,
    },
    RoleRevoked {
        actor: ActorId,
        role: Role,
        at: DateTime<Utc>,
    },
}

/// Append-only in-memory event sink, mirrored through `log`.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    events: Vec<EngineEvent>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, event: EngineEvent) {
        log::debug!("event: {:?}", event);
        self.events.push(event);
    }

    pub fn events(&self) -> &[EngineEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Events touching one position, in emission order.
    pub fn for_position<'a>(
        &'a self,
        id: &'a PositionId,
    ) -> impl Iterator<Item = &'a EngineEvent> + 'a {
        self.events.iter().filter(move |event| match event {
            EngineEvent::PositionOpened { position, .. }
            | EngineEvent::StatusChanged { position, .. }
            | EngineEvent::ReviewRequested { position, .. }
            | EngineEvent::ReviewCompleted { position, .. }
            | EngineEvent::RebalanceInitiated { position, .. }
            | EngineEvent::RebalanceCompleted { position, .. }
            | EngineEvent::LiquidationStarted { position, .. }
            | EngineEvent::LiquidationCompleted { position, .. }
            | EngineEvent::CreditDrawn { position, .. }
            | EngineEvent::CreditRepaid { position, .. }
            | EngineEvent::PositionClosed { position, .. }
            | EngineEvent::PositionFlagged { position, .. }
            | EngineEvent::PositionFrozen { position, .. } => position == id,
            _ => false,
        })
    }
}
