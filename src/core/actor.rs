use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Identifier for a principal acting on the engine.
///
/// An actor can be a borrower's position manager, the governor, a risk
/// council member, a liquidator or an auditor. How identities are
/// produced (addresses, account names) is outside the core; the engine
/// only compares them.
///
/// # Examples
///
/// ```
/// use credit_engine::core::actor::ActorId;
///
/// let acme = ActorId::new("ACME-TREASURY");
/// let nadir = ActorId::new("NADIR-HOLDINGS");
/// assert_ne!(acme, nadir);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActorId(String);

impl ActorId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ActorId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Capabilities required by gated operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    Governor,
    Council,
    Liquidator,
    Auditor,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Role::Governor => "governor",
            Role::Council => "council",
            Role::Liquidator => "liquidator",
            Role::Auditor => "auditor",
        };
        write!(f, "{}", name)
    }
}

/// Role assignments for the administrative surface.
///
/// The governor transitively holds every role; council members hold
/// auditor capability. This is a capability check, not a generic RBAC
/// subsystem.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessControl {
    governor: ActorId,
    council: ActorId,
    liquidators: HashSet<ActorId>,
    auditors: HashSet<ActorId>,
}

impl AccessControl {
    pub fn new(governor: ActorId, council: ActorId) -> Self {
        Self {
            governor,
            council,
            liquidators: HashSet::new(),
            auditors: HashSet::new(),
        }
    }

    pub fn governor(&self) -> &ActorId {
        &self.governor
    }

    pub fn council(&self) -> &ActorId {
        &self.council
    }

    /// Does `caller` hold `required`?
    pub fn authorize(&self, caller: &ActorId, required: Role) -> bool {
        if caller == &self.governor {
            return true;
        }
        match required {
            Role::Governor => false,
            Role::Council => caller == &self.council,
            Role::Liquidator => self.liquidators.contains(caller),
            Role::Auditor => caller == &self.council || self.auditors.contains(caller),
        }
    }

    pub fn grant_liquidator(&mut self, actor: ActorId) {
        self.liquidators.insert(actor);
    }

    pub fn revoke_liquidator(&mut self, actor: &ActorId) -> bool {
        self.liquidators.remove(actor)
    }

    pub fn grant_auditor(&mut self, actor: ActorId) {
        self.auditors.insert(actor);
    }

    pub fn revoke_auditor(&mut self, actor: &ActorId) -> bool {
        self.auditors.remove(actor)
    }

    pub fn transfer_governance(&mut self, next: ActorId) {
        self.governor = next;
    }

    pub fn update_council(&mut self, next: ActorId) {
        self.council = next;
    }
}
