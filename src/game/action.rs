//! Actions submitted by agents and the reasons they can be refused.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::game::{Coord, EntityId, FlagId, GlobalUpgrade};

/// What an entity wants to do this round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Action {
    /// Do nothing.
    #[default]
    Noop,
    /// Step to an adjacent cell.
    Move {
        /// Destination cell.
        to: Coord,
    },
    /// Damage an enemy entity in range.
    Attack {
        /// Entity to hit.
        target: EntityId,
    },
    /// Restore health of a friendly entity in range.
    Heal {
        /// Entity to heal.
        target: EntityId,
    },
    /// Pick up an enemy flag lying on the entity's cell.
    PickupFlag {
        /// Flag to take.
        flag: FlagId,
    },
    /// Drop the carried flag on the entity's cell.
    DropFlag,
    /// Spend a team upgrade point.
    BuyUpgrade {
        /// Upgrade to activate.
        upgrade: GlobalUpgrade,
    },
}

impl Action {
    /// Which resolution phase handles this action.
    #[must_use]
    pub const fn kind(self) -> ActionKind {
        match self {
            Action::Noop => ActionKind::Noop,
            Action::Move { .. } => ActionKind::Movement,
            Action::Attack { .. } | Action::Heal { .. } => ActionKind::Combat,
            Action::PickupFlag { .. } | Action::DropFlag => ActionKind::Flag,
            Action::BuyUpgrade { .. } => ActionKind::Upgrade,
        }
    }
}

/// Resolution phase an action belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionKind {
    /// No effect.
    Noop,
    /// Applied in the movement phase.
    Movement,
    /// Applied in the combat phase.
    Combat,
    /// Applied in the flag phase.
    Flag,
    /// Applied in the cooldown phase, with the upgrade timers.
    Upgrade,
}

/// One entity's action for one round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ActionRequest {
    /// Acting entity.
    pub entity: EntityId,
    /// The action.
    pub action: Action,
}

impl ActionRequest {
    /// Create a request.
    #[must_use]
    pub const fn new(entity: EntityId, action: Action) -> Self {
        Self { entity, action }
    }

    /// A no-op for an entity.
    #[must_use]
    pub const fn noop(entity: EntityId) -> Self {
        Self::new(entity, Action::Noop)
    }
}

/// Why an action was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum Rejection {
    /// The acting entity does not exist or is dead.
    #[error("entity is dead or unknown")]
    DeadEntity,
    /// The relevant cooldown is above the action threshold.
    #[error("cooldown above threshold")]
    InsufficientCooldown,
    /// The target is too far away.
    #[error("target out of range")]
    OutOfRange,
    /// The target does not exist or cannot be targeted by this action.
    #[error("invalid target")]
    TargetInvalid,
    /// The destination is a wall or occupied.
    #[error("cell is blocked")]
    BlockedCell,
    /// The team lacks the resource the action spends.
    #[error("insufficient team resources")]
    InsufficientResources,
}

/// A refused request, as reported by the resolver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RejectedAction {
    /// The original request.
    pub request: ActionRequest,
    /// Why it was refused.
    pub reason: Rejection,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_kinds() {
        assert_eq!(Action::Noop.kind(), ActionKind::Noop);
        assert_eq!(Action::Move { to: Coord::new(1, 1) }.kind(), ActionKind::Movement);
        assert_eq!(Action::Heal { target: EntityId(2) }.kind(), ActionKind::Combat);
        assert_eq!(Action::DropFlag.kind(), ActionKind::Flag);
        assert_eq!(
            Action::BuyUpgrade { upgrade: GlobalUpgrade::Action }.kind(),
            ActionKind::Upgrade
        );
    }

    #[test]
    fn test_request_json_shape() {
        let request = ActionRequest::new(EntityId(3), Action::Attack { target: EntityId(4) });
        let json = serde_json::to_string(&request).unwrap();
        let back: ActionRequest = serde_json::from_str(&json).unwrap();
        assert_eq!(back, request);
        assert!(json.contains("Attack"));
    }
}
