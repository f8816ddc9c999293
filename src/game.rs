//! Game layer for flagfall.
//!
//! Implements the capture-the-flag rules:
//! - Grid with terrain, spawn zones and per-cell passability
//! - Entities with health and two cooldowns, flags with a lifecycle
//! - Team-wide upgrades as additive modifiers to the base rules
//! - Action validation and phased round resolution
//! - Win conditions and the round-limit tiebreak

mod action;
mod entity;
mod flag;
mod invariants;
mod map;
mod resolver;
mod rules;
mod snapshot;
mod state;
mod upgrade;
mod validator;
mod victory;

pub use action::{Action, ActionKind, ActionRequest, RejectedAction, Rejection};
pub use entity::{Entity, EntityId, EntityStore, Team};
pub use flag::{Flag, FlagId, FlagState, FlagTable};
pub use invariants::check_invariants;
pub use map::{Coord, Direction, Grid, GridSpec, Terrain, WALL_PASSABILITY};
pub use resolver::{Phase, RoundOutcome, RoundReport, resolve_round};
pub use rules::{RuleConfig, TiebreakMetric};
pub use snapshot::{EntityDelta, EntityRecord, FlagRecord, RoundEvent, RoundSnapshot, TeamDelta};
pub use state::{EntitySpawn, FlagSpawn, MatchSetup, MatchState, TeamLedger};
pub use upgrade::{GlobalUpgrade, UpgradeEffect, UpgradeRegistry, UpgradeTable, apply_delta};
pub use validator::{validate, validate_pending};
pub use victory::{MatchResult, WinReason, check_win, tiebreak};
