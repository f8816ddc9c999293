// Allow unwrap and unreadable literals in tests (test code is not production)
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::unreadable_literal))]
//! Flagfall: a deterministic capture-the-flag round engine.
//!
//! Two teams of entities fight over flags on a grid. Each round every live
//! entity submits one action; the engine validates and applies them in a
//! fixed phase order and appends the result to a binary replay log.
//!
//! - Bit-exact determinism: same setup, rules and agents give the same log
//! - Fuel budgets so slow agents lose their turn, not the match
//! - Illegal actions become no-ops; corrupt state aborts the match
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────┐
//! │   Match Controller (rayon agents)   │
//! ├─────────────────────────────────────┤
//! │   Round Resolver + Validator        │
//! ├─────────────────────────────────────┤
//! │   Game State (grid, entities, flags)│
//! ├─────────────────────────────────────┤
//! │   Replay Log (encode / decode)      │
//! └─────────────────────────────────────┘
//! ```

pub mod agent;
pub mod controller;
pub mod error;
pub mod game;
pub mod replay;

pub use agent::{Agent, AgentView, Budget, BudgetExhausted, Roster};
pub use controller::{Match, MatchReport, StopHandle};
pub use error::{
    ConfigError, DecodeError, EncodingError, GridError, MatchError, StateInvariantViolation,
};

// Re-export key game types at crate root for convenience
pub use game::{
    Action, ActionRequest, Coord, EntityId, FlagId, MatchResult, MatchSetup, MatchState,
    RuleConfig, Team, UpgradeTable, WinReason,
};
