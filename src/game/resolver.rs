//! Round resolution.
//!
//! A round runs through a fixed sequence of phases on a working copy of
//! the state. Each apply phase re-validates its actions against the live
//! copy, so effects of earlier actions in the same round are visible.
//! The copy replaces the committed state only if every invariant holds.

use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, error, trace};

use crate::error::StateInvariantViolation;
use crate::game::{
    Action, ActionKind, ActionRequest, EntityId, FlagId, FlagState, MatchResult, MatchState,
    RejectedAction, Rejection, RoundEvent, RoundSnapshot, RuleConfig, check_invariants,
    check_win, validate, validate_pending,
};

/// Resolution phases, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// One request per live entity.
    Collect,
    /// Check every request against the pre-round state.
    Validate,
    /// Sort by ascending entity id.
    Order,
    /// Moves.
    ApplyMovement,
    /// Attacks and heals.
    ApplyCombat,
    /// Pickups, drops, captures and flag return timers.
    ApplyFlags,
    /// Upgrade timers and purchases, cooldown recovery, removal of the dead.
    ApplyCooldowns,
    /// Win conditions.
    CheckWin,
    /// Final invariant check and snapshot.
    Commit,
}

impl Phase {
    /// Human-readable phase name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Phase::Collect => "collect",
            Phase::Validate => "validate",
            Phase::Order => "order",
            Phase::ApplyMovement => "apply-movement",
            Phase::ApplyCombat => "apply-combat",
            Phase::ApplyFlags => "apply-flags",
            Phase::ApplyCooldowns => "apply-cooldowns",
            Phase::CheckWin => "check-win",
            Phase::Commit => "commit",
        }
    }
}

/// Whether the match goes on after a round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundOutcome {
    /// Play another round.
    Continue,
    /// The match is decided.
    MatchOver(MatchResult),
}

/// Result of resolving one round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundReport {
    /// Committed deltas.
    pub snapshot: RoundSnapshot,
    /// Continue or stop.
    pub outcome: RoundOutcome,
    /// Requests turned into no-ops, in the order they were refused.
    pub rejections: Vec<RejectedAction>,
}

/// Resolve one round and commit it to `state`.
///
/// Illegal requests never fail the round; they are returned as rejections.
/// Requests for unknown or dead entities are rejected, live entities without
/// a request do nothing, and a second request for the same entity is ignored.
///
/// # Errors
///
/// Returns [`StateInvariantViolation`] if the state is inconsistent after any
/// phase. `state` is left at the previous committed round in that case.
pub fn resolve_round(
    state: &mut MatchState,
    rules: &RuleConfig,
    requests: &[ActionRequest],
) -> Result<RoundReport, StateInvariantViolation> {
    let round = state.round + 1;
    let _span = tracing::debug_span!("round", round).entered();
    let mut rejections = Vec::new();

    trace!(phase = Phase::Collect.name());
    let mut collected: BTreeMap<_, ActionRequest> = BTreeMap::new();
    for request in requests {
        if state.entities.live(request.entity).is_none() {
            reject(&mut rejections, *request, Rejection::DeadEntity);
            continue;
        }
        if collected.contains_key(&request.entity) {
            debug!(entity = %request.entity, "duplicate request ignored");
            continue;
        }
        collected.insert(request.entity, *request);
    }
    for id in state.entities.live_ids() {
        collected
            .entry(id)
            .or_insert_with(|| ActionRequest::noop(id));
    }

    trace!(phase = Phase::Validate.name());
    let mut ordered = Vec::with_capacity(collected.len());
    for request in collected.into_values() {
        match validate_pending(state, rules, &request) {
            Ok(()) => ordered.push(request),
            Err(reason) => reject(&mut rejections, request, reason),
        }
    }

    trace!(phase = Phase::Order.name());
    ordered.sort_by_key(|r| r.entity);

    let mut round_state = RoundState {
        next: state.clone(),
        rules,
        events: Vec::new(),
        rejections,
        ordered: &ordered,
    };
    round_state.next.round = round;
    let previously_dropped: BTreeSet<FlagId> = state
        .flags
        .iter()
        .filter(|f| f.state == FlagState::Dropped)
        .map(|f| f.id)
        .collect();

    round_state.apply_movement();
    round_state.verify(Phase::ApplyMovement)?;
    round_state.apply_combat();
    round_state.verify(Phase::ApplyCombat)?;
    round_state.apply_flags(&previously_dropped);
    round_state.verify(Phase::ApplyFlags)?;
    round_state.apply_cooldowns();
    round_state.verify(Phase::ApplyCooldowns)?;

    trace!(phase = Phase::CheckWin.name());
    let outcome = match check_win(&round_state.next, rules) {
        Some(result) => RoundOutcome::MatchOver(result),
        None => RoundOutcome::Continue,
    };

    round_state.verify(Phase::Commit)?;
    let RoundState {
        next,
        events,
        rejections,
        ..
    } = round_state;
    let snapshot = RoundSnapshot::diff(state, &next, events);
    *state = next;

    Ok(RoundReport {
        snapshot,
        outcome,
        rejections,
    })
}

fn reject(rejections: &mut Vec<RejectedAction>, request: ActionRequest, reason: Rejection) {
    debug!(
        entity = %request.entity,
        action = ?request.action,
        %reason,
        "action rejected"
    );
    rejections.push(RejectedAction { request, reason });
}

/// Working copy of one round in progress.
struct RoundState<'a> {
    next: MatchState,
    rules: &'a RuleConfig,
    events: Vec<RoundEvent>,
    rejections: Vec<RejectedAction>,
    ordered: &'a [ActionRequest],
}

impl RoundState<'_> {
    /// Ordered requests handled by one phase.
    fn of_kind(&self, kind: ActionKind) -> Vec<ActionRequest> {
        self.ordered
            .iter()
            .filter(|r| r.action.kind() == kind)
            .copied()
            .collect()
    }

    /// Re-validate against the live copy, recording a rejection on failure.
    fn admit(&mut self, request: &ActionRequest) -> bool {
        match validate(&self.next, self.rules, request) {
            Ok(()) => true,
            Err(reason) => {
                reject(&mut self.rejections, *request, reason);
                false
            }
        }
    }

    fn apply_movement(&mut self) {
        trace!(phase = Phase::ApplyMovement.name());
        for request in self.of_kind(ActionKind::Movement) {
            let Action::Move { to } = request.action else {
                continue;
            };
            if !self.admit(&request) {
                continue;
            }
            let Some(entity) = self.next.entities.get_mut(request.entity) else {
                continue;
            };
            entity.position = to;
            entity.movement_cooldown = entity
                .movement_cooldown
                .saturating_add(self.rules.move_cooldown);
            if let Some(flag_id) = entity.carried_flag
                && let Some(flag) = self.next.flags.get_mut(flag_id)
            {
                flag.position = to;
            }
        }
    }

    fn apply_combat(&mut self) {
        trace!(phase = Phase::ApplyCombat.name());
        for request in self.of_kind(ActionKind::Combat) {
            if !self.admit(&request) {
                continue;
            }
            match request.action {
                Action::Attack { target } => self.attack(request.entity, target),
                Action::Heal { target } => self.heal(request.entity, target),
                _ => {}
            }
        }
    }

    fn attack(&mut self, attacker: EntityId, target: EntityId) {
        if let Some(entity) = self.next.entities.get_mut(attacker) {
            entity.action_cooldown = entity
                .action_cooldown
                .saturating_add(self.rules.attack_cooldown);
        }
        self.events.push(RoundEvent::Attack { attacker, target });

        let Some(victim) = self.next.entities.get_mut(target) else {
            return;
        };
        if !victim.take_damage(self.rules.attack_damage) {
            return;
        }
        let team = victim.team;
        let position = victim.position;
        let carried = victim.carried_flag.take();
        self.events.push(RoundEvent::Death { entity: target });

        if let Some(flag_id) = carried {
            let delay = self.next.flag_return_delay(team, self.rules);
            if let Some(flag) = self.next.flags.get_mut(flag_id) {
                flag.drop_at(position, delay);
            }
            self.events.push(RoundEvent::Drop {
                entity: target,
                flag: flag_id,
            });
        }
    }

    fn heal(&mut self, healer: EntityId, target: EntityId) {
        let Some(team) = self.next.entities.get(healer).map(|e| e.team) else {
            return;
        };
        let amount = self.next.heal_amount(team, self.rules);
        if let Some(entity) = self.next.entities.get_mut(healer) {
            entity.action_cooldown = entity
                .action_cooldown
                .saturating_add(self.rules.heal_cooldown);
        }
        if let Some(entity) = self.next.entities.get_mut(target) {
            entity.heal(amount, self.rules.max_health);
        }
        self.events.push(RoundEvent::Heal { healer, target });
    }

    fn apply_flags(&mut self, previously_dropped: &BTreeSet<FlagId>) {
        trace!(phase = Phase::ApplyFlags.name());
        for request in self.of_kind(ActionKind::Flag) {
            if !self.admit(&request) {
                continue;
            }
            let Some(entity) = self.next.entities.get_mut(request.entity) else {
                continue;
            };
            entity.action_cooldown = entity
                .action_cooldown
                .saturating_add(self.rules.flag_cooldown);
            let team = entity.team;
            let position = entity.position;

            match request.action {
                Action::PickupFlag { flag } => {
                    entity.carried_flag = Some(flag);
                    if let Some(record) = self.next.flags.get_mut(flag) {
                        record.pick_up(request.entity, position);
                    }
                    self.events.push(RoundEvent::Pickup {
                        entity: request.entity,
                        flag,
                    });
                }
                Action::DropFlag => {
                    let Some(flag) = entity.carried_flag.take() else {
                        continue;
                    };
                    let delay = self.next.flag_return_delay(team, self.rules);
                    if let Some(record) = self.next.flags.get_mut(flag) {
                        record.drop_at(position, delay);
                    }
                    self.events.push(RoundEvent::Drop {
                        entity: request.entity,
                        flag,
                    });
                }
                _ => {}
            }
        }

        // Captures: carriers standing in their own spawn zone
        let grid = &self.next.grid;
        let mut captures = Vec::new();
        for entity in self.next.entities.iter_mut().filter(|e| e.alive) {
            let in_zone = grid
                .terrain_at(entity.position)
                .is_ok_and(|t| t.spawn_team() == Some(entity.team));
            if in_zone && let Some(flag) = entity.carried_flag.take() {
                captures.push((entity.id, entity.team, entity.position, flag));
            }
        }
        for (entity, team, position, flag) in captures {
            if let Some(record) = self.next.flags.get_mut(flag) {
                record.capture(position);
            }
            self.next.ledger_mut(team).captures += 1;
            self.events.push(RoundEvent::Capture { entity, flag });
        }

        // Return timers of flags that were already lying on the ground
        for flag in self.next.flags.iter_mut() {
            if previously_dropped.contains(&flag.id) && flag.tick_return() {
                self.events.push(RoundEvent::Return { flag: flag.id });
            }
        }
    }

    fn apply_cooldowns(&mut self) {
        trace!(phase = Phase::ApplyCooldowns.name());
        if self.rules.grants_upgrade_point(self.next.round) {
            for ledger in &mut self.next.ledgers {
                ledger.upgrade_points += 1;
            }
        }

        for request in self.of_kind(ActionKind::Upgrade) {
            let Action::BuyUpgrade { upgrade } = request.action else {
                continue;
            };
            if !self.admit(&request) {
                continue;
            }
            let Some(team) = self.next.entities.get(request.entity).map(|e| e.team) else {
                continue;
            };
            if self.next.upgrades.activate(team, upgrade) {
                let ledger = self.next.ledger_mut(team);
                ledger.upgrade_points = ledger.upgrade_points.saturating_sub(1);
                self.events
                    .push(RoundEvent::UpgradePurchase { team, upgrade });
            }
        }

        let recovery: Vec<_> = self
            .next
            .entities
            .alive()
            .map(|e| (e.id, self.next.recovery(e.team, e.position, self.rules)))
            .collect();
        for (id, amount) in recovery {
            if let Some(entity) = self.next.entities.get_mut(id) {
                entity.action_cooldown = entity.action_cooldown.saturating_sub(amount);
                entity.movement_cooldown = entity.movement_cooldown.saturating_sub(amount);
            }
        }

        self.next.entities.remove_dead();
    }

    fn verify(&self, phase: Phase) -> Result<(), StateInvariantViolation> {
        let violations = check_invariants(&self.next, self.rules);
        if violations.is_empty() {
            return Ok(());
        }
        let err = StateInvariantViolation {
            round: self.next.round,
            phase: phase.name(),
            violations,
            diagnostic: diagnostic(self.ordered),
        };
        error!(%err, "state invariant violated");
        Err(err)
    }
}

/// Dump of a round's ordered requests, one per line.
fn diagnostic(ordered: &[ActionRequest]) -> String {
    ordered
        .iter()
        .map(|r| format!("{} {:?}", r.entity, r.action))
        .collect::<Vec<_>>()
        .join("\n")
}
