//! Legality checks for a single action against a state.
//!
//! Checks run in a fixed order: liveness, cooldown, target, range, cell.
//! The first failing check decides the rejection reason.

use crate::game::{Action, ActionKind, ActionRequest, Coord, MatchState, Rejection, RuleConfig};

/// Decide whether `request` is legal in `state`. Never mutates.
///
/// # Errors
///
/// Returns the [`Rejection`] of the first failing check.
pub fn validate(
    state: &MatchState,
    rules: &RuleConfig,
    request: &ActionRequest,
) -> Result<(), Rejection> {
    let actor = state
        .entities
        .live(request.entity)
        .ok_or(Rejection::DeadEntity)?;

    match request.action {
        Action::Noop => Ok(()),
        Action::Move { to } => {
            if actor.movement_cooldown > rules.action_threshold {
                return Err(Rejection::InsufficientCooldown);
            }
            check_move(state, actor.position, to)
        }
        Action::Attack { target } => {
            ready(actor.action_cooldown, rules)?;
            let target = state
                .entities
                .live(target)
                .filter(|t| t.team != actor.team)
                .ok_or(Rejection::TargetInvalid)?;
            within(actor.position, target.position, rules.attack_radius_sq)
        }
        Action::Heal { target } => {
            ready(actor.action_cooldown, rules)?;
            let target = state
                .entities
                .live(target)
                .filter(|t| t.team == actor.team && t.health < rules.max_health)
                .ok_or(Rejection::TargetInvalid)?;
            within(actor.position, target.position, rules.heal_radius_sq)
        }
        Action::PickupFlag { flag } => {
            ready(actor.action_cooldown, rules)?;
            if actor.carried_flag.is_some() {
                return Err(Rejection::TargetInvalid);
            }
            let flag = state
                .flags
                .get(flag)
                .filter(|f| f.team != actor.team && f.state.is_pickable())
                .ok_or(Rejection::TargetInvalid)?;
            if flag.position == actor.position {
                Ok(())
            } else {
                Err(Rejection::OutOfRange)
            }
        }
        Action::DropFlag => {
            ready(actor.action_cooldown, rules)?;
            match actor.carried_flag {
                Some(_) => Ok(()),
                None => Err(Rejection::TargetInvalid),
            }
        }
        Action::BuyUpgrade { upgrade } => {
            if state.upgrades.is_active(actor.team, upgrade) {
                return Err(Rejection::TargetInvalid);
            }
            if state.ledger(actor.team).upgrade_points == 0 {
                return Err(Rejection::InsufficientResources);
            }
            Ok(())
        }
    }
}

/// Check a request against the committed state before its round starts.
///
/// Same as [`validate`], except that a purchase may count on the upgrade
/// point the coming round grants. The cooldown phase re-checks it after the
/// grant.
///
/// # Errors
///
/// Returns the [`Rejection`] of the first failing check.
pub fn validate_pending(
    state: &MatchState,
    rules: &RuleConfig,
    request: &ActionRequest,
) -> Result<(), Rejection> {
    match validate(state, rules, request) {
        Err(Rejection::InsufficientResources)
            if request.action.kind() == ActionKind::Upgrade
                && rules.grants_upgrade_point(state.round.saturating_add(1)) =>
        {
            Ok(())
        }
        other => other,
    }
}

fn ready(cooldown: u32, rules: &RuleConfig) -> Result<(), Rejection> {
    if cooldown > rules.action_threshold {
        Err(Rejection::InsufficientCooldown)
    } else {
        Ok(())
    }
}

fn within(from: Coord, to: Coord, radius_sq: u32) -> Result<(), Rejection> {
    if from.dist_sq(to) > radius_sq {
        Err(Rejection::OutOfRange)
    } else {
        Ok(())
    }
}

fn check_move(state: &MatchState, from: Coord, to: Coord) -> Result<(), Rejection> {
    if !state.grid.in_bounds(to) || from.chebyshev(to) > 1 {
        return Err(Rejection::OutOfRange);
    }
    if from == to {
        return Err(Rejection::TargetInvalid);
    }
    if state.grid.is_blocked(to) || state.entities.occupant(to).is_some() {
        return Err(Rejection::BlockedCell);
    }
    Ok(())
}
