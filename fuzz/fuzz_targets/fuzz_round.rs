#![no_main]

//! Round resolution fuzzer.
//!
//! Feeds arbitrary action streams for a generated map through the resolver:
//! 1. Build a seeded setup
//! 2. Resolve rounds of fuzzer-chosen requests (duplicates, dead ids included)
//! 3. Check invariants after every committed round
//! 4. Encode each snapshot and decode the whole log again

use arbitrary::Arbitrary;
use flagfall::controller::{MapGenConfig, generate_setup};
use flagfall::game::{
    Action, ActionRequest, Coord, EntityId, FlagId, GlobalUpgrade, MatchState, RoundOutcome,
    RuleConfig, UpgradeTable, check_invariants, resolve_round,
};
use flagfall::replay::{ReplayHeader, ReplayReader, ReplayWriter};
use libfuzzer_sys::fuzz_target;

/// A fuzzer-generated action.
#[derive(Arbitrary, Debug, Clone, Copy)]
enum FuzzAction {
    Noop,
    Move { x: u8, y: u8 },
    Attack { target: u8 },
    Heal { target: u8 },
    Pickup { flag: u8 },
    Drop,
    Buy { upgrade: u8 },
}

impl FuzzAction {
    fn to_action(self) -> Action {
        match self {
            FuzzAction::Noop => Action::Noop,
            FuzzAction::Move { x, y } => Action::Move {
                to: Coord::new(u16::from(x % 20), u16::from(y % 20)),
            },
            FuzzAction::Attack { target } => Action::Attack {
                target: EntityId(u32::from(target % 16)),
            },
            FuzzAction::Heal { target } => Action::Heal {
                target: EntityId(u32::from(target % 16)),
            },
            FuzzAction::Pickup { flag } => Action::PickupFlag {
                flag: FlagId(u32::from(flag % 8)),
            },
            FuzzAction::Drop => Action::DropFlag,
            FuzzAction::Buy { upgrade } => Action::BuyUpgrade {
                upgrade: GlobalUpgrade::ALL[usize::from(upgrade) % GlobalUpgrade::ALL.len()],
            },
        }
    }
}

/// Structured input for round fuzzing.
#[derive(Arbitrary, Debug)]
struct RoundInput {
    /// Map seed.
    seed: u64,
    /// Requests per round as (entity, action).
    rounds: Vec<Vec<(u8, FuzzAction)>>,
    /// Damage per attack.
    attack_damage: u16,
    /// Upgrade point interval.
    upgrade_interval: u8,
}

fuzz_target!(|input: RoundInput| {
    let mapgen = MapGenConfig {
        width: 20,
        height: 20,
        entities_per_team: 6,
        flags_per_team: 2,
        ..MapGenConfig::default()
    };
    let Ok(setup) = generate_setup(input.seed, &mapgen) else {
        return;
    };
    let rules = RuleConfig {
        attack_damage: u32::from(input.attack_damage),
        upgrade_interval: u32::from(input.upgrade_interval),
        max_rounds: 64,
        ..RuleConfig::default()
    };
    let Ok(mut state) = MatchState::new(setup, &rules, UpgradeTable::default()) else {
        return;
    };

    let mut writer = ReplayWriter::new(Vec::new());
    writer
        .write_header(&ReplayHeader::new(&state, &rules))
        .expect("header encodes");

    for round in input.rounds.iter().take(64) {
        let requests: Vec<ActionRequest> = round
            .iter()
            .take(32)
            .map(|&(id, action)| {
                ActionRequest::new(EntityId(u32::from(id % 16)), action.to_action())
            })
            .collect();

        let report = resolve_round(&mut state, &rules, &requests)
            .unwrap_or_else(|e| panic!("invariant violated: {e}"));
        let violations = check_invariants(&state, &rules);
        assert!(violations.is_empty(), "after round {}: {violations:?}", state.round);

        writer.write_round(&report.snapshot).expect("round encodes");
        if let RoundOutcome::MatchOver(result) = report.outcome {
            writer.finish(&result).expect("trailer encodes");
            break;
        }
    }

    let bytes = writer.into_inner();
    let replay = ReplayReader::decode(&bytes).expect("own log decodes");
    assert_eq!(replay.round_count() as u32, state.round);
});
