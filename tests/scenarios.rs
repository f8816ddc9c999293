//! End-to-end match scenarios.
//!
//! Each test builds a tiny hand-made setup and drives rounds through the
//! public resolver or controller API.

#![allow(missing_docs)]
#![allow(clippy::unwrap_used)]

use std::fs::File;
use std::io::BufWriter;

use flagfall::agent::bots::{IdleAgent, ScriptedAgent};
use flagfall::controller::Match;
use flagfall::game::{
    Action, ActionRequest, Coord, EntityId, EntityRecord, EntitySpawn, FlagId, FlagSpawn,
    FlagState, GlobalUpgrade, GridSpec, MatchSetup, MatchState, Rejection, RoundOutcome,
    RuleConfig, Team, Terrain, UpgradeTable, WinReason, resolve_round,
};
use flagfall::replay::{ReplayReader, ReplayWriter};
use flagfall::Roster;

fn spawn(team: Team, x: u16, y: u16) -> EntitySpawn {
    EntitySpawn {
        team,
        position: Coord::new(x, y),
    }
}

fn request(id: u32, action: Action) -> ActionRequest {
    ActionRequest::new(EntityId(id), action)
}

fn step(id: u32, x: u16, y: u16) -> ActionRequest {
    request(id, Action::Move { to: Coord::new(x, y) })
}

fn build(setup: MatchSetup, rules: &RuleConfig) -> MatchState {
    MatchState::new(setup, rules, UpgradeTable::default()).unwrap()
}

#[test]
fn test_pickup_on_small_grid_keeps_flag_with_carrier() {
    let rules = RuleConfig::default();
    let mut state = build(
        MatchSetup {
            grid: GridSpec::open("tiny", 2, 2),
            entities: vec![spawn(Team::A, 0, 0), spawn(Team::B, 1, 1)],
            flags: vec![FlagSpawn {
                id: FlagId(1),
                team: Team::B,
                home: Coord::new(1, 0),
            }],
        },
        &rules,
    );

    let rounds = [
        vec![step(1, 1, 0)],
        vec![request(1, Action::PickupFlag { flag: FlagId(1) })],
        vec![step(1, 0, 0)],
        vec![step(1, 1, 0)],
    ];
    for requests in &rounds {
        let report = resolve_round(&mut state, &rules, requests).unwrap();
        assert!(report.rejections.is_empty(), "{:?}", report.rejections);
        assert_eq!(report.outcome, RoundOutcome::Continue);
    }

    let carrier = state.entities.live(EntityId(1)).unwrap();
    let flag = state.flags.get(FlagId(1)).unwrap();
    assert_eq!(flag.state, FlagState::Carried);
    assert_eq!(flag.carrier, Some(EntityId(1)));
    assert_eq!(carrier.carried_flag, Some(FlagId(1)));
    assert_eq!(flag.position, carrier.position);
    assert_eq!(flag.position, Coord::new(1, 0));
}

#[test]
fn test_contested_cell_goes_to_lower_id() {
    let rules = RuleConfig::default();
    let mut state = build(
        MatchSetup {
            grid: GridSpec::open("contest", 5, 5),
            entities: vec![
                spawn(Team::A, 0, 0),
                spawn(Team::A, 2, 0),
                spawn(Team::B, 4, 4),
            ],
            flags: vec![],
        },
        &rules,
    );

    // Submitted in reverse order; resolution still runs by ascending id
    let report = resolve_round(&mut state, &rules, &[step(2, 1, 0), step(1, 1, 0)]).unwrap();

    assert_eq!(state.entities.live(EntityId(1)).unwrap().position, Coord::new(1, 0));
    let loser = state.entities.live(EntityId(2)).unwrap();
    assert_eq!(loser.position, Coord::new(2, 0));
    assert_eq!(loser.movement_cooldown, 0);
    assert_eq!(report.rejections.len(), 1);
    assert_eq!(report.rejections[0].request.entity, EntityId(2));
    assert_eq!(report.rejections[0].reason, Rejection::BlockedCell);
}

#[test]
fn test_buying_capturing_twice_adds_its_delay_once() {
    let rules = RuleConfig::default();
    let mut state = build(
        MatchSetup {
            grid: GridSpec::open("upgrades", 5, 5),
            entities: vec![spawn(Team::A, 0, 0), spawn(Team::A, 1, 0), spawn(Team::B, 4, 4)],
            flags: vec![],
        },
        &rules,
    );
    state.ledgers[Team::A.index()].upgrade_points = 2;
    let base = state.flag_return_delay(Team::A, &rules);
    assert_eq!(base, rules.flag_return_delay);

    let buy = Action::BuyUpgrade {
        upgrade: GlobalUpgrade::Capturing,
    };
    let report = resolve_round(&mut state, &rules, &[request(1, buy), request(2, buy)]).unwrap();
    assert_eq!(report.rejections.len(), 1);
    assert_eq!(report.rejections[0].reason, Rejection::TargetInvalid);
    assert_eq!(state.ledger(Team::A).upgrade_points, 1);

    // A second purchase attempt in a later round is refused as well
    let report = resolve_round(&mut state, &rules, &[request(1, buy)]).unwrap();
    assert_eq!(report.rejections.len(), 1);
    assert_eq!(state.ledger(Team::A).upgrade_points, 1);

    assert_eq!(state.flag_return_delay(Team::A, &rules), base + 8);
    assert_eq!(state.flag_return_delay(Team::B, &rules), base);
}

#[test]
fn test_round_limit_goes_to_more_captures() {
    let rules = RuleConfig {
        max_rounds: 3,
        flags_to_win: Some(3),
        ..RuleConfig::default()
    };
    let mut state = build(
        MatchSetup {
            grid: GridSpec::open("limit", 4, 4),
            entities: vec![spawn(Team::A, 0, 0), spawn(Team::B, 3, 3)],
            flags: vec![],
        },
        &rules,
    );
    state.ledgers[Team::A.index()].captures = 2;
    state.ledgers[Team::B.index()].captures = 1;

    for _ in 0..2 {
        let report = resolve_round(&mut state, &rules, &[]).unwrap();
        assert_eq!(report.outcome, RoundOutcome::Continue);
    }
    let report = resolve_round(&mut state, &rules, &[]).unwrap();
    let RoundOutcome::MatchOver(result) = report.outcome else {
        panic!("match should end at the round limit");
    };
    assert_eq!(result.winner, Team::A);
    assert_eq!(result.reason, WinReason::RoundLimitTiebreak);
    assert_eq!(result.rounds, 3);
    assert_eq!(result.captures, [2, 1]);
}

#[test]
fn test_replay_file_rebuilds_final_state() {
    let mut grid = GridSpec::open("file", 5, 1);
    grid.set_terrain(Coord::new(0, 0), Terrain::SpawnA);
    grid.set_terrain(Coord::new(4, 0), Terrain::SpawnB);
    let setup = MatchSetup {
        grid,
        entities: vec![spawn(Team::A, 0, 0), spawn(Team::B, 4, 0)],
        flags: vec![FlagSpawn {
            id: FlagId(1),
            team: Team::B,
            home: Coord::new(1, 0),
        }],
    };
    let rules = RuleConfig {
        max_rounds: 10,
        ..RuleConfig::default()
    };
    let mut game = Match::new(setup, rules, UpgradeTable::default()).unwrap();
    let mut agents = Roster::new();
    agents.insert(
        EntityId(1),
        Box::new(ScriptedAgent::new(vec![
            Action::Move { to: Coord::new(1, 0) },
            Action::PickupFlag { flag: FlagId(1) },
            Action::Move { to: Coord::new(2, 0) },
        ])),
    );
    agents.insert(EntityId(2), Box::new(IdleAgent));

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("match.ffr");
    let report = {
        let file = File::create(&path).unwrap();
        let mut writer = ReplayWriter::new(BufWriter::new(file));
        game.run(&mut agents, &mut writer).unwrap()
    };
    assert_eq!(report.rounds, 10);
    assert_eq!(report.result.reason, WinReason::RoundLimitTiebreak);

    let replay = ReplayReader::from_reader(File::open(&path).unwrap()).unwrap();
    assert_eq!(replay.round_count(), 10);
    assert_eq!(replay.result, Some(report.result));
    assert_eq!(replay.header.map_name, "file");

    let (entities, flags) = replay.state_at(10);
    let expected: Vec<EntityRecord> = game
        .state()
        .entities
        .iter()
        .map(EntityRecord::from)
        .collect();
    assert_eq!(entities, expected);
    let carried = flags.iter().find(|f| f.id == FlagId(1)).unwrap();
    assert_eq!(carried.state, FlagState::Carried);
    assert_eq!(carried.position, Coord::new(2, 0));

    // Mid-match view: the flag was still at home after round 1
    let (_, flags) = replay.state_at(1);
    assert_eq!(flags[0].state, FlagState::AtHome);
}
