use ring_quest_core::{
    Equipment, Position,
    agent::{Agent, Planner},
    environment::{
        Enemy, Environment, HazardMasks, MapDefinition, Outcome, ReferenceDistances, Variant,
        briefed_planner, load_map_from_string, load_suite, reference_distances, simulate,
    },
    protocol::Command,
    search::{Search, SearchConfig, SearchOutcome, Strategy, find_next_action},
    session::{SessionConfig, run_session},
    state::{ActionKind, AgentState},
    world::{Sighting, SightingKind, ThreatKind, WorldModel},
};

const STRATEGIES: [Strategy; 2] = [Strategy::AStar, Strategy::BreadthFirst];

fn threat(x: i32, y: i32, kind: ThreatKind) -> Sighting {
    Sighting::new(Position::new(x, y), SightingKind::Threat(kind))
}

#[test]
fn empty_world_first_step_goes_up_the_column() {
    let world = WorldModel::new();
    for strategy in STRATEGIES {
        let plan = Search::new(&world, SearchConfig::with_strategy(strategy))
            .find_plan(AgentState::start(), Position::new(0, 3))
            .expect("open board");
        assert_eq!(plan.len(), 3, "{strategy}");
        assert_eq!(
            find_next_action(&world, AgentState::start(), Position::new(0, 3), strategy),
            SearchOutcome::Next(ring_quest_core::state::Action {
                kind: ActionKind::Move(Position::new(0, 1)),
                resulting: AgentState::new(Position::new(0, 1), Equipment::NONE),
            }),
            "{strategy}"
        );
    }
}

#[test]
fn target_in_danger_zone_gives_up() {
    let mut world = WorldModel::new();
    world.update([Sighting::new(Position::new(4, 4), SightingKind::DangerZone)]);
    for strategy in STRATEGIES {
        assert_eq!(
            find_next_action(&world, AgentState::start(), Position::new(4, 4), strategy),
            SearchOutcome::NoPath
        );
    }

    let mut planner = Planner::new(Position::new(4, 4), SearchConfig::default());
    planner
        .observe(&[Sighting::new(Position::new(4, 4), SightingKind::DangerZone)])
        .expect("initial perception");
    assert_eq!(planner.next_command(), Command::GiveUp);
}

#[test]
fn orc_neighbour_flips_with_the_ring() {
    let mut world = WorldModel::new();
    world.update([threat(5, 5, ThreatKind::Orc)]);
    let cell = Position::new(5, 6);
    assert!(!world.is_safe(cell, Equipment::NONE));
    assert!(world.is_safe(cell, Equipment::new(true, false)));
    assert!(world.is_safe(cell, Equipment::new(false, true)));
    assert!(!world.is_safe(Position::new(5, 5), Equipment::new(true, true)));
}

#[test]
fn coat_pickup_persists_across_updates() {
    let mut planner = Planner::new(Position::new(3, 0), SearchConfig::default());
    planner
        .observe(&[Sighting::new(Position::new(1, 0), SightingKind::Coat)])
        .expect("initial perception");

    assert_eq!(planner.next_command(), Command::Move(Position::new(1, 0)));
    assert!(planner.state().equipment.coat);

    planner
        .observe(&[threat(9, 9, ThreatKind::Nazgul), threat(12, 0, ThreatKind::Tower)])
        .expect("perception");
    assert_eq!(planner.next_command(), Command::Move(Position::new(2, 0)));
    assert!(planner.state().equipment.coat);
}

fn open_map() -> MapDefinition {
    MapDefinition {
        first_target: Position::new(0, 3),
        second_target: Position::new(3, 3),
        coat: Position::new(8, 8),
        enemies: vec![],
    }
}

#[test]
fn simulated_runs_succeed_on_an_open_map() {
    for strategy in STRATEGIES {
        for variant in [Variant::Near, Variant::Far] {
            let report = simulate(&open_map(), variant, SearchConfig::with_strategy(strategy));
            assert!(report.success, "{strategy} {variant:?}: {:?}", report.outcome);
            assert_eq!(report.reported_length, Some(6));
            assert_eq!(report.moves, 6);
            assert_eq!(report.reference.to_second, Some(6));
        }
    }
}

fn orc_map() -> MapDefinition {
    MapDefinition {
        first_target: Position::new(0, 3),
        second_target: Position::new(0, 5),
        coat: Position::new(12, 12),
        enemies: vec![Enemy {
            kind: ThreatKind::Orc,
            position: Position::new(1, 2),
        }],
    }
}

#[test]
fn reference_counts_free_ring_toggles() {
    let map = orc_map();
    let hazards = HazardMasks::new(&map);
    assert_eq!(
        reference_distances(&map, &hazards),
        ReferenceDistances {
            to_first: Some(3),
            to_second: Some(5),
        }
    );
}

#[test]
fn agent_reports_every_command_it_sent() {
    for strategy in STRATEGIES {
        let report = simulate(&orc_map(), Variant::Near, SearchConfig::with_strategy(strategy));
        assert_eq!(report.reported_length, Some(report.moves + report.toggles));
        assert_eq!(report.log.len() as u32, report.moves + report.toggles + 1);
    }
}

#[test]
fn paid_ring_toggles_miss_the_optimum() {
    for strategy in STRATEGIES {
        let report = simulate(&orc_map(), Variant::Near, SearchConfig::with_strategy(strategy));
        assert!(report.toggles > 0, "{strategy}");
        assert_eq!(report.reference.to_second, Some(5));
        assert_ne!(report.reported_length, report.reference.to_second);
        assert_eq!(report.outcome, Outcome::WrongLength, "{strategy}");
        assert!(!report.success);
    }
}

#[test]
fn unreachable_second_target_is_reported() {
    let mut map = open_map();
    map.enemies.push(Enemy {
        kind: ThreatKind::Tower,
        position: map.second_target,
    });
    let report = simulate(&map, Variant::Near, SearchConfig::default());
    assert!(!report.solvable);
    assert!(report.claimed_unsolvable);
    assert_eq!(report.outcome, Outcome::Ok);
}

#[test]
fn stepping_environment_by_hand() {
    let mut env = Environment::new(open_map(), Variant::Near).with_command_limit(4);
    let mut planner = briefed_planner(&env, SearchConfig::default());
    let mut turns = 0;
    while env.step(&mut planner).is_none() {
        turns += 1;
    }
    assert_eq!(turns, 3);
    let report = env.report().expect("finished");
    assert_eq!(report.outcome, Outcome::StepLimit);
    assert_eq!(env.position(), Position::new(1, 3));
}

#[test]
fn session_over_a_scripted_interactor() {
    // the orc at (1, 1) blocks both exits from the start unless the ring is on
    let input = "\
1
0 2
1
1 1 O
0
1
1 1 O
0
Mount Doom: 0 3
0
";
    let mut out = Vec::new();
    let report = run_session(input.as_bytes(), &mut out, SessionConfig::default())
        .expect("write to vec");
    assert_eq!(
        String::from_utf8(out).expect("utf-8"),
        "r\nm 0 1\nm 0 2\nm 0 3\ne 4\n"
    );
    assert!(report.succeeded());
    assert_eq!(report.steps, 4);
}

#[test]
fn bundled_maps_load() {
    let map = load_map_from_string(include_str!("../../maps/shire.txt")).expect("text map");
    assert_eq!(map.first_target, Position::new(0, 4));
    assert_eq!(map.second_target, Position::new(11, 11));
    assert_eq!(map.enemies.len(), 4);
    let report = simulate(&map, Variant::Far, SearchConfig::default());
    assert!(report.solvable);

    let suite = load_suite(include_str!("../../maps/suite.jsonl")).expect("suite");
    assert_eq!(suite.len(), 4);
    assert_eq!(suite[2].variant, Variant::Far);
}
