use dg_core::config::{KeySpec, RoomBounds};
use dg_core::graph::{Archetype, Capability, ConnectorType, DungeonGraph, SizeClass};
use dg_core::strategy::{AttemptFailure, GrammarEngine, Synthesizer, TemplateEngine};
use dg_core::validate::validate;
use dg_core::*;
use dg_rng::DungeonRng;
use proptest::prelude::*;

fn config(seed: u64, min: u32, max: u32) -> GeneratorConfig {
    GeneratorConfig {
        seed,
        rooms: RoomBounds { min, max },
        ..Default::default()
    }
}

fn run(cfg: &GeneratorConfig, strategy: &str) -> Result<DungeonGraph, GenerationError> {
    generate(
        cfg,
        &StrategyRegistry::builtin(),
        strategy,
        &CancelSignal::never(),
    )
}

#[test]
fn test_small_dungeon_without_keys() {
    for seed in 1..=30 {
        let mut cfg = config(seed, 10, 15);
        cfg.branching.max = 4;
        let g = run(&cfg, "grammar").expect("generation should succeed");
        assert!((10..=15).contains(&g.room_count()), "seed {seed}");
        assert_eq!(g.count_archetype(Archetype::Start), 1);
        assert_eq!(g.count_archetype(Archetype::Boss), 1);
        assert!(g.is_connected());
        assert_eq!(g.seed(), seed);
    }
}

#[test]
fn test_silver_key_loop() {
    for seed in 1..=20 {
        let mut cfg = config(seed, 20, 30);
        cfg.keys = vec![KeySpec::new("silver")];
        let g = run(&cfg, "grammar").expect("generation should succeed");

        let silver = Capability::key("silver");
        let key_room = g
            .rooms()
            .find(|r| r.grants(&silver))
            .expect("a room should hold the silver key");
        let start = g.start().expect("start room");
        assert!(g.reachable_from(start).contains(&key_room.id));

        let gate = g
            .connectors()
            .find(|c| c.gate.as_ref().is_some_and(|gate| gate.is_opened_by(&silver)))
            .expect("a connector should be locked by the silver key");
        assert!(!gate.bidirectional);
    }
}

#[test]
fn test_themes_cover_every_room() {
    for seed in 1..=20 {
        let mut cfg = config(seed, 20, 20);
        cfg.themes = vec!["forest".into(), "cave".into(), "ruins".into()];
        let g = run(&cfg, "grammar").expect("generation should succeed");
        assert_eq!(g.room_count(), 20);

        let mut seen = std::collections::BTreeSet::new();
        for room in g.rooms() {
            let biome = room.biome().expect("every room carries a biome tag");
            assert!(cfg.themes.iter().any(|t| t == biome));
            seen.insert(biome.to_string());
        }
        assert_eq!(seen.len(), 3, "seed {seed}");
    }
}

#[test]
fn test_same_seed_same_graph() {
    let mut cfg = config(1234, 20, 40);
    cfg.keys = vec![KeySpec::new("red"), KeySpec::new("blue")];
    cfg.themes = vec!["forest".into(), "cave".into()];
    for strategy in ["grammar", "template"] {
        let a = run(&cfg, strategy).expect("first run");
        let b = run(&cfg, strategy).expect("second run");
        assert_eq!(a.summary(), b.summary());
        assert_eq!(
            serde_json::to_string(&a).unwrap(),
            serde_json::to_string(&b).unwrap()
        );
    }
}

#[test]
fn test_different_seeds_differ() {
    let a = run(&config(1, 30, 60), "grammar").unwrap();
    let b = run(&config(2, 30, 60), "grammar").unwrap();
    assert_ne!(
        serde_json::to_string(&a).unwrap(),
        serde_json::to_string(&b).unwrap()
    );
}

#[test]
fn test_zero_seed_is_recorded() {
    let g = run(&config(0, 10, 20), "grammar").unwrap();
    assert_ne!(g.seed(), 0);
    let replay = run(&config(g.seed(), 10, 20), "grammar").unwrap();
    assert_eq!(
        serde_json::to_string(&g).unwrap(),
        serde_json::to_string(&replay).unwrap()
    );
}

#[test]
fn test_template_strategy_invariants() {
    for seed in 1..=20 {
        let mut cfg = config(seed, 15, 30);
        cfg.keys = vec![KeySpec::new("bronze")];
        cfg.themes = vec!["crypt".into(), "sewer".into()];
        let g = run(&cfg, "template").expect("generation should succeed");
        assert_eq!(validate(&g, &cfg), Ok(()));
        assert_eq!(g.strategy(), Some(StrategyKind::Template));
        for room in g.rooms() {
            assert!(room.biome().is_some());
            assert!((0.0..=1.0).contains(&room.difficulty));
            assert!((0.0..=1.0).contains(&room.reward));
        }
    }
}

#[test]
fn test_invalid_config_rejected_before_generation() {
    let cfg = config(7, 5, 15);
    assert!(matches!(
        run(&cfg, "grammar"),
        Err(GenerationError::Config(ConfigError::RoomBounds { .. }))
    ));

    let mut cfg = config(7, 10, 12);
    cfg.keys = (0..5).map(|i| KeySpec::new(&format!("k{i}"))).collect();
    assert!(matches!(
        run(&cfg, "grammar"),
        Err(GenerationError::Config(ConfigError::TooManyKeys { .. }))
    ));
}

#[test]
fn test_unknown_strategy_name() {
    assert_eq!(
        run(&config(1, 10, 20), "voronoi").unwrap_err(),
        GenerationError::UnknownStrategy("voronoi".into())
    );
}

#[test]
fn test_cancelled_before_start_consumes_nothing() {
    let (signal, trigger) = CancelSignal::new();
    trigger.cancel();
    let mut rng = DungeonRng::new(5);
    let err = GrammarEngine::new()
        .synthesize(&config(5, 10, 20), &mut rng, &signal)
        .unwrap_err();
    assert_eq!(
        err,
        GenerationError::Cancelled {
            phase: Phase::Trio
        }
    );
    assert_eq!(rng.draw_count(), 0);
}

/// Grows a fixed trio and raises cancellation on the way out
struct CancelsAfterGrowth {
    trigger: CancelTrigger,
}

impl Synthesizer for CancelsAfterGrowth {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Grammar
    }

    fn grow(
        &self,
        _config: &GeneratorConfig,
        _rng: &mut DungeonRng,
        _cancel: &CancelSignal,
    ) -> Result<DungeonGraph, AttemptFailure> {
        let mut g = DungeonGraph::new(0);
        let start = g.create_room(Archetype::Start, SizeClass::Small)?;
        let boss = g.create_room(Archetype::Boss, SizeClass::Large)?;
        g.connect(start, boss, ConnectorType::Door)?;
        self.trigger.cancel();
        Ok(g)
    }
}

#[test]
fn test_cancelled_before_validation() {
    let (signal, trigger) = CancelSignal::new();
    let synth = CancelsAfterGrowth { trigger };
    let mut rng = DungeonRng::new(5);
    let result = synth.synthesize(&config(5, 10, 20), &mut rng, &signal);
    assert_eq!(
        result.unwrap_err(),
        GenerationError::Cancelled {
            phase: Phase::Validation
        }
    );
    // Pacing and biome passes never ran
    assert_eq!(rng.draw_count(), 0);
}

#[test]
fn test_cancelled_during_growth() {
    let mut cfg = config(5, 20, 30);
    cfg.keys = vec![KeySpec::new("iron")];
    let strategies: [&dyn Synthesizer; 2] = [&GrammarEngine, &TemplateEngine];
    for synth in strategies {
        // The first poll (before the core rooms) passes, the next one trips
        let signal = CancelSignal::with_budget(1);
        let mut rng = DungeonRng::new(5);
        let err = synth.synthesize(&cfg, &mut rng, &signal).unwrap_err();
        assert_eq!(
            err,
            GenerationError::Cancelled {
                phase: Phase::Growth
            },
            "{}",
            synth.kind()
        );
    }
}

#[test]
fn test_cancelled_run_through_generate() {
    let err = generate(
        &config(9, 20, 30),
        &StrategyRegistry::builtin(),
        "grammar",
        &CancelSignal::with_budget(1),
    )
    .unwrap_err();
    assert!(matches!(err, GenerationError::Cancelled { phase: Phase::Growth }));
}

#[test]
fn test_retries_exhausted_reports_last_violation() {
    // Max branching 2 with dense secrets seals the graph early; a single
    // attempt with a tight failure budget cannot recover.
    let mut cfg = config(0, 280, 300);
    cfg.branching.max = 2;
    cfg.secret_density = 0.3;
    cfg.max_attempts = 1;
    cfg.max_consecutive_rule_failures = 1;
    let mut exhausted = false;
    for seed in 1..=50 {
        cfg.seed = seed;
        if let Err(err) = run(&cfg, "grammar") {
            assert!(matches!(
                err,
                GenerationError::RetriesExhausted {
                    attempts: 1,
                    last: Violation::GrowthStalled(1)
                }
            ));
            exhausted = true;
        }
    }
    assert!(exhausted);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn prop_generated_graphs_hold_invariants(
        seed in 1u64..u64::MAX,
        min in 10u32..40,
        span in 0u32..30,
        max_branching in 3u8..=5,
        keys in 0usize..3,
        template in any::<bool>(),
    ) {
        let mut cfg = config(seed, min, min + span);
        cfg.branching.max = max_branching;
        cfg.keys = (0..keys).map(|i| KeySpec::new(&format!("key{i}"))).collect();
        cfg.themes = vec!["a".into(), "b".into(), "c".into()];
        let strategy = if template { "template" } else { "grammar" };

        let g = run(&cfg, strategy).expect("generation should succeed");
        prop_assert_eq!(validate(&g, &cfg), Ok(()));
        prop_assert!(cfg.rooms.contains(g.room_count()));
        let start = g.start().expect("start room");
        let boss = g.boss().expect("boss room");
        prop_assert!(g.path(start, boss).is_some());
        for room in g.rooms() {
            prop_assert!(g.degree(room.id) <= max_branching as usize);
            prop_assert!(room.biome().is_some());
        }
    }
}
