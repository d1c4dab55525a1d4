//! # Property-Based Tests
//!
//! Verification tests using proptest.
//!
//! These tests ensure the gate rule, history monotonicity, and display
//! resolution hold for arbitrary inputs, not just the fixture values.

use chrysalis_core::{
    EngineConfig, IdentityId, ManualClock, Principal, SharedStakeTable, StakeAmount, TraitEngine,
    TraitRecord,
};
use proptest::prelude::*;

const ID: IdentityId = IdentityId(1);

fn controller() -> Principal {
    Principal::new("governance")
}

fn engine_with_threshold(threshold: u128) -> (TraitEngine, SharedStakeTable, ManualClock) {
    let stake = SharedStakeTable::new();
    let clock = ManualClock::at(1);
    let config = EngineConfig {
        evolution_threshold: StakeAmount::new(threshold),
        ..EngineConfig::default()
    };
    let engine = TraitEngine::with_config(controller(), stake.clone(), clock.clone(), config);
    (engine, stake, clock)
}

// =============================================================================
// PROPERTY TESTS
// =============================================================================

proptest! {
    /// The gate is open exactly when growth over the recorded baseline
    /// reaches the configured threshold.
    #[test]
    fn gate_matches_threshold_rule(
        baseline in 0u64..1_000_000,
        delta in 0u64..100_000,
        threshold in 1u64..50_000,
    ) {
        let (mut engine, stake, _) = engine_with_threshold(threshold as u128);

        stake.set_stake(ID, StakeAmount::new(baseline as u128));
        engine.init_traits(&controller(), ID, TraitRecord::with_traits(1, 1, 1)).expect("init");

        stake.credit(ID, delta as u128);

        let open = engine.can_evolve(ID).expect("gate");
        prop_assert_eq!(open, (delta as u128) >= (threshold as u128));
    }

    /// A balance decrease never opens the gate, whatever its size.
    #[test]
    fn gate_never_opens_on_decrease(
        baseline in 1u64..1_000_000,
        drop_to in 0u64..1_000_000,
        threshold in 1u64..50_000,
    ) {
        prop_assume!(drop_to < baseline);
        let (mut engine, stake, _) = engine_with_threshold(threshold as u128);

        stake.set_stake(ID, StakeAmount::new(baseline as u128));
        engine.init_traits(&controller(), ID, TraitRecord::with_traits(1, 1, 1)).expect("init");

        stake.set_stake(ID, StakeAmount::new(drop_to as u128));
        prop_assert!(!engine.can_evolve(ID).expect("gate"));
    }

    /// History count never decreases and each successful evolution
    /// increases it by exactly 1; every evolution re-closes the gate.
    #[test]
    fn history_is_monotonic(credits in prop::collection::vec(0u64..5_000, 1..30)) {
        let threshold = 1_000u128;
        let (mut engine, stake, _) = engine_with_threshold(threshold);

        stake.set_stake(ID, StakeAmount::new(0));
        engine.init_traits(&controller(), ID, TraitRecord::with_traits(2, 2, 2)).expect("init");

        let mut expected_count = 1u32;
        for credit in credits {
            stake.credit(ID, credit as u128);

            let before = engine.history_count(ID).expect("count");
            prop_assert_eq!(before, expected_count);

            let eligible = engine.can_evolve(ID).expect("gate");
            match engine.evolve(&controller(), ID) {
                Ok(()) => {
                    prop_assert!(eligible);
                    expected_count += 1;
                    // The bar resets against the new baseline
                    prop_assert!(!engine.can_evolve(ID).expect("gate"));
                }
                Err(_) => prop_assert!(!eligible),
            }

            let after = engine.history_count(ID).expect("count");
            prop_assert!(after >= before);
            prop_assert_eq!(after, expected_count);
        }
    }

    /// Pinning any in-range index makes it the displayed index and shapes
    /// the token URI, even after the chain grows further.
    #[test]
    fn pin_resolves_and_survives_growth(
        chain_len in 1u32..15,
        pin_seed in 0u32..100,
        extra_evolutions in 0u32..5,
    ) {
        let threshold = 100u128;
        let (mut engine, stake, _) = engine_with_threshold(threshold);

        stake.set_stake(ID, StakeAmount::new(0));
        engine.init_traits(&controller(), ID, TraitRecord::with_traits(1, 2, 3)).expect("init");
        for _ in 1..chain_len {
            stake.credit(ID, threshold);
            engine.evolve(&controller(), ID).expect("evolve");
        }

        let pin = (pin_seed % chain_len) + 1;
        engine.override_history(&controller(), ID, pin).expect("pin");

        for _ in 0..extra_evolutions {
            stake.credit(ID, threshold);
            engine.evolve(&controller(), ID).expect("evolve");
        }

        prop_assert_eq!(engine.resolved_display_index(ID).expect("index"), pin);
        let uri = engine.token_uri(ID).expect("uri");
        let expected_suffix = format!("id-1-history-{}.json", pin);
        prop_assert!(uri.ends_with(&expected_suffix));

        // The true latest stays override-blind
        let count = engine.history_count(ID).expect("count");
        prop_assert_eq!(count, chain_len + extra_evolutions);
    }

    /// An out-of-range pin always fails and never disturbs display state.
    #[test]
    fn out_of_range_pin_is_rejected(
        chain_len in 1u32..10,
        beyond in 1u32..50,
    ) {
        let threshold = 100u128;
        let (mut engine, stake, _) = engine_with_threshold(threshold);

        stake.set_stake(ID, StakeAmount::new(0));
        engine.init_traits(&controller(), ID, TraitRecord::with_traits(1, 2, 3)).expect("init");
        for _ in 1..chain_len {
            stake.credit(ID, threshold);
            engine.evolve(&controller(), ID).expect("evolve");
        }

        let before = engine.resolved_display_index(ID).expect("index");
        let result = engine.override_history(&controller(), ID, chain_len + beyond);
        prop_assert!(result.is_err());
        prop_assert_eq!(engine.resolved_display_index(ID).expect("index"), before);
    }

    /// Identical operation sequences produce identical observable state.
    #[test]
    fn determinism_identical_input_identical_output(
        ids in prop::collection::vec(0u64..50, 1..20),
    ) {
        let build = || {
            let (mut engine, stake, _) = engine_with_threshold(1_000);
            for &raw in &ids {
                let id = IdentityId(raw);
                stake.set_stake(id, StakeAmount::new(raw as u128));
                let _ = engine.init_traits(&controller(), id, TraitRecord::with_traits(1, 1, raw as u128));
            }
            engine
        };

        let first = build();
        let second = build();

        prop_assert_eq!(first.identity_count().expect("ids"), second.identity_count().expect("ids"));
        prop_assert_eq!(first.identities().expect("list"), second.identities().expect("list"));
        for id in first.identities().expect("list") {
            prop_assert_eq!(
                first.latest_trait_data(id).expect("latest"),
                second.latest_trait_data(id).expect("latest")
            );
        }
    }
}
