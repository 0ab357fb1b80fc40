use std::collections::BTreeSet;

use proptest::prelude::*;
use stackpull::detect::DigestPair;
use stackpull::engine::{CompletionDecision, Phase, TriggerState};
use stackpull::webhook::{sign, verify};
use stackpull::workload::{SelectionPolicy, WorkloadSpec};

// Small name pool so include/exclude overlap the declared set often.
fn name() -> impl Strategy<Value = String> {
    prop::sample::select(vec!["web", "api", "db", "cache", "worker", "proxy"])
        .prop_map(str::to_string)
}

fn names() -> impl Strategy<Value = BTreeSet<String>> {
    prop::collection::btree_set(name(), 0..6)
}

fn declared(set: &BTreeSet<String>) -> Vec<WorkloadSpec> {
    set.iter()
        .map(|n| WorkloadSpec::new(n.clone(), format!("registry/{n}:latest")))
        .collect()
}

proptest! {
    #[test]
    fn excluded_workloads_are_never_active(
        workloads in names(),
        include in names(),
        exclude in names(),
    ) {
        let policy = SelectionPolicy::new(include, exclude.clone());
        let active = policy.select(&declared(&workloads));

        for w in &active {
            prop_assert!(!exclude.contains(&w.name));
        }
    }

    #[test]
    fn active_set_matches_include_rule(
        workloads in names(),
        include in names(),
        exclude in names(),
    ) {
        let policy = SelectionPolicy::new(include.clone(), exclude.clone());
        let active: BTreeSet<String> = policy
            .select(&declared(&workloads))
            .into_iter()
            .map(|w| w.name)
            .collect();

        let expected: BTreeSet<String> = workloads
            .iter()
            .filter(|n| include.is_empty() || include.contains(*n))
            .filter(|n| !exclude.contains(*n))
            .cloned()
            .collect();

        prop_assert_eq!(active, expected);
    }

    #[test]
    fn identical_digests_never_require_update(digest in "sha256:[0-9a-f]{8,64}") {
        let pair = DigestPair { desired: digest.clone(), running: Some(digest) };
        prop_assert!(!pair.requires_update());
    }

    #[test]
    fn any_difference_requires_update(
        a in "sha256:[0-9a-f]{8,64}",
        b in "sha256:[0-9a-f]{8,64}",
    ) {
        prop_assume!(a != b);
        let pair = DigestPair { desired: a, running: Some(b) };
        prop_assert!(pair.requires_update());
    }

    #[test]
    fn absent_instance_always_requires_update(digest in "sha256:[0-9a-f]{8,64}") {
        let pair = DigestPair { desired: digest, running: None };
        prop_assert!(pair.requires_update());
    }

    #[test]
    fn flipping_any_body_byte_breaks_the_signature(
        body in prop::collection::vec(any::<u8>(), 1..256),
        index in any::<prop::sample::Index>(),
        bit in 0u8..8,
    ) {
        let sig = sign(&body, "secret");
        let mut tampered = body.clone();
        let i = index.index(tampered.len());
        tampered[i] ^= 1 << bit;

        prop_assert!(verify(&body, &sig, "secret"));
        prop_assert!(!verify(&tampered, &sig, "secret"));
    }

    /// Each burst is a number of triggers fired while one cycle runs.
    /// However large the burst, it costs exactly one follow-up cycle.
    #[test]
    fn bursts_cost_at_most_one_extra_cycle(bursts in prop::collection::vec(0usize..50, 1..10)) {
        let mut state = TriggerState::new();
        let mut cycles = 0u64;

        for burst in &bursts {
            state.on_trigger();
            cycles += 1;
            for _ in 0..*burst {
                state.on_trigger();
            }

            loop {
                match state.on_cycle_complete() {
                    CompletionDecision::RunAgain => cycles += 1,
                    CompletionDecision::GoIdle => break,
                }
            }
            prop_assert_eq!(state.phase(), Phase::Idle);
        }

        let expected: u64 = bursts.iter().map(|b| if *b > 0 { 2 } else { 1 }).sum();
        prop_assert_eq!(cycles, expected);

        let snapshot = state.snapshot();
        prop_assert_eq!(snapshot.cycles_started, expected);
        prop_assert_eq!(snapshot.cycles_completed, expected);
    }
}
