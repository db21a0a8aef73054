//! Property-based tests for the trace graph engine.
//!
//! Uses proptest to fuzz-verify:
//!   - Score bounds and the common-link equivalence (score == 1.0)
//!   - Trace closure: marked deliveries lead to marked stations
//!   - Full traces equal the union of forward and backward traces
//!   - Merge followed by expand restores the pre-merge graph
//!   - Structural validity under arbitrary operation sequences
//!
//! Tests prefixed `regression_gate_` are CI SLO gates — failures here
//! block merge. Run with: `cargo test regression_gate_`

use std::collections::BTreeSet;

use chrono::NaiveDate;
use epitrace_core::model::{DataSet, Delivery, DeliveryRelation, Station, TraceDirection};
use epitrace_graph::TracingEngine;
use proptest::prelude::*;
use proptest::test_runner::TestCaseError;

/// Build a dataset with `n` stations and one delivery per edge pair.
///
/// When `relate` is set every station links each incoming delivery to
/// each outgoing one, so propagation passes straight through. Stations
/// listed in `cross` widen instead. Most deliveries get a date, every
/// fourth stays undated.
fn random_dataset(
    n: usize,
    edges: &[(usize, usize)],
    relate: bool,
    cross: &[usize],
    outbreak: &[usize],
) -> DataSet {
    let mut stations: Vec<Station> = (0..n).map(|i| Station::new(format!("s{i}"))).collect();
    for &i in cross {
        stations[i % n].cross_contamination = true;
    }
    for &i in outbreak {
        stations[i % n].outbreak = true;
    }

    let mut incoming: Vec<Vec<String>> = vec![Vec::new(); n];
    let mut outgoing: Vec<Vec<String>> = vec![Vec::new(); n];
    let mut deliveries = Vec::with_capacity(edges.len());
    for (k, &(a, b)) in edges.iter().enumerate() {
        let id = format!("d{k}");
        let source = a % n;
        let target = b % n;
        let mut delivery = Delivery::new(id.clone(), format!("s{source}"), format!("s{target}"));
        if k % 4 != 3 {
            let month = 1 + (k % 12) as u32;
            let day = 1 + (k * 7 % 28) as u32;
            delivery.date = NaiveDate::from_ymd_opt(2020, month, day);
        }
        outgoing[source].push(id.clone());
        incoming[target].push(id);
        deliveries.push(delivery);
    }

    if relate {
        for (i, station) in stations.iter_mut().enumerate() {
            for inc in &incoming[i] {
                for out in &outgoing[i] {
                    station
                        .connections
                        .push(DeliveryRelation::new(inc.clone(), out.clone()));
                }
            }
        }
    }

    DataSet {
        stations,
        deliveries,
        ..DataSet::default()
    }
}

fn direction(code: u8) -> TraceDirection {
    match code % 3 {
        0 => TraceDirection::Forward,
        1 => TraceDirection::Backward,
        _ => TraceDirection::Full,
    }
}

/// Score bound and common-link check over every element of the graph.
fn assert_scores_consistent(engine: &TracingEngine) -> Result<(), TestCaseError> {
    for station in engine.graph().stations() {
        prop_assert!(
            (0.0..=1.0).contains(&station.score),
            "station {} score out of range: {}",
            station.id,
            station.score
        );
        prop_assert_eq!(
            station.common_link,
            station.score == 1.0,
            "station {} common_link disagrees with score {}",
            station.id.clone(),
            station.score
        );
    }
    for delivery in engine.graph().deliveries() {
        prop_assert!(
            (0.0..=1.0).contains(&delivery.score),
            "delivery {} score out of range: {}",
            delivery.id,
            delivery.score
        );
        prop_assert_eq!(
            delivery.common_link,
            delivery.score == 1.0,
            "delivery {} common_link disagrees with score {}",
            delivery.id.clone(),
            delivery.score
        );
    }
    Ok(())
}

// ═══════════════════════════════════════════════════════════════════
// Score Properties
// ═══════════════════════════════════════════════════════════════════

proptest! {
    /// REGRESSION GATE: scores stay in [0.0, 1.0] and common_link holds
    /// exactly for score 1.0, whatever the outbreak set.
    #[test]
    fn regression_gate_scores_bounded(
        n in 1usize..12,
        edges in prop::collection::vec((0usize..12, 0usize..12), 0..40),
        relate in any::<bool>(),
        cross in prop::collection::vec(0usize..12, 0..4),
        outbreak in prop::collection::vec(0usize..12, 0..6),
    ) {
        let data = random_dataset(n, &edges, relate, &cross, &outbreak);
        let engine = TracingEngine::from_dataset(data).unwrap();

        prop_assert!((0.0..=1.0).contains(&engine.max_score()));
        assert_scores_consistent(&engine)?;
    }

    /// With no outbreak set at all, every score is exactly zero.
    #[test]
    fn prop_no_outbreak_means_zero_scores(
        n in 1usize..12,
        edges in prop::collection::vec((0usize..12, 0usize..12), 0..40),
        relate in any::<bool>(),
    ) {
        let data = random_dataset(n, &edges, relate, &[], &[]);
        let engine = TracingEngine::from_dataset(data).unwrap();

        prop_assert_eq!(engine.max_score(), 0.0);
        for station in engine.graph().stations() {
            prop_assert_eq!(station.score, 0.0);
        }
        for delivery in engine.graph().deliveries() {
            prop_assert_eq!(delivery.score, 0.0);
        }
    }
}

// ═══════════════════════════════════════════════════════════════════
// Trace Properties
// ═══════════════════════════════════════════════════════════════════

proptest! {
    /// REGRESSION GATE: tracing terminates on arbitrary graphs (cycles
    /// and self-loops included) and marked deliveries always lead to a
    /// marked or untraceable endpoint station.
    #[test]
    fn regression_gate_trace_closure(
        n in 1usize..12,
        edges in prop::collection::vec((0usize..12, 0usize..12), 0..40),
        relate in any::<bool>(),
        cross in prop::collection::vec(0usize..12, 0..6),
        focal in 0usize..12,
        dir in any::<u8>(),
    ) {
        let data = random_dataset(n, &edges, relate, &cross, &[]);
        let mut engine = TracingEngine::from_dataset(data).unwrap();
        engine.trace_station(&format!("s{}", focal % n), direction(dir)).unwrap();

        for delivery in engine.graph().deliveries() {
            if delivery.forward {
                let target = engine.station(delivery.target.as_str()).unwrap();
                prop_assert!(
                    target.forward || !target.is_traceable(),
                    "forward delivery {} ends at unmarked station {}",
                    delivery.id, target.id
                );
            }
            if delivery.backward {
                let source = engine.station(delivery.source.as_str()).unwrap();
                prop_assert!(
                    source.backward || !source.is_traceable(),
                    "backward delivery {} starts at unmarked station {}",
                    delivery.id, source.id
                );
            }
        }
    }

    /// REGRESSION GATE: a full trace carries exactly the forward flags
    /// of a forward trace and the backward flags of a backward trace.
    #[test]
    fn regression_gate_full_trace_is_the_union(
        n in 1usize..12,
        edges in prop::collection::vec((0usize..12, 0usize..12), 0..40),
        relate in any::<bool>(),
        cross in prop::collection::vec(0usize..12, 0..6),
        focal in 0usize..12,
    ) {
        let data = random_dataset(n, &edges, relate, &cross, &[]);
        let id = format!("s{}", focal % n);

        let mut fwd = TracingEngine::from_dataset(data.clone()).unwrap();
        fwd.trace_station(&id, TraceDirection::Forward).unwrap();
        let mut bwd = TracingEngine::from_dataset(data.clone()).unwrap();
        bwd.trace_station(&id, TraceDirection::Backward).unwrap();
        let mut full = TracingEngine::from_dataset(data).unwrap();
        full.trace_station(&id, TraceDirection::Full).unwrap();

        for ((f, b), u) in fwd
            .graph()
            .stations()
            .zip(bwd.graph().stations())
            .zip(full.graph().stations())
        {
            prop_assert_eq!(u.forward, f.forward, "station {} forward", u.id.clone());
            prop_assert_eq!(u.backward, b.backward, "station {} backward", u.id.clone());
        }
        for ((f, b), u) in fwd
            .graph()
            .deliveries()
            .zip(bwd.graph().deliveries())
            .zip(full.graph().deliveries())
        {
            prop_assert_eq!(u.forward, f.forward, "delivery {} forward", u.id.clone());
            prop_assert_eq!(u.backward, b.backward, "delivery {} backward", u.id.clone());
            prop_assert_eq!(
                u.cross_contamination,
                f.cross_contamination || b.cross_contamination,
                "delivery {} widening marker",
                u.id.clone()
            );
        }
    }
}

// ═══════════════════════════════════════════════════════════════════
// Topology and Operation Sequence Properties
// ═══════════════════════════════════════════════════════════════════

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Merging any member set and expanding the result restores every
    /// endpoint and containment flag.
    #[test]
    fn prop_merge_expand_round_trips(
        n in 2usize..10,
        edges in prop::collection::vec((0usize..10, 0usize..10), 0..30),
        members in prop::collection::vec(0usize..10, 1..6),
    ) {
        let data = random_dataset(n, &edges, false, &[], &[]);
        let mut engine = TracingEngine::from_dataset(data).unwrap();

        let before: Vec<(String, String)> = engine
            .graph()
            .deliveries()
            .map(|d| (d.source.clone(), d.target.clone()))
            .collect();

        let member_ids: Vec<String> = members
            .iter()
            .map(|&i| i % n)
            .collect::<BTreeSet<usize>>()
            .into_iter()
            .map(|i| format!("s{i}"))
            .collect();
        let meta_id = engine.merge_stations(&member_ids, "group", None).unwrap();
        engine.expand_stations(&[meta_id]).unwrap();

        prop_assert_eq!(engine.graph().station_count(), n, "meta station removed again");
        for station in engine.graph().stations() {
            prop_assert!(!station.contained, "station {} still contained", station.id);
        }
        let after: Vec<(String, String)> = engine
            .graph()
            .deliveries()
            .map(|d| (d.source.clone(), d.target.clone()))
            .collect();
        prop_assert_eq!(before, after);
        prop_assert!(engine.graph().validate().is_ok());
    }

    /// Arbitrary operation sequences keep the graph structurally valid,
    /// the scores consistent and at most one element observed.
    #[test]
    fn prop_random_ops_preserve_validity(
        n in 1usize..10,
        edges in prop::collection::vec((0usize..10, 0usize..10), 0..30),
        relate in any::<bool>(),
        ops in prop::collection::vec((0u8..10, 0usize..10, 0u8..8), 0..25),
    ) {
        let data = random_dataset(n, &edges, relate, &[], &[]);
        let mut engine = TracingEngine::from_dataset(data).unwrap();
        let m = edges.len();

        for &(op, x, y) in &ops {
            let station_id = format!("s{}", x % n);
            match op {
                0 => {
                    let _ = engine.trace_station(&station_id, direction(y));
                }
                1 if m > 0 => {
                    let _ = engine.trace_delivery(&format!("d{}", x % m), direction(y));
                }
                2 => {
                    let other = format!("s{}", usize::from(y) % n);
                    let mut members = vec![station_id];
                    if other != members[0] {
                        members.push(other);
                    }
                    let _ = engine.merge_stations(&members, "group", None);
                }
                3 => {
                    let _ = engine.expand_stations(&[format!("meta:{}", y % 4)]);
                }
                4 => {
                    let _ = engine.make_stations_invisible(&[station_id]);
                }
                5 => {
                    let _ = engine.clear_invisibility();
                }
                6 => {
                    let _ = engine.mark_stations_as_outbreak(&[station_id], y % 2 == 0);
                }
                7 => {
                    let _ = engine.set_cross_contamination_of_stations(&[station_id], y % 2 == 0);
                }
                8 => {
                    let _ = engine.set_kill_contamination_of_stations(&[station_id], y % 2 == 0);
                }
                _ => engine.clear_trace(),
            }
        }

        prop_assert!(engine.graph().validate().is_ok());
        prop_assert!((0.0..=1.0).contains(&engine.max_score()));
        assert_scores_consistent(&engine)?;

        let observed: Vec<&str> = engine
            .graph()
            .stations()
            .filter(|s| s.observed.is_observed())
            .map(|s| s.id.as_str())
            .chain(
                engine
                    .graph()
                    .deliveries()
                    .filter(|d| d.observed.is_observed())
                    .map(|d| d.id.as_str()),
            )
            .collect();
        prop_assert!(observed.len() <= 1, "multiple observed elements: {:?}", observed);
        match engine.focus() {
            Some(focus) => prop_assert_eq!(observed, vec![focus.id()]),
            None => prop_assert!(observed.is_empty(), "observed without focus: {:?}", observed),
        }
    }
}
