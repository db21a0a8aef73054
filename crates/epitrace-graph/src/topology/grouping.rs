//! Grouping heuristics.
//!
//! Every finder here is a pure proposal producer: it never mutates the
//! graph. Callers apply accepted proposals through `merge_stations`.
//! Bucketing goes through `BTreeMap`/`BTreeSet` keys so proposal order
//! is stable across runs.

use std::collections::VecDeque;

use epitrace_core::collections::{BTreeMap, BTreeSet, FxHashMap, FxHashSet};
use epitrace_core::model::{GroupMode, GroupSetting, GroupType};

use crate::store::TraceGraph;

/// A candidate merge produced by the grouping heuristics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupProposal {
    /// Suggested display name.
    pub name: String,
    pub group_type: GroupType,
    /// Member station ids, sorted.
    pub members: Vec<String>,
    /// Previously recorded group whose identity this proposal should
    /// reuse, when one matches.
    pub reuse_group: Option<String>,
}

/// Bucket key for pure-endpoint grouping. `Ord` drives deterministic
/// proposal order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct EndpointKey {
    neighbor: String,
    outbreak: bool,
    features: BTreeSet<String>,
}

/// Propose merges of pure source stations (no incoming deliveries) that
/// all ship to the same single target and share the `mode`-derived key.
pub fn group_source_stations(
    graph: &TraceGraph,
    mode: GroupMode,
    previous: &[GroupSetting],
) -> Vec<GroupProposal> {
    pure_endpoint_groups(graph, mode, previous, true)
}

/// Mirror of [`group_source_stations`] over pure sink stations.
pub fn group_target_stations(
    graph: &TraceGraph,
    mode: GroupMode,
    previous: &[GroupSetting],
) -> Vec<GroupProposal> {
    pure_endpoint_groups(graph, mode, previous, false)
}

fn pure_endpoint_groups(
    graph: &TraceGraph,
    mode: GroupMode,
    previous: &[GroupSetting],
    sources: bool,
) -> Vec<GroupProposal> {
    let mut buckets: BTreeMap<EndpointKey, Vec<String>> = BTreeMap::new();

    for station in graph.stations() {
        if station.is_meta() || station.contained {
            continue;
        }
        let (away, links) = if sources {
            (&station.incoming, &station.outgoing)
        } else {
            (&station.outgoing, &station.incoming)
        };
        if !away.is_empty() || links.is_empty() {
            continue;
        }

        // All links must point at one and the same neighbor station.
        let mut neighbor: Option<&str> = None;
        let mut single = true;
        for id in links {
            let delivery = match graph.find_delivery(id) {
                Some(handle) => graph.delivery(handle),
                None => continue,
            };
            let other = if sources {
                delivery.target.as_str()
            } else {
                delivery.source.as_str()
            };
            match neighbor {
                None => neighbor = Some(other),
                Some(current) if current == other => {}
                Some(_) => {
                    single = false;
                    break;
                }
            }
        }
        let neighbor = match (single, neighbor) {
            (true, Some(id)) => id.to_owned(),
            _ => continue,
        };

        let key = EndpointKey {
            neighbor,
            outbreak: station.outbreak,
            features: feature_set(graph, links, mode),
        };
        buckets.entry(key).or_default().push(station.id.clone());
    }

    let group_type = if sources {
        GroupType::SourceGroup
    } else {
        GroupType::TargetGroup
    };
    let mut proposals = Vec::new();
    for (key, mut members) in buckets {
        if members.len() < 2 {
            continue;
        }
        members.sort();
        let name = if sources {
            format!("Sources of {}", key.neighbor)
        } else {
            format!("Targets of {}", key.neighbor)
        };
        proposals.push(GroupProposal {
            name,
            group_type,
            members,
            reuse_group: None,
        });
    }
    match_previous_groups(&mut proposals, previous, group_type);
    proposals
}

/// Key features of a station's deliveries under the given mode.
fn feature_set(graph: &TraceGraph, delivery_ids: &[String], mode: GroupMode) -> BTreeSet<String> {
    let mut features = BTreeSet::new();
    for id in delivery_ids {
        let delivery = match graph.find_delivery(id) {
            Some(handle) => graph.delivery(handle),
            None => continue,
        };
        let feature = match mode {
            GroupMode::Outbreak => continue,
            GroupMode::OutbreakAndProduct => delivery.name.clone(),
            GroupMode::OutbreakAndLot => delivery.lot.clone(),
        };
        if let Some(feature) = feature {
            features.insert(feature);
        }
    }
    features
}

/// Greedy maximum-member-overlap matching of proposals against the
/// groups recorded in a previous session. Each previous group is
/// reused at most once; ties go to the lexicographically smaller group
/// id.
fn match_previous_groups(
    proposals: &mut [GroupProposal],
    previous: &[GroupSetting],
    group_type: GroupType,
) {
    let candidates: Vec<&GroupSetting> = previous
        .iter()
        .filter(|setting| setting.group_type == Some(group_type))
        .collect();
    if candidates.is_empty() {
        return;
    }

    let mut taken: FxHashSet<&str> = FxHashSet::default();
    let mut assigned: FxHashSet<usize> = FxHashSet::default();
    loop {
        let mut best: Option<(usize, usize, usize)> = None;
        for (p_idx, proposal) in proposals.iter().enumerate() {
            if assigned.contains(&p_idx) {
                continue;
            }
            let member_set: FxHashSet<&str> =
                proposal.members.iter().map(String::as_str).collect();
            for (c_idx, setting) in candidates.iter().enumerate() {
                if taken.contains(setting.id.as_str()) {
                    continue;
                }
                let overlap = setting
                    .members
                    .iter()
                    .filter(|member| member_set.contains(member.as_str()))
                    .count();
                if overlap == 0 {
                    continue;
                }
                let better = match best {
                    None => true,
                    Some((best_overlap, _, best_c)) => {
                        overlap > best_overlap
                            || (overlap == best_overlap && setting.id < candidates[best_c].id)
                    }
                };
                if better {
                    best = Some((overlap, p_idx, c_idx));
                }
            }
        }
        let (_, p_idx, c_idx) = match best {
            Some(found) => found,
            None => break,
        };
        proposals[p_idx].reuse_group = Some(candidates[c_idx].id.clone());
        taken.insert(candidates[c_idx].id.as_str());
        assigned.insert(p_idx);
    }
}

/// Propose maximal runs of stations whose in- and out-degree are both
/// at most one. Cyclic runs have no head and are never proposed.
pub fn find_simple_chains(graph: &TraceGraph) -> Vec<GroupProposal> {
    let chainable = |id: &str| -> bool {
        match graph.find_station(id) {
            Some(handle) => {
                let station = graph.station(handle);
                !station.is_meta()
                    && !station.contained
                    && station.incoming.len() <= 1
                    && station.outgoing.len() <= 1
            }
            None => false,
        }
    };

    let mut proposals = Vec::new();
    for station in graph.stations() {
        if !chainable(&station.id) {
            continue;
        }
        // Heads have no chainable predecessor.
        if let Some(previous) = neighbor_station(graph, station.incoming.first(), true) {
            if chainable(previous) {
                continue;
            }
        }

        let mut members = vec![station.id.clone()];
        let mut current = station.id.as_str();
        loop {
            let here = match graph.find_station(current) {
                Some(handle) => graph.station(handle),
                None => break,
            };
            let next = match neighbor_station(graph, here.outgoing.first(), false) {
                Some(next) if chainable(next) && next != current => next,
                _ => break,
            };
            members.push(next.to_owned());
            current = next;
        }
        if members.len() < 2 {
            continue;
        }
        let name = format!("Chain {}-{}", members[0], members[members.len() - 1]);
        proposals.push(GroupProposal {
            name,
            group_type: GroupType::SimpleChain,
            members,
            reuse_group: None,
        });
    }
    proposals
}

/// The station on the far side of a delivery, by id.
fn neighbor_station<'a>(
    graph: &'a TraceGraph,
    delivery_id: Option<&String>,
    upstream: bool,
) -> Option<&'a str> {
    let handle = graph.find_delivery(delivery_id?)?;
    let delivery = graph.delivery(handle);
    let id = if upstream {
        delivery.source.as_str()
    } else {
        delivery.target.as_str()
    };
    graph.find_station(id)?;
    Some(id)
}

/// Propose weakly connected components of size at least two that
/// contain no outbreak station.
pub fn find_isolated_clouds(graph: &TraceGraph) -> Vec<GroupProposal> {
    let mut adjacency: FxHashMap<&str, Vec<&str>> = FxHashMap::default();
    for delivery in graph.deliveries() {
        let source = delivery.source.as_str();
        let target = delivery.target.as_str();
        adjacency.entry(source).or_default().push(target);
        adjacency.entry(target).or_default().push(source);
    }

    let mut seen: FxHashSet<&str> = FxHashSet::default();
    let mut proposals = Vec::new();
    for station in graph.stations() {
        if station.is_meta() || station.contained || seen.contains(station.id.as_str()) {
            continue;
        }
        let mut component: Vec<&str> = Vec::new();
        let mut any_outbreak = false;
        let mut queue = VecDeque::from([station.id.as_str()]);
        seen.insert(station.id.as_str());
        while let Some(id) = queue.pop_front() {
            component.push(id);
            if let Some(handle) = graph.find_station(id) {
                any_outbreak |= graph.station(handle).outbreak;
            }
            for &next in adjacency.get(id).into_iter().flatten() {
                if seen.insert(next) {
                    queue.push_back(next);
                }
            }
        }
        if any_outbreak || component.len() < 2 {
            continue;
        }
        let mut members: Vec<String> = component.iter().map(|id| (*id).to_owned()).collect();
        members.sort();
        proposals.push(GroupProposal {
            name: format!("Cloud {}", members[0]),
            group_type: GroupType::IsolatedGroup,
            members,
            reuse_group: None,
        });
    }
    proposals
}
