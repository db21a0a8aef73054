//! Merge/expand surgery and grouping heuristics.

mod grouping;
mod merge;

pub use grouping::{
    find_isolated_clouds, find_simple_chains, group_source_stations, group_target_stations,
    GroupProposal,
};
pub use merge::{expand_stations, merge_stations, merge_stations_with_id};
