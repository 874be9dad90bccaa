//! Grid reachability and "where can I see it from" queries

pub mod grid;
pub mod reachability;

pub use grid::{DIRECTIONS, GridCell};
pub use reachability::{
    CARDINAL_YAWS, ExploreDiagnostic, ReachabilityExplorer, ReachableSet, VisibleFrom,
};
