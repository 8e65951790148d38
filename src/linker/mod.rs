//! Turns remote title and bundle metadata into parent/child catalog records.

mod hierarchy;

pub use hierarchy::{HierarchyLinker, LinkPlan, LinkerSettings, RootPolicy};
