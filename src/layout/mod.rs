mod chain;
mod coords;
mod grid;
mod groups;
pub(crate) mod types;
pub use chain::{best_neighbor, build_chain, rank_groups};
pub use coords::{RowStats, canvas_for_positions, measure_canvas, resolve_coordinates};
pub use grid::place_cells;
pub use groups::{index_groups, shared_members};
pub use types::*;

use crate::config::LayoutConfig;
use crate::ir::Entity;
use std::cmp::Ordering;
use std::collections::{BTreeMap, VecDeque};
#[cfg(test)]
use std::collections::{HashMap, HashSet};
use tracing::{debug, trace};

/// Entities that take part in clustering: grouped, unique by id, sorted by id.
/// The first occurrence of a duplicated id wins.
pub fn clustered_members(entities: &[Entity]) -> Vec<&Entity> {
    let mut members: Vec<&Entity> = entities.iter().filter(|e| e.is_grouped()).collect();
    members.sort_by(|a, b| a.id.cmp(&b.id));
    members.dedup_by(|later, earlier| later.id == earlier.id);
    members
}

/// Compute the clustered dashboard layout.
///
/// Entities without groups are ignored; the caller renders them separately.
/// The result depends only on the set of `(id, groups)` pairs, never on input
/// order or on display metadata.
pub fn compute_layout(entities: &[Entity], config: &LayoutConfig) -> DashboardLayout {
    let members = clustered_members(entities);
    if members.is_empty() {
        return DashboardLayout::empty();
    }

    let groups = index_groups(&members);
    let chain = build_chain(&groups);
    if let Some(anchor) = chain.anchor_group() {
        debug!(
            entities = members.len(),
            groups = groups.len(),
            anchor = %groups[anchor].name,
            anchor_pos = chain.anchor,
            "built group chain"
        );
    }

    let cells = place_cells(&chain, &groups, &members, config.cols())
        .into_iter()
        .map(|(idx, cell)| (members[idx].id.clone(), cell))
        .collect();
    let (positions, canvas) = resolve_coordinates(cells, config);
    let chain = chain
        .order
        .iter()
        .map(|&g| ChainGroup::from_group(&groups[g], &members))
        .collect();

    DashboardLayout {
        positions,
        chain,
        canvas,
    }
}
