use std::collections::HashMap;

use tracing::{debug, info};

use crate::cache::{KeyValueSlot, LayoutCache, MemorySlot, signature};
use crate::config::LayoutConfig;
use crate::ir::{Entity, partition_entities};
use crate::layout::{DashboardLayout, compute_layout};

/// Everything the drawing layer needs for one refresh.
#[derive(Debug, Clone)]
pub struct Dashboard {
    pub layout: DashboardLayout,
    /// Entities with at least one group, sorted by id, carrying fresh metadata.
    pub clustered: Vec<Entity>,
    /// Entities without groups, sorted by id, rendered outside the clusters.
    pub unclustered: Vec<Entity>,
    pub signature: String,
    pub cache_hit: bool,
}

impl Dashboard {
    pub fn entity(&self, id: &str) -> Option<&Entity> {
        self.clustered
            .binary_search_by(|entity| entity.id.as_str().cmp(id))
            .ok()
            .map(|idx| &self.clustered[idx])
    }

    pub fn entities_by_id(&self) -> HashMap<&str, &Entity> {
        self.clustered
            .iter()
            .chain(&self.unclustered)
            .map(|entity| (entity.id.as_str(), entity))
            .collect()
    }
}

/// Lay out a refreshed entity list, reusing the cached layout when the
/// clustered ID set and grid geometry are unchanged and storing a fresh one
/// otherwise.
pub fn build_dashboard<S: KeyValueSlot>(
    entities: Vec<Entity>,
    cache: Option<&mut LayoutCache<S>>,
    config: &LayoutConfig,
) -> Dashboard {
    let (clustered, unclustered) = partition_entities(entities);
    let signature = signature(&clustered);
    debug!(
        clustered = clustered.len(),
        unclustered = unclustered.len(),
        "partitioned entities"
    );

    if clustered.is_empty() {
        return Dashboard {
            layout: DashboardLayout::empty(),
            clustered,
            unclustered,
            signature,
            cache_hit: false,
        };
    }

    let cached = cache
        .as_ref()
        .and_then(|cache| cache.load(&signature, config))
        .map(|record| record.into_layout(config));
    let (layout, cache_hit) = match cached {
        Some(layout) => {
            info!(entities = clustered.len(), "reusing cached layout");
            (layout, true)
        }
        None => {
            info!(entities = clustered.len(), "membership changed, computing layout");
            let layout = compute_layout(&clustered, config);
            if let Some(cache) = cache {
                cache.store(&signature, config, &layout);
            }
            (layout, false)
        }
    };

    Dashboard {
        layout,
        clustered,
        unclustered,
        signature,
        cache_hit,
    }
}

pub fn build_dashboard_uncached(entities: Vec<Entity>, config: &LayoutConfig) -> Dashboard {
    build_dashboard::<MemorySlot>(entities, None, config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::Platform;

    fn entity(id: &str, groups: &[&str]) -> Entity {
        Entity::new(id, Platform::Soop).with_groups(groups.iter().copied())
    }

    fn roster() -> Vec<Entity> {
        vec![
            entity("a", &["X"]),
            entity("b", &["X", "Y"]),
            entity("c", &["Y"]),
            entity("solo", &[]),
        ]
    }

    #[test]
    fn second_refresh_hits_cache() {
        let config = LayoutConfig::default();
        let mut cache = LayoutCache::new(MemorySlot::new());

        let first = build_dashboard(roster(), Some(&mut cache), &config);
        assert!(!first.cache_hit);
        assert_eq!(first.unclustered.len(), 1);

        let mut refreshed = roster();
        refreshed[0].nickname = "New Nick".to_string();
        let second = build_dashboard(refreshed, Some(&mut cache), &config);
        assert!(second.cache_hit);
        assert_eq!(second.layout, first.layout);
        assert_eq!(second.entity("a").unwrap().nickname, "New Nick");
    }

    #[test]
    fn membership_change_recomputes() {
        let config = LayoutConfig::default();
        let mut cache = LayoutCache::new(MemorySlot::new());
        build_dashboard(roster(), Some(&mut cache), &config);

        let mut changed = roster();
        changed.push(entity("d", &["Y"]));
        let dashboard = build_dashboard(changed, Some(&mut cache), &config);
        assert!(!dashboard.cache_hit);
        assert_eq!(dashboard.layout.positions.len(), 4);
        assert!(cache.load(&dashboard.signature, &config).is_some());
    }

    #[test]
    fn unclustered_changes_keep_cache_valid() {
        let config = LayoutConfig::default();
        let mut cache = LayoutCache::new(MemorySlot::new());
        build_dashboard(roster(), Some(&mut cache), &config);

        let mut more = roster();
        more.push(entity("solo2", &[]));
        let dashboard = build_dashboard(more, Some(&mut cache), &config);
        assert!(dashboard.cache_hit);
        assert_eq!(dashboard.unclustered.len(), 2);
    }

    #[test]
    fn changed_grid_geometry_recomputes() {
        let wide = LayoutConfig::default();
        let narrow = LayoutConfig {
            cols: 2,
            cell_width: 200.0,
            card_width: 180.0,
            ..LayoutConfig::default()
        };
        let team = || {
            ["a", "b", "c", "d"]
                .into_iter()
                .map(|id| entity(id, &["X"]))
                .collect::<Vec<_>>()
        };
        let mut cache = LayoutCache::new(MemorySlot::new());
        build_dashboard(team(), Some(&mut cache), &wide);

        let dashboard = build_dashboard(team(), Some(&mut cache), &narrow);
        assert!(!dashboard.cache_hit);
        let canvas = dashboard.layout.canvas;
        for (id, placement) in &dashboard.layout.positions {
            assert!(placement.col < 2, "{id} outside the narrow grid");
            assert!(placement.x + narrow.card_width <= canvas.width, "{id} overflows");
        }

        let again = build_dashboard(team(), Some(&mut cache), &narrow);
        assert!(again.cache_hit);
        assert_eq!(again.layout, dashboard.layout);
    }

    #[test]
    fn first_record_wins_across_grouped_and_loose() {
        let entities = vec![
            entity("a", &[]).with_nickname("Loose"),
            entity("a", &["X"]).with_nickname("Grouped"),
            entity("b", &["X"]),
        ];
        let dashboard = build_dashboard_uncached(entities, &LayoutConfig::default());
        assert_eq!(dashboard.unclustered.len(), 1);
        assert_eq!(dashboard.unclustered[0].nickname, "Loose");
        assert!(dashboard.entity("a").is_none());
        assert_eq!(dashboard.signature, "b");
        assert_eq!(dashboard.layout.positions.len(), 1);
    }

    #[test]
    fn nothing_grouped_gives_empty_layout() {
        let dashboard =
            build_dashboard_uncached(vec![entity("x", &[])], &LayoutConfig::default());
        assert!(dashboard.layout.is_empty());
        assert_eq!(dashboard.signature, "");
        assert!(dashboard.entity("x").is_none());
        assert!(dashboard.entities_by_id().contains_key("x"));
    }
}
