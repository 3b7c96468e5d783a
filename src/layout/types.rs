use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::ir::Entity;

/// A named cluster. `members` are indices into the run's clustered entity
/// list, ascending, so member lists double as sorted ID lists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Group {
    pub name: String,
    pub members: Vec<usize>,
    pub connectivity: usize,
}

impl Group {
    pub fn size(&self) -> usize {
        self.members.len()
    }
}

/// Linear group order. `order` holds group indices top to bottom and
/// `anchor` is the position of the anchor group inside `order`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Chain {
    pub order: Vec<usize>,
    pub anchor: usize,
}

impl Chain {
    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn anchor_group(&self) -> Option<usize> {
        self.order.get(self.anchor).copied()
    }
}

/// Relative grid cell. Rows above the anchor's first row are negative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GridCell {
    pub row: i32,
    pub col: usize,
}

/// Final position of one card. Field names follow the browser payload so
/// cached records stay readable by the dashboard page.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Placement {
    #[serde(rename = "relRow")]
    pub row: i32,
    pub col: usize,
    #[serde(rename = "finalX")]
    pub x: f32,
    #[serde(rename = "finalY")]
    pub y: f32,
}

impl Placement {
    pub fn cell(&self) -> GridCell {
        GridCell {
            row: self.row,
            col: self.col,
        }
    }
}

/// `[id, placement]`, serialised as a two element array.
pub type PositionEntry = (String, Placement);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberRef {
    pub id: String,
}

/// Group as carried out of a layout run: name and member IDs only, so
/// display metadata never leaks into cached payloads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainGroup {
    pub name: String,
    pub members: Vec<MemberRef>,
}

impl ChainGroup {
    pub fn from_group(group: &Group, entities: &[&Entity]) -> Self {
        Self {
            name: group.name.clone(),
            members: group
                .members
                .iter()
                .map(|&idx| MemberRef {
                    id: entities[idx].id.clone(),
                })
                .collect(),
        }
    }

    pub fn size(&self) -> usize {
        self.members.len()
    }

    pub fn member_ids(&self) -> impl Iterator<Item = &str> {
        self.members.iter().map(|member| member.id.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Canvas {
    /// Width of the widest row, not of the full `cols` grid.
    pub width: f32,
    pub height: f32,
    pub content_height: f32,
    pub rows: usize,
    pub max_cols_used: usize,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DashboardLayout {
    pub positions: Vec<PositionEntry>,
    pub chain: Vec<ChainGroup>,
    pub canvas: Canvas,
}

impl DashboardLayout {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn position_map(&self) -> HashMap<&str, &Placement> {
        self.positions
            .iter()
            .map(|(id, placement)| (id.as_str(), placement))
            .collect()
    }

    pub fn placement(&self, id: &str) -> Option<&Placement> {
        self.positions
            .iter()
            .find(|(entry, _)| entry == id)
            .map(|(_, placement)| placement)
    }
}
