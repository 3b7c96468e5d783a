use super::*;

/// Assigns relative grid cells by walking the chain outward from the anchor.
///
/// `cells` is indexed like the clustered entity list; a `Some` entry means the
/// entity is fixed and every later group pass skips it.
struct GridPlacer<'a> {
    entities: &'a [&'a Entity],
    cols: usize,
    cells: Vec<Option<GridCell>>,
    placed: Vec<usize>,
}

impl<'a> GridPlacer<'a> {
    fn new(entities: &'a [&'a Entity], cols: usize) -> Self {
        Self {
            entities,
            cols: cols.max(1),
            cells: vec![None; entities.len()],
            placed: Vec::with_capacity(entities.len()),
        }
    }

    fn rows_for(&self, count: usize) -> i32 {
        count.div_ceil(self.cols) as i32
    }

    fn unplaced(&self, members: &[usize]) -> Vec<usize> {
        members
            .iter()
            .copied()
            .filter(|&idx| self.cells[idx].is_none())
            .collect()
    }

    /// Lay `members` out left to right, `cols` per row, starting at `base_row`.
    fn place_rows(&mut self, members: &[usize], base_row: i32) {
        for (i, &idx) in members.iter().enumerate() {
            let cell = GridCell {
                row: base_row + (i / self.cols) as i32,
                col: i % self.cols,
            };
            self.cells[idx] = Some(cell);
            self.placed.push(idx);
        }
    }

    /// Entities in fewer groups first, then by id.
    fn anchor_order(&self, members: &[usize]) -> Vec<usize> {
        let mut ordered = members.to_vec();
        ordered.sort_by(|&a, &b| {
            let (ea, eb) = (self.entities[a], self.entities[b]);
            ea.group_count()
                .cmp(&eb.group_count())
                .then_with(|| ea.id.cmp(&eb.id))
        });
        ordered
    }

    /// Members whose column is already fixed come first, ascending by that
    /// column; unfixed members follow. Ties break on id. Only the unplaced
    /// tail of the result receives cells.
    fn column_order(&self, members: &[usize]) -> Vec<usize> {
        let mut ordered = members.to_vec();
        ordered.sort_by(|&a, &b| {
            let by_column = match (self.cells[a], self.cells[b]) {
                (Some(ca), Some(cb)) => ca.col.cmp(&cb.col),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            };
            by_column.then_with(|| self.entities[a].id.cmp(&self.entities[b].id))
        });
        ordered
    }

    fn run(mut self, chain: &Chain, groups: &[Group]) -> Vec<(usize, GridCell)> {
        let Some(anchor) = chain.anchor_group() else {
            return Vec::new();
        };

        let first = self.anchor_order(&groups[anchor].members);
        let first = self.unplaced(&first);
        self.place_rows(&first, 0);
        let mut upper_cursor: i32 = 0;
        let mut lower_cursor: i32 = self.rows_for(first.len());

        for &group in chain.order[..chain.anchor].iter().rev() {
            let ordered = self.column_order(&groups[group].members);
            let fresh = self.unplaced(&ordered);
            if fresh.is_empty() {
                continue;
            }
            upper_cursor -= self.rows_for(fresh.len());
            self.place_rows(&fresh, upper_cursor);
        }

        for &group in &chain.order[chain.anchor + 1..] {
            let ordered = self.column_order(&groups[group].members);
            let fresh = self.unplaced(&ordered);
            if fresh.is_empty() {
                continue;
            }
            self.place_rows(&fresh, lower_cursor);
            lower_cursor += self.rows_for(fresh.len());
        }

        trace!(
            placed = self.placed.len(),
            top_row = upper_cursor,
            bottom_row = lower_cursor,
            "grid placement finished"
        );
        let cells = self.cells;
        self.placed
            .into_iter()
            .filter_map(|idx| cells[idx].map(|cell| (idx, cell)))
            .collect()
    }
}

/// Grid cells for every entity reachable from the chain, in placement order.
pub fn place_cells(
    chain: &Chain,
    groups: &[Group],
    entities: &[&Entity],
    cols: usize,
) -> Vec<(usize, GridCell)> {
    GridPlacer::new(entities, cols).run(chain, groups)
}
