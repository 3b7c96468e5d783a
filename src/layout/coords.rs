use super::*;

/// Occupancy of the relative grid, row by row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RowStats {
    pub min_row: i32,
    pub max_row: i32,
    pub counts: BTreeMap<i32, usize>,
}

impl RowStats {
    pub fn from_rows<I>(rows: I) -> Self
    where
        I: IntoIterator<Item = i32>,
    {
        let mut counts: BTreeMap<i32, usize> = BTreeMap::new();
        for row in rows {
            *counts.entry(row).or_default() += 1;
        }
        let min_row = counts.keys().next().copied().unwrap_or(0);
        let max_row = counts.keys().next_back().copied().unwrap_or(0);
        Self {
            min_row,
            max_row,
            counts,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    pub fn total_rows(&self) -> usize {
        if self.is_empty() {
            return 0;
        }
        (self.max_row - self.min_row + 1) as usize
    }

    pub fn max_cols_used(&self) -> usize {
        self.counts.values().copied().max().unwrap_or(0)
    }

    pub fn count(&self, row: i32) -> usize {
        self.counts.get(&row).copied().unwrap_or(0)
    }
}

/// Canvas size for the given occupancy: as wide as the fullest row, vertically
/// padded to at least `min_canvas_height`.
pub fn measure_canvas(stats: &RowStats, config: &LayoutConfig) -> Canvas {
    if stats.is_empty() {
        return Canvas::default();
    }
    let rows = stats.total_rows();
    let max_cols_used = stats.max_cols_used();
    let content_height = rows as f32 * config.cell_height;
    Canvas {
        width: max_cols_used as f32 * config.cell_width,
        height: config
            .min_canvas_height
            .max(content_height + config.vertical_margin),
        content_height,
        rows,
        max_cols_used,
    }
}

/// Turn relative cells into final coordinates. Each row is centred on its own
/// so sparse rows narrow toward the middle of the canvas.
pub fn resolve_coordinates(
    cells: Vec<(String, GridCell)>,
    config: &LayoutConfig,
) -> (Vec<PositionEntry>, Canvas) {
    let stats = RowStats::from_rows(cells.iter().map(|(_, cell)| cell.row));
    let canvas = measure_canvas(&stats, config);
    let row_shift = -stats.min_row;
    let start_y = (canvas.height - canvas.content_height) / 2.0;
    let padding = config.cell_padding();

    let positions = cells
        .into_iter()
        .map(|(id, cell)| {
            let row_width = stats.count(cell.row) as f32 * config.cell_width;
            let start_x = (canvas.width - row_width) / 2.0;
            let placement = Placement {
                row: cell.row,
                col: cell.col,
                x: start_x + cell.col as f32 * config.cell_width + padding,
                y: start_y + (cell.row + row_shift) as f32 * config.cell_height,
            };
            (id, placement)
        })
        .collect();
    (positions, canvas)
}

/// Canvas for positions that were computed earlier, e.g. read from the cache.
pub fn canvas_for_positions(positions: &[PositionEntry], config: &LayoutConfig) -> Canvas {
    let stats = RowStats::from_rows(positions.iter().map(|(_, placement)| placement.row));
    measure_canvas(&stats, config)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cell(id: &str, row: i32, col: usize) -> (String, GridCell) {
        (id.to_string(), GridCell { row, col })
    }

    #[test]
    fn centres_each_row() {
        let config = LayoutConfig::default();
        let (positions, canvas) = resolve_coordinates(
            vec![cell("a", 0, 0), cell("b", 0, 1), cell("c", 1, 0)],
            &config,
        );
        assert_eq!(canvas.width, 680.0);
        assert_eq!(canvas.height, 820.0);
        assert_eq!(canvas.content_height, 520.0);
        assert_eq!(canvas.rows, 2);
        let (_, c) = &positions[2];
        assert_eq!((c.x, c.y), (210.0, 410.0));
        let (_, a) = &positions[0];
        assert_eq!((a.x, a.y), (40.0, 150.0));
    }

    #[test]
    fn negative_rows_are_shifted() {
        let config = LayoutConfig::default();
        let (positions, canvas) =
            resolve_coordinates(vec![cell("a", 0, 0), cell("c", -2, 0)], &config);
        // rows -2..=0, row -1 empty
        assert_eq!(canvas.rows, 3);
        assert_eq!(canvas.height, 1080.0);
        assert_eq!(positions[1].1.y, 150.0);
        assert_eq!(positions[0].1.y, 150.0 + 2.0 * 260.0);
    }

    #[test]
    fn width_tracks_fullest_row_not_cols() {
        let config = LayoutConfig::default();
        let (_, canvas) = resolve_coordinates(vec![cell("a", 0, 0), cell("b", 1, 0)], &config);
        assert_eq!(canvas.max_cols_used, 1);
        assert_eq!(canvas.width, 340.0);
        assert_eq!(canvas.height, 820.0);
    }

    #[test]
    fn empty_input_gives_empty_canvas() {
        let (positions, canvas) = resolve_coordinates(Vec::new(), &LayoutConfig::default());
        assert!(positions.is_empty());
        assert_eq!(canvas, Canvas::default());
    }

    #[test]
    fn canvas_can_be_measured_from_positions() {
        let config = LayoutConfig::default();
        let (positions, canvas) = resolve_coordinates(
            vec![cell("a", 0, 0), cell("b", 0, 1), cell("c", 1, 0)],
            &config,
        );
        assert_eq!(canvas_for_positions(&positions, &config), canvas);
    }
}
