//! Layout planning - decides where every tile of a batch goes on the sheet.
//!
//! A [`LayoutPlan`] is computed once from tile metadata and a [`Strategy`] and
//! is read-only afterwards. It fixes the logical grid, the size of every
//! column and row, the cell-to-tile mapping, and the pixel offset of every
//! placement, so compositing the same plan twice always gives the same sheet.
//!
//! # Strategies
//!
//! | Strategy     | Grid                                   | Cell size                 |
//! |--------------|----------------------------------------|---------------------------|
//! | `Auto`       | `ceil(sqrt(n))` columns                | largest tile              |
//! | `Horizontal` | one row, one column per tile           | per tile when sorting     |
//! | `Vertical`   | one column, one row per tile           | per tile when sorting     |
//! | `Explicit`   | author-supplied index matrix           | uniform                   |
//! | `IndexAuto`  | sized from offsets in tile file names  | uniform                   |

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::debug;

use crate::error::{Result, StitchError};
use crate::tile::TileMeta;

/// Tile size used for uniform cells when no tile tells us better.
pub const FALLBACK_TILE_SIZE: (u32, u32) = (128, 128);

/// Strategy names, as used in configuration files and plan metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StrategyKind {
    #[default]
    Auto,
    Horizontal,
    Vertical,
    Explicit,
    IndexAuto,
}

impl StrategyKind {
    pub fn as_str(self) -> &'static str {
        match self {
            StrategyKind::Auto => "auto",
            StrategyKind::Horizontal => "horizontal",
            StrategyKind::Vertical => "vertical",
            StrategyKind::Explicit => "explicit",
            StrategyKind::IndexAuto => "index-auto",
        }
    }
}

impl std::fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How tiles are arranged on the sheet.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Strategy {
    /// Square-ish grid, tallest tiles first
    #[default]
    Auto,
    /// Author-supplied row-major index matrix
    Explicit(ExplicitLayout),
    /// Single row
    Horizontal,
    /// Single column
    Vertical,
    /// Sparse grid addressed by the offsets embedded in tile names
    IndexAuto,
}

impl Strategy {
    pub fn kind(&self) -> StrategyKind {
        match self {
            Strategy::Auto => StrategyKind::Auto,
            Strategy::Explicit(_) => StrategyKind::Explicit,
            Strategy::Horizontal => StrategyKind::Horizontal,
            Strategy::Vertical => StrategyKind::Vertical,
            Strategy::IndexAuto => StrategyKind::IndexAuto,
        }
    }
}

/// Strategy flags as requested by a caller, before conflicts are checked.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StrategyRequest {
    pub auto: bool,
    pub horizontal: bool,
    pub vertical: bool,
    pub explicit: Option<String>,
    pub index_auto: bool,
}

impl StrategyRequest {
    /// True when no strategy flag is set at all.
    pub fn is_empty(&self) -> bool {
        self.requested().is_empty()
    }

    fn requested(&self) -> Vec<&'static str> {
        let mut names = Vec::new();
        if self.horizontal {
            names.push(StrategyKind::Horizontal.as_str());
        }
        if self.vertical {
            names.push(StrategyKind::Vertical.as_str());
        }
        if self.auto {
            names.push(StrategyKind::Auto.as_str());
        }
        if self.explicit.is_some() {
            names.push(StrategyKind::Explicit.as_str());
        }
        if self.index_auto {
            names.push(StrategyKind::IndexAuto.as_str());
        }
        names
    }

    /// Resolve the flags to exactly one strategy.
    ///
    /// No flag means [`Strategy::Auto`]. Explicit layout text is parsed with
    /// the delimiters from `options`.
    ///
    /// # Errors
    ///
    /// * [`StitchError::InvalidStrategy`] if more than one strategy is requested
    /// * [`StitchError::MalformedExplicitLayout`] if the layout text is ragged or empty
    pub fn resolve(&self, options: &LayoutOptions) -> Result<Strategy> {
        let requested = self.requested();
        if requested.len() > 1 {
            return Err(StitchError::InvalidStrategy { requested });
        }

        if let Some(ref text) = self.explicit {
            let layout =
                ExplicitLayout::parse(text, &options.row_delimiter, &options.cell_delimiter)?;
            return Ok(Strategy::Explicit(layout));
        }

        Ok(if self.horizontal {
            Strategy::Horizontal
        } else if self.vertical {
            Strategy::Vertical
        } else if self.index_auto {
            Strategy::IndexAuto
        } else {
            Strategy::Auto
        })
    }
}

/// Row-major matrix of optional tile indices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExplicitLayout {
    text: String,
    rows: Vec<Vec<Option<usize>>>,
}

impl ExplicitLayout {
    /// Parse layout text such as `"0,1,2/3,,5"`.
    ///
    /// Rows are split on `row_delimiter` and cells on `cell_delimiter`. Cells
    /// are trimmed; anything that is not a non-negative integer is an empty
    /// cell. Every row must have the same number of cells.
    pub fn parse(text: &str, row_delimiter: &str, cell_delimiter: &str) -> Result<Self> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(StitchError::malformed(text, "layout is empty"));
        }

        let rows: Vec<Vec<Option<usize>>> = trimmed
            .split(row_delimiter)
            .map(|row| row.split(cell_delimiter).map(|cell| cell.trim().parse().ok()).collect())
            .collect();

        let columns = rows[0].len();
        for (i, row) in rows.iter().enumerate().skip(1) {
            if row.len() != columns {
                return Err(StitchError::malformed(
                    text,
                    format!("row {} has {} cells, expected {}", i, row.len(), columns),
                ));
            }
        }

        Ok(Self { text: text.to_string(), rows })
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn columns(&self) -> usize {
        self.rows[0].len()
    }

    pub fn rows(&self) -> usize {
        self.rows.len()
    }

    /// Cells in row-major order.
    pub fn cells(&self) -> impl Iterator<Item = Option<usize>> + '_ {
        self.rows.iter().flatten().copied()
    }
}

/// Knobs that change sizing without changing the strategy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayoutOptions {
    /// Sort strip tiles (ascending width for rows, height for columns)
    pub sort: bool,
    /// Uniform cell size for Explicit and IndexAuto, instead of the largest tile
    pub cell_size: Option<(u32, u32)>,
    /// Cell size when no referenced tile has known dimensions
    pub fallback_tile: (u32, u32),
    pub row_delimiter: String,
    pub cell_delimiter: String,
    /// Character span `(start, len)` of the IndexAuto offset in a tile name
    pub index_span: (usize, usize),
}

impl Default for LayoutOptions {
    fn default() -> Self {
        Self {
            sort: true,
            cell_size: None,
            fallback_tile: FALLBACK_TILE_SIZE,
            row_delimiter: "/".to_string(),
            cell_delimiter: ",".to_string(),
            index_span: (8, 4),
        }
    }
}

/// Where one tile lands on the canvas.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Placement {
    /// Index into the batch's tiles
    pub tile: usize,
    pub name: String,
    pub x: u32,
    pub y: u32,
    #[serde(rename = "w")]
    pub width: u32,
    #[serde(rename = "h")]
    pub height: u32,
}

impl Placement {
    fn new(tile: usize, meta: &TileMeta, x: u32, y: u32) -> Self {
        Self { tile, name: meta.name.clone(), x, y, width: meta.width, height: meta.height }
    }
}

/// Immutable result of planning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LayoutPlan {
    pub strategy: StrategyKind,
    pub columns: usize,
    pub rows: usize,
    pub column_widths: Vec<u32>,
    pub row_heights: Vec<u32>,
    /// `columns * rows` entries, row-major
    pub cells: Vec<Option<usize>>,
    /// Placements in compositing order
    pub placements: Vec<Placement>,
    #[serde(rename = "canvas")]
    canvas_size: [u32; 2],
}

impl LayoutPlan {
    fn new(
        strategy: StrategyKind,
        columns: usize,
        rows: usize,
        column_widths: Vec<u32>,
        row_heights: Vec<u32>,
        cells: Vec<Option<usize>>,
        placements: Vec<Placement>,
    ) -> Self {
        let canvas_size = [column_widths.iter().sum(), row_heights.iter().sum()];
        Self { strategy, columns, rows, column_widths, row_heights, cells, placements, canvas_size }
    }

    /// Canvas dimensions: sum of column widths by sum of row heights.
    pub fn canvas_size(&self) -> (u32, u32) {
        (self.canvas_size[0], self.canvas_size[1])
    }

    /// Tile index at a grid position, `None` for empty or out-of-grid cells.
    pub fn cell(&self, column: usize, row: usize) -> Option<usize> {
        if column >= self.columns || row >= self.rows {
            return None;
        }
        self.cells[row * self.columns + column]
    }

    /// Number of cells holding a tile.
    pub fn filled_cells(&self) -> usize {
        self.cells.iter().filter(|c| c.is_some()).count()
    }
}

/// Plan the layout of a batch.
///
/// # Errors
///
/// * [`StitchError::EmptyInput`] if `tiles` is empty
/// * [`StitchError::MalformedExplicitLayout`] if an explicit matrix names a
///   tile that does not exist, or names one tile twice
/// * [`StitchError::TileIndex`] if an IndexAuto tile name carries no usable offset
/// * [`StitchError::PlannerInvariant`] if the grid cannot hold every tile
pub fn plan(
    tiles: &[TileMeta],
    strategy: &Strategy,
    options: &LayoutOptions,
) -> Result<LayoutPlan> {
    if tiles.is_empty() {
        return Err(StitchError::EmptyInput("nothing to lay out".to_string()));
    }

    let plan = match strategy {
        Strategy::Auto => plan_auto(tiles)?,
        Strategy::Horizontal => plan_strip(tiles, options.sort, Axis::Horizontal),
        Strategy::Vertical => plan_strip(tiles, options.sort, Axis::Vertical),
        Strategy::Explicit(layout) => plan_explicit(tiles, layout, options)?,
        Strategy::IndexAuto => plan_index_auto(tiles, options)?,
    };

    debug!(
        strategy = %plan.strategy,
        columns = plan.columns,
        rows = plan.rows,
        width = plan.canvas_size[0],
        height = plan.canvas_size[1],
        "planned layout"
    );
    Ok(plan)
}

/// Smallest `c` with `c * c >= n`. Defined for every `usize`.
pub fn ceil_sqrt(n: usize) -> usize {
    // A square that overflows is larger than any n
    let covers = |c: usize| c.checked_mul(c).map_or(true, |square| square >= n);
    let mut c = (n as f64).sqrt().ceil() as usize;
    while !covers(c) {
        c += 1;
    }
    while c > 0 && covers(c - 1) {
        c -= 1;
    }
    c
}

fn max_dimensions<'a>(tiles: impl Iterator<Item = &'a TileMeta>) -> Option<(u32, u32)> {
    tiles.fold(None, |acc, t| match acc {
        None => Some((t.width, t.height)),
        Some((w, h)) => Some((w.max(t.width), h.max(t.height))),
    })
}

/// Auto grid.
///
/// Tiles are stable-sorted by ascending height and consumed from the end, so
/// the tallest go first and equal heights come out in reverse input order.
/// Within a row `x` advances by each placed tile's own width; a finished row
/// advances `y` by the tallest tile placed in it.
// Mixed tile sizes can leave uneven gaps this way; kept for parity with
// sheets produced by the older tooling.
fn plan_auto(tiles: &[TileMeta]) -> Result<LayoutPlan> {
    let n = tiles.len();
    let columns = ceil_sqrt(n);
    let rows = n.div_ceil(columns);
    if n > columns * rows {
        return Err(StitchError::PlannerInvariant(format!(
            "{} tiles do not fit a {}x{} grid",
            n, columns, rows
        )));
    }

    let (max_w, max_h) = max_dimensions(tiles.iter()).unwrap_or(FALLBACK_TILE_SIZE);

    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by_key(|&i| tiles[i].height);

    let mut cells = vec![None; columns * rows];
    let mut placements = Vec::with_capacity(n);
    let mut top = 0u32;

    'grid: for row in 0..rows {
        let Some(&next) = order.last() else {
            break;
        };
        let mut row_height = tiles[next].height;
        let mut left = 0u32;

        for col in 0..columns {
            let Some(index) = order.pop() else {
                break 'grid;
            };
            cells[row * columns + col] = Some(index);
            placements.push(Placement::new(index, &tiles[index], left, top));
            left += tiles[index].width;
            row_height = row_height.max(tiles[index].height);
        }

        top += row_height;
    }

    Ok(LayoutPlan::new(
        StrategyKind::Auto,
        columns,
        rows,
        vec![max_w; columns],
        vec![max_h; rows],
        cells,
        placements,
    ))
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Axis {
    Horizontal,
    Vertical,
}

/// Single row or column. Sorted strips size each cell to its tile; unsorted
/// strips use uniform cells of the largest tile.
fn plan_strip(tiles: &[TileMeta], sort: bool, axis: Axis) -> LayoutPlan {
    let n = tiles.len();
    let (max_w, max_h) = max_dimensions(tiles.iter()).unwrap_or(FALLBACK_TILE_SIZE);
    let along = |t: &TileMeta| match axis {
        Axis::Horizontal => t.width,
        Axis::Vertical => t.height,
    };

    let mut order: Vec<usize> = (0..n).collect();
    if sort {
        order.sort_by_key(|&i| along(&tiles[i]));
    }

    let sizes: Vec<u32> = if sort {
        order.iter().map(|&i| along(&tiles[i])).collect()
    } else {
        let uniform = match axis {
            Axis::Horizontal => max_w,
            Axis::Vertical => max_h,
        };
        vec![uniform; n]
    };

    let mut placements = Vec::with_capacity(n);
    let mut offset = 0u32;
    for (&index, &size) in order.iter().zip(&sizes) {
        let (x, y) = match axis {
            Axis::Horizontal => (offset, 0),
            Axis::Vertical => (0, offset),
        };
        placements.push(Placement::new(index, &tiles[index], x, y));
        offset += size;
    }

    let cells = order.into_iter().map(Some).collect();
    match axis {
        Axis::Horizontal => LayoutPlan::new(
            StrategyKind::Horizontal,
            n,
            1,
            sizes,
            vec![max_h],
            cells,
            placements,
        ),
        Axis::Vertical => {
            LayoutPlan::new(StrategyKind::Vertical, 1, n, vec![max_w], sizes, cells, placements)
        }
    }
}

/// Uniform cell size: configured, else the largest referenced tile, else the fallback.
fn uniform_cell(
    tiles: &[TileMeta],
    cells: &[Option<usize>],
    options: &LayoutOptions,
) -> (u32, u32) {
    if let Some(size) = options.cell_size {
        return size;
    }
    max_dimensions(cells.iter().flatten().map(|&i| &tiles[i])).unwrap_or(options.fallback_tile)
}

fn plan_uniform_grid(
    kind: StrategyKind,
    tiles: &[TileMeta],
    columns: usize,
    rows: usize,
    cells: Vec<Option<usize>>,
    options: &LayoutOptions,
) -> LayoutPlan {
    let (cell_w, cell_h) = uniform_cell(tiles, &cells, options);

    let placements = cells
        .iter()
        .enumerate()
        .filter_map(|(i, cell)| {
            cell.map(|index| {
                let x = (i % columns) as u32 * cell_w;
                let y = (i / columns) as u32 * cell_h;
                Placement::new(index, &tiles[index], x, y)
            })
        })
        .collect();

    let column_widths = vec![cell_w; columns];
    let row_heights = vec![cell_h; rows];
    LayoutPlan::new(kind, columns, rows, column_widths, row_heights, cells, placements)
}

fn plan_explicit(
    tiles: &[TileMeta],
    layout: &ExplicitLayout,
    options: &LayoutOptions,
) -> Result<LayoutPlan> {
    let mut seen = HashSet::new();
    for index in layout.cells().flatten() {
        if index >= tiles.len() {
            return Err(StitchError::malformed(
                layout.text(),
                format!("tile index {} out of range (have {} tiles)", index, tiles.len()),
            ));
        }
        if !seen.insert(index) {
            return Err(StitchError::malformed(
                layout.text(),
                format!("tile index {} used more than once", index),
            ));
        }
    }

    let unused = tiles.len() - seen.len();
    if unused > 0 {
        debug!(unused, "tiles not referenced by explicit layout");
    }

    let cells: Vec<Option<usize>> = layout.cells().collect();
    Ok(plan_uniform_grid(
        StrategyKind::Explicit,
        tiles,
        layout.columns(),
        layout.rows(),
        cells,
        options,
    ))
}

/// Read the grid offset embedded in a tile name at character span `(start, len)`.
pub fn parse_index_offset(name: &str, span: (usize, usize)) -> Result<usize> {
    let (start, len) = span;
    let digits: String = name.chars().skip(start).take(len).collect();
    if digits.chars().count() < len {
        return Err(StitchError::TileIndex {
            name: name.to_string(),
            reason: format!("name too short for offset at {}..{}", start, start + len),
        });
    }
    digits.parse().map_err(|_| StitchError::TileIndex {
        name: name.to_string(),
        reason: format!("'{}' at {}..{} is not a number", digits, start, start + len),
    })
}

fn plan_index_auto(tiles: &[TileMeta], options: &LayoutOptions) -> Result<LayoutPlan> {
    let mut offsets = Vec::with_capacity(tiles.len());
    let mut seen = HashSet::new();
    for tile in tiles {
        let offset = parse_index_offset(&tile.name, options.index_span)?;
        if !seen.insert(offset) {
            return Err(StitchError::TileIndex {
                name: tile.name.clone(),
                reason: format!("offset {} already taken by another tile", offset),
            });
        }
        offsets.push(offset);
    }

    // Sized from the largest offset; the grid must also cover offset 0.
    let max_offset = offsets.iter().copied().max().unwrap_or(0);
    let columns = ceil_sqrt(max_offset).max(1);
    let too_large = || {
        StitchError::PlannerInvariant(format!("offset {} needs an unaddressable grid", max_offset))
    };
    let rows = max_offset.checked_add(1).ok_or_else(too_large)?.div_ceil(columns);
    let total = columns.checked_mul(rows).ok_or_else(too_large)?;
    if max_offset >= total || tiles.len() > total {
        return Err(StitchError::PlannerInvariant(format!(
            "offset {} does not fit a {}x{} grid",
            max_offset, columns, rows
        )));
    }

    let mut cells = vec![None; total];
    for (index, &offset) in offsets.iter().enumerate() {
        cells[offset] = Some(index);
    }

    Ok(plan_uniform_grid(StrategyKind::IndexAuto, tiles, columns, rows, cells, options))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square_tiles(n: usize, size: u32) -> Vec<TileMeta> {
        (0..n).map(|i| TileMeta::new(format!("tile{}", i), size, size)).collect()
    }

    fn order(plan: &LayoutPlan) -> Vec<usize> {
        plan.placements.iter().map(|p| p.tile).collect()
    }

    #[test]
    fn test_ceil_sqrt() {
        assert_eq!(ceil_sqrt(0), 0);
        assert_eq!(ceil_sqrt(1), 1);
        assert_eq!(ceil_sqrt(2), 2);
        assert_eq!(ceil_sqrt(4), 2);
        assert_eq!(ceil_sqrt(5), 3);
        assert_eq!(ceil_sqrt(9), 3);
        assert_eq!(ceil_sqrt(10), 4);
    }

    #[test]
    fn test_ceil_sqrt_near_usize_max() {
        let root = 1usize << (usize::BITS / 2);
        assert_eq!(ceil_sqrt(usize::MAX), root);
        assert_eq!(ceil_sqrt((root - 1) * (root - 1)), root - 1);
        assert_eq!(ceil_sqrt((root - 1) * (root - 1) + 1), root);
    }

    #[test]
    fn test_auto_grid_always_fits() {
        for n in 1..=200 {
            let plan = plan(&square_tiles(n, 4), &Strategy::Auto, &LayoutOptions::default())
                .expect("auto plan");
            assert_eq!(plan.columns, ceil_sqrt(n), "columns for n={}", n);
            assert!(plan.columns * plan.rows >= n, "grid too small for n={}", n);
            assert_eq!(plan.cells.len(), plan.columns * plan.rows);
            assert_eq!(plan.filled_cells(), n);
        }
    }

    #[test]
    fn test_auto_six_equal_tiles() {
        let plan = plan(&square_tiles(6, 128), &Strategy::Auto, &LayoutOptions::default())
            .expect("auto plan");
        assert_eq!((plan.columns, plan.rows), (3, 2));
        assert_eq!(plan.canvas_size(), (384, 256));
        assert_eq!(plan.filled_cells(), 6);
        // Equal heights come off the end of the stable sort: reverse input order
        assert_eq!(order(&plan), vec![5, 4, 3, 2, 1, 0]);
        assert_eq!(plan.cell(0, 0), Some(5));
        assert_eq!(plan.cell(2, 1), Some(0));

        let offsets: Vec<(u32, u32)> = plan.placements.iter().map(|p| (p.x, p.y)).collect();
        assert_eq!(
            offsets,
            vec![(0, 0), (128, 0), (256, 0), (0, 128), (128, 128), (256, 128)]
        );
    }

    #[test]
    fn test_auto_tallest_first_with_per_tile_advance() {
        let tiles = vec![
            TileMeta::new("a", 10, 10),
            TileMeta::new("b", 12, 30),
            TileMeta::new("c", 8, 20),
            TileMeta::new("d", 10, 30),
        ];
        let plan = plan(&tiles, &Strategy::Auto, &LayoutOptions::default()).expect("auto plan");

        assert_eq!((plan.columns, plan.rows), (2, 2));
        assert_eq!(plan.canvas_size(), (24, 60));
        assert_eq!(order(&plan), vec![3, 1, 2, 0]);

        let p: Vec<(usize, u32, u32)> =
            plan.placements.iter().map(|p| (p.tile, p.x, p.y)).collect();
        // x advances by each tile's own width, y by the tallest tile of the row
        assert_eq!(p, vec![(3, 0, 0), (1, 10, 0), (2, 0, 30), (0, 8, 30)]);
    }

    #[test]
    fn test_auto_partial_last_row() {
        let plan = plan(&square_tiles(5, 2), &Strategy::Auto, &LayoutOptions::default())
            .expect("auto plan");
        assert_eq!((plan.columns, plan.rows), (3, 2));
        assert_eq!(plan.cell(2, 1), None);
        assert_eq!(plan.cell(1, 1), Some(0));
    }

    #[test]
    fn test_empty_input() {
        let err = plan(&[], &Strategy::Auto, &LayoutOptions::default()).unwrap_err();
        assert!(matches!(err, StitchError::EmptyInput(_)));
    }

    #[test]
    fn test_horizontal_sorted_by_width() {
        let tiles = vec![
            TileMeta::new("a", 100, 40),
            TileMeta::new("b", 150, 60),
            TileMeta::new("c", 128, 50),
        ];
        let plan =
            plan(&tiles, &Strategy::Horizontal, &LayoutOptions::default()).expect("strip plan");
        assert_eq!((plan.columns, plan.rows), (3, 1));
        assert_eq!(plan.canvas_size(), (378, 60));
        assert_eq!(order(&plan), vec![0, 2, 1]);
        assert_eq!(plan.column_widths, vec![100, 128, 150]);
        let xs: Vec<u32> = plan.placements.iter().map(|p| p.x).collect();
        assert_eq!(xs, vec![0, 100, 228]);
    }

    #[test]
    fn test_horizontal_unsorted_uniform_cells() {
        let tiles = vec![
            TileMeta::new("a", 100, 40),
            TileMeta::new("b", 150, 60),
            TileMeta::new("c", 128, 50),
        ];
        let options = LayoutOptions { sort: false, ..Default::default() };
        let plan = plan(&tiles, &Strategy::Horizontal, &options).expect("strip plan");
        assert_eq!(plan.canvas_size(), (450, 60));
        assert_eq!(order(&plan), vec![0, 1, 2]);
        let xs: Vec<u32> = plan.placements.iter().map(|p| p.x).collect();
        assert_eq!(xs, vec![0, 150, 300]);
    }

    #[test]
    fn test_vertical_sorted_by_height() {
        let tiles = vec![
            TileMeta::new("a", 10, 30),
            TileMeta::new("b", 20, 10),
            TileMeta::new("c", 15, 10),
        ];
        let plan =
            plan(&tiles, &Strategy::Vertical, &LayoutOptions::default()).expect("strip plan");
        assert_eq!((plan.columns, plan.rows), (1, 3));
        assert_eq!(plan.canvas_size(), (20, 50));
        // Stable: b before c on equal height
        assert_eq!(order(&plan), vec![1, 2, 0]);
        let ys: Vec<u32> = plan.placements.iter().map(|p| p.y).collect();
        assert_eq!(ys, vec![0, 10, 20]);
    }

    #[test]
    fn test_explicit_parse() {
        let layout = ExplicitLayout::parse("0, 1,x/ 2,,3", "/", ",").expect("valid layout");
        assert_eq!((layout.columns(), layout.rows()), (3, 2));
        let cells: Vec<_> = layout.cells().collect();
        assert_eq!(cells, vec![Some(0), Some(1), None, Some(2), None, Some(3)]);
    }

    #[test]
    fn test_explicit_ragged_rows() {
        let err = ExplicitLayout::parse("0,1,2/3,4", "/", ",").unwrap_err();
        assert!(matches!(err, StitchError::MalformedExplicitLayout { .. }));
    }

    #[test]
    fn test_explicit_empty_text() {
        let err = ExplicitLayout::parse("   ", "/", ",").unwrap_err();
        assert!(matches!(err, StitchError::MalformedExplicitLayout { .. }));
    }

    #[test]
    fn test_explicit_custom_delimiters() {
        let layout = ExplicitLayout::parse("0 1;2 3", ";", " ").expect("valid layout");
        assert_eq!((layout.columns(), layout.rows()), (2, 2));
    }

    #[test]
    fn test_explicit_plan_uses_largest_referenced_tile() {
        let tiles = vec![
            TileMeta::new("a", 16, 16),
            TileMeta::new("b", 32, 8),
            TileMeta::new("c", 64, 64),
        ];
        let layout = ExplicitLayout::parse("1,-/-,0", "/", ",").expect("valid layout");
        let plan =
            plan(&tiles, &Strategy::Explicit(layout), &LayoutOptions::default()).expect("plan");
        assert_eq!((plan.columns, plan.rows), (2, 2));
        assert_eq!(plan.canvas_size(), (64, 32));
        let p: Vec<(usize, u32, u32)> =
            plan.placements.iter().map(|p| (p.tile, p.x, p.y)).collect();
        assert_eq!(p, vec![(1, 0, 0), (0, 32, 16)]);
    }

    #[test]
    fn test_explicit_configured_cell_size() {
        let tiles = square_tiles(2, 10);
        let layout = ExplicitLayout::parse("0,1", "/", ",").expect("valid layout");
        let options = LayoutOptions { cell_size: Some((24, 12)), ..Default::default() };
        let plan = plan(&tiles, &Strategy::Explicit(layout), &options).expect("plan");
        assert_eq!(plan.canvas_size(), (48, 12));
        assert_eq!(plan.placements[1].x, 24);
    }

    #[test]
    fn test_explicit_all_empty_uses_fallback_size() {
        let tiles = square_tiles(1, 10);
        let layout = ExplicitLayout::parse("-,-/-,-", "/", ",").expect("valid layout");
        let plan =
            plan(&tiles, &Strategy::Explicit(layout), &LayoutOptions::default()).expect("plan");
        assert_eq!(plan.canvas_size(), (256, 256));
        assert!(plan.placements.is_empty());
    }

    #[test]
    fn test_explicit_index_out_of_range() {
        let layout = ExplicitLayout::parse("0,5", "/", ",").expect("valid layout");
        let err = plan(&square_tiles(2, 4), &Strategy::Explicit(layout), &LayoutOptions::default())
            .unwrap_err();
        assert!(matches!(err, StitchError::MalformedExplicitLayout { .. }));
    }

    #[test]
    fn test_explicit_duplicate_index() {
        let layout = ExplicitLayout::parse("0,0", "/", ",").expect("valid layout");
        let err = plan(&square_tiles(2, 4), &Strategy::Explicit(layout), &LayoutOptions::default())
            .unwrap_err();
        assert!(matches!(err, StitchError::MalformedExplicitLayout { .. }));
    }

    #[test]
    fn test_parse_index_offset() {
        assert_eq!(parse_index_offset("DESERT1-0003.png", (8, 4)).unwrap(), 3);
        assert_eq!(parse_index_offset("DESERT1-0120.png", (8, 4)).unwrap(), 120);
        assert!(matches!(
            parse_index_offset("DESERT1-ABCD.png", (8, 4)),
            Err(StitchError::TileIndex { .. })
        ));
        assert!(matches!(parse_index_offset("short", (8, 4)), Err(StitchError::TileIndex { .. })));
    }

    #[test]
    fn test_index_auto_leaves_gaps() {
        let tiles = vec![
            TileMeta::new("DESERT1-0000.png", 8, 8),
            TileMeta::new("DESERT1-0001.png", 8, 8),
            TileMeta::new("DESERT1-0003.png", 8, 8),
        ];
        let plan = plan(&tiles, &Strategy::IndexAuto, &LayoutOptions::default()).expect("plan");
        assert_eq!((plan.columns, plan.rows), (2, 2));
        assert_eq!(plan.cells, vec![Some(0), Some(1), None, Some(2)]);
        assert_eq!(plan.canvas_size(), (16, 16));
        let p: Vec<(usize, u32, u32)> =
            plan.placements.iter().map(|p| (p.tile, p.x, p.y)).collect();
        assert_eq!(p, vec![(0, 0, 0), (1, 8, 0), (2, 8, 8)]);
    }

    #[test]
    fn test_index_auto_single_tile_at_zero() {
        let tiles = vec![TileMeta::new("DESERT1-0000.png", 8, 8)];
        let plan = plan(&tiles, &Strategy::IndexAuto, &LayoutOptions::default()).expect("plan");
        assert_eq!((plan.columns, plan.rows), (1, 1));
        assert_eq!(plan.cells, vec![Some(0)]);
    }

    #[test]
    fn test_index_auto_input_order_independent() {
        let tiles = vec![
            TileMeta::new("DESERT1-0004.png", 8, 8),
            TileMeta::new("DESERT1-0000.png", 8, 8),
        ];
        let plan = plan(&tiles, &Strategy::IndexAuto, &LayoutOptions::default()).expect("plan");
        assert_eq!((plan.columns, plan.rows), (2, 3));
        assert_eq!(plan.cell(0, 0), Some(1));
        assert_eq!(plan.cell(0, 2), Some(0));
    }

    #[test]
    fn test_index_auto_duplicate_offset() {
        let tiles = vec![
            TileMeta::new("DESERT1-0002.png", 8, 8),
            TileMeta::new("JUNGLE1-0002.png", 8, 8),
        ];
        let err = plan(&tiles, &Strategy::IndexAuto, &LayoutOptions::default()).unwrap_err();
        assert!(matches!(err, StitchError::TileIndex { .. }));
    }

    #[test]
    fn test_index_auto_offset_at_usize_max() {
        let digits = usize::MAX.to_string();
        let tiles = vec![TileMeta::new(format!("{}.png", digits), 8, 8)];
        let options = LayoutOptions { index_span: (0, digits.len()), ..LayoutOptions::default() };
        let err = plan(&tiles, &Strategy::IndexAuto, &options).unwrap_err();
        assert!(matches!(err, StitchError::PlannerInvariant(_)));
    }

    #[test]
    fn test_strategy_request_conflict() {
        let request = StrategyRequest { horizontal: true, vertical: true, ..Default::default() };
        let err = request.resolve(&LayoutOptions::default()).unwrap_err();
        match err {
            StitchError::InvalidStrategy { requested } => {
                assert_eq!(requested, vec!["horizontal", "vertical"]);
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_strategy_request_default_is_auto() {
        let request = StrategyRequest::default();
        assert!(request.is_empty());
        assert_eq!(request.resolve(&LayoutOptions::default()).unwrap(), Strategy::Auto);
    }

    #[test]
    fn test_strategy_request_explicit() {
        let request = StrategyRequest { explicit: Some("0,1".to_string()), ..Default::default() };
        let strategy = request.resolve(&LayoutOptions::default()).unwrap();
        assert_eq!(strategy.kind(), StrategyKind::Explicit);
    }

    #[test]
    fn test_plan_serializes_to_json() {
        let plan = plan(&square_tiles(2, 4), &Strategy::Horizontal, &LayoutOptions::default())
            .expect("plan");
        let json = serde_json::to_value(&plan).expect("serialize");
        assert_eq!(json["strategy"], "horizontal");
        assert_eq!(json["canvas"], serde_json::json!([8, 4]));
        assert_eq!(json["placements"][1]["x"], 4);
        assert_eq!(json["placements"][1]["w"], 4);
    }
}
