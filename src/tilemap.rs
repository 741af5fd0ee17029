use crate::components::Tile;

/// Live, mutable tile matrix for the active level.
///
/// Stored row-major with `rows` rows of `cols` cells. Ragged source rows are
/// padded with [`Tile::Empty`] up to the widest row when the grid is built.
#[derive(Clone, Debug, Default, serde::Serialize)]
pub struct GridWorld {
    cols: usize,
    rows: usize,
    tile_size: f32,
    tiles: Vec<Tile>,
    /// Bumped on every successful mutation so renderers can rebuild lazily.
    #[serde(skip)]
    revision: u64,
}

impl GridWorld {
    pub fn from_rows(rows: &[Vec<Tile>], tile_size: f32) -> Self {
        let cols = rows.iter().map(Vec::len).max().unwrap_or(0);
        let mut tiles = Vec::with_capacity(cols * rows.len());
        for row in rows {
            tiles.extend_from_slice(row);
            tiles.extend(std::iter::repeat(Tile::Empty).take(cols - row.len()));
        }
        Self {
            cols,
            rows: rows.len(),
            tile_size,
            tiles,
            revision: 0,
        }
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn tile_size(&self) -> f32 {
        self.tile_size
    }

    pub fn width_px(&self) -> f32 {
        self.cols as f32 * self.tile_size
    }

    pub fn height_px(&self) -> f32 {
        self.rows as f32 * self.tile_size
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    fn index(&self, col: i32, row: i32) -> Option<usize> {
        if col < 0 || row < 0 || col >= self.cols as i32 || row >= self.rows as i32 {
            return None;
        }
        Some(row as usize * self.cols + col as usize)
    }

    /// Tile at integer cell coordinates; empty outside the grid.
    pub fn get(&self, col: i32, row: i32) -> Tile {
        self.index(col, row)
            .map(|i| self.tiles[i])
            .unwrap_or(Tile::Empty)
    }

    /// Cell containing a world-space point.
    pub fn cell_of(&self, world_x: f32, world_y: f32) -> (i32, i32) {
        (
            (world_x / self.tile_size).floor() as i32,
            (world_y / self.tile_size).floor() as i32,
        )
    }

    pub fn tile_at(&self, world_x: f32, world_y: f32) -> Tile {
        let (col, row) = self.cell_of(world_x, world_y);
        self.get(col, row)
    }

    /// Out-of-range writes are ignored.
    pub fn set_tile(&mut self, col: i32, row: i32, tile: Tile) {
        if let Some(i) = self.index(col, row) {
            self.tiles[i] = tile;
            self.revision = self.revision.wrapping_add(1);
        }
    }

    /// First non-empty row from the top in a column, if any.
    pub fn surface_row(&self, col: i32) -> Option<i32> {
        (0..self.rows as i32).find(|&row| !self.get(col, row).is_empty())
    }

    /// Non-empty cells in row-major order.
    pub fn occupied(&self) -> impl Iterator<Item = (i32, i32, Tile)> + '_ {
        self.tiles.iter().enumerate().filter_map(move |(i, tile)| {
            if tile.is_empty() {
                None
            } else {
                Some(((i % self.cols) as i32, (i / self.cols) as i32, *tile))
            }
        })
    }
}
