//! Screen grid projection and localized diff computation.
//!
//! The producer reports per-region change percentages on a square `wh × wh`
//! grid with a lower-left origin. We project those entries onto the device
//! profile's dense row/column grid (upper-left origin) and compute the diff
//! localized around arbitrary screen coordinates.

use jankscope_common::{Connectivity, JankscopeError, JankscopeResult};
use jankscope_log_model::surfaceflinger::GridEntry;

/// Geometry of the screen-diff reporting grid for one hardware profile.
///
/// The producer covers the full screen height but only `cols` columns of the
/// width, with the last column spanning a partial cell; the edge multipliers
/// rescale those cells to the area they actually cover.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridProfile {
    pub screen_width_px: u32,
    pub screen_height_px: u32,
    /// Width/height of the square producer grid.
    pub grid_wh: usize,
    pub rows: usize,
    pub cols: usize,
    pub pixels_per_cell: u32,
    pub edge_row_mult: f64,
    pub edge_col_mult: f64,
}

/// The one profile current devices report with: 1440×2560 at 320 px/cell.
pub const QUAD_HD_PROFILE: GridProfile = GridProfile {
    screen_width_px: 1440,
    screen_height_px: 2560,
    grid_wh: 8,
    rows: 8,
    cols: 5,
    pixels_per_cell: 320,
    edge_row_mult: 1.0,
    edge_col_mult: 2.0,
};

impl GridProfile {
    /// Screen height in cells (fractional when the last row is partial).
    pub fn rows_effective(&self) -> f64 {
        self.screen_height_px as f64 / self.pixels_per_cell as f64
    }

    /// Screen width in cells (4.5 for the quad-HD profile: the producer's
    /// last reported column covers half a cell).
    pub fn cols_effective(&self) -> f64 {
        self.screen_width_px as f64 / self.pixels_per_cell as f64
    }

    /// Divisor that normalizes a cell-value sum to a whole-screen percent.
    pub fn normalization_cells(&self) -> f64 {
        self.rows_effective() * self.cols_effective()
    }

    /// Map a raw producer position to our (row, col).
    ///
    /// The producer origin is lower-left; ours is upper-left, so the row is
    /// flipped. Positions outside the profile's `rows × cols` window map to
    /// `None`.
    pub fn entry_pos_to_grid_pos(&self, position: i32) -> Option<(usize, usize)> {
        if position < 0 {
            return None;
        }
        let wh = self.grid_wh as i32;
        let row_from_bottom = position / wh;
        let col = (position - row_from_bottom * wh) as usize;
        let row = (wh - 1 - row_from_bottom) as usize;
        if row_from_bottom >= wh || row >= self.rows || col >= self.cols {
            return None;
        }
        Some((row, col))
    }

    /// Area-corrected multiplier for a cell.
    fn edge_mult(&self, row: usize, col: usize) -> f64 {
        let mut mult = 1.0;
        if row == self.rows - 1 {
            mult *= self.edge_row_mult;
        }
        if col == self.cols - 1 {
            mult *= self.edge_col_mult;
        }
        mult
    }
}

/// A frame diff's grid entries projected onto the dense profile grid.
#[derive(Debug, Clone, PartialEq)]
pub struct ScreenGrid {
    profile: GridProfile,
    cells: Vec<f64>,
}

impl ScreenGrid {
    /// Bind a grid from a diff's entries.
    ///
    /// An entry position outside the profile window means the record is
    /// malformed; that is an upstream bug, not something to repair.
    pub fn from_entries(profile: &GridProfile, entries: &[GridEntry]) -> JankscopeResult<Self> {
        let mut cells = vec![0.0; profile.rows * profile.cols];
        for entry in entries {
            let (row, col) = profile.entry_pos_to_grid_pos(entry.position).ok_or_else(|| {
                JankscopeError::grid(format!(
                    "grid entry position {} outside the {}x{} profile window",
                    entry.position, profile.rows, profile.cols
                ))
            })?;
            cells[row * profile.cols + col] = entry.value;
        }
        Ok(Self {
            profile: *profile,
            cells,
        })
    }

    pub fn cell(&self, row: usize, col: usize) -> Option<f64> {
        if row >= self.profile.rows || col >= self.profile.cols {
            return None;
        }
        Some(self.cells[row * self.profile.cols + col])
    }

    /// The diff localized around a screen coordinate.
    ///
    /// Returns `(local_mean, local_normalized)`: the mean area-corrected
    /// cell value over the in-bounds neighborhood, and the same sum
    /// normalized to a whole-screen percent (comparable with a sample's
    /// total `pct_diff`).
    pub fn local_diff(
        &self,
        connectivity: Connectivity,
        x: f64,
        y: f64,
    ) -> JankscopeResult<(f64, f64)> {
        let profile = &self.profile;
        if x < 0.0 || y < 0.0 {
            return Err(JankscopeError::grid(format!(
                "negative screen coordinate ({x}, {y})"
            )));
        }

        let col = (x / profile.pixels_per_cell as f64).floor() as i64;
        let row = (y / profile.pixels_per_cell as f64).floor() as i64;
        if row >= profile.rows as i64 || col >= profile.cols as i64 {
            return Err(JankscopeError::grid(format!(
                "coordinate ({x}, {y}) lands at cell ({row}, {col}), outside the {}x{} grid",
                profile.rows, profile.cols
            )));
        }

        let neighborhood: &[(i64, i64)] = match connectivity {
            Connectivity::One => &[(0, 0)],
            Connectivity::Four => &[(0, 0), (-1, 0), (1, 0), (0, -1), (0, 1)],
            Connectivity::Eight => &[
                (0, 0),
                (-1, -1),
                (-1, 0),
                (-1, 1),
                (0, -1),
                (0, 1),
                (1, -1),
                (1, 0),
                (1, 1),
            ],
        };

        let mut sum = 0.0;
        let mut count = 0usize;
        for (dr, dc) in neighborhood {
            let r = row + dr;
            let c = col + dc;
            if r < 0 || c < 0 || r >= profile.rows as i64 || c >= profile.cols as i64 {
                continue;
            }
            let (r, c) = (r as usize, c as usize);
            sum += self.cells[r * profile.cols + c] * profile.edge_mult(r, c);
            count += 1;
        }

        let local_mean = sum / count as f64;
        let local_normalized = sum / profile.normalization_cells();
        Ok((local_mean, local_normalized))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(position: i32, value: f64) -> GridEntry {
        GridEntry { position, value }
    }

    #[test]
    fn test_entry_pos_mapping() {
        let p = QUAD_HD_PROFILE;
        assert_eq!(p.entry_pos_to_grid_pos(0), Some((7, 0)));
        assert_eq!(p.entry_pos_to_grid_pos(5), None);
        assert_eq!(p.entry_pos_to_grid_pos(26), Some((4, 2)));
        assert_eq!(p.entry_pos_to_grid_pos(56), Some((0, 0)));
        assert_eq!(p.entry_pos_to_grid_pos(61), None);
        assert_eq!(p.entry_pos_to_grid_pos(-1), None);
        assert_eq!(p.entry_pos_to_grid_pos(64), None);
    }

    #[test]
    fn test_entry_pos_mapping_is_injective_in_window() {
        let p = QUAD_HD_PROFILE;
        let mut seen = std::collections::HashSet::new();
        for pos in 0..(p.grid_wh * p.grid_wh) as i32 {
            if let Some(cell) = p.entry_pos_to_grid_pos(pos) {
                assert!(seen.insert(cell), "position {pos} mapped to {cell:?} twice");
            }
        }
        assert_eq!(seen.len(), p.rows * p.cols);
    }

    #[test]
    fn test_normalization_cells() {
        assert_eq!(QUAD_HD_PROFILE.normalization_cells(), 36.0);
    }

    #[test]
    fn test_malformed_entry_position_fails_bind() {
        let err = ScreenGrid::from_entries(&QUAD_HD_PROFILE, &[entry(5, 10.0)]).unwrap_err();
        assert!(matches!(err, JankscopeError::Grid { .. }));
    }

    #[test]
    fn test_local_diff_upper_left() {
        // Single changed region in the upper-left cell.
        let grid = ScreenGrid::from_entries(&QUAD_HD_PROFILE, &[entry(56, 50.0)]).unwrap();

        let (mean, normalized) = grid.local_diff(Connectivity::One, 0.0, 0.0).unwrap();
        assert_eq!(mean, 50.0);
        assert!((normalized - 50.0 / 36.0).abs() < 1e-9);

        // 4-connected from the corner sees center + right + below.
        let (mean, normalized) = grid.local_diff(Connectivity::Four, 0.0, 0.0).unwrap();
        assert!((mean - 50.0 / 3.0).abs() < 1e-9);
        assert!((normalized - 50.0 / 36.0).abs() < 1e-9);
    }

    #[test]
    fn test_local_diff_bottom_right_corner_edge_multipliers() {
        let grid = ScreenGrid::from_entries(
            &QUAD_HD_PROFILE,
            &[entry(3, 100.0), entry(4, 50.0), entry(12, 50.0)],
        )
        .unwrap();

        // (1400, 2500) lands in the bottom-right cell (7, 4); the edge-column
        // values double while the bottom row is full-sized.
        let (mean4, _) = grid.local_diff(Connectivity::Four, 1400.0, 2500.0).unwrap();
        assert!((mean4 - 100.0).abs() < 1e-9);

        let (mean8, _) = grid.local_diff(Connectivity::Eight, 1400.0, 2500.0).unwrap();
        assert!((mean8 - 75.0).abs() < 1e-9);
    }

    #[test]
    fn test_local_diff_out_of_bounds_coordinate() {
        let grid = ScreenGrid::from_entries(&QUAD_HD_PROFILE, &[]).unwrap();
        assert!(grid.local_diff(Connectivity::Four, 1700.0, 100.0).is_err());
        assert!(grid.local_diff(Connectivity::Four, 100.0, 2600.0).is_err());
        assert!(grid.local_diff(Connectivity::Four, -1.0, 100.0).is_err());
    }
}
