//! Evidence grid: per-cell occupancy belief in log-odds form.
//!
//! ```text
//! P(occupied) = 1 / (1 + exp(-log_odds))
//! Update: log_odds += log_odds_observation (clamped)
//! ```
//!
//! The grid extent is fixed at construction and never resized; updates that
//! would fall outside it are ignored. There is no temporal decay — the world
//! is assumed static for the lifetime of the process.

use serde::{Deserialize, Serialize};

/// Cell classification derived from log-odds thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellState {
    Unknown,
    Free,
    Occupied,
}

/// Configuration for the evidence grid.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvidenceGridConfig {
    /// Cell size in meters.
    #[serde(default = "default_resolution")]
    pub resolution: f32,

    /// Grid width in cells.
    #[serde(default = "default_extent")]
    pub width: usize,

    /// Grid height in cells.
    #[serde(default = "default_extent")]
    pub height: usize,

    /// Log-odds added for an occupied observation.
    #[serde(default = "default_log_odds_occupied")]
    pub log_odds_occupied: f32,

    /// Log-odds added for a free observation (negative).
    #[serde(default = "default_log_odds_free")]
    pub log_odds_free: f32,

    /// Clamp bound; cells never exceed ±this value.
    #[serde(default = "default_log_odds_clamp")]
    pub log_odds_clamp: f32,

    /// Log-odds above which a cell counts as occupied.
    #[serde(default = "default_occupied_threshold")]
    pub occupied_threshold: f32,

    /// Log-odds below which a cell counts as free.
    #[serde(default = "default_free_threshold")]
    pub free_threshold: f32,
}

fn default_resolution() -> f32 {
    0.01
}
fn default_extent() -> usize {
    512
}
fn default_log_odds_occupied() -> f32 {
    0.9
}
fn default_log_odds_free() -> f32 {
    -0.7
}
fn default_log_odds_clamp() -> f32 {
    50.0
}
fn default_occupied_threshold() -> f32 {
    0.5
}
fn default_free_threshold() -> f32 {
    -0.5
}

impl Default for EvidenceGridConfig {
    fn default() -> Self {
        Self {
            resolution: default_resolution(),
            width: default_extent(),
            height: default_extent(),
            log_odds_occupied: default_log_odds_occupied(),
            log_odds_free: default_log_odds_free(),
            log_odds_clamp: default_log_odds_clamp(),
            occupied_threshold: default_occupied_threshold(),
            free_threshold: default_free_threshold(),
        }
    }
}

/// 2D evidence grid centered on the world origin.
///
/// Row-major storage: index = cy * width + cx.
#[derive(Debug, Clone)]
pub struct EvidenceGrid {
    config: EvidenceGridConfig,
    cells: Vec<f32>,
    /// World coordinate of cell (0, 0).
    origin_x: f32,
    origin_y: f32,
}

impl EvidenceGrid {
    pub fn new(config: EvidenceGridConfig) -> Self {
        let cells = vec![0.0; config.width * config.height];
        let origin_x = -(config.width as f32) * config.resolution / 2.0;
        let origin_y = -(config.height as f32) * config.resolution / 2.0;
        Self {
            config,
            cells,
            origin_x,
            origin_y,
        }
    }

    pub fn config(&self) -> &EvidenceGridConfig {
        &self.config
    }

    pub fn dimensions(&self) -> (usize, usize) {
        (self.config.width, self.config.height)
    }

    pub fn resolution(&self) -> f32 {
        self.config.resolution
    }

    /// Convert world coordinates to cell indices, `None` outside the extent.
    #[inline]
    pub fn world_to_cell(&self, x: f32, y: f32) -> Option<(usize, usize)> {
        let cx = ((x - self.origin_x) / self.config.resolution).floor();
        let cy = ((y - self.origin_y) / self.config.resolution).floor();
        if cx >= 0.0 && cy >= 0.0 {
            let (cx, cy) = (cx as usize, cy as usize);
            if cx < self.config.width && cy < self.config.height {
                return Some((cx, cy));
            }
        }
        None
    }

    /// Signed cell indices for ray traversal; may lie outside the extent.
    #[inline]
    fn world_to_cell_signed(&self, x: f32, y: f32) -> (i64, i64) {
        (
            ((x - self.origin_x) / self.config.resolution).floor() as i64,
            ((y - self.origin_y) / self.config.resolution).floor() as i64,
        )
    }

    #[inline]
    fn in_bounds(&self, cx: i64, cy: i64) -> bool {
        cx >= 0 && cy >= 0 && (cx as usize) < self.config.width && (cy as usize) < self.config.height
    }

    /// Log-odds at a cell; out-of-bounds reads as unknown (0.0).
    #[inline]
    pub fn log_odds(&self, cx: usize, cy: usize) -> f32 {
        if cx < self.config.width && cy < self.config.height {
            self.cells[cy * self.config.width + cx]
        } else {
            0.0
        }
    }

    /// Occupancy probability at a cell, 0.0 to 1.0.
    pub fn probability(&self, cx: usize, cy: usize) -> f32 {
        1.0 / (1.0 + (-self.log_odds(cx, cy)).exp())
    }

    pub fn state(&self, cx: usize, cy: usize) -> CellState {
        let lo = self.log_odds(cx, cy);
        if lo >= self.config.occupied_threshold {
            CellState::Occupied
        } else if lo <= self.config.free_threshold {
            CellState::Free
        } else {
            CellState::Unknown
        }
    }

    /// Raw cell data, row-major.
    pub fn cells(&self) -> &[f32] {
        &self.cells
    }

    /// Apply one observation to a cell. Out-of-bounds cells are ignored.
    #[inline]
    fn update_cell(&mut self, cx: i64, cy: i64, occupied: bool) {
        if !self.in_bounds(cx, cy) {
            return;
        }
        let idx = cy as usize * self.config.width + cx as usize;
        let delta = if occupied {
            self.config.log_odds_occupied
        } else {
            self.config.log_odds_free
        };
        let clamp = self.config.log_odds_clamp;
        self.cells[idx] = (self.cells[idx] + delta).clamp(-clamp, clamp);
    }

    /// Record a return at `range` meters along `bearing` (world frame) from
    /// the robot at (`robot_x`, `robot_y`).
    ///
    /// Cells between the robot and the endpoint accumulate free evidence;
    /// the endpoint cell accumulates occupied evidence.
    pub fn observe_occupied(&mut self, range: f32, bearing: f32, robot_x: f32, robot_y: f32) {
        let (sin_b, cos_b) = bearing.sin_cos();
        let end_x = robot_x + range * cos_b;
        let end_y = robot_y + range * sin_b;
        self.trace_ray(robot_x, robot_y, end_x, end_y, true);
    }

    /// Record the absence of a return along `bearing` (world frame).
    ///
    /// Policy for out-of-band samples: the ray is treated as unobstructed up
    /// to the scanner's maximum range, so every traversed cell accumulates
    /// free evidence and no endpoint is marked.
    pub fn observe_free(&mut self, max_range: f32, bearing: f32, robot_x: f32, robot_y: f32) {
        let (sin_b, cos_b) = bearing.sin_cos();
        let end_x = robot_x + max_range * cos_b;
        let end_y = robot_y + max_range * sin_b;
        self.trace_ray(robot_x, robot_y, end_x, end_y, false);
    }

    /// Bresenham traversal from start to end in cell space.
    ///
    /// Intermediate cells are marked free; the endpoint is marked occupied
    /// when `mark_endpoint` is set. Every cell write is bounds-checked, so a
    /// ray that leaves the extent simply stops contributing.
    fn trace_ray(&mut self, start_x: f32, start_y: f32, end_x: f32, end_y: f32, mark_endpoint: bool) {
        let (x0, y0) = self.world_to_cell_signed(start_x, start_y);
        let (x1, y1) = self.world_to_cell_signed(end_x, end_y);

        let dx = (x1 - x0).abs();
        let dy = (y1 - y0).abs();
        let sx = if x0 < x1 { 1 } else { -1 };
        let sy = if y0 < y1 { 1 } else { -1 };

        let mut x = x0;
        let mut y = y0;
        let mut err = dx - dy;

        // Upper bound on cells a ray can touch inside the extent.
        let max_steps = self.config.width + self.config.height;
        let mut steps = 0;

        loop {
            if x == x1 && y == y1 {
                if mark_endpoint {
                    self.update_cell(x, y, true);
                }
                break;
            }

            self.update_cell(x, y, false);

            steps += 1;
            if steps >= max_steps {
                break;
            }

            let e2 = 2 * err;
            if e2 > -dy {
                err -= dy;
                x += sx;
            }
            if e2 < dx {
                err += dx;
                y += sy;
            }
        }
    }
}
