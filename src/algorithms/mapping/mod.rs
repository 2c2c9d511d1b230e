//! Occupancy mapping.

mod evidence_grid;

pub use evidence_grid::{CellState, EvidenceGrid, EvidenceGridConfig};
