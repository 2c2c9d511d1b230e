//! Landmark extraction from range scans.

mod ransac;

pub use ransac::{LandmarkExtractor, LandmarkObservation, RansacConfig};
