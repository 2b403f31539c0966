//! # ThreeCrate Algorithms
//!
//! Algorithms for mapping a displayed point set back onto the point clouds it
//! was rendered from.
//!
//! - [`nearest_neighbor`]: R*-tree and brute force nearest neighbor search
//! - [`cleaning`]: zero-tolerance merging of coincident points
//! - [`correspondence`]: nearest-point correspondence between a displayed
//!   surface and a reference cloud

pub mod nearest_neighbor;
pub mod cleaning;
pub mod correspondence;

// Re-export commonly used items
pub use nearest_neighbor::*;
pub use cleaning::*;
pub use correspondence::*;
