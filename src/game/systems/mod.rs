//! Per-tick simulation systems, run in a fixed order by `Simulation::tick`

pub mod ai;
pub mod collision;
pub mod drops;
pub mod movement;
pub mod petal;
pub mod resolution;
