pub mod components;
pub mod constants;
pub mod data;
pub mod entity;
pub mod simulation;
pub mod spatial;
pub mod systems;
